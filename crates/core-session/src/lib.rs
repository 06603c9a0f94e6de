pub mod clipboard;
pub mod parameter;
pub mod tty;
pub mod window;

pub use clipboard::Clipboard;
pub use parameter::{ParameterBus, ParameterId, ParameterValue, WatchFlags, WatchKey};
pub use tty::{TtyNode, TtyNodeId, TtyTree};
pub use window::{
    compute_scroll_intent, DisplayMode, ScreenRegion, Session, SessionManager, Window,
};
