pub mod context;
pub mod dispatch;
pub mod environment;
pub mod handlers;
pub mod misc_codes;
pub mod outcome;
pub mod queue;

pub use context::DispatchContext;
pub use dispatch::{dispatch, CommandObserver};
pub use environment::{CommandContext, Environment, EnvironmentError, EnvironmentStack, MAX_ENVIRONMENT_DEPTH};
pub use handlers::{standard_stack, Handler, HandlerOutcome};
pub use outcome::DispatchOutcome;
pub use queue::{CommandQueue, Priority};
