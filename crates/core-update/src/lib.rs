pub mod renderpass;
pub mod scheduler;

pub use renderpass::{run_pass, PassOutcome};
pub use scheduler::{Decision, RenderDelta, UpdateScheduler};
