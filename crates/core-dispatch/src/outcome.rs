//! Result of dispatching a single command.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handled: bool,
    pub dirty: bool,
    pub quit: bool,
}

impl DispatchOutcome {
    pub fn unhandled() -> Self {
        Self {
            handled: false,
            dirty: false,
            quit: false,
        }
    }

    pub fn handled() -> Self {
        Self {
            handled: true,
            dirty: false,
            quit: false,
        }
    }

    pub fn dirty() -> Self {
        Self {
            handled: true,
            dirty: true,
            quit: false,
        }
    }

    pub fn quit() -> Self {
        Self {
            handled: true,
            dirty: true,
            quit: true,
        }
    }
}
