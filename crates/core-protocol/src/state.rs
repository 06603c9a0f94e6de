//! Per-connection state machine. Illegal-transition requests are rejected
//! up front by gating the dispatch match on the current state, rather
//! than special-casing each request type.

use crate::requests::{requires_authentication, requires_tty_attached};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    New,
    VersionExchanged,
    AuthPending,
    Authenticated,
    TtyAttached,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    NotAuthenticated,
    NotTtyAttached,
    Closing,
}

impl ConnState {
    /// Whether a frame of `frame_type` is legal to process in this state.
    pub fn check(self, frame_type: u32) -> Result<(), StateError> {
        if self == ConnState::Closing {
            return Err(StateError::Closing);
        }
        if requires_tty_attached(frame_type) && self != ConnState::TtyAttached {
            return Err(StateError::NotTtyAttached);
        }
        if requires_authentication(frame_type)
            && !matches!(self, ConnState::Authenticated | ConnState::TtyAttached)
        {
            return Err(StateError::NotAuthenticated);
        }
        Ok(())
    }

    pub fn advance_version_exchanged(self) -> Self {
        debug_assert_eq!(self, ConnState::New);
        ConnState::VersionExchanged
    }

    pub fn advance_auth_pending(self) -> Self {
        debug_assert_eq!(self, ConnState::VersionExchanged);
        ConnState::AuthPending
    }

    pub fn advance_authenticated(self) -> Self {
        debug_assert_eq!(self, ConnState::AuthPending);
        ConnState::Authenticated
    }

    pub fn advance_tty_attached(self) -> Self {
        debug_assert_eq!(self, ConnState::Authenticated);
        ConnState::TtyAttached
    }

    pub fn advance_closing(self) -> Self {
        ConnState::Closing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::frame_type;

    #[test]
    fn write_before_tty_attach_is_rejected() {
        let state = ConnState::Authenticated;
        assert_eq!(state.check(frame_type::WRITE), Err(StateError::NotTtyAttached));
    }

    #[test]
    fn write_after_tty_attach_is_permitted() {
        let state = ConnState::TtyAttached;
        assert_eq!(state.check(frame_type::WRITE), Ok(()));
    }

    #[test]
    fn closing_rejects_everything() {
        let state = ConnState::Closing;
        assert_eq!(state.check(frame_type::GET_DRIVER_NAME), Err(StateError::Closing));
    }

    #[test]
    fn version_frame_is_permitted_before_authentication() {
        let state = ConnState::New;
        assert_eq!(state.check(frame_type::VERSION), Ok(()));
    }
}
