//! Frame type codes for both request/reply pairs and server-pushed
//! asynchronous frames.

pub mod frame_type {
    pub const VERSION: u32 = 0;
    pub const AUTH_TYPES: u32 = 1;
    pub const AUTH_RESPONSE: u32 = 2;
    pub const AUTH_RESULT: u32 = 3;

    pub const GET_DRIVER_NAME: u32 = 10;
    pub const GET_MODEL_IDENTIFIER: u32 = 11;
    pub const GET_DISPLAY_SIZE: u32 = 12;
    pub const ENTER_TTY_MODE: u32 = 13;
    pub const LEAVE_TTY_MODE: u32 = 14;
    pub const SET_FOCUS: u32 = 15;
    pub const WRITE: u32 = 16;
    pub const ACCEPT_KEYS: u32 = 17;
    pub const IGNORE_KEYS: u32 = 18;
    pub const ACQUIRE_DISPLAY: u32 = 19;
    pub const RELEASE_DISPLAY: u32 = 20;
    pub const WATCH_PARAMETER: u32 = 21;
    pub const GET_PARAMETER: u32 = 22;
    pub const SET_PARAMETER: u32 = 23;

    pub const ACK: u32 = 40;
    pub const ERR_PROTOCOL_VERSION: u32 = 41;
    pub const ERR_AUTH_FAILED: u32 = 42;
    pub const ERR_ILLEGAL_STATE: u32 = 43;
    pub const ERR_TIMEOUT: u32 = 44;

    pub const KEY: u32 = 60;
    pub const PARAMETER_UPDATE: u32 = 61;
    pub const EXCEPTION: u32 = 62;
}

/// Requests that require the connection to already be `Authenticated`
/// (or later). Used to gate dispatch on connection state without
/// special-casing each request in the read loop.
pub fn requires_authentication(frame_type: u32) -> bool {
    use frame_type::*;
    matches!(
        frame_type,
        GET_DRIVER_NAME
            | GET_MODEL_IDENTIFIER
            | GET_DISPLAY_SIZE
            | ENTER_TTY_MODE
            | LEAVE_TTY_MODE
            | SET_FOCUS
            | WRITE
            | ACCEPT_KEYS
            | IGNORE_KEYS
            | ACQUIRE_DISPLAY
            | RELEASE_DISPLAY
            | WATCH_PARAMETER
            | GET_PARAMETER
            | SET_PARAMETER
    )
}

/// Requests valid only once the connection has entered TTY mode.
pub fn requires_tty_attached(frame_type: u32) -> bool {
    use frame_type::*;
    matches!(frame_type, WRITE | ACCEPT_KEYS | IGNORE_KEYS | SET_FOCUS)
}
