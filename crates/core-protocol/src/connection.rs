//! Per-connection bookkeeping: state, TTY attachment, and key interest.

use crate::keyrange::KeyRangeSet;
use crate::state::ConnState;

pub type ClientId = u64;

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ClientId,
    pub state: ConnState,
    pub tty_path: Vec<u32>,
    pub key_ranges: KeyRangeSet,
    pub self_notify_watches: bool,
}

impl Connection {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            state: ConnState::New,
            tty_path: Vec::new(),
            key_ranges: KeyRangeSet::new(),
            self_notify_watches: false,
        }
    }
}
