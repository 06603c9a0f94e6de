//! Per-client request dispatch: advances each connection's state machine,
//! runs authentication, and answers every request frame the wire format
//! defines. This is the one place all of `connection`, `auth`, `keyrange`,
//! and `ownership` come together at runtime; everything else in the crate
//! is a collaborator this module drives.
//!
//! Wire convention: a request and its reply share one `frame_type` (the
//! table in `requests` names one constant per concept, not per direction);
//! requests with no return value reply with `ACK`, failures reply with
//! the matching `ERR_*` code.

use std::collections::HashMap;

use core_events::UpdateReason;
use core_session::{ParameterBus, ParameterId, ParameterValue, WatchFlags, WatchKey};

use crate::auth::{AuthOutcome, Authenticator};
use crate::connection::{ClientId, Connection};
use crate::framing::Frame;
use crate::keyrange::KeyRange;
use crate::ownership::DisplayOwnership;
use crate::requests::frame_type;
use crate::state::{ConnState, StateError};

pub const PROTOCOL_VERSION: u32 = 1;

const DRIVER_NAME: &str = "null-driver";
const MODEL_IDENTIFIER: &str = "generic-braille";

#[derive(Debug, Default)]
pub struct RouterOutcome {
    pub replies: Vec<(ClientId, Frame)>,
    pub update: Option<UpdateReason>,
}

impl RouterOutcome {
    fn single(client_id: ClientId, frame: Frame) -> Self {
        Self { replies: vec![(client_id, frame)], update: None }
    }

    fn with_update(mut self, reason: UpdateReason) -> Self {
        self.update = Some(reason);
        self
    }

    fn extend(mut self, other: Vec<(ClientId, Frame)>) -> Self {
        self.replies.extend(other);
        self
    }
}

fn ack(client_id: ClientId) -> (ClientId, Frame) {
    (client_id, Frame::new(frame_type::ACK, Vec::new()))
}

fn err(client_id: ClientId, code: u32) -> (ClientId, Frame) {
    (client_id, Frame::new(code, Vec::new()))
}

pub struct ProtocolRouter {
    connections: HashMap<ClientId, Connection>,
    tty: core_session::TtyTree,
    display_ownership: DisplayOwnership,
    last_write: HashMap<ClientId, Vec<u8>>,
    authenticator: Box<dyn Authenticator>,
    display_cell_count: u16,
}

impl ProtocolRouter {
    pub fn new(authenticator: Box<dyn Authenticator>, display_cell_count: u16) -> Self {
        Self {
            connections: HashMap::new(),
            tty: core_session::TtyTree::new(),
            display_ownership: DisplayOwnership::new(),
            last_write: HashMap::new(),
            authenticator,
            display_cell_count,
        }
    }

    pub fn display_owner(&self) -> Option<ClientId> {
        self.display_ownership.owner()
    }

    pub fn passthrough_cells(&self) -> Option<&[u8]> {
        let owner = self.display_ownership.owner()?;
        self.last_write.get(&owner).map(|v| v.as_slice())
    }

    /// Route a raw key transition to whichever client holds TTY focus for
    /// `vt` and has accepted this key value, if any.
    pub fn route_key(&self, vt: u32, key_value: u64) -> Option<ClientId> {
        let client_id = self.tty.focused_client(&[vt])?;
        let conn = self.connections.get(&client_id)?;
        if conn.state == ConnState::TtyAttached && conn.key_ranges.permits(key_value) {
            Some(client_id)
        } else {
            None
        }
    }

    /// Called when a new connection is accepted: pushes the version
    /// handshake and the configured auth type eagerly, the way the wire
    /// format's `New` state requires.
    pub fn on_connect(&mut self, client_id: ClientId) -> RouterOutcome {
        let mut conn = Connection::new(client_id);
        conn.state = conn.state.advance_version_exchanged();
        conn.state = conn.state.advance_auth_pending();
        self.connections.insert(client_id, conn);

        let version_frame = Frame::new(frame_type::VERSION, PROTOCOL_VERSION.to_be_bytes().to_vec());
        let auth_types_frame = Frame::new(frame_type::AUTH_TYPES, vec![auth_kind_code(self.authenticator.kind())]);
        RouterOutcome {
            replies: vec![(client_id, version_frame), (client_id, auth_types_frame)],
            update: None,
        }
    }

    pub fn on_disconnect(&mut self, client_id: ClientId) -> RouterOutcome {
        if let Some(conn) = self.connections.remove(&client_id) {
            self.tty.detach_client(&conn.tty_path, client_id);
            self.tty.release_focus(&conn.tty_path, client_id);
        }
        self.last_write.remove(&client_id);
        self.display_ownership.release(client_id);
        RouterOutcome::default()
    }

    pub fn on_frame(&mut self, client_id: ClientId, frame: Frame, parameters: &mut ParameterBus) -> RouterOutcome {
        let Some(state) = self.connections.get(&client_id).map(|c| c.state) else {
            return RouterOutcome::default();
        };
        if let Err(state_err) = state.check(frame.frame_type) {
            return RouterOutcome::single(client_id, err(client_id, state_error_code(state_err)).1);
        }

        match frame.frame_type {
            frame_type::AUTH_RESPONSE => self.handle_auth_response(client_id, &frame.payload),
            frame_type::GET_DRIVER_NAME => {
                RouterOutcome::single(client_id, Frame::new(frame_type::GET_DRIVER_NAME, DRIVER_NAME.as_bytes().to_vec()))
            }
            frame_type::GET_MODEL_IDENTIFIER => RouterOutcome::single(
                client_id,
                Frame::new(frame_type::GET_MODEL_IDENTIFIER, MODEL_IDENTIFIER.as_bytes().to_vec()),
            ),
            frame_type::GET_DISPLAY_SIZE => RouterOutcome::single(
                client_id,
                Frame::new(frame_type::GET_DISPLAY_SIZE, self.display_cell_count.to_be_bytes().to_vec()),
            ),
            frame_type::ENTER_TTY_MODE => self.handle_enter_tty(client_id, &frame.payload),
            frame_type::LEAVE_TTY_MODE => self.handle_leave_tty(client_id),
            frame_type::SET_FOCUS => self.handle_set_focus(client_id),
            frame_type::WRITE => self.handle_write(client_id, frame.payload),
            frame_type::ACCEPT_KEYS => self.handle_key_ranges(client_id, &frame.payload, true),
            frame_type::IGNORE_KEYS => self.handle_key_ranges(client_id, &frame.payload, false),
            frame_type::ACQUIRE_DISPLAY => self.handle_acquire_display(client_id),
            frame_type::RELEASE_DISPLAY => self.handle_release_display(client_id),
            frame_type::WATCH_PARAMETER => self.handle_watch_parameter(client_id, &frame.payload, parameters),
            frame_type::GET_PARAMETER => self.handle_get_parameter(client_id, &frame.payload, parameters),
            frame_type::SET_PARAMETER => self.handle_set_parameter(client_id, &frame.payload, parameters),
            _ => RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1),
        }
    }

    fn handle_auth_response(&mut self, client_id: ClientId, payload: &[u8]) -> RouterOutcome {
        let outcome = self.authenticator.authenticate(payload);
        let Some(conn) = self.connections.get_mut(&client_id) else {
            return RouterOutcome::default();
        };
        match outcome {
            AuthOutcome::Accepted => {
                conn.state = conn.state.advance_authenticated();
                RouterOutcome::single(client_id, Frame::new(frame_type::AUTH_RESULT, vec![0]))
            }
            AuthOutcome::Denied => {
                core_events::CLIENT_AUTH_FAILURES.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                conn.state = conn.state.advance_closing();
                RouterOutcome::single(client_id, Frame::new(frame_type::AUTH_RESULT, vec![1]))
            }
            AuthOutcome::ProtocolError => {
                conn.state = conn.state.advance_closing();
                RouterOutcome::single(client_id, err(client_id, frame_type::ERR_PROTOCOL_VERSION).1)
            }
        }
    }

    fn handle_enter_tty(&mut self, client_id: ClientId, payload: &[u8]) -> RouterOutcome {
        let mut offset = 0usize;
        let Some(count) = read_u8(payload, &mut offset) else {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        };
        let mut path = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match read_u32(payload, &mut offset) {
                Some(segment) => path.push(segment),
                None => return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1),
            }
        }
        if path.is_empty() {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        }
        self.tty.ensure_path(&path);
        self.tty.set_focus(&path, client_id);
        let Some(conn) = self.connections.get_mut(&client_id) else {
            return RouterOutcome::default();
        };
        conn.tty_path = path;
        conn.state = conn.state.advance_tty_attached();
        RouterOutcome::single(client_id, ack(client_id).1)
    }

    fn handle_leave_tty(&mut self, client_id: ClientId) -> RouterOutcome {
        let Some(conn) = self.connections.get_mut(&client_id) else {
            return RouterOutcome::default();
        };
        let path = std::mem::take(&mut conn.tty_path);
        conn.state = ConnState::Authenticated;
        self.tty.detach_client(&path, client_id);
        self.tty.release_focus(&path, client_id);
        RouterOutcome::single(client_id, ack(client_id).1)
    }

    fn handle_set_focus(&mut self, client_id: ClientId) -> RouterOutcome {
        let Some(conn) = self.connections.get(&client_id) else {
            return RouterOutcome::default();
        };
        let path = conn.tty_path.clone();
        self.tty.set_focus(&path, client_id);
        RouterOutcome::single(client_id, ack(client_id).1)
    }

    fn handle_write(&mut self, client_id: ClientId, payload: Vec<u8>) -> RouterOutcome {
        if self.display_ownership.owner() != Some(client_id) {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        }
        self.last_write.insert(client_id, payload);
        RouterOutcome::single(client_id, ack(client_id).1).with_update(UpdateReason::ClientWrite)
    }

    fn handle_key_ranges(&mut self, client_id: ClientId, payload: &[u8], accept: bool) -> RouterOutcome {
        let mut offset = 0usize;
        let Some(count) = read_u16(payload, &mut offset) else {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        };
        let mut ranges = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (Some(min), Some(max)) = (read_u64(payload, &mut offset), read_u64(payload, &mut offset)) else {
                return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
            };
            ranges.push(KeyRange::new(min, max));
        }
        let Some(conn) = self.connections.get_mut(&client_id) else {
            return RouterOutcome::default();
        };
        for range in ranges {
            if accept {
                conn.key_ranges.accept(range);
            } else {
                conn.key_ranges.reject(range);
            }
        }
        RouterOutcome::single(client_id, ack(client_id).1)
    }

    fn handle_acquire_display(&mut self, client_id: ClientId) -> RouterOutcome {
        self.display_ownership.acquire(client_id);
        RouterOutcome::single(client_id, ack(client_id).1)
    }

    fn handle_release_display(&mut self, client_id: ClientId) -> RouterOutcome {
        self.display_ownership.release(client_id);
        self.last_write.remove(&client_id);
        RouterOutcome::single(client_id, ack(client_id).1).with_update(UpdateReason::ClientWrite)
    }

    fn handle_watch_parameter(&mut self, client_id: ClientId, payload: &[u8], parameters: &mut ParameterBus) -> RouterOutcome {
        let mut offset = 0usize;
        let (Some(param), Some(subparam), Some(flags)) = (
            read_u32(payload, &mut offset),
            read_u32(payload, &mut offset),
            read_u8(payload, &mut offset),
        ) else {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        };
        let param = ParameterId(param);
        parameters.watch(
            WatchKey { param, subparam, client_id },
            WatchFlags { self_notify: flags & 1 != 0 },
        );
        let reply_payload = match parameters.get(param, subparam) {
            Some(value) => encode_parameter_value(value),
            None => Vec::new(),
        };
        RouterOutcome::single(client_id, Frame::new(frame_type::WATCH_PARAMETER, reply_payload))
    }

    fn handle_get_parameter(&mut self, client_id: ClientId, payload: &[u8], parameters: &ParameterBus) -> RouterOutcome {
        let mut offset = 0usize;
        let (Some(param), Some(subparam)) = (read_u32(payload, &mut offset), read_u32(payload, &mut offset)) else {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        };
        let reply_payload = match parameters.get(ParameterId(param), subparam) {
            Some(value) => encode_parameter_value(value),
            None => return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1),
        };
        RouterOutcome::single(client_id, Frame::new(frame_type::GET_PARAMETER, reply_payload))
    }

    fn handle_set_parameter(&mut self, client_id: ClientId, payload: &[u8], parameters: &mut ParameterBus) -> RouterOutcome {
        let mut offset = 0usize;
        let (Some(param), Some(subparam)) = (read_u32(payload, &mut offset), read_u32(payload, &mut offset)) else {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        };
        let Some(value) = decode_parameter_value(payload, &mut offset) else {
            return RouterOutcome::single(client_id, err(client_id, frame_type::ERR_ILLEGAL_STATE).1);
        };
        let recipients = parameters.set(ParameterId(param), subparam, value.clone(), Some(client_id));
        let update_payload = encode_parameter_value(&value);
        let mut replies: Vec<(ClientId, Frame)> = recipients
            .into_iter()
            .map(|id| (id, Frame::new(frame_type::PARAMETER_UPDATE, update_payload.clone())))
            .collect();
        replies.push(ack(client_id));
        RouterOutcome { replies, update: None }
    }
}

fn auth_kind_code(kind: crate::auth::AuthKind) -> u8 {
    use crate::auth::AuthKind::*;
    match kind {
        None => 0,
        Keyfile => 1,
        Credentials => 2,
        Polkit => 3,
    }
}

fn state_error_code(err: StateError) -> u32 {
    match err {
        StateError::NotAuthenticated => frame_type::ERR_AUTH_FAILED,
        StateError::NotTtyAttached => frame_type::ERR_ILLEGAL_STATE,
        StateError::Closing => frame_type::ERR_ILLEGAL_STATE,
    }
}

fn read_u8(buf: &[u8], offset: &mut usize) -> Option<u8> {
    let byte = *buf.get(*offset)?;
    *offset += 1;
    Some(byte)
}

fn read_u16(buf: &[u8], offset: &mut usize) -> Option<u16> {
    let slice = buf.get(*offset..*offset + 2)?;
    *offset += 2;
    Some(u16::from_be_bytes(slice.try_into().unwrap()))
}

fn read_u32(buf: &[u8], offset: &mut usize) -> Option<u32> {
    let slice = buf.get(*offset..*offset + 4)?;
    *offset += 4;
    Some(u32::from_be_bytes(slice.try_into().unwrap()))
}

fn read_u64(buf: &[u8], offset: &mut usize) -> Option<u64> {
    let slice = buf.get(*offset..*offset + 8)?;
    *offset += 8;
    Some(u64::from_be_bytes(slice.try_into().unwrap()))
}

fn encode_parameter_value(value: &ParameterValue) -> Vec<u8> {
    match value {
        ParameterValue::Bool(b) => vec![0, *b as u8],
        ParameterValue::Int(n) => {
            let mut out = vec![1];
            out.extend_from_slice(&n.to_be_bytes());
            out
        }
        ParameterValue::Text(s) => {
            let mut out = vec![2];
            out.extend_from_slice(&(s.len() as u16).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
            out
        }
        ParameterValue::Bytes(b) => {
            let mut out = vec![3];
            out.extend_from_slice(&(b.len() as u16).to_be_bytes());
            out.extend_from_slice(b);
            out
        }
    }
}

fn decode_parameter_value(buf: &[u8], offset: &mut usize) -> Option<ParameterValue> {
    let tag = read_u8(buf, offset)?;
    match tag {
        0 => read_u8(buf, offset).map(|b| ParameterValue::Bool(b != 0)),
        1 => {
            let slice = buf.get(*offset..*offset + 8)?;
            *offset += 8;
            Some(ParameterValue::Int(i64::from_be_bytes(slice.try_into().unwrap())))
        }
        2 => {
            let len = read_u16(buf, offset)? as usize;
            let slice = buf.get(*offset..*offset + len)?;
            *offset += len;
            Some(ParameterValue::Text(String::from_utf8(slice.to_vec()).ok()?))
        }
        3 => {
            let len = read_u16(buf, offset)? as usize;
            let slice = buf.get(*offset..*offset + len)?;
            *offset += len;
            Some(ParameterValue::Bytes(slice.to_vec()))
        }
        _ => None,
    }
}
