//! Parameter bus: typed, watchable global and per-scope values.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub param: ParameterId,
    pub subparam: u32,
    pub client_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchFlags {
    pub self_notify: bool,
}

#[derive(Debug, Default)]
pub struct ParameterBus {
    values: HashMap<(ParameterId, u32), ParameterValue>,
    watchers: HashMap<(ParameterId, u32), Vec<(u64, WatchFlags)>>,
}

impl ParameterBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, param: ParameterId, subparam: u32) -> Option<&ParameterValue> {
        self.values.get(&(param, subparam))
    }

    pub fn watch(&mut self, key: WatchKey, flags: WatchFlags) {
        self.watchers
            .entry((key.param, key.subparam))
            .or_default()
            .push((key.client_id, flags));
    }

    pub fn unwatch_client(&mut self, client_id: u64) {
        for list in self.watchers.values_mut() {
            list.retain(|(id, _)| *id != client_id);
        }
    }

    /// Set a value and return the set of client ids that should receive a
    /// `parameterUpdate` frame: every watcher of this `(param, subparam)`,
    /// excluding the writer unless it opted into self-notify.
    pub fn set(
        &mut self,
        param: ParameterId,
        subparam: u32,
        value: ParameterValue,
        writer: Option<u64>,
    ) -> Vec<u64> {
        self.values.insert((param, subparam), value);
        let Some(list) = self.watchers.get(&(param, subparam)) else {
            return Vec::new();
        };
        let recipients = list
            .iter()
            .filter(|(id, flags)| Some(*id) != writer || flags.self_notify)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        core_events::PARAMETER_UPDATES_BROADCAST
            .fetch_add(recipients.len() as u64, std::sync::atomic::Ordering::Relaxed);
        recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchers_receive_updates_excluding_self_by_default() {
        let mut bus = ParameterBus::new();
        let param = ParameterId(1);
        bus.watch(
            WatchKey { param, subparam: 0, client_id: 1 },
            WatchFlags { self_notify: false },
        );
        bus.watch(
            WatchKey { param, subparam: 0, client_id: 2 },
            WatchFlags { self_notify: true },
        );
        let recipients = bus.set(param, 0, ParameterValue::Bool(true), Some(2));
        assert!(recipients.contains(&1));
        assert!(recipients.contains(&2));
    }

    #[test]
    fn unwatch_client_removes_from_all_parameters() {
        let mut bus = ParameterBus::new();
        let param = ParameterId(2);
        bus.watch(
            WatchKey { param, subparam: 0, client_id: 9 },
            WatchFlags { self_notify: false },
        );
        bus.unwatch_client(9);
        let recipients = bus.set(param, 0, ParameterValue::Int(1), None);
        assert!(recipients.is_empty());
    }
}
