//! `PendingKeys`: the runtime state machine that turns a stream of raw key
//! transitions into bound commands, layering chord composition, hold/
//! long-press resolution, and sticky modifiers on top of a compiled
//! [`KeyTable`].

use crate::command::{Command, CommandBlock, CommandFlags};
use crate::table::{BindingFlags, Chord, ContextId, KeyId, KeyTable};
use core_events::{KeyEvent, KeyGroup, ModMask};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatcherState {
    Idle,
    Building,
    Held,
}

#[derive(Debug, Clone, Copy, Default)]
struct StickyState {
    once: ModMask,
    lock: ModMask,
    reset_deadline: Option<Instant>,
}

impl StickyState {
    fn active(&self) -> ModMask {
        self.once | self.lock
    }

    fn clear(&mut self) {
        self.once = ModMask::empty();
        self.lock = ModMask::empty();
        self.reset_deadline = None;
    }

    /// Consume the active sticky flags, returning what was applied. `once`
    /// is cleared after a single use; `lock` persists.
    fn consume(&mut self) -> ModMask {
        let active = self.active();
        self.once = ModMask::empty();
        active
    }
}

/// What a single key transition produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A bound command fired.
    Command(Command),
    /// No binding matched; the chord is discarded.
    Rejected,
    /// The combination is still being built; no command yet.
    Pending,
}

pub struct KeyMatcher<'t> {
    table: &'t KeyTable,
    state: MatcherState,
    held: Chord,
    combo: Chord,
    context: ContextId,
    long_press_deadline: Option<Instant>,
    held_binding: Option<Command>,
    sticky: StickyState,
    long_press_timeout: Duration,
    sticky_reset_timeout: Duration,
}

impl<'t> KeyMatcher<'t> {
    pub fn new(
        table: &'t KeyTable,
        context: ContextId,
        long_press_timeout: Duration,
        sticky_reset_timeout: Duration,
    ) -> Self {
        Self {
            table,
            state: MatcherState::Idle,
            held: Chord::default(),
            combo: Chord::default(),
            context,
            long_press_deadline: None,
            held_binding: None,
            sticky: StickyState::default(),
            long_press_timeout,
            sticky_reset_timeout,
        }
    }

    pub fn set_context(&mut self, context: ContextId) {
        self.context = context;
    }

    /// A VT-switch command clears pending chord state and sticky modifiers:
    /// mid-combination state tied to one virtual terminal must not bleed
    /// into another.
    pub fn on_vt_switch(&mut self) {
        self.state = MatcherState::Idle;
        self.held = Chord::default();
        self.combo = Chord::default();
        self.long_press_deadline = None;
        self.held_binding = None;
        self.sticky.clear();
    }

    pub fn feed(&mut self, event: KeyEvent, now: Instant) -> MatchOutcome {
        let key = KeyId {
            group: event.group,
            number: event.number,
        };
        if is_modifier(key) && !event.pressed {
            return self.on_modifier_release(key);
        }
        if event.pressed {
            self.on_press(key, now)
        } else {
            self.on_release(key)
        }
    }

    fn on_modifier_release(&mut self, key: KeyId) -> MatchOutcome {
        // A modifier pressed and released alone (never combined with
        // another key this cycle) toggles the sticky state; building a
        // combination with other keys falls through to normal release
        // handling instead.
        if self.state == MatcherState::Building && self.combo.len() == 1 {
            self.held.remove(key);
            self.state = MatcherState::Idle;
            self.combo = Chord::default();
            let mask = modifier_mask(key);
            if self.sticky.lock.contains(mask) {
                self.sticky.lock.remove(mask);
            } else if self.sticky.once.contains(mask) {
                self.sticky.once.remove(mask);
                self.sticky.lock.insert(mask);
            } else {
                self.sticky.once.insert(mask);
            }
            return MatchOutcome::Pending;
        }
        self.on_release(key)
    }

    fn on_press(&mut self, key: KeyId, now: Instant) -> MatchOutcome {
        self.state = MatcherState::Building;
        self.held.insert(key);
        self.combo.insert(key);
        self.long_press_deadline = Some(now + self.long_press_timeout);
        MatchOutcome::Pending
    }

    fn on_release(&mut self, key: KeyId) -> MatchOutcome {
        self.held.remove(key);
        if self.state == MatcherState::Held {
            if self.held.is_empty() {
                self.state = MatcherState::Idle;
                let release = self.held_binding.take();
                self.combo = Chord::default();
                self.long_press_deadline = None;
                return release.map(MatchOutcome::Command).unwrap_or(MatchOutcome::Pending);
            }
            return MatchOutcome::Pending;
        }
        let outcome = self.resolve_combo();
        if self.held.is_empty() {
            self.combo = Chord::default();
            self.state = MatcherState::Idle;
            self.long_press_deadline = None;
        }
        outcome
    }

    fn resolve_combo(&mut self) -> MatchOutcome {
        let combo = self.combo.clone();
        match self.table.lookup(self.context, &combo) {
            Some((binding, _)) if !binding.flags.contains(BindingFlags::HOLD) => {
                let command = self.apply_sticky(binding.command);
                MatchOutcome::Command(command)
            }
            _ => MatchOutcome::Rejected,
        }
    }

    /// Evaluate the long-press timer. Call periodically (e.g. on each
    /// refresh-quantum tick) with the current time.
    pub fn poll_timeout(&mut self, now: Instant) -> MatchOutcome {
        if self.state != MatcherState::Building {
            return MatchOutcome::Pending;
        }
        let Some(deadline) = self.long_press_deadline else {
            return MatchOutcome::Pending;
        };
        if now < deadline {
            return MatchOutcome::Pending;
        }
        let combo = self.combo.clone();
        match self.table.lookup(self.context, &combo) {
            Some((binding, _)) if binding.flags.contains(BindingFlags::HOLD) => {
                self.state = MatcherState::Held;
                self.held_binding = binding.release_command;
                MatchOutcome::Command(self.apply_sticky(binding.command))
            }
            _ => MatchOutcome::Pending,
        }
    }

    /// Evaluate the sticky-modifier reset timer independently of the
    /// long-press timer.
    pub fn poll_sticky_reset(&mut self, now: Instant) {
        if let Some(deadline) = self.sticky.reset_deadline {
            if now >= deadline {
                self.sticky.clear();
            }
        } else if self.sticky.active() != ModMask::empty() {
            self.sticky.reset_deadline = Some(now + self.sticky_reset_timeout);
        }
    }

    fn apply_sticky(&mut self, mut command: Command) -> Command {
        if matches!(
            command.block,
            CommandBlock::PassChar | CommandBlock::PassKey | CommandBlock::PassDots
        ) {
            let active = self.sticky.consume();
            if active.contains(ModMask::SHIFT) {
                command.flags |= CommandFlags::INPUT_SHIFT;
            }
            if active.contains(ModMask::CONTROL) {
                command.flags |= CommandFlags::INPUT_CONTROL;
            }
            if active.contains(ModMask::META) {
                command.flags |= CommandFlags::INPUT_META;
            }
        }
        command
    }
}

fn is_modifier(key: KeyId) -> bool {
    matches!(key.group, KeyGroup::Modifier)
}

fn modifier_mask(key: KeyId) -> ModMask {
    match key.number {
        0 => ModMask::SHIFT,
        1 => ModMask::CONTROL,
        2 => ModMask::META,
        3 => ModMask::ALTGR,
        4 => ModMask::GUI,
        _ => ModMask::UPPER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBlock;
    use crate::table::{Binding, KeyTable};

    fn build_table() -> KeyTable {
        let mut b = KeyTable::builder();
        let ctx = b.declare_context("default", None);
        let dot1 = KeyId {
            group: KeyGroup::Braille,
            number: 1,
        };
        b.declare_key("dot1", dot1);
        b.bind(
            ctx,
            Chord::single(dot1),
            Binding {
                command: Command::new(CommandBlock::PassChar, 'a' as u16),
                flags: BindingFlags::empty(),
                release_command: None,
            },
        );
        let dot2 = KeyId {
            group: KeyGroup::Braille,
            number: 2,
        };
        b.declare_key("dot2", dot2);
        b.bind(
            ctx,
            Chord::single(dot2),
            Binding {
                command: Command::new(CommandBlock::Misc, 1),
                flags: BindingFlags::HOLD,
                release_command: Some(Command::new(CommandBlock::Misc, 2)),
            },
        );
        b.build()
    }

    fn shift_key() -> KeyId {
        KeyId {
            group: KeyGroup::Modifier,
            number: 0,
        }
    }

    #[test]
    fn simple_press_release_emits_command_on_release() {
        let table = build_table();
        let ctx = table.context_id("default").unwrap();
        let mut m = KeyMatcher::new(&table, ctx, Duration::from_millis(300), Duration::from_secs(10));
        let now = Instant::now();
        let dot1 = table.key_named("dot1").unwrap();
        let press = KeyEvent { group: dot1.group, number: dot1.number, pressed: true };
        let release = KeyEvent { group: dot1.group, number: dot1.number, pressed: false };
        assert_eq!(m.feed(press, now), MatchOutcome::Pending);
        let outcome = m.feed(release, now);
        assert_eq!(outcome, MatchOutcome::Command(Command::new(CommandBlock::PassChar, 'a' as u16)));
    }

    #[test]
    fn long_press_fires_hold_binding_then_release_on_empty() {
        let table = build_table();
        let ctx = table.context_id("default").unwrap();
        let mut m = KeyMatcher::new(&table, ctx, Duration::from_millis(50), Duration::from_secs(10));
        let now = Instant::now();
        let dot2 = table.key_named("dot2").unwrap();
        let press = KeyEvent { group: dot2.group, number: dot2.number, pressed: true };
        assert_eq!(m.feed(press, now), MatchOutcome::Pending);
        let later = now + Duration::from_millis(60);
        let outcome = m.poll_timeout(later);
        assert_eq!(outcome, MatchOutcome::Command(Command::new(CommandBlock::Misc, 1)));
        let release = KeyEvent { group: dot2.group, number: dot2.number, pressed: false };
        let release_outcome = m.feed(release, later);
        assert_eq!(release_outcome, MatchOutcome::Command(Command::new(CommandBlock::Misc, 2)));
    }

    #[test]
    fn sticky_shift_applies_once_then_clears() {
        let table = build_table();
        let ctx = table.context_id("default").unwrap();
        let mut m = KeyMatcher::new(&table, ctx, Duration::from_millis(300), Duration::from_secs(10));
        let now = Instant::now();
        let shift = shift_key();
        m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: true }, now);
        m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: false }, now);

        let dot1 = table.key_named("dot1").unwrap();
        m.feed(KeyEvent { group: dot1.group, number: dot1.number, pressed: true }, now);
        let first = m.feed(KeyEvent { group: dot1.group, number: dot1.number, pressed: false }, now);
        assert_eq!(
            first,
            MatchOutcome::Command(
                Command::new(CommandBlock::PassChar, 'a' as u16).with_flags(CommandFlags::INPUT_SHIFT)
            )
        );

        m.feed(KeyEvent { group: dot1.group, number: dot1.number, pressed: true }, now);
        let second = m.feed(KeyEvent { group: dot1.group, number: dot1.number, pressed: false }, now);
        assert_eq!(second, MatchOutcome::Command(Command::new(CommandBlock::PassChar, 'a' as u16)));
    }

    #[test]
    fn double_shift_locks_until_third_press() {
        let table = build_table();
        let ctx = table.context_id("default").unwrap();
        let mut m = KeyMatcher::new(&table, ctx, Duration::from_millis(300), Duration::from_secs(10));
        let now = Instant::now();
        let shift = shift_key();
        for _ in 0..2 {
            m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: true }, now);
            m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: false }, now);
        }
        assert!(m.sticky.lock.contains(ModMask::SHIFT));
        m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: true }, now);
        m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: false }, now);
        assert!(!m.sticky.lock.contains(ModMask::SHIFT));
    }

    #[test]
    fn vt_switch_clears_pending_and_sticky_state() {
        let table = build_table();
        let ctx = table.context_id("default").unwrap();
        let mut m = KeyMatcher::new(&table, ctx, Duration::from_millis(300), Duration::from_secs(10));
        let now = Instant::now();
        let shift = shift_key();
        m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: true }, now);
        m.feed(KeyEvent { group: shift.group, number: shift.number, pressed: false }, now);
        assert!(m.sticky.once.contains(ModMask::SHIFT));
        m.on_vt_switch();
        assert_eq!(m.sticky.active(), ModMask::empty());
    }
}
