//! Update scheduler: merges `needsUpdate` reasons queued since the last
//! render pass into a single shape the pass executes, escalating to a full
//! repaint whenever the individual pieces no longer cheaply compose.
//!
//! Merge semantics mirror a render-delta collapse: `Full` always wins; a
//! `CursorOnly` mark never downgrades a pending `Full`; window pans
//! coalesce to the earliest observed origin and the latest new origin.

use core_events::UpdateReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDelta {
    Full,
    WindowPan { old_origin: u16, new_origin: u16 },
    CursorOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub semantic: RenderDelta,
    pub effective: RenderDelta,
}

#[derive(Debug, Default)]
pub struct UpdateScheduler {
    pending: Vec<RenderDelta>,
    /// Pan distances beyond this many columns escalate to `Full` rather
    /// than emit an unbounded incremental shift.
    pan_escalation_width: u16,
}

impl UpdateScheduler {
    pub fn new(visible_window_width: u16) -> Self {
        Self {
            pending: Vec::new(),
            pan_escalation_width: visible_window_width,
        }
    }

    pub fn mark(&mut self, reason: UpdateReason) {
        let delta = match reason {
            UpdateReason::ScreenChanged | UpdateReason::PreferenceChanged | UpdateReason::Resize => {
                RenderDelta::Full
            }
            UpdateReason::KeyCommand | UpdateReason::ClientWrite => RenderDelta::CursorOnly,
        };
        tracing::trace!(target: "update", ?delta, "update_mark");
        self.pending.push(delta);
    }

    pub fn mark_pan(&mut self, old_origin: u16, new_origin: u16) {
        self.pending.push(RenderDelta::WindowPan { old_origin, new_origin });
    }

    pub fn mark_delta(&mut self, delta: RenderDelta) {
        self.pending.push(delta);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Collapse queued deltas into one `Decision`. Returns `None` if
    /// nothing was marked since the last call.
    pub fn consume(&mut self) -> Option<Decision> {
        if self.pending.is_empty() {
            return None;
        }
        let semantic = self.collapse();
        self.pending.clear();
        let effective = match semantic {
            RenderDelta::WindowPan { old_origin, new_origin } => {
                let distance = new_origin.abs_diff(old_origin);
                if distance > self.pan_escalation_width {
                    RenderDelta::Full
                } else {
                    semantic
                }
            }
            other => other,
        };
        Some(Decision { semantic, effective })
    }

    fn collapse(&self) -> RenderDelta {
        if self.pending.iter().any(|d| *d == RenderDelta::Full) {
            return RenderDelta::Full;
        }
        let mut pan: Option<(u16, u16)> = None;
        let mut cursor_only = false;
        for delta in &self.pending {
            match delta {
                RenderDelta::Full => return RenderDelta::Full,
                RenderDelta::WindowPan { old_origin, new_origin } => {
                    pan = Some(match pan {
                        None => (*old_origin, *new_origin),
                        Some((first_old, _)) => (first_old, *new_origin),
                    });
                }
                RenderDelta::CursorOnly => cursor_only = true,
            }
        }
        if let Some((old_origin, new_origin)) = pan {
            return RenderDelta::WindowPan { old_origin, new_origin };
        }
        if cursor_only {
            return RenderDelta::CursorOnly;
        }
        RenderDelta::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_wins_over_everything_else() {
        let mut s = UpdateScheduler::new(20);
        s.mark(UpdateReason::KeyCommand);
        s.mark(UpdateReason::ScreenChanged);
        let decision = s.consume().unwrap();
        assert_eq!(decision.semantic, RenderDelta::Full);
    }

    #[test]
    fn pans_coalesce_to_earliest_old_and_latest_new() {
        let mut s = UpdateScheduler::new(20);
        s.mark_pan(0, 5);
        s.mark_pan(5, 9);
        let decision = s.consume().unwrap();
        assert_eq!(
            decision.semantic,
            RenderDelta::WindowPan { old_origin: 0, new_origin: 9 }
        );
    }

    #[test]
    fn pan_beyond_window_width_escalates_to_full_effective() {
        let mut s = UpdateScheduler::new(10);
        s.mark_pan(0, 50);
        let decision = s.consume().unwrap();
        assert_eq!(decision.effective, RenderDelta::Full);
        assert_ne!(decision.semantic, RenderDelta::Full);
    }

    #[test]
    fn cursor_only_never_downgrades_pending_full() {
        let mut s = UpdateScheduler::new(20);
        s.mark_delta(RenderDelta::Full);
        s.mark(UpdateReason::KeyCommand);
        let decision = s.consume().unwrap();
        assert_eq!(decision.semantic, RenderDelta::Full);
    }

    #[test]
    fn empty_consume_returns_none() {
        let mut s = UpdateScheduler::new(20);
        assert!(s.consume().is_none());
    }
}
