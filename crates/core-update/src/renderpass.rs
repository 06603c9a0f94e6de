//! A single render pass: acquire, snapshot, track/slide, render, emit,
//! release. The update loop runs at most one of these per wake, then
//! sleeps until the next tick or event.

use std::sync::Mutex;

use core_driver::{BrailleDriver, DriverOwnership, ScreenSource};
use core_session::{Session, SessionManager};
use core_texttable::{Cell, TextTable};

use crate::scheduler::{Decision, RenderDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// A client owns the display; the pass was skipped entirely.
    ClaimedByClient,
    /// The driver reported offline; state was kept but nothing was drawn.
    DriverOffline,
    /// Cells were written successfully.
    Rendered { cell_count: usize },
    /// `write_window` returned an error; the driver should be reconstructed.
    WriteFailed,
}

/// Advance at most one window position when panning past a screen region
/// of all-whitespace characters, bounded by the region width so it can
/// never loop unboundedly.
fn skip_blank_windows(session: &mut Session, region: &core_session::ScreenRegion) {
    let width = session.window.width;
    if width == 0 {
        return;
    }
    for _ in 0..region.columns {
        let all_blank = (session.window.origin_x..session.window.origin_x + width)
            .all(|col| region.char_at(col, session.window.origin_y) == ' ');
        if !all_blank {
            break;
        }
        let next_origin = session.window.origin_x.saturating_add(width);
        if next_origin >= region.columns {
            break;
        }
        session.window.origin_x = next_origin;
    }
}

/// Run one render pass. `driver` is held behind a mutex for the duration
/// of the write so at most one write is ever in flight. When a client
/// already owns the display, the pass writes through the owner's last
/// `write()` payload (if any) instead of capturing from `screen` at all.
pub fn run_pass(
    ownership: &DriverOwnership,
    driver: &Mutex<Box<dyn BrailleDriver>>,
    screen: &Mutex<Box<dyn ScreenSource>>,
    sessions: &mut SessionManager,
    table: &TextTable,
    margin: u16,
    skip_blank: bool,
    decision: &Decision,
    passthrough: Option<&[Cell]>,
) -> PassOutcome {
    if ownership.is_claimed() {
        let Some(cells) = passthrough else {
            return PassOutcome::ClaimedByClient;
        };
        return write_through(driver, cells);
    }

    let Some(_claim) = ownership.acquire() else {
        return PassOutcome::ClaimedByClient;
    };

    let mut driver = driver.lock().expect("driver mutex poisoned");
    if !driver.online() {
        return PassOutcome::DriverOffline;
    }

    let Some(session) = sessions.active_mut() else {
        return PassOutcome::Rendered { cell_count: 0 };
    };

    let Some(region) = screen.lock().expect("screen mutex poisoned").capture(session.vt) else {
        return PassOutcome::Rendered { cell_count: 0 };
    };

    if matches!(decision.effective, RenderDelta::Full | RenderDelta::CursorOnly) {
        session.track_cursor_column(region.cursor_column, region.columns, margin);
    }
    if skip_blank {
        skip_blank_windows(session, &region);
    }
    session.window.clamp(region.columns, region.rows);

    let show_cursor = !session.hide_cursor;
    let cells = session.render_row(&region, table, show_cursor);

    match driver.write_window(&cells) {
        Ok(()) => {
            core_events::FRAMES_FULL.fetch_add(
                matches!(decision.effective, RenderDelta::Full) as u64,
                std::sync::atomic::Ordering::Relaxed,
            );
            core_events::FRAMES_PAN_ONLY.fetch_add(
                matches!(decision.effective, RenderDelta::WindowPan { .. }) as u64,
                std::sync::atomic::Ordering::Relaxed,
            );
            core_events::FRAMES_CURSOR_ONLY.fetch_add(
                matches!(decision.effective, RenderDelta::CursorOnly) as u64,
                std::sync::atomic::Ordering::Relaxed,
            );
            PassOutcome::Rendered { cell_count: cells.len() }
        }
        Err(err) => {
            tracing::warn!(target: "update", %err, "write_window failed");
            PassOutcome::WriteFailed
        }
    }
}

fn write_through(driver: &Mutex<Box<dyn BrailleDriver>>, cells: &[Cell]) -> PassOutcome {
    let mut driver = driver.lock().expect("driver mutex poisoned");
    if !driver.online() {
        return PassOutcome::DriverOffline;
    }
    match driver.write_window(cells) {
        Ok(()) => PassOutcome::Rendered { cell_count: cells.len() },
        Err(err) => {
            tracing::warn!(target: "update", %err, "write_window failed (passthrough)");
            PassOutcome::WriteFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_driver::{NullDriver, StaticScreenSource};
    use core_session::{ScreenRegion, Window};

    fn fixture(online: bool) -> (DriverOwnership, Mutex<Box<dyn BrailleDriver>>, Mutex<Box<dyn ScreenSource>>, SessionManager, TextTable) {
        let ownership = DriverOwnership::new();
        let mut null_driver = NullDriver::new(20);
        null_driver.set_online(online);
        let driver: Mutex<Box<dyn BrailleDriver>> = Mutex::new(Box::new(null_driver));
        let mut screen = StaticScreenSource::default();
        let mut region = ScreenRegion::blank(40, 1, 1);
        region.characters[0] = 'a';
        screen.region = Some(region);
        let screen: Mutex<Box<dyn ScreenSource>> = Mutex::new(Box::new(screen));
        let mut sessions = SessionManager::new();
        let idx = sessions.get_or_create(1, Window::new(0, 0, 20));
        sessions.set_active(idx);
        let table = TextTable::builder().build();
        (ownership, driver, screen, sessions, table)
    }

    #[test]
    fn claimed_display_skips_the_pass_without_a_passthrough_write() {
        let (ownership, driver, screen, mut sessions, table) = fixture(true);
        let _held = ownership.acquire().unwrap();
        let decision = Decision { semantic: RenderDelta::Full, effective: RenderDelta::Full };
        let outcome = run_pass(&ownership, &driver, &screen, &mut sessions, &table, 2, false, &decision, None);
        assert_eq!(outcome, PassOutcome::ClaimedByClient);
    }

    #[test]
    fn claimed_display_writes_through_the_owners_last_write() {
        let (ownership, driver, screen, mut sessions, table) = fixture(true);
        ownership.set_claimed(true);
        let decision = Decision { semantic: RenderDelta::Full, effective: RenderDelta::Full };
        let cells = [1u8, 2, 3];
        let outcome = run_pass(&ownership, &driver, &screen, &mut sessions, &table, 2, false, &decision, Some(&cells));
        assert_eq!(outcome, PassOutcome::Rendered { cell_count: 3 });
    }

    #[test]
    fn offline_driver_skips_render_steps() {
        let (ownership, driver, screen, mut sessions, table) = fixture(false);
        let decision = Decision { semantic: RenderDelta::Full, effective: RenderDelta::Full };
        let outcome = run_pass(&ownership, &driver, &screen, &mut sessions, &table, 2, false, &decision, None);
        assert_eq!(outcome, PassOutcome::DriverOffline);
    }

    #[test]
    fn online_driver_renders_and_counts_frame() {
        let (ownership, driver, screen, mut sessions, table) = fixture(true);
        let decision = Decision { semantic: RenderDelta::Full, effective: RenderDelta::Full };
        let outcome = run_pass(&ownership, &driver, &screen, &mut sessions, &table, 2, false, &decision, None);
        assert_eq!(outcome, PassOutcome::Rendered { cell_count: 20 });
    }
}
