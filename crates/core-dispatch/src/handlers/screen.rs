//! Navigation: cursor routing and window panning.

use core_keytable::{Command, CommandBlock};

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::CommandContext;
use crate::misc_codes;

pub struct ScreenHandler;

impl Handler for ScreenHandler {
    fn name(&self) -> &'static str {
        "screen"
    }

    fn handle(
        &mut self,
        command: Command,
        ctx: &mut DispatchContext,
        _context: CommandContext,
    ) -> HandlerOutcome {
        match command.block {
            CommandBlock::Route => {
                let Some(session) = ctx.sessions.active_mut() else {
                    return HandlerOutcome::NotHandled;
                };
                session.window.origin_x = command.arg;
                HandlerOutcome::dirty()
            }
            CommandBlock::Misc => match command.arg {
                misc_codes::PAN_LEFT => {
                    if let Some(session) = ctx.sessions.active_mut() {
                        session.window.origin_x = session.window.origin_x.saturating_sub(session.window.width);
                        session.window.clamp(ctx.screen_columns, u16::MAX);
                    }
                    HandlerOutcome::dirty()
                }
                misc_codes::PAN_RIGHT => {
                    if let Some(session) = ctx.sessions.active_mut() {
                        session.window.origin_x = session.window.origin_x.saturating_add(session.window.width);
                        session.window.clamp(ctx.screen_columns, u16::MAX);
                    }
                    HandlerOutcome::dirty()
                }
                misc_codes::TOGGLE_CURSOR_TRACKING => {
                    if let Some(session) = ctx.sessions.active_mut() {
                        session.track_cursor = !session.track_cursor;
                    }
                    HandlerOutcome::dirty()
                }
                _ => HandlerOutcome::NotHandled,
            },
            _ => HandlerOutcome::NotHandled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentStack;
    use core_session::{Clipboard, ParameterBus, SessionManager, Window};
    use std::collections::HashMap;

    #[test]
    fn pan_right_slides_window_by_its_own_width() {
        let mut sessions = SessionManager::new();
        let idx = sessions.get_or_create(1, Window::new(0, 0, 20));
        sessions.set_active(idx);
        let mut clipboard = Clipboard::new();
        let mut parameters = ParameterBus::new();
        let mut environments = EnvironmentStack::new();
        let mut toggles = HashMap::new();
        let mut ctx = DispatchContext {
            sessions: &mut sessions,
            clipboard: &mut clipboard,
            parameters: &mut parameters,
            environments: &mut environments,
            toggles: &mut toggles,
            screen_columns: 80,
            margin: 2,
            default_window: Window::new(0, 0, 20),
        };
        let mut handler = ScreenHandler;
        handler.handle(
            Command::new(CommandBlock::Misc, misc_codes::PAN_RIGHT),
            &mut ctx,
            CommandContext::Default,
        );
        assert_eq!(ctx.sessions.active().unwrap().window.origin_x, 20);
    }
}
