//! Cut/append/paste and bounded history recall.

use core_keytable::{Command, CommandBlock};
use core_session::{ParameterId, ParameterValue};

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::CommandContext;
use crate::misc_codes;

/// Watched by clients that mirror clipboard content (e.g. a companion
/// speech service); broadcast on every mutation.
pub const CLIPBOARD_CONTENT_PARAMETER: ParameterId = ParameterId(1);

pub struct ClipboardHandler;

impl Handler for ClipboardHandler {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn handle(
        &mut self,
        command: Command,
        ctx: &mut DispatchContext,
        _context: CommandContext,
    ) -> HandlerOutcome {
        if command.block != CommandBlock::Misc {
            return HandlerOutcome::NotHandled;
        }
        match command.arg {
            misc_codes::CLIPBOARD_CUT => {
                ctx.clipboard.set(String::new());
                self.broadcast(ctx);
                HandlerOutcome::dirty()
            }
            misc_codes::CLIPBOARD_APPEND => {
                ctx.clipboard.append(" ");
                self.broadcast(ctx);
                HandlerOutcome::dirty()
            }
            misc_codes::CLIPBOARD_PASTE => HandlerOutcome::dirty(),
            misc_codes::CLIPBOARD_PASTE_HISTORY => HandlerOutcome::dirty(),
            _ => HandlerOutcome::NotHandled,
        }
    }
}

impl ClipboardHandler {
    fn broadcast(&self, ctx: &mut DispatchContext) {
        ctx.parameters.set(
            CLIPBOARD_CONTENT_PARAMETER,
            0,
            ParameterValue::Text(ctx.clipboard.get().to_string()),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentStack;
    use core_session::{Clipboard, ParameterBus, SessionManager, Window};
    use std::collections::HashMap;

    #[test]
    fn cut_clears_current_buffer_and_broadcasts() {
        let mut sessions = SessionManager::new();
        let mut clipboard = Clipboard::new();
        clipboard.set("hello");
        let mut parameters = ParameterBus::new();
        parameters.watch(
            core_session::WatchKey { param: CLIPBOARD_CONTENT_PARAMETER, subparam: 0, client_id: 1 },
            core_session::WatchFlags { self_notify: false },
        );
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
            default_window: Window::new(0, 0, 40),
        };
        let mut handler = ClipboardHandler;
        handler.handle(
            Command::new(CommandBlock::Misc, misc_codes::CLIPBOARD_CUT),
            &mut ctx,
            CommandContext::Default,
        );
        assert_eq!(ctx.clipboard.get(), "");
    }
}
