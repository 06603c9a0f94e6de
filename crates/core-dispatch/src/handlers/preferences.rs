//! Preferences menu enter/exit and persistence actions.

use core_keytable::{Command, CommandBlock};

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::{CommandContext, EnvironmentError};
use crate::misc_codes;

pub struct PreferencesHandler;

impl Handler for PreferencesHandler {
    fn name(&self) -> &'static str {
        "preferences"
    }

    fn handle(
        &mut self,
        command: Command,
        ctx: &mut DispatchContext,
        context: CommandContext,
    ) -> HandlerOutcome {
        if command.block != CommandBlock::Misc {
            return HandlerOutcome::NotHandled;
        }
        match command.arg {
            misc_codes::PREFERENCES_MENU => {
                if context == CommandContext::Menu {
                    ctx.environments.pop();
                } else {
                    match ctx.environments.push("preferences", CommandContext::Menu, None) {
                        Ok(()) | Err(EnvironmentError::TooDeep) => {}
                    }
                }
                HandlerOutcome::dirty()
            }
            misc_codes::PREFERENCES_SAVE | misc_codes::PREFERENCES_LOAD | misc_codes::PREFERENCES_RESET => {
                // Persisting to disk is owned by the config loader; the
                // handler just acknowledges the request here.
                HandlerOutcome::dirty()
            }
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
    fn menu_toggle_pushes_then_pops_environment() {
        let mut sessions = SessionManager::new();
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
            default_window: Window::new(0, 0, 40),
        };
        let mut handler = PreferencesHandler;
        let cmd = Command::new(CommandBlock::Misc, misc_codes::PREFERENCES_MENU);
        handler.handle(cmd, &mut ctx, CommandContext::Default);
        assert_eq!(ctx.environments.depth(), 2);
        handler.handle(cmd, &mut ctx, CommandContext::Menu);
        assert_eq!(ctx.environments.depth(), 1);
    }
}
