//! Help screen, clock, restart, and forced-refresh commands.

use core_keytable::{Command, CommandBlock};

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::{CommandContext, EnvironmentError};
use crate::misc_codes;

pub struct MiscellaneousHandler;

impl Handler for MiscellaneousHandler {
    fn name(&self) -> &'static str {
        "miscellaneous"
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
            misc_codes::HELP_SCREEN => {
                if context == CommandContext::Help {
                    ctx.environments.pop();
                } else {
                    match ctx
                        .environments
                        .push("help", CommandContext::Help, Some(vec!["miscellaneous"]))
                    {
                        Ok(()) | Err(EnvironmentError::TooDeep) => {}
                    }
                }
                HandlerOutcome::dirty()
            }
            misc_codes::SHOW_TIME => HandlerOutcome::dirty(),
            misc_codes::RESTART => HandlerOutcome::quit(),
            misc_codes::REFRESH => HandlerOutcome::dirty(),
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
    fn restart_requests_quit() {
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
        let mut handler = MiscellaneousHandler;
        let outcome = handler.handle(
            Command::new(CommandBlock::Misc, misc_codes::RESTART),
            &mut ctx,
            CommandContext::Default,
        );
        assert_eq!(outcome, HandlerOutcome::quit());
    }
}
