//! Boolean preference toggles, keyed by the command's argument code.

use core_keytable::{Command, CommandBlock, CommandFlags};

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::CommandContext;

pub struct ToggleHandler;

impl Handler for ToggleHandler {
    fn name(&self) -> &'static str {
        "toggle"
    }

    fn handle(
        &mut self,
        command: Command,
        ctx: &mut DispatchContext,
        _context: CommandContext,
    ) -> HandlerOutcome {
        if command.block != CommandBlock::Toggle {
            return HandlerOutcome::NotHandled;
        }
        let current = *ctx.toggles.get(&command.arg).unwrap_or(&false);
        let next = if command.flags.contains(CommandFlags::TOGGLE_ON) {
            true
        } else if command.flags.contains(CommandFlags::TOGGLE_OFF) {
            false
        } else {
            !current
        };
        ctx.toggles.insert(command.arg, next);
        HandlerOutcome::dirty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentStack;
    use core_session::{Clipboard, ParameterBus, SessionManager, Window};
    use std::collections::HashMap;

    fn ctx_fixture<'a>(
        sessions: &'a mut SessionManager,
        clipboard: &'a mut Clipboard,
        parameters: &'a mut ParameterBus,
        environments: &'a mut EnvironmentStack,
        toggles: &'a mut HashMap<u16, bool>,
    ) -> DispatchContext<'a> {
        DispatchContext {
            sessions,
            clipboard,
            parameters,
            environments,
            toggles,
            screen_columns: 80,
            margin: 2,
            default_window: Window::new(0, 0, 40),
        }
    }

    #[test]
    fn bare_toggle_flips_current_value() {
        let mut sessions = SessionManager::new();
        let mut clipboard = Clipboard::new();
        let mut parameters = ParameterBus::new();
        let mut environments = EnvironmentStack::new();
        let mut toggles = HashMap::new();
        let mut ctx = ctx_fixture(&mut sessions, &mut clipboard, &mut parameters, &mut environments, &mut toggles);
        let mut handler = ToggleHandler;
        let cmd = Command::new(CommandBlock::Toggle, 7);
        handler.handle(cmd, &mut ctx, CommandContext::Default);
        assert_eq!(ctx.toggles.get(&7), Some(&true));
        handler.handle(cmd, &mut ctx, CommandContext::Default);
        assert_eq!(ctx.toggles.get(&7), Some(&false));
    }

    #[test]
    fn explicit_toggle_on_always_sets_true() {
        let mut sessions = SessionManager::new();
        let mut clipboard = Clipboard::new();
        let mut parameters = ParameterBus::new();
        let mut environments = EnvironmentStack::new();
        let mut toggles = HashMap::new();
        let mut ctx = ctx_fixture(&mut sessions, &mut clipboard, &mut parameters, &mut environments, &mut toggles);
        let mut handler = ToggleHandler;
        let cmd = Command::new(CommandBlock::Toggle, 3).with_flags(CommandFlags::TOGGLE_ON);
        handler.handle(cmd, &mut ctx, CommandContext::Default);
        handler.handle(cmd, &mut ctx, CommandContext::Default);
        assert_eq!(ctx.toggles.get(&3), Some(&true));
    }
}
