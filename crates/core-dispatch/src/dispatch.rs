//! Top-level dispatch: walks the handler stack for the current environment
//! exactly as the handler order table specifies, stopping at the first
//! handler that reports `Handled`.

use core_keytable::Command;

use crate::context::DispatchContext;
use crate::handlers::{Handler, HandlerOutcome};
use crate::outcome::DispatchOutcome;

/// Observes every command as it's dispatched, independent of which handler
/// (if any) ends up consuming it. Lets the protocol server mirror commands
/// to subscribed clients without the dispatcher depending on networking.
pub trait CommandObserver {
    fn on_command(&self, command: Command);
}

pub fn dispatch(
    command: Command,
    handlers: &mut [Box<dyn Handler>],
    ctx: &mut DispatchContext,
    observers: &[Box<dyn CommandObserver>],
) -> DispatchOutcome {
    for observer in observers {
        observer.on_command(command);
    }

    let environment_context = ctx.environments.current().context;
    let restrict = ctx.environments.current().active_handlers.clone();

    for handler in handlers.iter_mut() {
        if let Some(allowed) = &restrict {
            if !allowed.contains(&handler.name()) {
                continue;
            }
        }
        match handler.handle(command, ctx, environment_context) {
            HandlerOutcome::Handled { dirty, quit } => {
                tracing::debug!(target: "dispatch", handler = handler.name(), "command handled");
                return DispatchOutcome { handled: true, dirty, quit };
            }
            HandlerOutcome::NotHandled => continue,
        }
    }

    core_events::COMMANDS_REJECTED.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    tracing::warn!(target: "dispatch", arg = command.arg, "command rejected: no handler");
    DispatchOutcome::unhandled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentStack;
    use crate::handlers::standard_stack;
    use core_keytable::CommandBlock;
    use core_session::{Clipboard, ParameterBus, SessionManager, Window};
    use std::collections::HashMap;

    #[test]
    fn unhandled_command_increments_rejected_counter_and_reports_unhandled() {
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
        let mut handlers = standard_stack();
        let before = core_events::COMMANDS_REJECTED.load(std::sync::atomic::Ordering::Relaxed);
        let outcome = dispatch(
            Command::new(CommandBlock::Misc, 9999),
            &mut handlers,
            &mut ctx,
            &[],
        );
        assert!(!outcome.handled);
        let after = core_events::COMMANDS_REJECTED.load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(after, before + 1);
    }

    #[test]
    fn pass_char_is_claimed_by_the_input_handler_first() {
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
        let mut handlers = standard_stack();
        let outcome = dispatch(
            Command::new(CommandBlock::PassChar, 'a' as u16),
            &mut handlers,
            &mut ctx,
            &[],
        );
        assert_eq!(outcome, DispatchOutcome { handled: true, dirty: true, quit: false });
    }
}
