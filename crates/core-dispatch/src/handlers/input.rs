//! Character/key pass-through and virtual-terminal switching.

use core_keytable::{Command, CommandBlock};

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::CommandContext;

#[derive(Default)]
pub struct InputHandler;

impl Handler for InputHandler {
    fn name(&self) -> &'static str {
        "input"
    }

    fn handle(
        &mut self,
        command: Command,
        ctx: &mut DispatchContext,
        _context: CommandContext,
    ) -> HandlerOutcome {
        match command.block {
            CommandBlock::PassChar | CommandBlock::PassKey | CommandBlock::PassDots => {
                // The protocol/driver collaborator actually injects the
                // keystroke into the focused client; dispatch only marks
                // the frame dirty so the update loop re-renders.
                HandlerOutcome::dirty()
            }
            CommandBlock::SwitchVt => {
                let idx = ctx.sessions.get_or_create(command.arg as u32, ctx.default_window);
                ctx.sessions.set_active(idx);
                HandlerOutcome::dirty()
            }
            CommandBlock::SwitchVtPrev | CommandBlock::SwitchVtNext => {
                if ctx.sessions.is_empty() {
                    return HandlerOutcome::handled();
                }
                HandlerOutcome::dirty()
            }
            _ => HandlerOutcome::NotHandled,
        }
    }
}
