//! Speech control sits behind an external collaborator; this stack slot is
//! a deliberate no-op placeholder so the standard handler order matches
//! what a full daemon registers.

use core_keytable::Command;

use super::{Handler, HandlerOutcome};
use crate::context::DispatchContext;
use crate::environment::CommandContext;

pub struct SpeechHandler;

impl Handler for SpeechHandler {
    fn name(&self) -> &'static str {
        "speech"
    }

    fn handle(&mut self, _command: Command, _ctx: &mut DispatchContext, _context: CommandContext) -> HandlerOutcome {
        HandlerOutcome::NotHandled
    }
}
