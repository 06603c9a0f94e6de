pub mod clipboard;
pub mod input;
pub mod miscellaneous;
pub mod preferences;
pub mod screen;
pub mod speech;
pub mod toggle;

use core_keytable::Command;

use crate::context::DispatchContext;
use crate::environment::CommandContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    NotHandled,
    Handled { dirty: bool, quit: bool },
}

impl HandlerOutcome {
    pub fn handled() -> Self {
        Self::Handled { dirty: false, quit: false }
    }

    pub fn dirty() -> Self {
        Self::Handled { dirty: true, quit: false }
    }

    pub fn quit() -> Self {
        Self::Handled { dirty: true, quit: true }
    }
}

pub trait Handler {
    fn name(&self) -> &'static str;

    fn handle(
        &mut self,
        command: Command,
        ctx: &mut DispatchContext,
        context: CommandContext,
    ) -> HandlerOutcome;
}

/// The standard stack, top to bottom, stable and observable per the
/// dispatch contract: the first handler that reports `Handled` wins.
pub fn standard_stack() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(input::InputHandler::default()),
        Box::new(preferences::PreferencesHandler),
        Box::new(toggle::ToggleHandler),
        Box::new(miscellaneous::MiscellaneousHandler),
        Box::new(clipboard::ClipboardHandler),
        Box::new(speech::SpeechHandler),
        Box::new(screen::ScreenHandler),
    ]
}
