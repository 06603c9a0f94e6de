//! State shared across the handler stack for the duration of one dispatch.

use std::collections::HashMap;

use core_session::{Clipboard, ParameterBus, SessionManager, Window};

use crate::environment::EnvironmentStack;

pub struct DispatchContext<'a> {
    pub sessions: &'a mut SessionManager,
    pub clipboard: &'a mut Clipboard,
    pub parameters: &'a mut ParameterBus,
    pub environments: &'a mut EnvironmentStack,
    pub toggles: &'a mut HashMap<u16, bool>,
    pub screen_columns: u16,
    pub margin: u16,
    pub default_window: Window,
}
