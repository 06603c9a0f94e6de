//! Built-in key table loaded when no preference file supplies one. Mirrors
//! the minimal binding set a fresh install needs to be useful: navigation
//! keys and a handful of driver-independent chords on the routing keys.

pub const DEFAULT_KEYTABLE_SOURCE: &str = r#"
context default

key navigation 0 nav_left
key navigation 1 nav_right
key navigation 2 nav_up
key navigation 3 nav_down
key navigation 4 help_key
key navigation 5 refresh_key
key modifier 0 dot_shift

bind default nav_left MISC 30
bind default nav_right MISC 31
bind default help_key MISC 0
bind default refresh_key MISC 3
bind default dot_shift+nav_up TOGGLE 32 hold

context menu parent default
bind menu nav_left MISC 30
bind menu nav_right MISC 31
"#;
