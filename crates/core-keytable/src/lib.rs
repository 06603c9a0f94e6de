//! Key-table compiler and chord matcher.
//!
//! Compiles a declarative binding file into a [`table::KeyTable`], then
//! drives it at runtime through [`matcher::KeyMatcher`], which composes
//! raw key transitions into chords, resolves hold/long-press bindings,
//! and tracks sticky modifiers.

pub mod command;
pub mod matcher;
pub mod table;

pub use command::{Command, CommandBlock, CommandFlags};
pub use matcher::{KeyMatcher, MatchOutcome};
pub use table::{Binding, BindingFlags, Chord, CompileError, ContextId, KeyId, KeyTable, compile};
