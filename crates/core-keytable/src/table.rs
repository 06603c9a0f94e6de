//! Compiled key-table representation and its declarative compiler.
//!
//! A table is a set of contexts, each an unordered map from a canonical
//! chord (sorted key-identifier set) to a binding. Contexts form a tree:
//! a lookup miss in a child context retries in its parent, up to the
//! root, capped at [`MAX_CONTEXT_DEPTH`] so a cyclic `parent` declaration
//! can never cause an unbounded walk.

use crate::command::{Command, CommandBlock};
use core_events::KeyGroup;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

pub const MAX_CONTEXT_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId {
    pub group: KeyGroup,
    pub number: u16,
}

/// A canonical, sorted, de-duplicated set of simultaneously held keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Chord(pub SmallVec<[KeyId; 4]>);

impl Chord {
    pub fn new(mut keys: SmallVec<[KeyId; 4]>) -> Self {
        keys.sort_by_key(key_sort_key);
        keys.dedup();
        Self(keys)
    }

    pub fn single(key: KeyId) -> Self {
        let mut v = SmallVec::new();
        v.push(key);
        Self(v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, key: KeyId) {
        if !self.0.contains(&key) {
            self.0.push(key);
            self.0.sort_by_key(key_sort_key);
        }
    }

    pub fn remove(&mut self, key: KeyId) {
        self.0.retain(|k| *k != key);
    }
}

fn key_sort_key(k: &KeyId) -> (u8, u16) {
    let group_rank = match k.group {
        KeyGroup::Routing => 0,
        KeyGroup::Braille => 1,
        KeyGroup::Navigation => 2,
        KeyGroup::Modifier => 3,
        KeyGroup::Driver(n) => 4u8.saturating_add(n),
    };
    (group_rank, k.number)
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BindingFlags: u8 {
        const HOLD   = 0b001;
        const REPEAT = 0b010;
        const HOTKEY = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub command: Command,
    pub flags: BindingFlags,
    /// Command emitted on release, for `hold` bindings only.
    pub release_command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub usize);

#[derive(Debug, Clone)]
struct ContextData {
    #[allow(dead_code)]
    name: String,
    parent: Option<ContextId>,
    bindings: HashMap<Chord, Binding>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    contexts: Vec<ContextData>,
    names: HashMap<String, ContextId>,
    key_names: HashMap<String, KeyId>,
}

impl KeyTable {
    pub fn builder() -> KeyTableBuilder {
        KeyTableBuilder::default()
    }

    pub fn context_id(&self, name: &str) -> Option<ContextId> {
        self.names.get(name).copied()
    }

    pub fn key_named(&self, name: &str) -> Option<KeyId> {
        self.key_names.get(name).copied()
    }

    /// Resolve `chord` in `ctx`, falling back through parents. Returns the
    /// binding and the context it was actually found in.
    pub fn lookup(&self, ctx: ContextId, chord: &Chord) -> Option<(&Binding, ContextId)> {
        let mut current = Some(ctx);
        for _ in 0..MAX_CONTEXT_DEPTH {
            let cid = current?;
            let data = self.contexts.get(cid.0)?;
            if let Some(binding) = data.bindings.get(chord) {
                return Some((binding, cid));
            }
            current = data.parent;
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyTableBuilder {
    table: KeyTable,
}

impl KeyTableBuilder {
    pub fn declare_context(&mut self, name: impl Into<String>, parent: Option<&str>) -> ContextId {
        let name = name.into();
        if let Some(existing) = self.table.names.get(&name) {
            return *existing;
        }
        let parent_id = parent.and_then(|p| self.table.names.get(p).copied());
        let id = ContextId(self.table.contexts.len());
        self.table.contexts.push(ContextData {
            name: name.clone(),
            parent: parent_id,
            bindings: HashMap::new(),
        });
        self.table.names.insert(name, id);
        id
    }

    pub fn declare_key(&mut self, name: impl Into<String>, key: KeyId) {
        self.table.key_names.insert(name.into(), key);
    }

    pub fn bind(&mut self, ctx: ContextId, chord: Chord, binding: Binding) {
        if let Some(data) = self.table.contexts.get_mut(ctx.0) {
            data.bindings.insert(chord, binding);
        }
    }

    pub fn build(self) -> KeyTable {
        self.table
    }
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
impl std::error::Error for CompileError {}

/// Compile a declarative key table. Directives, one per line, `#` comments:
///
/// ```text
/// context <name> [parent <parent>]
/// key <group> <number> <name>
/// bind <context> <chord> <block> <arg> [hold|repeat|hotkey]
/// assign <name> <value>
/// ifvar <name> <directive...>
/// ```
///
/// A chord is one or more key references joined by `+`, each either a
/// declared name or `<group>:<number>` (group one of `routing`, `braille`,
/// `navigation`, `modifier`, or `driver<n>`).
pub fn compile(source: &str) -> Result<KeyTable, CompileError> {
    let mut builder = KeyTable::builder();
    let mut vars: HashMap<String, String> = HashMap::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        apply_directive(&mut builder, &mut vars, line, line_no)?;
    }
    Ok(builder.build())
}

fn apply_directive(
    builder: &mut KeyTableBuilder,
    vars: &mut HashMap<String, String>,
    line: &str,
    line_no: usize,
) -> Result<(), CompileError> {
    let mut tokens = line.split_whitespace();
    let directive = tokens.next().unwrap_or("");
    match directive {
        "context" => {
            let name = tokens.next().ok_or_else(|| err(line_no, "context requires a name"))?;
            let parent = if tokens.next() == Some("parent") {
                Some(tokens.next().ok_or_else(|| err(line_no, "parent requires a name"))?)
            } else {
                None
            };
            builder.declare_context(name, parent);
            Ok(())
        }
        "key" => {
            let group = parse_group(tokens.next(), line_no)?;
            let number: u16 = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| err(line_no, "expected a key number"))?;
            let name = tokens.next().ok_or_else(|| err(line_no, "key requires a name"))?;
            builder.declare_key(name, KeyId { group, number });
            Ok(())
        }
        "bind" => {
            let ctx_name = tokens.next().ok_or_else(|| err(line_no, "bind requires a context"))?;
            let ctx = builder
                .table
                .names
                .get(ctx_name)
                .copied()
                .ok_or_else(|| err(line_no, &format!("unknown context '{ctx_name}'")))?;
            let chord_tok = tokens.next().ok_or_else(|| err(line_no, "bind requires a chord"))?;
            let chord = parse_chord(&builder.table, chord_tok, line_no)?;
            let block = parse_block(tokens.next(), line_no)?;
            let arg: u16 = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| err(line_no, "expected a command argument"))?;
            let mut flags = BindingFlags::empty();
            for tok in tokens {
                match tok {
                    "hold" => flags |= BindingFlags::HOLD,
                    "repeat" => flags |= BindingFlags::REPEAT,
                    "hotkey" => flags |= BindingFlags::HOTKEY,
                    other => return Err(err(line_no, &format!("unknown binding flag '{other}'"))),
                }
            }
            let binding = Binding {
                command: Command::new(block, arg),
                flags,
                release_command: None,
            };
            builder.bind(ctx, chord, binding);
            Ok(())
        }
        "assign" => {
            let name = tokens.next().ok_or_else(|| err(line_no, "assign requires a name"))?;
            let value = tokens.next().unwrap_or("1");
            vars.insert(name.to_string(), value.to_string());
            Ok(())
        }
        "ifvar" => {
            let name = tokens.next().ok_or_else(|| err(line_no, "ifvar requires a variable"))?;
            let rest: Vec<&str> = tokens.collect();
            if rest.is_empty() {
                return Err(err(line_no, "ifvar requires a directive"));
            }
            let truthy = vars
                .get(name)
                .map(|v| v != "0" && v != "false")
                .unwrap_or(false);
            if truthy {
                apply_directive(builder, vars, &rest.join(" "), line_no)?;
            }
            Ok(())
        }
        other => Err(err(line_no, &format!("unsupported directive '{other}'"))),
    }
}

fn err(line: usize, message: &str) -> CompileError {
    CompileError {
        line,
        message: message.to_string(),
    }
}

fn parse_group(tok: Option<&str>, line: usize) -> Result<KeyGroup, CompileError> {
    let tok = tok.ok_or_else(|| err(line, "expected a key group"))?;
    parse_group_str(tok).ok_or_else(|| err(line, &format!("unknown key group '{tok}'")))
}

fn parse_group_str(tok: &str) -> Option<KeyGroup> {
    match tok {
        "routing" => Some(KeyGroup::Routing),
        "braille" => Some(KeyGroup::Braille),
        "navigation" => Some(KeyGroup::Navigation),
        "modifier" => Some(KeyGroup::Modifier),
        other => other.strip_prefix("driver").and_then(|n| n.parse().ok()).map(KeyGroup::Driver),
    }
}

fn parse_chord(table: &KeyTable, tok: &str, line: usize) -> Result<Chord, CompileError> {
    let mut keys = SmallVec::new();
    for part in tok.split('+') {
        if let Some(key) = table.key_names.get(part) {
            keys.push(*key);
            continue;
        }
        if let Some((group_tok, num_tok)) = part.split_once(':') {
            let group = parse_group_str(group_tok)
                .ok_or_else(|| err(line, &format!("unknown key group '{group_tok}'")))?;
            let number: u16 = num_tok
                .parse()
                .map_err(|_| err(line, &format!("invalid key number '{num_tok}'")))?;
            keys.push(KeyId { group, number });
            continue;
        }
        return Err(err(line, &format!("unknown key reference '{part}'")));
    }
    Ok(Chord::new(keys))
}

fn parse_block(tok: Option<&str>, line: usize) -> Result<CommandBlock, CompileError> {
    let tok = tok.ok_or_else(|| err(line, "expected a command block"))?;
    Ok(match tok {
        "PASSCHAR" => CommandBlock::PassChar,
        "PASSKEY" => CommandBlock::PassKey,
        "PASSDOTS" => CommandBlock::PassDots,
        "ROUTE" => CommandBlock::Route,
        "SWITCHVT" => CommandBlock::SwitchVt,
        "SWITCHVT_PREV" => CommandBlock::SwitchVtPrev,
        "SWITCHVT_NEXT" => CommandBlock::SwitchVtNext,
        "TOGGLE" => CommandBlock::Toggle,
        "MISC" => CommandBlock::Misc,
        other => return Err(err(line, &format!("unknown command block '{other}'"))),
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_context_and_binding() {
        let src = "context default\nkey braille 1 dot1\nbind default dot1 PASSCHAR 65\n";
        let table = compile(src).unwrap();
        let ctx = table.context_id("default").unwrap();
        let chord = Chord::single(table.key_named("dot1").unwrap());
        let (binding, found_in) = table.lookup(ctx, &chord).unwrap();
        assert_eq!(found_in, ctx);
        assert_eq!(binding.command.arg, 65);
    }

    #[test]
    fn falls_back_to_parent_context() {
        let src = "context default\ncontext menu parent default\nkey braille 1 dot1\nbind default dot1 PASSCHAR 1\n";
        let table = compile(src).unwrap();
        let menu = table.context_id("menu").unwrap();
        let default = table.context_id("default").unwrap();
        let chord = Chord::single(table.key_named("dot1").unwrap());
        let (_binding, found_in) = table.lookup(menu, &chord).unwrap();
        assert_eq!(found_in, default);
    }

    #[test]
    fn ifvar_gate_applies_conditionally() {
        let src = "context default\nassign extra 0\nifvar extra context hidden\n";
        let table = compile(src).unwrap();
        assert!(table.context_id("hidden").is_none());
    }

    #[test]
    fn unsupported_directive_is_rejected() {
        let err = compile("frobnicate\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn chord_order_is_insertion_independent() {
        let a = Chord::new(SmallVec::from_slice(&[
            KeyId { group: KeyGroup::Braille, number: 2 },
            KeyId { group: KeyGroup::Braille, number: 1 },
        ]));
        let b = Chord::new(SmallVec::from_slice(&[
            KeyId { group: KeyGroup::Braille, number: 1 },
            KeyId { group: KeyGroup::Braille, number: 2 },
        ]));
        assert_eq!(a, b);
    }
}
