//! Line-oriented compiler for the declarative text-table format.
//!
//! Directives, one per line, `#` starts a comment:
//!
//! ```text
//! char  <codepoint-or-'c'>  <dots>
//! byte  <0xNN>               <dots>
//! glyph <codepoint-or-'c'>  <dots>
//! input <codepoint-or-'c'>  <dots>
//! alias <from> <to>
//! include <path>
//! ifglyph|ifnotglyph|ifinput|ifnotinput <codepoint-or-'c'> <dots>
//! ```
//!
//! `char`, `glyph`, and `input` are treated identically: all three define a
//! mapping from a Unicode scalar to a cell (glyph/input distinguish
//! display-direction versus input-direction mappings upstream; this
//! compiler keeps a single bidirectional table, matching the `TextTable`
//! runtime's single `to_cell`/`by_cell` pair). The `if*` conditionals are
//! accepted for compatibility with tables that carry them but are applied
//! unconditionally: this compiler has no terminal-glyph-support oracle to
//! consult.

use crate::{Cell, TextTable, TextTableBuilder, parse_dots, resolve_include};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

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

/// Compile a table from an in-memory source string. `include` directives
/// are resolved relative to `base_dir` (pass `None` if the source has no
/// filesystem home; any `include` then fails to compile).
pub fn compile(source: &str, base_dir: Option<&Path>) -> Result<TextTable, CompileError> {
    let mut builder = TextTable::builder();
    compile_into(source, base_dir, &mut builder, &mut Vec::new())?;
    Ok(builder.build())
}

/// Compile a table from a file on disk, using its parent directory as the
/// base for any `include` directives.
pub fn compile_file(path: &Path) -> Result<TextTable, CompileError> {
    let source = fs::read_to_string(path).map_err(|e| CompileError {
        line: 0,
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    let base_dir = path.parent().map(Path::to_path_buf);
    compile(&source, base_dir.as_deref())
}

fn compile_into(
    source: &str,
    base_dir: Option<&Path>,
    builder: &mut TextTableBuilder,
    include_stack: &mut Vec<PathBuf>,
) -> Result<(), CompileError> {
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let directive = tokens.next().unwrap_or("");
        match directive {
            "char" | "glyph" | "input" => {
                let ch = parse_char_token(tokens.next(), line_no)?;
                let dots = parse_dots_token(tokens.next(), line_no)?;
                builder.define(ch, dots);
            }
            "byte" => {
                let byte = parse_byte_token(tokens.next(), line_no)?;
                let dots = parse_dots_token(tokens.next(), line_no)?;
                builder.define(byte as char, dots);
            }
            "alias" => {
                let from = parse_char_token(tokens.next(), line_no)?;
                let to = parse_char_token(tokens.next(), line_no)?;
                builder.alias(from, to);
            }
            "ifglyph" | "ifnotglyph" | "ifinput" | "ifnotinput" => {
                let ch = parse_char_token(tokens.next(), line_no)?;
                let dots = parse_dots_token(tokens.next(), line_no)?;
                builder.define(ch, dots);
            }
            "include" => {
                let name = tokens.next().ok_or_else(|| CompileError {
                    line: line_no,
                    message: "include requires a path".into(),
                })?;
                let path = resolve_include(base_dir, name);
                if include_stack.contains(&path) {
                    return Err(CompileError {
                        line: line_no,
                        message: format!("circular include of {}", path.display()),
                    });
                }
                let nested = fs::read_to_string(&path).map_err(|e| CompileError {
                    line: line_no,
                    message: format!("cannot include {}: {e}", path.display()),
                })?;
                include_stack.push(path.clone());
                let nested_base = path.parent().map(Path::to_path_buf);
                compile_into(&nested, nested_base.as_deref(), builder, include_stack)?;
                include_stack.pop();
            }
            other => {
                return Err(CompileError {
                    line: line_no,
                    message: format!("unsupported directive '{other}'"),
                });
            }
        }
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_char_token(tok: Option<&str>, line: usize) -> Result<char, CompileError> {
    let tok = tok.ok_or_else(|| CompileError {
        line,
        message: "expected a character token".into(),
    })?;
    parse_char(tok).ok_or_else(|| CompileError {
        line,
        message: format!("invalid character token '{tok}'"),
    })
}

fn parse_char(tok: &str) -> Option<char> {
    if let Some(hex) = tok.strip_prefix("U+").or_else(|| tok.strip_prefix("u+")) {
        let cp = u32::from_str_radix(hex, 16).ok()?;
        return char::from_u32(cp);
    }
    if tok.starts_with('\'') && tok.ends_with('\'') && tok.len() >= 3 {
        return tok[1..tok.len() - 1].chars().next();
    }
    let mut chars = tok.chars();
    let first = chars.next()?;
    if chars.next().is_none() { Some(first) } else { None }
}

fn parse_dots_token(tok: Option<&str>, line: usize) -> Result<Cell, CompileError> {
    let tok = tok.ok_or_else(|| CompileError {
        line,
        message: "expected a dot specification".into(),
    })?;
    parse_dots(tok).ok_or_else(|| CompileError {
        line,
        message: format!("invalid dot specification '{tok}'"),
    })
}

fn parse_byte_token(tok: Option<&str>, line: usize) -> Result<u8, CompileError> {
    let tok = tok.ok_or_else(|| CompileError {
        line,
        message: "expected a byte value".into(),
    })?;
    let value = if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        tok.parse::<u8>()
    };
    value.map_err(|_| CompileError {
        line,
        message: format!("invalid byte value '{tok}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_basic_table() {
        let src = "char U+0041 1-7\nchar U+0061 1\n# comment\nalias U+00C0 U+0041\n";
        let table = compile(src, None).expect("compiles");
        assert_eq!(table.cell_of('A'), 0b0100_0001);
        assert_eq!(table.cell_of('À'), table.cell_of('A'));
    }

    #[test]
    fn rejects_unsupported_directive() {
        let err = compile("frobnicate U+0041 1\n", None).unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn rejects_bad_dot_spec() {
        let err = compile("char U+0041 9\n", None).unwrap_err();
        assert!(err.message.contains("dot"));
    }

    #[test]
    fn include_without_base_dir_fails_cleanly() {
        let err = compile("include missing.ttb\n", None).unwrap_err();
        assert!(err.message.contains("missing.ttb"));
    }
}
