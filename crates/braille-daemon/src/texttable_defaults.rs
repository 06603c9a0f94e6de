//! Built-in glyph table loaded when no preference file supplies one.
//! Defines the standard six-dot Braille ASCII alphabet (lowercase letters
//! and digits sharing the letter-a-through-j dot patterns, by convention)
//! so the update loop never renders through a table with zero glyphs.

use core_texttable::{parse_dots, TextTable};

const LOWERCASE: &[(char, &str)] = &[
    ('a', "1"),
    ('b', "1-2"),
    ('c', "1-4"),
    ('d', "1-4-5"),
    ('e', "1-5"),
    ('f', "1-2-4"),
    ('g', "1-2-4-5"),
    ('h', "1-2-5"),
    ('i', "2-4"),
    ('j', "2-4-5"),
    ('k', "1-3"),
    ('l', "1-2-3"),
    ('m', "1-3-4"),
    ('n', "1-3-4-5"),
    ('o', "1-3-5"),
    ('p', "1-2-3-4"),
    ('q', "1-2-3-4-5"),
    ('r', "1-2-3-5"),
    ('s', "2-3-4"),
    ('t', "2-3-4-5"),
    ('u', "1-3-6"),
    ('v', "1-2-3-6"),
    ('w', "2-4-5-6"),
    ('x', "1-3-4-6"),
    ('y', "1-3-4-5-6"),
    ('z', "1-3-5-6"),
];

/// Digits reuse the a-through-j dot patterns, the same convention Braille
/// number notation relies on (normally disambiguated by a number sign,
/// which this table has no concept of yet).
const DIGITS: &[(char, char)] = &[
    ('1', 'a'),
    ('2', 'b'),
    ('3', 'c'),
    ('4', 'd'),
    ('5', 'e'),
    ('6', 'f'),
    ('7', 'g'),
    ('8', 'h'),
    ('9', 'i'),
    ('0', 'j'),
];

pub fn build() -> TextTable {
    let mut builder = TextTable::builder();
    builder.define(' ', 0);
    for (ch, dots) in LOWERCASE {
        let cell = parse_dots(dots).expect("built-in dot spec parses");
        builder.define(*ch, cell);
        builder.define(ch.to_ascii_uppercase(), cell);
    }
    for (digit, letter) in DIGITS {
        builder.alias(*digit, *letter);
    }
    builder.build()
}
