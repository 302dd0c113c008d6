//! Static APRS symbol table.
//!
//! Built once on first use from an embedded copy of WA8LMF's symbol table
//! (<http://wa8lmf.net/miscinfo/APRSsymbolcodes.txt>) and read-only after
//! that, so lookups are safe from any number of threads.

use std::collections::HashMap;

use once_cell::sync::Lazy;

const SYMBOL_TABLE_TEXT: &str = include_str!("symbols.txt");

struct SymbolTable {
    primary: HashMap<u8, String>,
    alternate: HashMap<u8, String>,
    glyphs: HashMap<String, String>,
}

static SYMBOLS: Lazy<SymbolTable> = Lazy::new(|| parse_table(SYMBOL_TABLE_TEXT));

/// Parse the fixed-column table: one record per printable symbol character
/// with a primary-table name, an alternate-table name and optional glyphs.
/// `REM` comment lines fall out naturally because they do not split into
/// enough columns.
fn parse_table(text: &str) -> SymbolTable {
    let mut table = SymbolTable {
        primary: HashMap::new(),
        alternate: HashMap::new(),
        glyphs: HashMap::new(),
    };

    for line in text.lines() {
        let line = line.trim();
        if line.len() < 3 || !line.is_char_boundary(2) {
            continue;
        }
        let symbol = line.as_bytes()[0];
        let parts: Vec<&str> = line[2..].split(',').map(str::trim).collect();
        if parts.len() < 6 {
            continue;
        }
        if parts.len() > 7 {
            table.glyphs.insert(parts[2].to_string(), parts[6].to_string());
            table.glyphs.insert(parts[5].to_string(), parts[7].to_string());
        }
        table.primary.insert(symbol, parts[2].to_string());
        table.alternate.insert(symbol, parts[5].to_string());
    }

    table
}

/// Resolve a (table, symbol) byte pair to its name.
///
/// `table == b'\\'` selects the alternate table. Unknown codes resolve to
/// the empty string rather than an error.
pub fn name(table: u8, symbol: u8) -> &'static str {
    let map = if table == b'\\' {
        &SYMBOLS.alternate
    } else {
        &SYMBOLS.primary
    };
    map.get(&symbol).map_or("", String::as_str)
}

/// Glyph for a resolved symbol name, if the table carries one.
pub fn glyph(name: &str) -> Option<&'static str> {
    SYMBOLS
        .glyphs
        .get(name)
        .map(String::as_str)
        .filter(|g| !g.is_empty())
}
