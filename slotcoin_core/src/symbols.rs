use serde::{Deserialize, Serialize};
use std::fmt;

/// A reel symbol, identified by its position in the configured alphabet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Symbol(pub u8);

impl Symbol {
    pub fn to_index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One entry of the alphabet: the symbol, a display name and its draw weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolDef {
    pub symbol: Symbol,
    pub name: String,
    pub weight: u32,
}

impl SymbolDef {
    pub fn new(symbol: u8, name: impl Into<String>, weight: u32) -> Self {
        Self {
            symbol: Symbol(symbol),
            name: name.into(),
            weight,
        }
    }
}

/// Names of the nine symbols printed on the default reel strip, in id order.
pub const DEFAULT_SYMBOL_NAMES: [&str; 9] = [
    "seven", "banana", "melon", "citron", "bar", "bell", "orange", "plum", "cherry",
];

/// The default alphabet: nine symbols drawn with equal weight.
pub fn default_alphabet() -> Vec<SymbolDef> {
    DEFAULT_SYMBOL_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| SymbolDef::new(i as u8, *name, 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alphabet_ids_follow_position() {
        let alphabet = default_alphabet();
        assert_eq!(alphabet.len(), 9);
        for (i, def) in alphabet.iter().enumerate() {
            assert_eq!(def.symbol.to_index() as usize, i);
            assert_eq!(def.weight, 1);
        }
        assert_eq!(alphabet[0].name, "seven");
        assert_eq!(alphabet[8].name, "cherry");
    }

    #[test]
    fn symbol_serializes_as_bare_integer() {
        let json = serde_json::to_string(&[Symbol(4), Symbol(0)]).unwrap();
        assert_eq!(json, "[4,0]");
    }

    #[test]
    fn display_honours_width() {
        assert_eq!(format!("{:>3}|", Symbol(7)), "  7|");
        assert_eq!(format!("{:<3}|", Symbol(12)), "12 |");
    }
}
