use crate::symbols::Symbol;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub const WILDCARD: &str = "*";

/// One position of a pattern: a concrete symbol or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Is(Symbol),
    Any,
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Is(symbol) => serializer.serialize_u8(symbol.to_index()),
            Slot::Any => serializer.serialize_str(WILDCARD),
        }
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotVisitor;

        impl<'de> Visitor<'de> for SlotVisitor {
            type Value = Slot;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a symbol id or \"*\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Slot, E> {
                u8::try_from(v)
                    .map(|i| Slot::Is(Symbol(i)))
                    .map_err(|_| E::custom(format!("symbol id {v} out of range")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Slot, E> {
                u8::try_from(v)
                    .map(|i| Slot::Is(Symbol(i)))
                    .map_err(|_| E::custom(format!("symbol id {v} out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Slot, E> {
                if v == WILDCARD {
                    Ok(Slot::Any)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(SlotVisitor)
    }
}

/// The three pattern shapes a paytable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `[a, b, c]`
    Exact,
    /// `[s, s, *]`
    Pair,
    /// `[s, *, *]`
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(pub [Slot; 3]);

impl Pattern {
    pub fn exact(a: u8, b: u8, c: u8) -> Self {
        Pattern([Slot::Is(Symbol(a)), Slot::Is(Symbol(b)), Slot::Is(Symbol(c))])
    }

    pub fn pair(s: u8) -> Self {
        Pattern([Slot::Is(Symbol(s)), Slot::Is(Symbol(s)), Slot::Any])
    }

    pub fn single(s: u8) -> Self {
        Pattern([Slot::Is(Symbol(s)), Slot::Any, Slot::Any])
    }

    pub fn kind(&self) -> Option<PatternKind> {
        match self.0 {
            [Slot::Is(_), Slot::Is(_), Slot::Is(_)] => Some(PatternKind::Exact),
            [Slot::Is(a), Slot::Is(b), Slot::Any] if a == b => Some(PatternKind::Pair),
            [Slot::Is(_), Slot::Any, Slot::Any] => Some(PatternKind::Single),
            _ => None,
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.iter().filter_map(|slot| match slot {
            Slot::Is(s) => Some(*s),
            Slot::Any => None,
        })
    }

    fn lead(&self) -> Option<Symbol> {
        match self.0[0] {
            Slot::Is(s) => Some(s),
            Slot::Any => None,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match slot {
                Slot::Is(s) => write!(f, "{s}")?,
                Slot::Any => f.write_str(WILDCARD)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaytableEntry {
    #[serde(alias = "combo")]
    pub pattern: Pattern,
    pub payout: u32,
}

impl PaytableEntry {
    pub fn new(pattern: Pattern, payout: u32) -> Self {
        Self { pattern, payout }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaytableError {
    #[error("unsupported pattern [{0}]: expected [a,b,c], [s,s,*] or [s,*,*]")]
    UnsupportedPattern(Pattern),
    #[error("pattern [{0}] is listed twice")]
    DuplicatePattern(Pattern),
}

/// Validated paytable with one lookup per pattern shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<PaytableEntry>", into = "Vec<PaytableEntry>")]
pub struct Paytable {
    entries: Vec<PaytableEntry>,
    exact: HashMap<[Symbol; 3], u32>,
    pairs: HashMap<Symbol, u32>,
    singles: HashMap<Symbol, u32>,
}

impl Paytable {
    pub fn new(entries: Vec<PaytableEntry>) -> Result<Self, PaytableError> {
        let mut exact = HashMap::new();
        let mut pairs = HashMap::new();
        let mut singles = HashMap::new();
        for entry in &entries {
            let pattern = entry.pattern;
            let kind = pattern
                .kind()
                .ok_or(PaytableError::UnsupportedPattern(pattern))?;
            let previous = match (kind, pattern.0) {
                (PatternKind::Exact, [Slot::Is(a), Slot::Is(b), Slot::Is(c)]) => {
                    exact.insert([a, b, c], entry.payout)
                }
                (PatternKind::Pair, _) => pattern.lead().and_then(|s| pairs.insert(s, entry.payout)),
                (PatternKind::Single, _) => {
                    pattern.lead().and_then(|s| singles.insert(s, entry.payout))
                }
                _ => return Err(PaytableError::UnsupportedPattern(pattern)),
            };
            if previous.is_some() {
                return Err(PaytableError::DuplicatePattern(pattern));
            }
        }
        Ok(Self {
            entries,
            exact,
            pairs,
            singles,
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            exact: HashMap::new(),
            pairs: HashMap::new(),
            singles: HashMap::new(),
        }
    }

    /// The nine-symbol table the game ships with.
    pub fn simple_default() -> Self {
        let entries = vec![
            PaytableEntry::new(Pattern::exact(0, 0, 0), 1000),
            PaytableEntry::new(Pattern::exact(1, 1, 1), 700),
            PaytableEntry::new(Pattern::exact(2, 2, 2), 500),
            PaytableEntry::new(Pattern::exact(3, 3, 3), 400),
            PaytableEntry::new(Pattern::exact(4, 4, 4), 300),
            PaytableEntry::new(Pattern::exact(5, 5, 5), 150),
            PaytableEntry::new(Pattern::exact(6, 6, 6), 100),
            PaytableEntry::new(Pattern::exact(7, 7, 7), 80),
            PaytableEntry::new(Pattern::exact(8, 8, 8), 60),
            PaytableEntry::new(Pattern::pair(7), 30),
            PaytableEntry::new(Pattern::pair(8), 15),
            PaytableEntry::new(Pattern::single(7), 7),
            PaytableEntry::new(Pattern::single(8), 2),
        ];
        Self::new(entries).expect("default paytable is well formed")
    }

    pub fn entries(&self) -> &[PaytableEntry] {
        &self.entries
    }

    pub fn exact(&self, triple: &[Symbol; 3]) -> Option<u32> {
        self.exact.get(triple).copied()
    }

    pub fn pair(&self, symbol: Symbol) -> Option<u32> {
        self.pairs.get(&symbol).copied()
    }

    pub fn single(&self, symbol: Symbol) -> Option<u32> {
        self.singles.get(&symbol).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.entries.iter().flat_map(|e| e.pattern.symbols())
    }
}

impl TryFrom<Vec<PaytableEntry>> for Paytable {
    type Error = PaytableError;

    fn try_from(entries: Vec<PaytableEntry>) -> Result<Self, Self::Error> {
        Paytable::new(entries)
    }
}

impl From<Paytable> for Vec<PaytableEntry> {
    fn from(table: Paytable) -> Self {
        table.entries
    }
}
