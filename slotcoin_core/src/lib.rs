pub mod config;
pub mod engine;
pub mod generator;
pub mod paytable;
pub mod resolver;
pub mod rng;
pub mod symbols;

pub use crate::config::{ConfigError, GameConfig, DEFAULT_SPIN_COST, DEFAULT_STARTING_COINS};
pub use crate::engine::{SimulationReport, SpinEngine, SpinOutcome};
pub use crate::generator::{GeneratorError, SymbolGenerator};
pub use crate::paytable::{Pattern, PatternKind, Paytable, PaytableEntry, PaytableError, Slot};
pub use crate::resolver::{PayoutResolver, Resolution};
pub use crate::rng::{derive_hash_hex, HmacSource, RandSource, ScriptedSource, UniformSource};
pub use crate::symbols::{default_alphabet, Symbol, SymbolDef};
