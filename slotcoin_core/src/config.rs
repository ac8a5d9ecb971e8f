use crate::generator::{GeneratorError, SymbolGenerator};
use crate::paytable::{PaytableError, Paytable};
use crate::symbols::{default_alphabet, Symbol, SymbolDef};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_SPIN_COST: u32 = 10;
/// Coins granted to a freshly provisioned profile.
pub const DEFAULT_STARTING_COINS: i64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading game config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing game config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("symbol at position {position} has id {found}")]
    SymbolOrder { position: usize, found: Symbol },
    #[error("alphabet has {0} symbols, at most 256 are supported")]
    TooManySymbols(usize),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Paytable(#[from] PaytableError),
    #[error("paytable references symbol {0} outside the alphabet")]
    UnknownSymbol(Symbol),
    #[error("spin cost must be positive")]
    ZeroCost,
    #[error("starting coins must not be negative")]
    NegativeStartingCoins,
}

/// Everything that defines the game: alphabet with weights, paytable and
/// the coin economics. Built once and handed to the engine and coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_alphabet")]
    pub symbols: Vec<SymbolDef>,
    #[serde(default = "Paytable::simple_default")]
    pub paytable: Paytable,
    #[serde(default = "default_spin_cost")]
    pub spin_cost: u32,
    #[serde(default = "default_starting_coins")]
    pub starting_coins: i64,
}

fn default_spin_cost() -> u32 {
    DEFAULT_SPIN_COST
}

fn default_starting_coins() -> i64 {
    DEFAULT_STARTING_COINS
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            symbols: default_alphabet(),
            paytable: Paytable::simple_default(),
            spin_cost: DEFAULT_SPIN_COST,
            starting_coins: DEFAULT_STARTING_COINS,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.len() > 256 {
            return Err(ConfigError::TooManySymbols(self.symbols.len()));
        }
        for (position, def) in self.symbols.iter().enumerate() {
            if def.symbol.to_index() as usize != position {
                return Err(ConfigError::SymbolOrder {
                    position,
                    found: def.symbol,
                });
            }
        }
        SymbolGenerator::from_alphabet(&self.symbols)?;
        if let Some(symbol) = self
            .paytable
            .symbols()
            .find(|s| s.to_index() as usize >= self.symbols.len())
        {
            return Err(ConfigError::UnknownSymbol(symbol));
        }
        if self.spin_cost == 0 {
            return Err(ConfigError::ZeroCost);
        }
        if self.starting_coins < 0 {
            return Err(ConfigError::NegativeStartingCoins);
        }
        Ok(())
    }

    pub fn symbol_name(&self, symbol: Symbol) -> Option<&str> {
        self.symbols
            .get(symbol.to_index() as usize)
            .map(|d| d.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.spin_cost, 10);
        assert_eq!(config.starting_coins, 1000);
        assert_eq!(config.symbol_name(Symbol(4)), Some("bar"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = GameConfig::from_json_str(r#"{"spin_cost": 25}"#).unwrap();
        assert_eq!(config.spin_cost, 25);
        assert_eq!(config.symbols.len(), 9);
        assert_eq!(config.paytable.entries().len(), 13);
    }

    #[test]
    fn skewed_weights_parse() {
        let json = r#"{
            "symbols": [
                {"symbol": 0, "name": "seven", "weight": 1},
                {"symbol": 1, "name": "cherry", "weight": 9}
            ],
            "paytable": [
                {"pattern": [0, 0, 0], "payout": 500},
                {"pattern": [1, "*", "*"], "payout": 5}
            ]
        }"#;
        let config = GameConfig::from_json_str(json).unwrap();
        assert_eq!(config.symbols[1].weight, 9);
    }

    #[test]
    fn rejects_paytable_symbol_outside_alphabet() {
        let json = r#"{
            "symbols": [{"symbol": 0, "name": "seven", "weight": 1}],
            "paytable": [{"pattern": [3, "*", "*"], "payout": 5}]
        }"#;
        assert!(matches!(
            GameConfig::from_json_str(json),
            Err(ConfigError::UnknownSymbol(Symbol(3)))
        ));
    }

    #[test]
    fn rejects_misnumbered_symbols_and_zero_weights() {
        let json = r#"{"symbols": [{"symbol": 1, "name": "x", "weight": 1}], "paytable": []}"#;
        assert!(matches!(
            GameConfig::from_json_str(json),
            Err(ConfigError::SymbolOrder { position: 0, .. })
        ));
        let json = r#"{"symbols": [{"symbol": 0, "name": "x", "weight": 0}], "paytable": []}"#;
        assert!(matches!(
            GameConfig::from_json_str(json),
            Err(ConfigError::Generator(GeneratorError::ZeroWeight(_)))
        ));
    }

    #[test]
    fn rejects_bad_economics() {
        assert!(matches!(
            GameConfig::from_json_str(r#"{"spin_cost": 0}"#),
            Err(ConfigError::ZeroCost)
        ));
        assert!(matches!(
            GameConfig::from_json_str(r#"{"starting_coins": -1}"#),
            Err(ConfigError::NegativeStartingCoins)
        ));
    }
}
