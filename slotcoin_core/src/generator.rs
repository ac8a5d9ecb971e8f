use crate::rng::UniformSource;
use crate::symbols::{Symbol, SymbolDef};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("symbol alphabet is empty")]
    Empty,
    #[error("symbol {0} has zero weight")]
    ZeroWeight(Symbol),
}

/// Draws reel symbols from a weighted discrete distribution.
///
/// Holds the cumulative weight of each symbol in configuration order. A draw
/// takes `r` uniform in `[0, W)` and returns the first symbol whose
/// cumulative weight exceeds `r`, so `P(symbol_i) = weight_i / W`.
#[derive(Debug, Clone)]
pub struct SymbolGenerator {
    cumulative: Vec<(Symbol, u64)>,
    total: u64,
}

impl SymbolGenerator {
    pub fn new(weights: impl IntoIterator<Item = (Symbol, u32)>) -> Result<Self, GeneratorError> {
        let mut cumulative = Vec::new();
        let mut total = 0u64;
        for (symbol, weight) in weights {
            if weight == 0 {
                return Err(GeneratorError::ZeroWeight(symbol));
            }
            total += u64::from(weight);
            cumulative.push((symbol, total));
        }
        if cumulative.is_empty() {
            return Err(GeneratorError::Empty);
        }
        Ok(Self { cumulative, total })
    }

    pub fn from_alphabet(alphabet: &[SymbolDef]) -> Result<Self, GeneratorError> {
        Self::new(alphabet.iter().map(|d| (d.symbol, d.weight)))
    }

    /// Equal weights over symbols `0..n`: the `floor(random() * n)` case.
    pub fn uniform(n: u8) -> Result<Self, GeneratorError> {
        Self::new((0..n).map(|i| (Symbol(i), 1)))
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Probability of drawing each symbol, in configuration order.
    pub fn probabilities(&self) -> Vec<(Symbol, f64)> {
        let mut prev = 0u64;
        self.cumulative
            .iter()
            .map(|&(symbol, cum)| {
                let p = (cum - prev) as f64 / self.total as f64;
                prev = cum;
                (symbol, p)
            })
            .collect()
    }

    pub fn draw<S: UniformSource + ?Sized>(&self, source: &mut S) -> Symbol {
        let r = source.next_below(self.total);
        self.symbol_at(r)
    }

    /// Maps a point in `[0, W)` onto its symbol.
    pub fn symbol_at(&self, r: u64) -> Symbol {
        let idx = self.cumulative.partition_point(|&(_, cum)| cum <= r);
        // r >= W only when a source misbehaves; clamp to the last symbol.
        self.cumulative[idx.min(self.cumulative.len() - 1)].0
    }

    /// Three independent draws, one per reel.
    pub fn draw_reels<S: UniformSource + ?Sized>(&self, source: &mut S) -> [Symbol; 3] {
        [self.draw(source), self.draw(source), self.draw(source)]
    }
}
