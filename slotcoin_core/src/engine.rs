use crate::config::{ConfigError, GameConfig};
use crate::generator::SymbolGenerator;
use crate::paytable::Paytable;
use crate::resolver::{PayoutResolver, Resolution};
use crate::rng::UniformSource;
use crate::symbols::Symbol;

/// Generator and resolver bound to one game configuration.
#[derive(Debug, Clone)]
pub struct SpinEngine {
    generator: SymbolGenerator,
    resolver: PayoutResolver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinOutcome {
    pub symbols: [Symbol; 3],
    pub resolution: Resolution,
}

impl SpinOutcome {
    pub fn win(&self) -> bool {
        self.resolution.win
    }

    pub fn payout(&self) -> u32 {
        self.resolution.payout
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    pub spins: u64,
    pub wins: u64,
    pub total_cost: u64,
    pub total_payout: u64,
}

impl SimulationReport {
    pub fn hit_rate(&self) -> f64 {
        if self.spins == 0 {
            return 0.0;
        }
        self.wins as f64 / self.spins as f64
    }

    pub fn rtp(&self) -> f64 {
        if self.total_cost == 0 {
            return 0.0;
        }
        self.total_payout as f64 / self.total_cost as f64
    }
}

impl SpinEngine {
    pub fn new(generator: SymbolGenerator, paytable: Paytable) -> Self {
        Self {
            generator,
            resolver: PayoutResolver::new(paytable),
        }
    }

    pub fn from_config(config: &GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = SymbolGenerator::from_alphabet(&config.symbols)?;
        Ok(Self::new(generator, config.paytable.clone()))
    }

    pub fn generator(&self) -> &SymbolGenerator {
        &self.generator
    }

    pub fn spin_once<S: UniformSource + ?Sized>(&self, source: &mut S) -> SpinOutcome {
        let symbols = self.generator.draw_reels(source);
        SpinOutcome {
            symbols,
            resolution: self.resolver.resolve(symbols),
        }
    }

    pub fn simulate<S: UniformSource + ?Sized>(
        &self,
        spins: u64,
        cost: u32,
        source: &mut S,
    ) -> SimulationReport {
        let mut report = SimulationReport::default();
        for _ in 0..spins {
            let outcome = self.spin_once(source);
            report.spins += 1;
            report.total_cost += u64::from(cost);
            report.total_payout += u64::from(outcome.payout());
            if outcome.win() {
                report.wins += 1;
            }
        }
        report
    }

    /// Exact expected payout of one spin, by enumerating every triple.
    pub fn expected_payout(&self) -> f64 {
        let probs = self.generator.probabilities();
        let mut expected = 0.0;
        for &(a, pa) in &probs {
            for &(b, pb) in &probs {
                for &(c, pc) in &probs {
                    let payout = self.resolver.resolve([a, b, c]).payout;
                    if payout > 0 {
                        expected += pa * pb * pc * f64::from(payout);
                    }
                }
            }
        }
        expected
    }

    pub fn expected_return(&self, cost: u32) -> f64 {
        self.expected_payout() / f64::from(cost)
    }
}
