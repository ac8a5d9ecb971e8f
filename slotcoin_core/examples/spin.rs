use slotcoin_core::{GameConfig, HmacSource, SpinEngine};

fn main() {
    // Example end-to-end spin
    let config = GameConfig::default();
    let engine = SpinEngine::from_config(&config).expect("default config is valid");
    let mut source = HmacSource::new("example-seed", 1);
    let outcome = engine.spin_once(&mut source);
    let names: Vec<&str> = outcome
        .symbols
        .iter()
        .map(|s| config.symbol_name(*s).unwrap_or("?"))
        .collect();
    println!(
        "seed_hash={} symbols={:?} win={} payout={}",
        source.seed_hash_hex(),
        names,
        outcome.win(),
        outcome.payout()
    );
}
