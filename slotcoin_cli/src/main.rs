use anyhow::Context;
use clap::{Parser, Subcommand};
use slotcoin_core::{GameConfig, HmacSource, SpinEngine};
use slotcoin_server::{ProfileStore, SqliteProfileStore, StoreError, UserId};

#[derive(Parser)]
#[command(name = "slotcoin-cli", about = "Admin CLI for slotcoin server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://slotcoin.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Game configuration JSON; built-in game when omitted
    #[arg(long, env = "SLOTCOIN_GAME_CONFIG")]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a profile with the configured starting balance
    CreateProfile {
        user_id: String,
        #[arg(long, default_value = "")]
        username: String,
    },
    /// Print one profile
    ShowProfile { user_id: String },
    /// View last N spins
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: u32,
    },
    /// Export spins to CSV path
    ExportCsv { path: String },
    /// Play many spins offline with a reproducible seed
    Simulate {
        #[arg(long, default_value_t = 100_000)]
        spins: u64,
        #[arg(long, default_value = "slotcoin")]
        seed: String,
        #[arg(long, default_value_t = 0)]
        nonce: u64,
    },
    /// Print symbols, paytable and the exact expected return
    Paytable,
}

fn load_game(path: Option<&str>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::from_path(path).with_context(|| format!("loading {path}")),
        None => Ok(GameConfig::default()),
    }
}

async fn open_store(url: Option<String>) -> anyhow::Result<SqliteProfileStore> {
    let url = url.unwrap_or_else(|| "sqlite://slotcoin.db".into());
    Ok(SqliteProfileStore::connect(&url).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let game = load_game(cli.config.as_deref())?;

    match cli.command {
        Commands::CreateProfile { user_id, username } => {
            let store = open_store(cli.database_url).await?;
            match store
                .create(&UserId::new(&user_id), &username, game.starting_coins)
                .await
            {
                Ok(profile) => println!(
                    "Created profile {} with {} coins",
                    profile.id, profile.coins
                ),
                Err(StoreError::AlreadyExists) => {
                    anyhow::bail!("profile {user_id} already exists")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::ShowProfile { user_id } => {
            let store = open_store(cli.database_url).await?;
            match store.get(&UserId::new(&user_id)).await? {
                Some(p) => println!("{} username={:?} coins={}", p.id, p.username, p.coins),
                None => anyhow::bail!("no profile for {user_id}"),
            }
        }
        Commands::ViewLogs { n } => {
            let store = open_store(cli.database_url).await?;
            for s in store.recent_spins(n).await? {
                println!(
                    "#{:>6} {} user={} reels={:?} cost={} payout={} coins={}->{}",
                    s.id,
                    s.ts.to_rfc3339(),
                    s.user_id,
                    s.symbols,
                    s.cost,
                    s.payout,
                    s.coins_before,
                    s.coins_after
                );
            }
        }
        Commands::ExportCsv { path } => {
            let store = open_store(cli.database_url).await?;
            let spins = store.all_spins().await?;
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "ts",
                "user_id",
                "reels",
                "cost",
                "payout",
                "coins_before",
                "coins_after",
            ])?;
            for s in &spins {
                wtr.write_record(&[
                    s.id.to_string(),
                    s.ts.to_rfc3339(),
                    s.user_id.clone(),
                    format!("{},{},{}", s.symbols[0], s.symbols[1], s.symbols[2]),
                    s.cost.to_string(),
                    s.payout.to_string(),
                    s.coins_before.to_string(),
                    s.coins_after.to_string(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", spins.len(), path);
        }
        Commands::Simulate { spins, seed, nonce } => {
            let engine = SpinEngine::from_config(&game)?;
            let mut source = HmacSource::new(seed, nonce);
            let report = engine.simulate(spins, game.spin_cost, &mut source);
            println!("seed_hash={} nonce={}", source.seed_hash_hex(), nonce);
            println!(
                "spins={} wins={} hit_rate={:.4} wagered={} paid={} rtp={:.4} (exact {:.4})",
                report.spins,
                report.wins,
                report.hit_rate(),
                report.total_cost,
                report.total_payout,
                report.rtp(),
                engine.expected_return(game.spin_cost)
            );
        }
        Commands::Paytable => {
            let engine = SpinEngine::from_config(&game)?;
            let probs = engine.generator().probabilities();
            println!("{:>3}  {:<10} {:>6} {:>8}", "id", "symbol", "weight", "p");
            for (def, (_, p)) in game.symbols.iter().zip(probs) {
                println!("{:>3}  {:<10} {:>6} {:>8.4}", def.symbol, def.name, def.weight, p);
            }
            println!();
            for entry in game.paytable.entries() {
                println!("{:<8} {:>6}", entry.pattern.to_string(), entry.payout);
            }
            println!();
            println!(
                "spin cost {} expected payout {:.4} return {:.4}",
                game.spin_cost,
                engine.expected_payout(),
                engine.expected_return(game.spin_cost)
            );
        }
    }

    Ok(())
}
