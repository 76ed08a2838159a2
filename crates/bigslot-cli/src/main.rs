//! BigSlot headless driver
//!
//! Usage:
//!   bigslot play --runs 3 --seed 42   - Autoplay runs and print a summary
//!   bigslot stats                     - Print the saved record
//!   bigslot reset                     - Delete the saved record
//!   bigslot config                    - Print the effective configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use bigslot_core::{Currency, SlotError};
use bigslot_engine::{GameConfig, WildMode};
use bigslot_event::GameEvent;
use bigslot_state::{BetStep, FileStore, GameSession, PersistenceAdapter, StageOutcome};

#[derive(Parser)]
#[command(name = "bigslot", about = "BigSlot roguelite slot machine, headless")]
struct Cli {
    /// Save directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    save_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Autoplay runs
    Play {
        /// Number of runs to play
        #[arg(short, long, default_value_t = 1)]
        runs: u32,
        /// Fixed rng seed
        #[arg(short, long)]
        seed: Option<u64>,
        /// Game configuration (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the wild rule
        #[arg(long, value_enum)]
        wild_mode: Option<WildModeArg>,
        /// Spend gems on permanent upgrades between stages
        #[arg(long)]
        buy_upgrades: bool,
    },
    /// Print the saved record
    Stats,
    /// Delete the saved record
    Reset,
    /// Print the effective configuration as JSON
    Config {
        /// Game configuration (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WildModeArg {
    Transparent,
    Plain,
}

impl From<WildModeArg> for WildMode {
    fn from(arg: WildModeArg) -> Self {
        match arg {
            WildModeArg::Transparent => WildMode::Transparent,
            WildModeArg::Plain => WildMode::Plain,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let adapter = persistence(cli.save_dir.as_deref());

    match cli.command {
        Commands::Play {
            runs,
            seed,
            config,
            wild_mode,
            buy_upgrades,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(mode) = wild_mode {
                config.rules.wild_mode = mode.into();
            }
            play(config, adapter, runs, seed, buy_upgrades)
        }
        Commands::Stats => show_stats(&adapter),
        Commands::Reset => reset(&adapter),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn persistence(save_dir: Option<&Path>) -> PersistenceAdapter {
    let dir = save_dir.map_or_else(FileStore::default_dir, Path::to_path_buf);
    log::debug!("Save directory: {}", dir.display());
    PersistenceAdapter::in_dir(dir)
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(GameConfig::default()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAY
// ═══════════════════════════════════════════════════════════════════════════════

/// How a run ended
enum RunEnd {
    Completed(u32),
    Bust(u32),
}

fn play(
    config: GameConfig,
    adapter: PersistenceAdapter,
    runs: u32,
    seed: Option<u64>,
    buy_upgrades: bool,
) -> Result<()> {
    let mut session = GameSession::new(config)?.with_persistence(adapter);
    if let Some(seed) = seed {
        session = session.with_seed(seed);
    }

    let big_wins = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&big_wins);
    session.events().subscribe(move |envelope| {
        if matches!(envelope.event, GameEvent::Win { tier, .. } if tier.is_big()) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    for run in 1..=runs {
        if run > 1 {
            session.start_new_run();
        }
        let end = play_run(&mut session, buy_upgrades)?;
        let snap = session.snapshot();
        match end {
            RunEnd::Completed(stage) => println!(
                "run {run}: completed at stage {stage}, {} coins, {} gems",
                snap.coins, snap.gems
            ),
            RunEnd::Bust(stage) => println!(
                "run {run}: out of coins at stage {stage}, {} gems",
                snap.gems
            ),
        }
    }

    let stats = session.machine_stats();
    let lifetime = session.state().stats();
    println!();
    println!("spins:          {}", stats.total_spins);
    println!("rtp:            {:.2}%", stats.rtp());
    println!("hit rate:       {:.2}%", stats.hit_rate());
    println!("big wins:       {}", big_wins.load(Ordering::Relaxed));
    println!("biggest payout: {}", stats.biggest_payout);
    println!("longest run:    {}", lifetime.longest_run);
    println!("total runs:     {}", lifetime.total_runs);

    session.save()?;
    Ok(())
}

fn play_run(session: &mut GameSession, buy_upgrades: bool) -> Result<RunEnd> {
    loop {
        match session.play_spin() {
            Ok(outcome) if outcome.stage_complete => {
                if buy_upgrades {
                    shop(session);
                }
                if let StageOutcome::RunComplete { stage_reached } = session.end_stage()? {
                    return Ok(RunEnd::Completed(stage_reached));
                }
            }
            Ok(_) => {}
            Err(SlotError::InsufficientFunds {
                currency: Currency::Coins,
                ..
            }) => {
                let cost = session.state().slot().spin_cost;
                if session.adjust_bet(BetStep::Down) == cost {
                    session.state_mut().record_run_progress();
                    return Ok(RunEnd::Bust(session.state().stage_reached()));
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Buy every affordable permanent upgrade level
fn shop(session: &mut GameSession) {
    let candidates: Vec<String> = session
        .state()
        .upgrade_catalog()
        .list_all()
        .iter()
        .filter(|u| u.is_permanent() && u.currency == Currency::Gems)
        .map(|u| u.id.clone())
        .collect();

    for id in candidates {
        match session.purchase_upgrade(&id) {
            Ok(level) => log::info!("Bought {id} (level {level})"),
            Err(e) if e.is_gameplay() => {}
            Err(e) => log::warn!("Cannot buy {id}: {e}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAVE MANAGEMENT
// ═══════════════════════════════════════════════════════════════════════════════

fn show_stats(adapter: &PersistenceAdapter) -> Result<()> {
    match adapter.load() {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => println!("no saved progress"),
    }
    Ok(())
}

fn reset(adapter: &PersistenceAdapter) -> Result<()> {
    if adapter.clear()? {
        println!("saved progress deleted");
    } else {
        println!("no saved progress");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play() {
        let cli = Cli::try_parse_from([
            "bigslot", "play", "--runs", "3", "--seed", "7", "--wild-mode", "plain",
        ])
        .unwrap();
        match cli.command {
            Commands::Play { runs, seed, wild_mode, buy_upgrades, .. } => {
                assert_eq!(runs, 3);
                assert_eq!(seed, Some(7));
                assert!(matches!(wild_mode, Some(WildModeArg::Plain)));
                assert!(!buy_upgrades);
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn test_global_save_dir() {
        let cli = Cli::try_parse_from(["bigslot", "stats", "--save-dir", "/tmp/slots"]).unwrap();
        assert_eq!(cli.save_dir, Some(PathBuf::from("/tmp/slots")));
    }

    #[test]
    fn test_play_saves_progress() {
        let adapter = PersistenceAdapter::in_memory();
        play(GameConfig::default(), adapter.clone(), 2, Some(3), true).unwrap();

        let record = adapter.load().unwrap();
        assert_eq!(record.stats.total_runs, 1);
        assert!(record.stats.longest_run >= 1);
        assert!(reset(&adapter).is_ok());
        assert!(adapter.load().is_none());
    }
}
