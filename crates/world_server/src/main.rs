//! # world_server: shard host
//!
//! Owns the single [`World`] of a shard and drives it from one control task.
//!
//! ## Startup Sequence
//!
//! 1. Read the world configuration (`--config`, defaults otherwise).
//! 2. Register every persisted type and load the save directory, asking the
//!    operator about anything that cannot be restored.
//! 3. Enter the fixed-rate tick loop, saving every `--autosave-secs`.
//! 4. On Ctrl-C or after `--ticks` ticks, take a final save and exit.

mod prompt;
mod shard;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use world_content::{Container, Location, PlayerMobile, register_all};
use world_entity::{EntityKind, TypeRegistry};
use world_store::{FixedDecision, LoadDecision, World, WorldConfig};

use prompt::ConsolePrompt;
use shard::{Shard, ShardConfig};

#[derive(Parser)]
#[command(name = "world_server", about = "Persistent world shard with background snapshot saves")]
struct Args {
    /// JSON world configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save directory, overriding the configuration file
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Seconds between automatic saves (0 disables autosave)
    #[arg(long, default_value_t = 300)]
    autosave_secs: u64,

    /// Discard unrestorable types and entities without asking
    #[arg(long)]
    discard_bad: bool,

    /// Stop after this many ticks (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Ticks per second
    #[arg(long, default_value_t = 10.0)]
    tick_rate: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let shard_config = ShardConfig {
        tick_rate: args.tick_rate,
        max_ticks: args.ticks,
        autosave: (args.autosave_secs > 0).then(|| Duration::from_secs(args.autosave_secs)),
        ..ShardConfig::default()
    };
    shard_config.validate()?;

    let mut config = match &args.config {
        Some(path) => WorldConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WorldConfig::default(),
    };
    if let Some(dir) = args.save_dir {
        config.save_path = dir;
    }
    info!(save = %config.save_path.display(), "world server starting");

    let mut registry = TypeRegistry::new();
    register_all(&mut registry);
    let mut world = World::new(config, registry)?;

    let summary = if args.discard_bad {
        world.load(&mut FixedDecision(LoadDecision::Discard))?
    } else {
        world.load(&mut ConsolePrompt::stdin())?
    };
    if summary.is_some_and(|s| s.total() == 0) {
        seed(&mut world)?;
    }

    let mut shard = Shard::new(world, shard_config);
    shard.run().await?;
    Ok(())
}

/// Populate an empty world with a first character and its backpack.
fn seed(world: &mut World) -> Result<()> {
    let player_serial = world.new_serial(EntityKind::Mobile)?;
    let pack_serial = world.new_serial(EntityKind::Item)?;

    let mut player = PlayerMobile::named(player_serial, "Avatar");
    player.location = Location::new(1495, 1629, 10, 0);
    player.backpack = Some(pack_serial);

    world.add_entity(Box::new(Container::named(pack_serial, "backpack")))?;
    world.add_entity(Box::new(player))?;
    info!(%player_serial, "seeded empty world");
    Ok(())
}
