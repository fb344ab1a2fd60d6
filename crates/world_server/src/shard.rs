//! The shard's tick loop.
//!
//! Every tick settles a finished background save, advances the simulation,
//! and starts an autosave when one is due. Shutdown waits for any write in
//! flight and then takes a final save.

use std::time::{Duration, Instant, SystemTime};

use anyhow::{Result, bail};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use world_content::{Gold, Location};
use world_entity::EntityKind;
use world_store::{SaveOutcome, SaveStatus, World, WorldState};

/// Tick loop settings.
#[derive(Debug, Clone)]
pub struct ShardConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = until interrupted).
    pub max_ticks: u64,
    /// Time between automatic saves, `None` to disable.
    pub autosave: Option<Duration>,
    /// A pile of coins is dropped every this many ticks (0 = never).
    pub spawn_every: u64,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            tick_rate: 10.0,
            max_ticks: 0,
            autosave: Some(Duration::from_secs(300)),
            spawn_every: 10,
        }
    }
}

impl ShardConfig {
    /// Reject settings the tick loop cannot run with.
    ///
    /// # Errors
    ///
    /// Fails if the tick rate is not a positive, finite number.
    pub fn validate(&self) -> Result<()> {
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            bail!("tick rate must be a positive number, got {}", self.tick_rate);
        }
        Ok(())
    }
}

pub struct Shard {
    world: World,
    config: ShardConfig,
    tick_id: u64,
    last_save: Instant,
}

impl Shard {
    #[must_use]
    pub fn new(world: World, config: ShardConfig) -> Self {
        Self {
            world,
            config,
            tick_id: 0,
            last_save: Instant::now(),
        }
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Run until `max_ticks` is reached or Ctrl-C arrives, then shut down.
    pub async fn run(&mut self) -> Result<()> {
        self.config.validate()?;
        let period = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            autosave = ?self.config.autosave,
            "starting tick loop"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let start = Instant::now();
                    self.tick();
                    let elapsed = start.elapsed();
                    if elapsed > period {
                        warn!(
                            tick_id = self.tick_id,
                            elapsed_ms = elapsed.as_millis() as u64,
                            budget_ms = period.as_millis() as u64,
                            "tick exceeded time budget"
                        );
                    }
                    if self.config.max_ticks > 0 && self.tick_id >= self.config.max_ticks {
                        info!(ticks = self.tick_id, "tick limit reached");
                        break;
                    }
                }
                result = &mut shutdown => {
                    result?;
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.shutdown()
    }

    /// One simulation step.
    pub fn tick(&mut self) {
        self.tick_id += 1;

        if let Some(outcome) = self.world.poll_write() {
            report(&outcome);
        }

        if self.config.spawn_every > 0 && self.tick_id % self.config.spawn_every == 0 {
            self.drop_coins();
        }

        if let Some(every) = self.config.autosave
            && self.world.state() == WorldState::Running
            && self.last_save.elapsed() >= every
        {
            self.last_save = Instant::now();
            if let SaveStatus::Abandoned(error) = self.world.save() {
                error!(%error, "autosave abandoned");
            }
        }
    }

    fn drop_coins(&mut self) {
        let serial = match self.world.new_serial(EntityKind::Item) {
            Ok(serial) => serial,
            Err(error) => {
                error!(%error, "cannot create more items");
                return;
            }
        };
        let mut gold = Gold::with_amount(serial, (self.tick_id % 1000) as u32 + 1);
        let spot = (self.tick_id % 4096) as i16;
        gold.move_to(Location::new(spot, spot / 2, 0, 0), SystemTime::now());
        match self.world.add_entity(Box::new(gold)) {
            Ok(()) => debug!(tick_id = self.tick_id, %serial, "coins dropped"),
            Err(error) => error!(%error, "failed to add coins"),
        }
    }

    /// Settle any write in flight and take a final save.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(outcome) = self.world.wait_for_write_completion() {
            report(&outcome);
        }
        match self.world.save() {
            SaveStatus::Dispatched { .. } => {
                if let Some(outcome) = self.world.wait_for_write_completion() {
                    report(&outcome);
                    if let Err(error) = outcome.result {
                        return Err(error.into());
                    }
                }
            }
            SaveStatus::Abandoned(error) => return Err(error.into()),
            SaveStatus::Skipped { state } => warn!(%state, "final save skipped"),
        }
        info!(ticks = self.tick_id, "shard stopped");
        Ok(())
    }
}

fn report(outcome: &SaveOutcome) {
    match &outcome.result {
        Ok(summary) => info!(
            path = %summary.save_dir.display(),
            decayed = outcome.decayed,
            replayed_adds = outcome.replayed.added,
            replayed_deletes = outcome.replayed.deleted,
            "save settled"
        ),
        Err(error) => error!(%error, "save failed, previous save kept"),
    }
}

#[cfg(test)]
mod tests {
    use world_content::register_all;
    use world_entity::TypeRegistry;
    use world_store::{FixedDecision, LoadDecision, WorldConfig};

    use super::*;

    fn shard(root: &std::path::Path, config: ShardConfig) -> Shard {
        let mut registry = TypeRegistry::new();
        register_all(&mut registry);
        let mut world = World::new(WorldConfig::rooted_at(root), registry).unwrap();
        world.load(&mut FixedDecision(LoadDecision::Abort)).unwrap();
        Shard::new(world, config)
    }

    #[test]
    fn test_tick_rate_must_be_positive() {
        for tick_rate in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = ShardConfig {
                tick_rate,
                ..ShardConfig::default()
            };
            assert!(config.validate().is_err(), "{tick_rate} accepted");
        }
        assert!(ShardConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_run_refuses_zero_tick_rate() {
        let dir = tempfile::tempdir().unwrap();
        let mut shard = shard(
            dir.path(),
            ShardConfig {
                tick_rate: 0.0,
                ..ShardConfig::default()
            },
        );
        assert!(shard.run().await.is_err());
        assert_eq!(shard.tick_id(), 0);
    }

    #[test]
    fn test_tick_drops_coins() {
        let dir = tempfile::tempdir().unwrap();
        let mut shard = shard(
            dir.path(),
            ShardConfig {
                autosave: None,
                spawn_every: 2,
                ..ShardConfig::default()
            },
        );
        for _ in 0..6 {
            shard.tick();
        }
        assert_eq!(shard.tick_id(), 6);
        assert_eq!(shard.world().entity_count(EntityKind::Item), 3);
    }

    #[test]
    fn test_autosave_then_final_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut shard = shard(
            dir.path(),
            ShardConfig {
                autosave: Some(Duration::ZERO),
                spawn_every: 1,
                ..ShardConfig::default()
            },
        );
        shard.tick();
        assert_eq!(shard.world().state(), WorldState::WritingSave);
        // Coins dropped while a save is in flight wait for it to settle.
        shard.tick();
        shard.shutdown().unwrap();
        assert_eq!(shard.world().state(), WorldState::Running);
        assert_eq!(shard.world().entity_count(EntityKind::Item), 2);
        assert!(dir.path().join("Saves/Items/Items.idx").is_file());
    }
}
