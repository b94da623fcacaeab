//! Per-player state and the concurrent store that owns it.
//!
//! The store is the only synchronized structure on the hot path: the
//! id-to-context map is multi-reader safe, while each context is wrapped
//! in its own mutex and mutated only by the player's single ingest owner.
//! Read-only accessors may observe slightly stale values from other
//! threads; that is fine for status reporting.

mod combat;
mod player;

pub use combat::CombatContext;
pub use player::PlayerContext;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::model::PlayerId;

/// Sizing parameters applied to newly created contexts.
#[derive(Debug, Clone, Copy)]
struct StoreParams {
    history_size: usize,
    window_size: usize,
    ewma_alpha: f64,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            history_size: 64,
            window_size: 20,
            ewma_alpha: 0.3,
        }
    }
}

/// Owns every live [`PlayerContext`] and [`CombatContext`], keyed by
/// player id. Contexts are created lazily on first access and destroyed
/// on quit.
pub struct HistoryStore {
    players: RwLock<HashMap<PlayerId, Arc<Mutex<PlayerContext>>>>,
    combat: RwLock<HashMap<PlayerId, Arc<Mutex<CombatContext>>>>,
    params: RwLock<StoreParams>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            combat: RwLock::new(HashMap::new()),
            params: RwLock::new(StoreParams::default()),
        }
    }

    /// Applies configured sizing. Existing contexts keep their buffers;
    /// new contexts pick up the new sizes.
    pub fn configure(&self, config: &EngineConfig) {
        let mut params = self.params.write();
        params.history_size = config.history.size;
        params.window_size = config.stats.median_window;
        params.ewma_alpha = config.stats.ewma_alpha;
    }

    /// Returns the existing movement context or creates one with the
    /// configured sizing.
    pub fn get_or_create(
        &self,
        player_id: PlayerId,
        player_name: &str,
    ) -> Arc<Mutex<PlayerContext>> {
        if let Some(ctx) = self.players.read().get(&player_id) {
            return Arc::clone(ctx);
        }
        let params = *self.params.read();
        let mut players = self.players.write();
        Arc::clone(players.entry(player_id).or_insert_with(|| {
            Arc::new(Mutex::new(PlayerContext::new(
                player_id,
                player_name,
                params.history_size,
                params.window_size,
                params.ewma_alpha,
            )))
        }))
    }

    pub fn get(&self, player_id: PlayerId) -> Option<Arc<Mutex<PlayerContext>>> {
        self.players.read().get(&player_id).cloned()
    }

    /// Returns the existing combat context or creates one.
    pub fn get_or_create_combat(
        &self,
        player_id: PlayerId,
        player_name: &str,
    ) -> Arc<Mutex<CombatContext>> {
        if let Some(ctx) = self.combat.read().get(&player_id) {
            return Arc::clone(ctx);
        }
        let params = *self.params.read();
        let mut combat = self.combat.write();
        Arc::clone(combat.entry(player_id).or_insert_with(|| {
            Arc::new(Mutex::new(CombatContext::new(
                player_id,
                player_name,
                params.history_size,
                params.window_size,
                params.ewma_alpha,
            )))
        }))
    }

    pub fn get_combat(&self, player_id: PlayerId) -> Option<Arc<Mutex<CombatContext>>> {
        self.combat.read().get(&player_id).cloned()
    }

    /// Destroys all state for a player.
    pub fn remove(&self, player_id: PlayerId) {
        self.players.write().remove(&player_id);
        self.combat.write().remove(&player_id);
    }

    /// Removes every context.
    pub fn clear(&self) {
        self.players.write().clear();
        self.combat.write().clear();
    }

    /// Number of tracked players (movement contexts).
    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
