//! Server state management
//!
//! Shared state for the game service and the idempotency store.

use crate::engine::GameService;
use crate::idempotency::IdempotencyGuard;
use crate::store::{GameRepository, MemoryRepository};
use crate::ServerConfig;
use hexlands_core::{GreedyOpponent, StandardDamage};
use std::sync::Arc;

/// Server-wide shared state
pub struct ServerState {
    pub service: GameService,
    pub idempotency: IdempotencyGuard,
}

impl ServerState {
    /// In-memory games with the default damage model and AI
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_repository(config, Arc::new(MemoryRepository::new()))
    }

    pub fn with_repository(config: &ServerConfig, repo: Arc<dyn GameRepository>) -> Self {
        let opponent = GreedyOpponent::new(config.rules.expansion.clone());
        Self {
            service: GameService::new(
                repo,
                config.rules.clone(),
                Box::new(StandardDamage::default()),
                Box::new(opponent),
            ),
            idempotency: IdempotencyGuard::new(config.idempotency_ttl),
        }
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}
