use serde::Serialize;

use crate::digest::DigestStats;

/// Per-turn counters, logged once the turn's orders are ready.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnMetrics {
    pub turn: u64,
    pub ants: usize,
    pub births: usize,
    pub deaths: usize,
    pub blocked: usize,
    pub orders: usize,
    pub evictions: u32,
    pub rejections: u32,
    pub experts_run: usize,
    pub experts_skipped: usize,
    pub attributed_losses: usize,
    pub elapsed_us: u64,
    /// Skipped when the deadline has already passed.
    pub digest: Option<DigestStats>,
    pub trust: Option<Vec<f64>>,
}

impl TurnMetrics {
    pub fn log(&self) {
        tracing::info!(
            target: "colony::turn",
            turn = self.turn,
            ants = self.ants,
            births = self.births,
            deaths = self.deaths,
            blocked = self.blocked,
            orders = self.orders,
            evictions = self.evictions,
            rejections = self.rejections,
            experts_run = self.experts_run,
            experts_skipped = self.experts_skipped,
            elapsed_us = self.elapsed_us,
            "turn.resolved"
        );
        if let Some(digest) = &self.digest {
            tracing::debug!(
                target: "colony::turn",
                turn = self.turn,
                digest_queries = digest.digest_queries,
                digest_hits = digest.digest_hits,
                ray_queries = digest.ray_queries,
                ray_hits = digest.ray_hits,
                reachable_queries = digest.reachable_queries,
                trust = ?self.trust,
                "turn.diagnostics"
            );
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
