//! Leaderboard read path with a short-lived Redis cache

use anyhow::Result;
use common::cache::RedisPool;
use tracing::{debug, warn};

use crate::{
    models::leaderboard::{LeaderboardRow, LeaderboardScope, build_rows},
    repositories::TrophyRepository,
};

const CACHE_PREFIX: &str = "leaderboard:";
const CACHE_TTL_SECS: u64 = 60;

/// `leaderboard:{ALL|UCL|EUROPA}`, with `:{season}` appended when filtered
pub fn cache_key(scope: &LeaderboardScope) -> String {
    let competition = scope.competition.map_or("ALL", |c| c.as_str());
    match &scope.season {
        Some(season) => format!("{CACHE_PREFIX}{competition}:{season}"),
        None => format!("{CACHE_PREFIX}{competition}"),
    }
}

#[derive(Clone)]
pub struct LeaderboardService {
    redis_pool: RedisPool,
    trophy_repository: TrophyRepository,
}

impl LeaderboardService {
    pub fn new(redis_pool: RedisPool, trophy_repository: TrophyRepository) -> Self {
        Self {
            redis_pool,
            trophy_repository,
        }
    }

    /// Ranked rows, served from cache when a fresh copy exists.
    ///
    /// Redis failures are logged and the rows are computed from Postgres.
    pub async fn rows(&self, scope: &LeaderboardScope) -> Result<Vec<LeaderboardRow>> {
        let key = cache_key(scope);

        match self.redis_pool.get_json::<Vec<LeaderboardRow>>(&key).await {
            Ok(Some(rows)) => {
                debug!(key, "leaderboard cache hit");
                return Ok(rows);
            }
            Ok(None) => {}
            Err(e) => warn!(key, "leaderboard cache read failed: {:#}", e),
        }

        let rows = build_rows(self.trophy_repository.leaderboard_counts(scope).await?);

        if let Err(e) = self
            .redis_pool
            .set_json(&key, &rows, Some(CACHE_TTL_SECS))
            .await
        {
            warn!(key, "leaderboard cache write failed: {:#}", e);
        }

        Ok(rows)
    }

    /// Drop every cached leaderboard; called after any trophy write
    pub async fn invalidate(&self) {
        match self.redis_pool.delete_prefix(CACHE_PREFIX).await {
            Ok(removed) => debug!(removed, "leaderboard cache invalidated"),
            Err(e) => warn!("leaderboard cache invalidation failed: {:#}", e),
        }
    }
}
