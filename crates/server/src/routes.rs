/// Health check endpoint
pub const HEALTH: &str = "/health";

/// Prometheus scrape endpoint
pub const METRICS: &str = "/metrics";

/// Proposer reward and MEV classification for a slot
pub const BLOCK_REWARD: &str = "/api/v1/blockreward/{slot}";

/// Sync committee members on duty at a slot
pub const SYNC_DUTIES: &str = "/api/v1/syncduties/{slot}";
