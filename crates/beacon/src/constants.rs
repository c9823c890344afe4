pub const HEAD_HEADER_ROUTE: &str = "eth/v1/beacon/headers/head";

pub const HEADER_ROUTE: &str = "eth/v1/beacon/headers";

pub const BLOCK_REWARDS_ROUTE: &str = "eth/v1/beacon/rewards/blocks";

/// Suffixed with `/{state_id}/sync_committees` or `/{state_id}/validators`
pub const STATES_ROUTE: &str = "eth/v1/beacon/states";

pub const SYNC_DUTIES_ROUTE: &str = "eth/v1/validator/duties/sync";

/// Slots per epoch
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Upper bound on validator ids encoded into one `validators?id=..` request
pub const VALIDATOR_CHUNK_SIZE: usize = 100;

/// Default ceiling on chunk requests in flight for a single lookup
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// Upstream message fragment returned for sync committee queries against a pre-Altair state
pub const PRE_ALTAIR_MESSAGE: &str = "is not activated for Altair";
