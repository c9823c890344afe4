use std::time::Duration;

/// Builder and relay tags searched for in block extra data.
///
/// Matched as substrings of the lower-cased, trimmed extra data.
pub const MEV_RELAY_SIGNATURES: [&str; 10] = [
    "flashbots",
    "bloxroute",
    "eden",
    "manifold",
    "builder0x69",
    "rsync-builder",
    "beaverbuild",
    "aestus",
    "titans",
    "relayooor",
];

/// How long resolved sync duties stay cached
pub const DUTY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
