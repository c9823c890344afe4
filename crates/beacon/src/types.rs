use alloy::primitives::U256;
use alloy::rpc::types::beacon::BlsPublicKey;
use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_CONCURRENT_REQUESTS;

/// Configuration for Beacon API integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconApiConfig {
    /// Beacon node root URL, e.g. `http://localhost:5052`
    pub endpoint: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum number of validator chunk requests in flight for one lookup
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

/// Error body returned by beacon nodes on non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<u16>,
}

impl ApiErrorBody {
    /// Decode an upstream error body, keeping the raw text as the message when
    /// the node answered with something other than the standard JSON shape.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice::<ApiErrorBody>(body).unwrap_or_else(|_| ApiErrorBody {
            message: String::from_utf8_lossy(body).trim().to_string(),
            code: None,
        })
    }
}

/// Response from `/eth/v1/beacon/headers/{block_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderResponse {
    #[serde(default)]
    pub execution_optimistic: bool,
    #[serde(default)]
    pub finalized: bool,
    pub data: HeaderData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderData {
    pub root: String,
    #[serde(default)]
    pub canonical: bool,
    pub header: SignedHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedHeader {
    pub message: HeaderMessage,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderMessage {
    pub slot: String,
    pub proposer_index: String,
}

impl HeaderMessage {
    pub fn parse_slot(&self) -> Result<u64> {
        self.slot
            .parse::<u64>()
            .map_err(|e| eyre::eyre!("Failed to parse slot '{}': {:?}", self.slot, e))
    }
}

/// Beacon block header for a slot, reduced to what the services need.
///
/// `block_root` joins the consensus layer to the execution layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconHeader {
    pub block_root: String,
    pub proposer_index: String,
    pub slot: u64,
}

impl HeaderResponse {
    pub fn into_header(self) -> Result<BeaconHeader> {
        let slot = self.data.header.message.parse_slot()?;
        Ok(BeaconHeader {
            block_root: self.data.root,
            proposer_index: self.data.header.message.proposer_index,
            slot,
        })
    }
}

/// Response from `/eth/v1/beacon/rewards/blocks/{block_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardResponse {
    #[serde(default)]
    pub execution_optimistic: bool,
    #[serde(default)]
    pub finalized: bool,
    pub data: ConsensusReward,
}

/// Proposer reward breakdown in Gwei, kept as the decimal text the node returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusReward {
    pub proposer_index: String,
    pub total: String,
    #[serde(default)]
    pub attestations: String,
    #[serde(default)]
    pub sync_aggregate: String,
    #[serde(default)]
    pub proposer_slashings: String,
    #[serde(default)]
    pub attester_slashings: String,
}

impl ConsensusReward {
    /// Total reward as an integer amount of Gwei.
    pub fn total_gwei(&self) -> Result<U256> {
        parse_gwei(&self.total)
    }
}

/// Parse a decimal Gwei amount without going through floating point.
pub fn parse_gwei(amount: &str) -> Result<U256> {
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        eyre::bail!("Invalid Gwei amount '{}'", amount);
    }
    U256::from_str_radix(amount, 10).map_err(|e| eyre::eyre!("Invalid Gwei amount '{}': {:?}", amount, e))
}

/// Response from `/eth/v1/beacon/states/{state_id}/sync_committees`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCommitteeResponse {
    #[serde(default)]
    pub execution_optimistic: bool,
    #[serde(default)]
    pub finalized: bool,
    pub data: SyncCommitteeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCommitteeData {
    /// Validator indices as decimal strings
    pub validators: Vec<String>,
    #[serde(default)]
    pub validator_aggregates: Vec<Vec<String>>,
}

/// Response from `/eth/v1/beacon/states/{state_id}/validators`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorListResponse {
    #[serde(default)]
    pub execution_optimistic: bool,
    #[serde(default)]
    pub finalized: bool,
    pub data: Vec<ValidatorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub index: String,
    #[serde(default)]
    pub status: String,
    pub validator: ValidatorDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorDetails {
    pub pubkey: String,
    #[serde(default)]
    pub withdrawal_credentials: String,
    #[serde(default)]
    pub slashed: bool,
}

/// Response from `/eth/v1/validator/duties/sync/{epoch}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDutiesResponse {
    #[serde(default)]
    pub execution_optimistic: bool,
    pub data: Vec<SyncDuty>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDuty {
    pub pubkey: String,
    pub validator_index: String,
    #[serde(default)]
    pub validator_sync_committee_indices: Vec<String>,
}

/// Check that `pubkey` is a 48-byte hex string, with or without `0x`.
pub fn parse_pubkey(pubkey: &str) -> Result<BlsPublicKey> {
    let pubkey_str = pubkey.strip_prefix("0x").unwrap_or(pubkey);
    let bytes = alloy::hex::decode(pubkey_str)?;

    if bytes.len() != 48 {
        return Err(eyre::eyre!("Invalid BLS public key length: expected 48 bytes, got {}", bytes.len()));
    }

    Ok(BlsPublicKey::from_slice(&bytes))
}
