use alloy::primitives::{Address, Bytes};

/// The parts of an execution block the reward service reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionBlock {
    /// Height of the block, as reported by the node
    pub number: u64,
    /// Fee recipient of the block
    pub coinbase: Address,
    /// Opaque builder-controlled bytes from the header
    pub extra_data: Bytes,
}

impl ExecutionBlock {
    /// Extra data as lower-case text with surrounding whitespace removed.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected, builders
    /// are free to put arbitrary bytes here.
    pub fn normalized_extra_data(&self) -> String {
        String::from_utf8_lossy(&self.extra_data).trim().to_lowercase()
    }
}
