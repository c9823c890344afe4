use crate::constants::{SLOTS_PER_EPOCH, VALIDATOR_CHUNK_SIZE};

/// Converts a slot number to its corresponding epoch.
pub fn slot_to_epoch(slot: u64) -> u64 {
    slot / SLOTS_PER_EPOCH
}

/// Compute the first slot index of the given epoch.
pub fn epoch_to_first_slot(epoch: u64) -> u64 {
    epoch * SLOTS_PER_EPOCH
}

/// A slot is only answerable up to one slot past the current head.
pub fn is_slot_in_future(slot: u64, current_slot: u64) -> bool {
    slot > current_slot.saturating_add(1)
}

/// Split validator ids into request-sized chunks, preserving order.
pub fn chunk_validator_ids(ids: &[String]) -> Vec<&[String]> {
    ids.chunks(VALIDATOR_CHUNK_SIZE).collect()
}

/// Encode ids as repeated `id=` query parameters.
pub fn validator_ids_query(ids: &[String]) -> String {
    ids.iter().map(|id| format!("id={}", id)).collect::<Vec<_>>().join("&")
}
