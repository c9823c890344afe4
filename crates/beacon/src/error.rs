use thiserror::Error;

/// Domain errors raised while answering a slot query.
///
/// These are carried inside an `eyre::Report` with call-site context layered
/// on top; use [`find_beacon_error`] to recover the kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BeaconError {
    #[error("beacon node unreachable")]
    Transport,
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
    #[error("malformed beacon node response")]
    Parse,
    #[error("slot is in the future")]
    SlotInFuture,
    #[error("slot was missed or does not exist")]
    SlotMissedOrDoesNotExist,
    #[error("sync duties not found for given slot")]
    DutiesNotFound,
    #[error("slot was missed")]
    SlotWasMissed,
}

/// Look through the context layers of `report` for a [`BeaconError`].
pub fn find_beacon_error(report: &eyre::Report) -> Option<&BeaconError> {
    report.downcast_ref::<BeaconError>().or_else(|| {
        report
            .chain()
            .find_map(|cause| cause.downcast_ref::<BeaconError>())
    })
}

/// True if `report` carries the given [`BeaconError`] anywhere in its chain.
pub fn is_beacon_error(report: &eyre::Report, kind: &BeaconError) -> bool {
    find_beacon_error(report).is_some_and(|found| found == kind)
}
