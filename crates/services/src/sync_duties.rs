use std::sync::Arc;
use std::time::Duration;

use beacon::beacon_client::ConsensusClient;
use beacon::error::{BeaconError, is_beacon_error};
use beacon::utils::{is_slot_in_future, slot_to_epoch};
use eyre::{Report, Result, WrapErr};
use tracing::{debug, info, warn};

use crate::cache::DutyCache;
use crate::constants::DUTY_CACHE_TTL;

/// Resolves the public keys of the sync committee members for a slot.
///
/// With a [`DutyCache`] attached, results are memoized per epoch and a
/// missing committee falls back once to the duties of the current epoch.
pub struct SyncDutiesService<C: ConsensusClient> {
    consensus: Arc<C>,
    cache: Option<Arc<dyn DutyCache>>,
    cache_ttl: Duration,
}

impl<C: ConsensusClient> Clone for SyncDutiesService<C> {
    fn clone(&self) -> Self {
        Self { consensus: self.consensus.clone(), cache: self.cache.clone(), cache_ttl: self.cache_ttl }
    }
}

impl<C: ConsensusClient> SyncDutiesService<C> {
    pub fn new(consensus: Arc<C>) -> Self {
        Self { consensus, cache: None, cache_ttl: DUTY_CACHE_TTL }
    }

    pub fn with_cache(mut self, cache: Arc<dyn DutyCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Validator public keys on sync duty at `slot`, in no particular order.
    pub async fn get_sync_duties(&self, slot: u64) -> Result<Vec<String>> {
        match &self.cache {
            Some(cache) => self.get_sync_duties_cached(cache.as_ref(), slot).await,
            None => {
                self.ensure_not_future(slot).await?;
                self.resolve_committee(slot).await
            }
        }
    }

    async fn get_sync_duties_cached(&self, cache: &dyn DutyCache, slot: u64) -> Result<Vec<String>> {
        let epoch = slot_to_epoch(slot);

        if let Some(validators) = cache.get(epoch) {
            debug!(slot, epoch, count = validators.len(), "Sync duties served from cache");
            return Ok(validators);
        }

        self.ensure_not_future(slot).await?;

        match self.resolve_committee(slot).await {
            Ok(validators) => {
                cache.set(epoch, validators.clone(), self.cache_ttl);
                Ok(validators)
            }
            Err(err) if is_beacon_error(&err, &BeaconError::DutiesNotFound) => {
                self.fallback_to_current_epoch(cache, epoch, err).await
            }
            Err(err) => Err(err),
        }
    }

    /// Retry a missing committee with the duties of the current epoch.
    ///
    /// The result is stored under the requested epoch, so later lookups for
    /// it are served from the cache instead of repeating the miss.
    async fn fallback_to_current_epoch(
        &self,
        cache: &dyn DutyCache,
        requested_epoch: u64,
        original: Report,
    ) -> Result<Vec<String>> {
        let current_slot = self
            .consensus
            .get_current_slot()
            .await
            .wrap_err("Failed to fetch current slot for sync duties fallback")?;
        let current_epoch = slot_to_epoch(current_slot);

        warn!(
            requested_epoch,
            current_epoch,
            error = %format!("{:#}", original),
            "Sync committee not found, falling back to current epoch duties"
        );

        let validators = self.consensus.get_sync_duties(current_epoch).await.wrap_err_with(|| {
            format!(
                "Failed to get sync duties for both epoch {} and current epoch {}",
                requested_epoch, current_epoch
            )
        })?;

        cache.set(requested_epoch, validators.clone(), self.cache_ttl);
        Ok(validators)
    }

    async fn ensure_not_future(&self, slot: u64) -> Result<()> {
        let current_slot = self.consensus.get_current_slot().await.wrap_err("Failed to fetch current slot")?;
        if is_slot_in_future(slot, current_slot) {
            return Err(Report::new(BeaconError::SlotInFuture)
                .wrap_err(format!("Requested slot {} is ahead of head slot {}", slot, current_slot)));
        }
        Ok(())
    }

    async fn resolve_committee(&self, slot: u64) -> Result<Vec<String>> {
        let indexes = self
            .consensus
            .get_sync_committee_indexes(slot)
            .await
            .wrap_err_with(|| format!("Failed to fetch sync committee for slot {}", slot))?;

        let pubkeys = self
            .consensus
            .resolve_validator_pubkeys(slot, &indexes)
            .await
            .wrap_err_with(|| {
                format!("Failed to resolve {} sync committee validators at slot {}", indexes.len(), slot)
            })?;

        info!(slot, count = pubkeys.len(), "Resolved sync duties");
        Ok(pubkeys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MockDutyCache, TtlDutyCache};
    use beacon::beacon_client::MockConsensusClient;
    use beacon::error::find_beacon_error;
    use mockall::predicate::eq;

    fn indexes(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    fn pubkeys_for(ids: &[String]) -> Vec<String> {
        ids.iter().map(|id| format!("0xpk{}", id)).collect()
    }

    fn consensus_resolving(head: u64, slot: u64, committee_size: usize) -> MockConsensusClient {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(1).returning(move || Ok(head));
        consensus
            .expect_get_sync_committee_indexes()
            .with(eq(slot))
            .times(1)
            .returning(move |_| Ok(indexes(committee_size)));
        consensus
            .expect_resolve_validator_pubkeys()
            .times(1)
            .returning(|_, ids| Ok(pubkeys_for(ids)));
        consensus
    }

    fn duties_not_found(slot: u64) -> Report {
        Report::new(BeaconError::DutiesNotFound).wrap_err(format!("no committee at {}", slot))
    }

    #[tokio::test]
    async fn test_resolves_without_cache() {
        let service = SyncDutiesService::new(Arc::new(consensus_resolving(500, 320, 512)));

        let validators = service.get_sync_duties(320).await.unwrap();
        assert_eq!(validators.len(), 512);
        assert!(validators.contains(&"0xpk511".to_string()));
    }

    #[tokio::test]
    async fn test_future_slot_makes_no_further_calls() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(1).returning(|| Ok(100));
        consensus.expect_get_sync_committee_indexes().never();
        consensus.expect_resolve_validator_pubkeys().never();

        let service = SyncDutiesService::new(Arc::new(consensus));
        let err = service.get_sync_duties(200).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), Some(&BeaconError::SlotInFuture));
    }

    #[tokio::test]
    async fn test_duties_not_found_propagates_without_cache() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(1).returning(|| Ok(100));
        consensus.expect_get_sync_committee_indexes().returning(|slot| Err(duties_not_found(slot)));
        consensus.expect_get_sync_duties().never();

        let service = SyncDutiesService::new(Arc::new(consensus));
        let err = service.get_sync_duties(10).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), Some(&BeaconError::DutiesNotFound));
    }

    #[tokio::test]
    async fn test_slot_was_missed_propagates_with_cache() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(1).returning(|| Ok(100));
        consensus
            .expect_get_sync_committee_indexes()
            .returning(|_| Err(Report::new(BeaconError::SlotWasMissed)));
        consensus.expect_get_sync_duties().never();

        let mut cache = MockDutyCache::new();
        cache.expect_get().with(eq(1)).times(1).returning(|_| None);
        cache.expect_set().never();

        let service = SyncDutiesService::new(Arc::new(consensus)).with_cache(Arc::new(cache), DUTY_CACHE_TTL);
        let err = service.get_sync_duties(40).await.unwrap_err();

        assert_eq!(find_beacon_error(&err), Some(&BeaconError::SlotWasMissed));
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_upstream_calls() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().never();
        consensus.expect_get_sync_committee_indexes().never();
        consensus.expect_resolve_validator_pubkeys().never();

        let mut cache = MockDutyCache::new();
        cache.expect_get().with(eq(10)).times(1).returning(|_| Some(vec!["0xaa".to_string()]));
        cache.expect_set().never();

        let service = SyncDutiesService::new(Arc::new(consensus)).with_cache(Arc::new(cache), DUTY_CACHE_TTL);
        assert_eq!(service.get_sync_duties(335).await.unwrap(), vec!["0xaa".to_string()]);
    }

    #[tokio::test]
    async fn test_cache_miss_stores_under_epoch() {
        let ttl = Duration::from_secs(42);
        let mut cache = MockDutyCache::new();
        cache.expect_get().with(eq(10)).times(1).returning(|_| None);
        cache
            .expect_set()
            .withf(move |epoch, validators, set_ttl| *epoch == 10 && validators.len() == 3 && *set_ttl == ttl)
            .times(1)
            .return_const(());

        let service =
            SyncDutiesService::new(Arc::new(consensus_resolving(400, 320, 3))).with_cache(Arc::new(cache), ttl);
        assert_eq!(service.get_sync_duties(320).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_to_current_epoch() {
        let mut consensus = MockConsensusClient::new();
        // Once for the future-slot check, once to pick the fallback epoch
        consensus.expect_get_current_slot().times(2).returning(|| Ok(1000));
        consensus
            .expect_get_sync_committee_indexes()
            .with(eq(320))
            .times(1)
            .returning(|slot| Err(duties_not_found(slot)));
        consensus.expect_resolve_validator_pubkeys().never();
        consensus
            .expect_get_sync_duties()
            .with(eq(31))
            .times(1)
            .returning(|_| Ok(vec!["0xbb".to_string(), "0xcc".to_string()]));

        let mut cache = MockDutyCache::new();
        cache.expect_get().with(eq(10)).times(1).returning(|_| None);
        cache
            .expect_set()
            .withf(|epoch, validators, _| *epoch == 10 && validators.len() == 2)
            .times(1)
            .return_const(());

        let service = SyncDutiesService::new(Arc::new(consensus)).with_cache(Arc::new(cache), DUTY_CACHE_TTL);
        let validators = service.get_sync_duties(320).await.unwrap();

        assert_eq!(validators, vec!["0xbb".to_string(), "0xcc".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_failure_names_both_epochs() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(2).returning(|| Ok(1000));
        consensus.expect_get_sync_committee_indexes().returning(|slot| Err(duties_not_found(slot)));
        consensus
            .expect_get_sync_duties()
            .with(eq(31))
            .times(1)
            .returning(|_| Err(Report::new(BeaconError::DutiesNotFound)));

        let mut cache = MockDutyCache::new();
        cache.expect_get().returning(|_| None);
        cache.expect_set().never();

        let service = SyncDutiesService::new(Arc::new(consensus)).with_cache(Arc::new(cache), DUTY_CACHE_TTL);
        let err = service.get_sync_duties(320).await.unwrap_err();

        let rendered = format!("{:#}", err);
        assert!(rendered.contains("epoch 10"), "{rendered}");
        assert!(rendered.contains("current epoch 31"), "{rendered}");
        assert_eq!(find_beacon_error(&err), Some(&BeaconError::DutiesNotFound));
    }

    #[tokio::test]
    async fn test_repeated_queries_hit_ttl_cache() {
        // Second query in the same epoch must not reach the beacon node
        let service = SyncDutiesService::new(Arc::new(consensus_resolving(400, 330, 5)))
            .with_cache(Arc::new(TtlDutyCache::new()), DUTY_CACHE_TTL);

        let first = service.get_sync_duties(330).await.unwrap();
        let second = service.get_sync_duties(340).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_future_slot_check() {
        // Head is 320 (epoch 10) and slot 340 is more than one slot ahead,
        // but epoch 10 is already cached so the head is never consulted.
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().never();
        consensus.expect_get_sync_committee_indexes().never();

        let cache = TtlDutyCache::new();
        cache.set(10, vec!["0xaa".to_string()], DUTY_CACHE_TTL);

        let service = SyncDutiesService::new(Arc::new(consensus)).with_cache(Arc::new(cache), DUTY_CACHE_TTL);
        assert_eq!(service.get_sync_duties(340).await.unwrap(), vec!["0xaa".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_result_serves_later_requests_for_missing_epoch() {
        let mut consensus = MockConsensusClient::new();
        consensus.expect_get_current_slot().times(2).returning(|| Ok(1000));
        consensus
            .expect_get_sync_committee_indexes()
            .times(1)
            .returning(|slot| Err(duties_not_found(slot)));
        consensus
            .expect_get_sync_duties()
            .with(eq(31))
            .times(1)
            .returning(|_| Ok(vec!["0xbb".to_string()]));

        let service = SyncDutiesService::new(Arc::new(consensus))
            .with_cache(Arc::new(TtlDutyCache::new()), DUTY_CACHE_TTL);

        let first = service.get_sync_duties(320).await.unwrap();
        let second = service.get_sync_duties(330).await.unwrap();

        assert_eq!(first, vec!["0xbb".to_string()]);
        assert_eq!(second, first);
    }
}
