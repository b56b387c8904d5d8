use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ClearPolicy, Config};
use crate::fetch_error::FetchError;
use crate::fixtures;
use crate::outlet_resolver::OutletResolver;
use crate::stats_fetcher::StatsFetcher;

/// Snapshot of everything a presentation layer needs to render a segment.
///
/// The payloads are committed together: after a settled fetch, `statistics`
/// and `hydrograph` are either both populated or both null, never mixed.
#[derive(Debug, Clone, Default)]
pub struct SegmentState {
    pub segment_id: Option<String>,
    pub segment_name: Option<String>,
    pub huc_id: Option<String>,
    pub is_loading: bool,
    pub is_slow: bool,
    pub has_failed: bool,
    pub statistics: Option<Value>,
    pub hydrograph: Option<Value>,
}

/// Coordinates the dependent remote calls for one stream segment: HUC-8 to
/// outlet-segment resolution, then the statistics/hydrograph pair fetch.
///
/// State lives behind a watch channel; `subscribe()` hands out receivers
/// that see every transition. Each fetch cycle takes a generation from an
/// atomic counter, and only the cycle that is still current may commit
/// payloads, mutate flags, or release `is_loading` - a superseded cycle's
/// late settle cannot clobber a newer cycle's result.
pub struct SegmentDataController {
    config: Config,
    stats_fetcher: StatsFetcher,
    outlet_resolver: OutletResolver,
    state_tx: watch::Sender<SegmentState>,
    generation: Arc<AtomicU64>,
}

impl SegmentDataController {
    pub fn new(config: Config) -> Self {
        let client = reqwest::Client::new();
        let stats_fetcher = StatsFetcher::with_client(client.clone(), config.api_base_url.clone());
        let outlet_resolver = OutletResolver::with_client(client, config.geoserver_base_url.clone());
        let (state_tx, _) = watch::channel(SegmentState::default());

        Self {
            config,
            stats_fetcher,
            outlet_resolver,
            state_tx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SegmentState> {
        self.state_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> SegmentState {
        self.state_tx.borrow().clone()
    }

    pub fn set_segment(&self, segment_id: impl Into<String>, segment_name: Option<String>) {
        let segment_id = segment_id.into();
        self.state_tx.send_modify(|state| {
            state.segment_id = Some(segment_id);
            state.segment_name = segment_name;
        });
    }

    pub fn set_huc(&self, huc_id: impl Into<String>) {
        let huc_id = huc_id.into();
        self.state_tx.send_modify(|state| {
            state.huc_id = Some(huc_id);
        });
    }

    /// Clear payloads and identity. Idempotent; flags are left to the next
    /// fetch cycle, which resets them on entry.
    pub fn reset(&self) {
        self.state_tx.send_modify(|state| {
            state.segment_id = None;
            state.segment_name = None;
            state.huc_id = None;
            state.statistics = None;
            state.hydrograph = None;
        });
    }

    /// Resolve the watershed outlet segment for the configured HUC id, then
    /// chain into `fetch_statistics` if a segment was found.
    ///
    /// An empty or outlet-less feature collection is logged and swallowed,
    /// leaving the current segment id untouched. `is_loading` spans the
    /// resolution and the chained fetch and is released on every path.
    #[instrument(skip(self))]
    pub async fn resolve_outlet_from_huc(&self) {
        let huc_id = self.state_tx.borrow().huc_id.clone();
        let Some(huc_id) = huc_id else {
            warn!("resolve_outlet_from_huc called without a HUC id");
            return;
        };

        let generation = self.next_generation();
        self.state_tx.send_modify(|state| {
            state.is_slow = false;
            state.has_failed = false;
            state.is_loading = true;
        });

        let resolved = self.outlet_resolver.resolve(&huc_id).await;

        if !self.is_current(generation) {
            debug!(generation, "Resolution cycle superseded, discarding result");
            return;
        }

        match resolved {
            Ok(Some(segment_id)) => {
                info!(huc_id = %huc_id, segment_id = %segment_id, "Resolved watershed outlet segment");
                self.state_tx.send_modify(|state| {
                    state.segment_id = Some(segment_id);
                });
                self.fetch_statistics_cycle(generation).await;
            }
            Ok(None) => {
                // Diagnostic already logged by the resolver; segment id stays.
                self.state_tx.send_modify(|state| state.is_loading = false);
            }
            Err(e) => {
                error!(huc_id = %huc_id, error = %e, "Outlet resolution failed");
                let failed = e.is_api_failure();
                self.state_tx.send_modify(|state| {
                    state.has_failed = failed;
                    state.is_loading = false;
                });
            }
        }
    }

    /// Fetch the statistics/hydrograph pair for the current segment id.
    ///
    /// Resets the slow/failed flags, clears payloads per the configured
    /// clear policy, and commits both payloads only when both requests
    /// succeed. `is_loading` is released exactly once per cycle.
    #[instrument(skip(self))]
    pub async fn fetch_statistics(&self) {
        let generation = self.next_generation();
        self.fetch_statistics_cycle(generation).await;
    }

    async fn fetch_statistics_cycle(&self, generation: u64) {
        // An unset segment id is not guarded; the request targets a record
        // that cannot exist and settles as a failure.
        let segment_id = self
            .state_tx
            .borrow()
            .segment_id
            .clone()
            .unwrap_or_default();

        let clear_eagerly = self.config.clear_policy == ClearPolicy::Eager;
        self.state_tx.send_modify(|state| {
            state.is_slow = false;
            state.has_failed = false;
            state.is_loading = true;
            if clear_eagerly {
                state.statistics = None;
                state.hydrograph = None;
            }
        });

        let outcome = if self.config.static_fixtures {
            info!("Using static fixtures for hydrology API data");
            fixtures::fixture_pair()
        } else {
            self.fetch_pair_with_timers(&segment_id, generation).await
        };

        if !self.is_current(generation) {
            debug!(generation, "Fetch cycle superseded, discarding result");
            return;
        }

        match outcome {
            Ok((stats, hydrograph)) => {
                info!(segment_id = %segment_id, "Committing statistics and hydrograph payloads");
                self.state_tx.send_modify(|state| {
                    state.statistics = Some(stats);
                    state.hydrograph = Some(hydrograph);
                    state.is_loading = false;
                });
            }
            Err(e) => {
                // Either endpoint failing fails the pair; partial chart
                // state is worse than no chart state.
                error!(segment_id = %segment_id, error = %e, "Statistics fetch failed");
                let failed = e.is_api_failure();
                self.state_tx.send_modify(|state| {
                    state.statistics = None;
                    state.hydrograph = None;
                    state.has_failed = failed;
                    state.is_loading = false;
                });
            }
        }
    }

    /// Run the pair fetch under the soft "slow" timer and the hard abort
    /// timeout. The slow timer only raises an advisory flag; the hard
    /// timeout abandons the in-flight requests and settles as `Timeout`.
    async fn fetch_pair_with_timers(
        &self,
        segment_id: &str,
        generation: u64,
    ) -> Result<(Value, Value), FetchError> {
        let slow_timer = {
            let state_tx = self.state_tx.clone();
            let counter = Arc::clone(&self.generation);
            let threshold = self.config.slow_threshold;
            tokio::spawn(async move {
                tokio::time::sleep(threshold).await;
                if counter.load(Ordering::SeqCst) == generation {
                    warn!("Hydrology API is responding slowly");
                    state_tx.send_modify(|state| state.is_slow = true);
                }
            })
        };

        let result = match timeout(
            self.config.hard_timeout,
            self.stats_fetcher.fetch_pair(segment_id),
        )
        .await
        {
            Ok(settled) => settled,
            Err(_) => Err(FetchError::Timeout),
        };

        slow_timer.abort();
        result
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}
