//! Background prefetcher
//!
//! Warms the response cache right after instance activation so the first
//! dashboard render hits memory instead of the rate-limited upstream. One
//! run: list the most recent activities, warm the common list pages, then
//! pull detail and streams for each activity under a concurrency gate.

use crate::models::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use cadence_foundation::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Upper bound on concurrent per-activity prefetch tasks. Keeps a prefetch
/// burst well inside the upstream rate limit.
const MAX_CONCURRENT_TASKS: usize = 4;

/// Activity-list page sizes dashboards commonly request.
const LIST_WARM_PAGE_SIZES: [u32; 2] = [50, 100];

/// Stream channel combinations fetched per activity, matching the shapes the
/// dashboard panels ask for.
const STREAM_KEYS: [&str; 3] = ["velocity_smooth,time", "heartrate,time", "latlng,time"];

/// What the prefetcher runs against. Implemented by the tenant instance;
/// the seam keeps prefetch scheduling testable without a network.
#[async_trait]
pub trait PrefetchTarget: Send + Sync {
    /// Live upstream query, bypassing the response cache.
    async fn query(&self, request: &ApiRequest) -> Result<ApiResponse>;

    /// Read-through cached query; this is what actually warms the cache.
    async fn query_with_cache(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// One-shot cache warmer for a tenant instance.
pub struct Prefetcher<T: PrefetchTarget + 'static> {
    depth: usize,
    target: Arc<T>,
}

impl<T: PrefetchTarget + 'static> Prefetcher<T> {
    pub fn new(depth: usize, target: Arc<T>) -> Self {
        Self { depth, target }
    }

    /// Run the prefetch on a background task. The run is not tied to the
    /// caller; dropping the handle lets it finish on its own.
    pub fn spawn(self) -> PrefetchHandle {
        let handle = tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(error = %e, "prefetch run aborted");
            }
        });
        PrefetchHandle { handle }
    }

    /// One full prefetch pass. A failure to list recent activities aborts
    /// the run; failures for individual activities are logged and skipped.
    pub async fn run(&self) -> Result<()> {
        info!(depth = self.depth, "prefetching recent activities");

        let ids = self.recent_activity_ids().await?;
        self.warm_activity_lists().await;
        self.prefetch_activities(ids).await;

        info!("prefetch run complete");
        Ok(())
    }

    /// Ids of the `depth` most recent activities, fetched live so the run
    /// always works from the current state.
    async fn recent_activity_ids(&self) -> Result<Vec<String>> {
        let request =
            ApiRequest::new("athlete/activities").with_param("per_page", self.depth as u64);
        let response = self.target.query(&request).await?;

        let activities = response
            .result
            .as_array()
            .ok_or_else(|| Error::Parse("activity list is not an array".to_string()))?;

        activities
            .iter()
            .map(|activity| {
                activity
                    .get("id")
                    .and_then(serde_json::Value::as_i64)
                    .map(|id| id.to_string())
                    .ok_or_else(|| Error::Parse("activity without a numeric id".to_string()))
            })
            .collect()
    }

    /// Warm the list pages dashboards ask for first. Failures here are not
    /// fatal; the per-activity phase still runs.
    async fn warm_activity_lists(&self) {
        for page_size in LIST_WARM_PAGE_SIZES {
            let request = ApiRequest::new("athlete/activities").with_param("per_page", page_size);
            if let Err(e) = self.target.query_with_cache(&request).await {
                warn!(page_size, error = %e, "failed to warm activity list");
            }
        }
    }

    /// Fetch detail and streams for each activity, at most
    /// [`MAX_CONCURRENT_TASKS`] activities in flight at a time.
    async fn prefetch_activities(&self, ids: Vec<String>) {
        let gate = Arc::new(Semaphore::new(MAX_CONCURRENT_TASKS));
        let mut tasks = Vec::with_capacity(ids.len());

        for id in ids {
            let gate = Arc::clone(&gate);
            let target = Arc::clone(&self.target);
            tasks.push(tokio::spawn(async move {
                // Closed only if the gate is dropped, which cannot happen
                // while this task holds a clone.
                let Ok(_permit) = gate.acquire().await else {
                    return;
                };
                debug!(activity = %id, "prefetching activity");

                for request in activity_requests(&id) {
                    if let Err(e) = target.query_with_cache(&request).await {
                        warn!(activity = %id, endpoint = %request.endpoint, error = %e,
                            "prefetch fetch failed");
                    }
                }
            }));
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "prefetch task panicked");
            }
        }
    }
}

/// The requests warmed for one activity: the full detail plus the three
/// stream shapes.
fn activity_requests(id: &str) -> Vec<ApiRequest> {
    let mut requests = vec![
        ApiRequest::new(format!("activities/{}", id)).with_param("include_all_efforts", true),
    ];
    for keys in STREAM_KEYS {
        requests.push(
            ApiRequest::new(format!("activities/{}/streams", id))
                .with_param("keys", keys)
                .with_param("key_by_type", true),
        );
    }
    requests
}

/// Handle to a running prefetch. Dropping it detaches the run.
pub struct PrefetchHandle {
    handle: JoinHandle<()>,
}

impl PrefetchHandle {
    /// Stop the run immediately. Normally unnecessary; a prefetch left to
    /// finish only fills the cache.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to finish. A panicked or aborted run is logged,
    /// never propagated.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                error!(error = %e, "prefetch task failed");
            }
        }
    }
}
