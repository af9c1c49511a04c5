//! Refreshes stale origin leaves

use futures::stream::{self, StreamExt};
use graph::Node;
use node_config::UpdaterConfig;
use origins::{FetchContext, Origin};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use types::{Pair, Point, PointError};

/// Outcome of one update pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Leaves that received a valid point
    pub refreshed: usize,
    /// Leaves that received an error point
    pub failed: usize,
    /// Leaves still fresh, left untouched
    pub skipped: usize,
}

impl UpdateSummary {
    fn merge(&mut self, other: UpdateSummary) {
        self.refreshed += other.refreshed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Pairs of one origin fetched together, with the leaves waiting on each pair
struct Batch {
    origin: String,
    leaves: Vec<(Pair, Vec<Arc<Node>>)>,
}

pub struct Updater {
    origins: HashMap<String, Arc<dyn Origin>>,
    batch_size: usize,
    max_concurrency: usize,
    timeout: Duration,
}

impl Updater {
    pub fn new(origins: HashMap<String, Arc<dyn Origin>>, config: &UpdaterConfig) -> Self {
        Self {
            origins,
            batch_size: config.batch_size.max(1),
            max_concurrency: config.max_concurrency.max(1),
            timeout: config.timeout(),
        }
    }

    pub fn origin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.origins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fetch new points for every stale origin leaf in `leaves`
    ///
    /// Leaves are grouped by origin and split into batches of at most `batch_size`
    /// pairs. At most `max_concurrency` batches are in flight, each bounded by the
    /// updater timeout. Every stale leaf receives a point, an error point when its
    /// pair could not be fetched.
    pub async fn update(&self, ctx: &FetchContext, leaves: &[Arc<Node>]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let mut by_origin: BTreeMap<String, BTreeMap<Pair, Vec<Arc<Node>>>> = BTreeMap::new();
        for leaf in leaves {
            let Some(origin) = leaf.as_origin() else {
                continue;
            };
            if origin.is_fresh() {
                summary.skipped += 1;
                continue;
            }
            by_origin
                .entry(origin.origin().to_string())
                .or_default()
                .entry(origin.pair().clone())
                .or_default()
                .push(leaf.clone());
        }

        let mut batches = Vec::new();
        for (origin, pairs) in by_origin {
            let pairs: Vec<(Pair, Vec<Arc<Node>>)> = pairs.into_iter().collect();
            for chunk in pairs.chunks(self.batch_size) {
                batches.push(Batch {
                    origin: origin.clone(),
                    leaves: chunk.to_vec(),
                });
            }
        }
        if batches.is_empty() {
            return summary;
        }
        debug!(batches = batches.len(), "Updating stale origin leaves");

        let results: Vec<UpdateSummary> = stream::iter(batches)
            .map(|batch| self.run_batch(ctx, batch))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        for result in results {
            summary.merge(result);
        }

        info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Update pass finished"
        );
        summary
    }

    async fn run_batch(&self, ctx: &FetchContext, batch: Batch) -> UpdateSummary {
        let Some(origin) = self.origins.get(&batch.origin) else {
            warn!(origin = %batch.origin, "Leaves reference an unknown origin");
            let error = PointError::configuration(format!("unknown origin {}", batch.origin));
            return record_all(&batch, |_| Point::from_error(error.clone()));
        };

        let pairs: Vec<Pair> = batch.leaves.iter().map(|(pair, _)| pair.clone()).collect();
        let ctx = ctx.with_budget(self.timeout);
        match origin.fetch_data_points(&ctx, &pairs).await {
            Ok(mut points) => record_all(&batch, |pair| {
                points.remove(pair).unwrap_or_else(|| {
                    Point::from_error(PointError::transient(format!(
                        "origin {} returned no point for {pair}",
                        batch.origin
                    )))
                })
            }),
            Err(err) => {
                warn!(origin = %batch.origin, pairs = pairs.len(), error = %err, "Origin fetch failed");
                let error = err.to_point_error().context(format!("origin {}", batch.origin));
                record_all(&batch, |_| Point::from_error(error.clone()))
            }
        }
    }
}

/// Record the point `point_for(pair)` on every leaf waiting on that pair
///
/// A leaf counts as refreshed only when it accepted a valid point.
fn record_all(batch: &Batch, mut point_for: impl FnMut(&Pair) -> Point) -> UpdateSummary {
    let mut summary = UpdateSummary::default();
    for (pair, leaves) in &batch.leaves {
        let point = point_for(pair);
        for leaf in leaves {
            let Some(origin) = leaf.as_origin() else {
                continue;
            };
            match origin.record(point.clone()) {
                Ok(()) if point.is_err() => summary.failed += 1,
                Ok(()) => summary.refreshed += 1,
                Err(err) => {
                    warn!(origin = %batch.origin, %pair, error = %err, "Point not recorded");
                    summary.failed += 1;
                }
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use graph::OriginNode;
    use origins::OriginError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use types::{ErrorKind, Tick};

    /// Prices every pair at 1 except those listed as missing; counts calls
    struct CountingOrigin {
        missing: Vec<Pair>,
        fail: bool,
        /// Pair written into every tick instead of the requested one
        tick_pair: Option<Pair>,
        calls: AtomicUsize,
        largest_batch: AtomicUsize,
    }

    impl CountingOrigin {
        fn new() -> Self {
            Self {
                missing: Vec::new(),
                fail: false,
                tick_pair: None,
                calls: AtomicUsize::new(0),
                largest_batch: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Origin for CountingOrigin {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_data_points(
            &self,
            _ctx: &FetchContext,
            pairs: &[Pair],
        ) -> origins::Result<HashMap<Pair, Point>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.largest_batch.fetch_max(pairs.len(), Ordering::SeqCst);
            if self.fail {
                return Err(OriginError::Rpc("node unavailable".into()));
            }
            Ok(pairs
                .iter()
                .filter(|pair| !self.missing.contains(pair))
                .map(|pair| {
                    let tick_pair = self.tick_pair.clone().unwrap_or_else(|| pair.clone());
                    let point = Point::new(Tick::new(tick_pair, "1".parse().unwrap()), Utc::now());
                    (pair.clone(), point)
                })
                .collect())
        }
    }

    fn leaf(origin: &str, pair: &str) -> Arc<Node> {
        Arc::new(Node::Origin(
            OriginNode::new(
                origin,
                pair.parse().unwrap(),
                Duration::from_secs(60),
                Duration::from_secs(600),
            )
            .unwrap(),
        ))
    }

    fn config(batch_size: usize) -> UpdaterConfig {
        UpdaterConfig {
            batch_size,
            max_concurrency: 2,
            timeout_ms: 1_000,
        }
    }

    fn counting_updater(origin: Arc<CountingOrigin>, batch_size: usize) -> Updater {
        let mut origins: HashMap<String, Arc<dyn Origin>> = HashMap::new();
        origins.insert("counting".into(), origin);
        Updater::new(origins, &config(batch_size))
    }

    #[tokio::test]
    async fn test_batches_and_freshness() {
        let origin = Arc::new(CountingOrigin::new());
        let updater = counting_updater(origin.clone(), 2);
        let leaves = vec![
            leaf("counting", "ETH/USD"),
            leaf("counting", "BTC/USD"),
            leaf("counting", "SOL/USD"),
        ];

        let summary = updater.update(&FetchContext::background(), &leaves).await;
        assert_eq!(summary.refreshed, 3);
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
        assert_eq!(origin.largest_batch.load(Ordering::SeqCst), 2);
        assert!(leaves.iter().all(|leaf| leaf.data_point().validate().is_ok()));

        // everything is fresh now
        let summary = updater.update(&FetchContext::background(), &leaves).await;
        assert_eq!(summary.skipped, 3);
        assert_eq!(origin.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_duplicate_leaves_share_one_fetch() {
        let origin = Arc::new(CountingOrigin::new());
        let updater = counting_updater(origin.clone(), 10);
        let leaves = vec![leaf("counting", "ETH/USD"), leaf("counting", "ETH/USD")];

        let summary = updater.update(&FetchContext::background(), &leaves).await;
        assert_eq!(summary.refreshed, 2);
        assert_eq!(origin.largest_batch.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_pair_unknown_origin_and_failed_fetch() {
        let mut origin = CountingOrigin::new();
        origin.missing.push(Pair::new("BTC", "USD"));
        let updater = counting_updater(Arc::new(origin), 10);
        let eth = leaf("counting", "ETH/USD");
        let btc = leaf("counting", "BTC/USD");
        let orphan = leaf("kraken", "ETH/USD");

        let summary = updater
            .update(&FetchContext::background(), &[eth.clone(), btc.clone(), orphan.clone()])
            .await;
        assert_eq!(summary, UpdateSummary { refreshed: 1, failed: 2, skipped: 0 });

        let missing = btc.data_point().error.unwrap();
        assert_eq!(missing.message, "origin counting returned no point for BTC/USD");
        assert_eq!(missing.kind, ErrorKind::Transient);
        let unknown = orphan.data_point().error.unwrap();
        assert_eq!(unknown.kind, ErrorKind::Configuration);

        let mut failing = CountingOrigin::new();
        failing.fail = true;
        let updater = counting_updater(Arc::new(failing), 10);
        let sol = leaf("counting", "SOL/USD");
        updater.update(&FetchContext::background(), &[sol.clone()]).await;
        let error = sol.data_point().error.unwrap();
        assert_eq!(error.kind, ErrorKind::Transient);
        assert!(error.message.starts_with("origin counting: "));
    }

    #[tokio::test]
    async fn test_rejected_points_count_as_failed() {
        let mut origin = CountingOrigin::new();
        origin.tick_pair = Some(Pair::new("BTC", "USD"));
        let updater = counting_updater(Arc::new(origin), 10);
        let eth = leaf("counting", "ETH/USD");

        let summary = updater.update(&FetchContext::background(), &[eth.clone()]).await;
        assert_eq!(summary, UpdateSummary { refreshed: 0, failed: 1, skipped: 0 });
        assert!(eth.data_point().error.is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_point() {
        let eth = leaf("counting", "ETH/USD");
        let stale = Utc::now() - chrono::Duration::seconds(120);
        eth.as_origin()
            .unwrap()
            .record(Point::new(Tick::new(Pair::new("ETH", "USD"), "2000".parse().unwrap()), stale))
            .unwrap();

        let mut failing = CountingOrigin::new();
        failing.fail = true;
        let updater = counting_updater(Arc::new(failing), 10);
        let summary = updater.update(&FetchContext::background(), &[eth.clone()]).await;

        assert_eq!(summary, UpdateSummary { refreshed: 0, failed: 1, skipped: 0 });
        assert_eq!(eth.data_point().tick().unwrap().price, Some("2000".parse().unwrap()));
    }
}
