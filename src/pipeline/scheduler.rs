//! Refresh scheduling and publication of the module collection.
//!
//! ## States
//!
//! ```text
//! Empty ──trigger──▶ Refreshing ──success──▶ Ready
//!   ▲                   │                      │
//!   └─────failure───────┘◀──────trigger────────┘
//! ```
//!
//! A trigger is either the periodic timer or a reader asking for data before
//! any refresh has succeeded. Concurrent triggers share one in-flight cycle.
//! Readers never wait on a refresh once a collection has been published;
//! they get the last published `Arc` while the next one is being built.
//! A failed cycle leaves both the cache and the published collection as they
//! were.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::models::{Config, Module};
use crate::pipeline::cache::{ContentCache, ContentFingerprint, InsertOutcome};
use crate::pipeline::normalize::Normalizer;
use crate::services::Extractor;

/// An immutable, published module collection, sorted by date descending.
pub type Snapshot = Arc<Vec<Module>>;

type Flight = Shared<BoxFuture<'static, Option<Snapshot>>>;

/// Coarse scheduler state, for logging and readiness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Empty,
    Refreshing,
    Ready,
}

/// Counts from one successful refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub scraped: usize,
    pub added: usize,
    pub touched: usize,
    pub evicted: usize,
    pub published: usize,
}

/// Owns the content cache and the published collection.
pub struct RefreshScheduler {
    extractor: Arc<dyn Extractor>,
    normalizer: Normalizer,
    cache: tokio::sync::Mutex<ContentCache>,
    published: RwLock<Option<Snapshot>>,
    in_flight: Mutex<Option<Flight>>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        normalizer: Normalizer,
        capacity: usize,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            extractor,
            normalizer,
            cache: tokio::sync::Mutex::new(ContentCache::new(capacity)),
            published: RwLock::new(None),
            in_flight: Mutex::new(None),
            interval,
        })
    }

    /// Build a scheduler from configuration.
    pub fn from_config(config: &Config, extractor: Arc<dyn Extractor>) -> Arc<Self> {
        Self::new(
            extractor,
            Normalizer::new(&config.normalize),
            config.refresh.cache_capacity,
            config.refresh.interval(),
        )
    }

    /// Last published collection, without triggering anything.
    pub fn current(&self) -> Option<Snapshot> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> RefreshState {
        let refreshing = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        match (refreshing, self.current().is_some()) {
            (true, _) => RefreshState::Refreshing,
            (false, true) => RefreshState::Ready,
            (false, false) => RefreshState::Empty,
        }
    }

    /// Published collection, refreshing first if nothing was ever published.
    ///
    /// Returns `None` only when no refresh has succeeded yet, including the
    /// one this call joined or started.
    pub async fn snapshot(self: &Arc<Self>) -> Option<Snapshot> {
        if let Some(snapshot) = self.current() {
            return Some(snapshot);
        }
        self.join_or_start(true).await
    }

    /// Run a refresh cycle, or join the one already in flight.
    ///
    /// Resolves to whatever is published once the cycle ends.
    pub async fn refresh(self: &Arc<Self>) -> Option<Snapshot> {
        self.join_or_start(false).await
    }

    /// Pick the flight to wait on while holding the `in_flight` lock.
    ///
    /// A cycle publishes before it clears the slot under this lock, so an
    /// empty slot here means any finished cycle's collection is visible.
    fn join_or_start(self: &Arc<Self>, reuse_published: bool) -> Flight {
        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = slot.as_ref() {
            return flight.clone();
        }
        if reuse_published {
            if let Some(snapshot) = self.current() {
                return future::ready(Some(snapshot)).boxed().shared();
            }
        }
        let flight = self.start_cycle();
        *slot = Some(flight.clone());
        flight
    }

    /// Start the periodic refresh loop. The first tick fires immediately.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                this.refresh().await;
            }
        })
    }

    /// Spawn the cycle so it completes even if every waiter goes away.
    fn start_cycle(self: &Arc<Self>) -> Flight {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            log::info!("Refresh starting");
            match this.run_cycle().await {
                Ok(stats) => log::info!(
                    "Refresh done in {:?}: {} scraped, {} new, {} seen, {} evicted, {} published",
                    started.elapsed(),
                    stats.scraped,
                    stats.added,
                    stats.touched,
                    stats.evicted,
                    stats.published
                ),
                Err(e) => log::error!("Refresh failed, keeping previous modules: {e}"),
            }

            let snapshot = this.current();
            *this
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = None;
            snapshot
        });

        // Weak: the flight is stored inside the scheduler it points back to.
        let weak = Arc::downgrade(self);
        async move {
            match handle.await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    log::error!("Refresh task aborted: {e}");
                    let Some(this) = weak.upgrade() else {
                        return None;
                    };
                    *this
                        .in_flight
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = None;
                    this.current()
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Scrape, normalize, merge into the cache, publish.
    async fn run_cycle(&self) -> Result<CycleStats> {
        let raws: Vec<_> = self.extractor.extract().try_collect().await?;
        let modules = self.normalizer.normalize_all(&raws)?;
        let fingerprints = raws
            .iter()
            .map(ContentFingerprint::of)
            .collect::<Result<Vec<_>>>()?;

        let mut stats = CycleStats {
            scraped: raws.len(),
            ..CycleStats::default()
        };

        let mut cache = self.cache.lock().await;
        for ((fingerprint, raw), module) in fingerprints.into_iter().zip(raws).zip(modules) {
            match cache.insert(fingerprint, raw, module) {
                InsertOutcome::Added => stats.added += 1,
                InsertOutcome::Touched => stats.touched += 1,
                InsertOutcome::Evicted(old) => {
                    log::debug!("Evicted {old}");
                    stats.added += 1;
                    stats.evicted += 1;
                }
            }
        }

        let mut collection = cache.modules();
        drop(cache);

        // Stable: equal dates keep observation order.
        collection.sort_by(|a, b| b.date.cmp(&a.date));
        stats.published = collection.len();
        self.publish(collection);
        Ok(stats)
    }

    fn publish(&self, modules: Vec<Module>) {
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(modules));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::join_all;
    use futures::stream::{self, StreamExt};

    use super::*;
    use crate::error::AppError;
    use crate::models::RawModule;
    use crate::services::RawStream;

    pub(crate) fn raw(name: &str, date: &str, tags: &[&str]) -> RawModule {
        RawModule {
            name: name.to_string(),
            date: date.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: format!("{name} description"),
            gif: format!("/images/{name}.gif"),
        }
    }

    pub(crate) fn scenario() -> Vec<RawModule> {
        vec![
            raw("foo", "2018 Jan 5", &["CLI "]),
            raw("bar", "2018 Jan 12", &["http"]),
        ]
    }

    /// Replays scripted passes; `None` fails the pass. The last script repeats.
    pub(crate) struct ScriptedExtractor {
        passes: Mutex<VecDeque<Option<Vec<RawModule>>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedExtractor {
        pub(crate) fn new(passes: Vec<Option<Vec<RawModule>>>) -> Self {
            Self {
                passes: Mutex::new(passes.into()),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Extractor for ScriptedExtractor {
        fn extract(&self) -> RawStream<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let pass = {
                let mut passes = self.passes.lock().unwrap();
                if passes.len() > 1 {
                    passes.pop_front().flatten()
                } else {
                    passes.front().cloned().flatten()
                }
            };
            let items: Vec<Result<RawModule>> = match pass {
                Some(raws) => raws.into_iter().map(Ok).collect(),
                None => vec![Err(AppError::extraction("scripted", "boom"))],
            };
            let delay = self.delay;
            stream::once(async move {
                tokio::time::sleep(delay).await;
                stream::iter(items)
            })
            .flatten()
            .boxed()
        }
    }

    fn scheduler(extractor: Arc<ScriptedExtractor>, capacity: usize) -> Arc<RefreshScheduler> {
        RefreshScheduler::new(
            extractor,
            Normalizer::default(),
            capacity,
            Duration::from_secs(600),
        )
    }

    fn names(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|m| m.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario())]));
        let scheduler = scheduler(Arc::clone(&extractor), 10);

        assert_eq!(scheduler.state(), RefreshState::Empty);
        assert!(scheduler.current().is_none());
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_publishes_sorted() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario())]));
        let scheduler = scheduler(extractor, 10);

        let snapshot = scheduler.refresh().await.unwrap();
        assert_eq!(names(&snapshot), vec!["bar", "foo"]);
        assert_eq!(snapshot[1].tags, vec!["cli"]);
        assert_eq!(snapshot[1].date.to_string(), "2018-01-05");
        assert_eq!(scheduler.state(), RefreshState::Ready);
    }

    #[tokio::test]
    async fn test_equal_dates_keep_scrape_order() {
        let raws = vec![
            raw("first", "2018 Jan 5", &[]),
            raw("newest", "2018 Feb 1", &[]),
            raw("second", "2018 Jan 5", &[]),
        ];
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(raws)]));
        let scheduler = scheduler(extractor, 10);

        let snapshot = scheduler.refresh().await.unwrap();
        assert_eq!(names(&snapshot), vec!["newest", "first", "second"]);
    }

    #[tokio::test]
    async fn test_concurrent_demand_is_single_flight() {
        let extractor = Arc::new(
            ScriptedExtractor::new(vec![Some(scenario())]).with_delay(Duration::from_millis(50)),
        );
        let scheduler = scheduler(Arc::clone(&extractor), 10);

        let results = join_all((0..8).map(|_| {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.snapshot().await })
        }))
        .await;

        assert_eq!(extractor.calls(), 1);
        let snapshots: Vec<Snapshot> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();
        for snapshot in &snapshots {
            assert_eq!(snapshot, &snapshots[0]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_staggered_demand_is_single_flight() {
        for _ in 0..200 {
            let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario())]));
            let scheduler = scheduler(Arc::clone(&extractor), 10);

            let callers = (0..64).map(|i| {
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    for _ in 0..(i % 40) {
                        tokio::task::yield_now().await;
                    }
                    scheduler.snapshot().await
                })
            });
            for result in join_all(callers).await {
                assert!(result.unwrap().is_some());
            }
            assert_eq!(extractor.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_snapshot_does_not_refresh_when_ready() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario())]));
        let scheduler = scheduler(Arc::clone(&extractor), 10);

        scheduler.refresh().await;
        scheduler.snapshot().await;
        scheduler.snapshot().await;
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_from_empty_stays_empty() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![None]));
        let scheduler = scheduler(extractor, 10);

        assert!(scheduler.snapshot().await.is_none());
        assert_eq!(scheduler.state(), RefreshState::Empty);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_collection() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario()), None]));
        let scheduler = scheduler(extractor, 10);

        let before = scheduler.refresh().await.unwrap();
        let after = scheduler.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(names(&after), vec!["bar", "foo"]);
    }

    #[tokio::test]
    async fn test_bad_date_aborts_whole_batch() {
        let mut broken = scenario();
        broken.push(raw("baz", "someday", &[]));
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario()), Some(broken)]));
        let scheduler = scheduler(extractor, 10);

        let before = scheduler.refresh().await.unwrap();
        let after = scheduler.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.iter().all(|m| m.name != "baz"));
    }

    #[tokio::test]
    async fn test_readers_get_old_collection_during_refresh() {
        let passes = vec![Some(scenario()), Some(vec![raw("new", "2019 Jan 1", &[])])];
        let extractor =
            Arc::new(ScriptedExtractor::new(passes).with_delay(Duration::from_millis(50)));
        let scheduler = scheduler(extractor, 10);
        let first = scheduler.refresh().await.unwrap();

        let refreshing = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(scheduler.state(), RefreshState::Refreshing);
        let during = scheduler.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &during));

        let after = refreshing.await.unwrap().unwrap();
        assert_eq!(after[0].name, "new");
    }

    #[tokio::test]
    async fn test_repeat_scrapes_do_not_duplicate() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario())]));
        let scheduler = scheduler(extractor, 10);

        scheduler.refresh().await;
        scheduler.refresh().await;
        let snapshot = scheduler.refresh().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_previously_seen_items_survive_within_capacity() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![
            Some(scenario()),
            Some(vec![raw("baz", "2018 Jan 19", &[])]),
        ]));
        let scheduler = scheduler(extractor, 10);

        scheduler.refresh().await;
        let snapshot = scheduler.refresh().await.unwrap();
        assert_eq!(names(&snapshot), vec!["baz", "bar", "foo"]);
    }

    #[tokio::test]
    async fn test_capacity_bounds_collection() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![
            Some(scenario()),
            Some(vec![raw("baz", "2018 Jan 19", &[])]),
        ]));
        let scheduler = scheduler(extractor, 2);

        scheduler.refresh().await;
        let snapshot = scheduler.refresh().await.unwrap();
        // "foo" is the least recently observed entry.
        assert_eq!(names(&snapshot), vec!["baz", "bar"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_refreshes_on_interval() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![Some(scenario())]));
        let scheduler = scheduler(Arc::clone(&extractor), 10);

        let handle = scheduler.spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(extractor.calls(), 1);
        assert!(scheduler.current().is_some());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(extractor.calls(), 2);

        handle.abort();
    }
}
