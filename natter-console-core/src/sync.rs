//! Fixed-interval polling with at most one task per concern.
//!
//! There is no backoff: a failed refresh is the callback's business and the
//! next tick runs on schedule. Replacing a task aborts the old one first;
//! requests already in flight are not cancelled.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Polling periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub list: Duration,
    pub detail: Duration,
    pub runtime: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(10),
            detail: Duration::from_secs(5),
            runtime: Duration::from_secs(1),
        }
    }
}

/// The service whose details are on screen, shared with polling tasks.
#[derive(Debug, Clone)]
pub struct CurrentService {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for CurrentService {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentService {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn set(&self, id: impl Into<String>) {
        self.tx.send_replace(Some(id.into()));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn is(&self, id: &str) -> bool {
        self.tx.borrow().as_deref() == Some(id)
    }
}

struct DetailTask {
    service_id: String,
    handle: JoinHandle<()>,
}

/// Owner of the list-refresh, detail-refresh and runtime-tick tasks.
#[derive(Default)]
pub struct PollingSynchronizer {
    list: Option<JoinHandle<()>>,
    detail: Option<DetailTask>,
    runtime: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PollingSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSynchronizer")
            .field("list", &is_live(self.list.as_ref()))
            .field(
                "detail",
                &self.detail.as_ref().map(|d| d.service_id.as_str()),
            )
            .field("runtime", &is_live(self.runtime.as_ref()))
            .finish()
    }
}

fn is_live(handle: Option<&JoinHandle<()>>) -> bool {
    handle.map(|h| !h.is_finished()).unwrap_or(false)
}

impl PollingSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the page-lifetime list refresh. Returns `false` if it already runs.
    ///
    /// The first tick fires immediately.
    pub fn start_list_refresh<F>(&mut self, period: Duration, mut refresh: F) -> bool
    where
        F: FnMut() -> BoxFuture<'static, ()> + Send + 'static,
    {
        if is_live(self.list.as_ref()) {
            return false;
        }
        self.list = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                refresh().await;
            }
        }));
        true
    }

    /// Poll details for `service_id` while it stays the current service.
    ///
    /// Any previous detail task is aborted first. The first tick fires after
    /// one period; callers load details once themselves on entry.
    pub fn start_detail_refresh<F>(
        &mut self,
        service_id: String,
        current: CurrentService,
        period: Duration,
        mut refresh: F,
    ) where
        F: FnMut(String) -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.stop_detail_refresh();
        let id = service_id.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !current.is(&id) {
                    debug!("detail refresh for {} stopped: no longer current", id);
                    break;
                }
                refresh(id.clone()).await;
            }
        });
        self.detail = Some(DetailTask { service_id, handle });
    }

    pub fn stop_detail_refresh(&mut self) {
        if let Some(task) = self.detail.take() {
            debug!("clearing detail refresh for {}", task.service_id);
            task.handle.abort();
        }
    }

    /// Recompute elapsed time every `period`, independent of the network.
    pub fn start_runtime_tick<F>(&mut self, period: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop_runtime_tick();
        self.runtime = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tick();
            }
        }));
    }

    pub fn stop_runtime_tick(&mut self) {
        if let Some(handle) = self.runtime.take() {
            handle.abort();
        }
    }

    /// Clear everything tied to the details view.
    pub fn leave_details(&mut self) {
        self.stop_detail_refresh();
        self.stop_runtime_tick();
    }

    pub fn detail_service(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .filter(|d| !d.handle.is_finished())
            .map(|d| d.service_id.as_str())
    }

    /// Detail-refresh tasks still alive. Never more than one.
    pub fn active_detail_timers(&self) -> usize {
        self.detail
            .as_ref()
            .filter(|d| !d.handle.is_finished())
            .map(|_| 1)
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn list_refresh_active(&self) -> bool {
        is_live(self.list.as_ref())
    }

    pub fn runtime_tick_active(&self) -> bool {
        is_live(self.runtime.as_ref())
    }

    /// Abort every task; used when the console exits.
    pub fn shutdown(&mut self) {
        self.leave_details();
        if let Some(handle) = self.list.take() {
            handle.abort();
        }
    }
}

impl Drop for PollingSynchronizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn counting(counter: Arc<AtomicUsize>) -> impl FnMut(String) -> BoxFuture<'static, ()> {
        move |_id| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entering_details_twice_keeps_one_timer() {
        let current = CurrentService::new();
        let mut sync = PollingSynchronizer::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let period = Duration::from_secs(5);

        current.set("a");
        sync.start_detail_refresh("a".into(), current.clone(), period, counting(first.clone()));
        current.set("b");
        sync.start_detail_refresh("b".into(), current.clone(), period, counting(second.clone()));

        assert_eq!(sync.active_detail_timers(), 1);
        assert_eq!(sync.detail_service(), Some("b"));

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn detail_refresh_stops_when_current_cleared() {
        let current = CurrentService::new();
        let mut sync = PollingSynchronizer::new();
        let hits = Arc::new(AtomicUsize::new(0));

        current.set("a");
        sync.start_detail_refresh(
            "a".into(),
            current.clone(),
            Duration::from_secs(5),
            counting(hits.clone()),
        );
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        current.clear();
        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(sync.active_detail_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn list_refresh_starts_once_and_keeps_running() {
        let mut sync = PollingSynchronizer::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let started = sync.start_list_refresh(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}.boxed()
        });
        assert!(started);
        assert!(!sync.start_list_refresh(Duration::from_secs(10), || async {}.boxed()));

        tokio::time::sleep(Duration::from_secs(25)).await;
        // Immediate tick plus ticks at 10s and 20s.
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        sync.leave_details();
        assert!(sync.list_refresh_active());
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_tick_is_replaced_not_duplicated() {
        let mut sync = PollingSynchronizer::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = log.clone();
        sync.start_runtime_tick(Duration::from_secs(1), move || {
            first.lock().unwrap().push("a")
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let second = log.clone();
        sync.start_runtime_tick(Duration::from_secs(1), move || {
            second.lock().unwrap().push("b")
        });
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let seen = log.lock().unwrap().clone();
        assert_eq!(seen, vec!["a", "a", "b", "b", "b"]);

        sync.leave_details();
        tokio::task::yield_now().await;
        assert!(!sync.runtime_tick_active());
    }
}
