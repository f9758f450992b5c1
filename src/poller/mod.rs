//! StatusPoller - recurring `/status` fetch
//!
//! - One fetch immediately on start, then one per interval
//! - Failures are logged and swallowed; the last good snapshot stays published
//! - `PollerHandle::stop` (or dropping the handle) ends publishing for good

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::device::{DeviceApi, DeviceStatus};

pub type StatusReceiver = watch::Receiver<Option<DeviceStatus>>;

/// Where a fetch was triggered from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOrigin {
    Scheduled,
    Manual,
}

struct PollerShared {
    api: Arc<dyn DeviceApi>,
    publisher: Mutex<Option<watch::Sender<Option<DeviceStatus>>>>,
    refreshing: AtomicBool,
}

impl PollerShared {
    async fn fetch_and_publish(&self, origin: FetchOrigin) -> bool {
        match self.api.status().await {
            Ok(status) => self.publish(status, origin),
            Err(err) => {
                tracing::warn!(
                    origin = ?origin,
                    error = %err,
                    "status poll failed; keeping last snapshot"
                );
                false
            }
        }
    }

    fn publish(&self, status: DeviceStatus, origin: FetchOrigin) -> bool {
        let guard = match self.publisher.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = guard.as_ref() else {
            tracing::debug!(origin = ?origin, "poller stopped; dropping status");
            return false;
        };
        tracing::debug!(origin = ?origin, ?status, "publishing device status");
        sender.send_replace(Some(status));
        true
    }

    fn publisher_closed(&self) -> bool {
        match self.publisher.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    fn close(&self) -> bool {
        let mut guard = match self.publisher.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take().is_some()
    }
}

struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct StatusPoller {
    api: Arc<dyn DeviceApi>,
    period: Duration,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn DeviceApi>, period: Duration) -> Self {
        Self { api, period }
    }

    /// Spawns the polling task on the current tokio runtime.
    pub fn start(self) -> PollerHandle {
        let (sender, receiver) = watch::channel(None);
        let shared = Arc::new(PollerShared {
            api: self.api,
            publisher: Mutex::new(Some(sender)),
            refreshing: AtomicBool::new(false),
        });

        let task_shared = Arc::clone(&shared);
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if task_shared.publisher_closed() {
                    break;
                }
                task_shared
                    .fetch_and_publish(FetchOrigin::Scheduled)
                    .await;
            }
            tracing::debug!("status poller task finished");
        });

        tracing::info!(interval_ms = period.as_millis() as u64, "status poller started");
        PollerHandle {
            shared,
            receiver,
            task: Some(task),
        }
    }
}

/// Owner of a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    shared: Arc<PollerShared>,
    receiver: StatusReceiver,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> StatusReceiver {
        self.receiver.clone()
    }

    /// Most recent successfully fetched snapshot.
    pub fn latest(&self) -> Option<DeviceStatus> {
        self.receiver.borrow().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.shared.refreshing.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.shared.publisher_closed()
    }

    /// Fetches outside the schedule. Returns whether a snapshot was published;
    /// a refresh requested while another is in flight, or after `stop`, is skipped.
    pub async fn refresh(&self) -> bool {
        if self.shared.publisher_closed() {
            tracing::debug!("manual refresh ignored; poller stopped");
            return false;
        }
        if self
            .shared
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("manual refresh already in flight");
            return false;
        }
        // Cleared on drop so a cancelled refresh does not wedge the flag.
        let _in_flight = RefreshGuard(&self.shared.refreshing);
        self.shared.fetch_and_publish(FetchOrigin::Manual).await
    }

    /// Stops the schedule. No snapshot is published after this returns.
    pub fn stop(&mut self) {
        let was_running = self.shared.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if was_running {
            tracing::info!("status poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
