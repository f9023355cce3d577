use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::remote::RemoteEntries;
use crate::worker::{SyncHandle, SyncJob};

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Shared online/offline flag. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct OnlineFlag(Arc<AtomicBool>);

impl OnlineFlag {
    pub fn new(online: bool) -> Self {
        OnlineFlag(Arc::new(AtomicBool::new(online)))
    }

    /// Returns the previous value.
    pub fn set(&self, online: bool) -> bool {
        self.0.swap(online, Ordering::SeqCst)
    }
}

impl Connectivity for OnlineFlag {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Poll the remote's health check every `interval`, keep `flag` current,
/// and queue a full sync whenever connectivity comes back.
pub fn spawn_monitor(
    remote: Arc<dyn RemoteEntries>,
    flag: OnlineFlag,
    sync: SyncHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let online = remote.probe().await;
            let was_online = flag.set(online);
            if online && !was_online {
                tracing::info!("Connectivity restored, scheduling sync");
                sync.enqueue(SyncJob::All);
            } else if !online && was_online {
                tracing::info!("Remote unreachable, working offline");
            }
            if sync.is_closed() {
                tracing::debug!("Sync worker gone, stopping connectivity monitor");
                break;
            }
        }
    })
}
