// ── Snapshot subscriptions ──
//
// Consumers hold a `SnapshotStream` to read the latest published snapshot
// and to be woken when the next one lands.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::FetchSnapshot;

/// A subscription to published fetch snapshots.
pub struct SnapshotStream {
    current: Arc<FetchSnapshot>,
    receiver: watch::Receiver<Arc<FetchSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<FetchSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time or at the last `changed()`.
    pub fn current(&self) -> &Arc<FetchSnapshot> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<FetchSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish. `None` once the screener is dropped.
    pub async fn changed(&mut self) -> Option<Arc<FetchSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of snapshots, starting with the current one.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<FetchSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<FetchSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn stream_yields_current_then_updates() {
        let (tx, rx) = watch::channel(Arc::new(FetchSnapshot::default()));
        let mut stream = SnapshotStream::new(rx).into_stream();

        let first = stream.next().await;
        assert_eq!(first.map(|s| s.total_count), Some(0));

        tx.send_replace(Arc::new(FetchSnapshot {
            total_count: 40,
            ..FetchSnapshot::default()
        }));
        let second = stream.next().await;
        assert_eq!(second.map(|s| s.total_count), Some(40));
    }

    #[tokio::test]
    async fn changed_tracks_latest() {
        let (tx, rx) = watch::channel(Arc::new(FetchSnapshot::default()));
        let mut sub = SnapshotStream::new(rx);

        tx.send_replace(Arc::new(FetchSnapshot {
            page: 2,
            ..FetchSnapshot::default()
        }));
        let snap = sub.changed().await;
        assert_eq!(snap.map(|s| s.page), Some(2));
        assert_eq!(sub.current().page, 2);

        drop(tx);
        assert!(sub.changed().await.is_none());
    }
}
