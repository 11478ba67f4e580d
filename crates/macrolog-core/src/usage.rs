//! Quota and usage bookkeeping off the request path
//!
//! The router enqueues quota increments and usage log entries with a
//! non-blocking `try_send`. A background worker drains the bounded queue into
//! a [`UsageSink`]. A full queue drops the event; sink errors are logged.
//! Both are counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::UsageLogEntry;
use crate::store::UsageSink;

enum UsageEvent {
    QuotaIncrement { config_id: i64, tokens: u64 },
    Usage(Box<UsageLogEntry>),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time view of the queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageCounters {
    pub enqueued: u64,
    pub dropped: u64,
    pub processed: u64,
    pub failed: u64,
}

/// Producer side of the usage queue
#[derive(Clone)]
pub struct UsageRecorder {
    tx: mpsc::Sender<UsageEvent>,
    counters: Arc<Counters>,
}

/// Consumer side; run it with [`UsageWorker::spawn`]
pub struct UsageWorker {
    rx: mpsc::Receiver<UsageEvent>,
    counters: Arc<Counters>,
}

impl UsageRecorder {
    /// Create a queue holding at most `capacity` pending events
    pub fn new(capacity: usize) -> (Self, UsageWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        (
            Self {
                tx,
                counters: counters.clone(),
            },
            UsageWorker { rx, counters },
        )
    }

    /// Enqueue a quota increment for a provider config
    pub fn record_quota(&self, config_id: i64, tokens: u64) {
        self.enqueue(UsageEvent::QuotaIncrement { config_id, tokens });
    }

    /// Enqueue a usage log entry
    pub fn record_usage(&self, entry: UsageLogEntry) {
        self.enqueue(UsageEvent::Usage(Box::new(entry)));
    }

    fn enqueue(&self, event: UsageEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Usage queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Usage worker stopped, dropping event");
            }
        }
    }

    /// Wait until every event enqueued before this call has been handled
    ///
    /// Returns immediately when the worker is gone.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(UsageEvent::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    pub fn counters(&self) -> UsageCounters {
        UsageCounters {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl UsageWorker {
    /// Run the worker as a background task
    ///
    /// The task ends once every `UsageRecorder` clone is dropped and the
    /// queue is drained.
    pub fn spawn(self, sink: Arc<dyn UsageSink>) -> JoinHandle<()> {
        tokio::spawn(self.run(sink))
    }

    pub async fn run(mut self, sink: Arc<dyn UsageSink>) {
        while let Some(event) = self.rx.recv().await {
            let result = match event {
                UsageEvent::QuotaIncrement { config_id, tokens } => {
                    sink.increment_quota(config_id, tokens).await
                }
                UsageEvent::Usage(entry) => sink.append_usage_log(&entry).await,
                UsageEvent::Flush(ack) => {
                    let _ = ack.send(());
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    self.counters.processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Failed to write usage event: {}", e);
                }
            }
        }
        debug!("Usage worker stopped");
    }
}
