//! Bounded pool that runs webhook events off the request path.
//!
//! A fixed number of workers drain a bounded queue. The webhook handler uses
//! [`WorkerPool::try_submit`], so a delivery burst is rejected at the queue instead of
//! spawning unbounded tasks; the change poller picks up anything that was dropped.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

use super::event_processor::EventProcessor;
use crate::error::SyncError;
use crate::models::ChangeEvent;

#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<ChangeEvent>,
    capacity: usize,
}

impl WorkerPool {
    /// Spawn `workers` tasks on the current runtime.
    pub fn start(processor: Arc<EventProcessor>, workers: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        log::info!(
            "Starting {} sync worker(s) (queue capacity: {})",
            workers.max(1),
            capacity
        );

        for worker_id in 0..workers.max(1) {
            let receiver = receiver.clone();
            let processor = processor.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the receiver only while waiting, never while processing.
                    let next = receiver.lock().await.recv().await;
                    let Some(event) = next else {
                        log::info!("Sync worker {} stopping: queue closed", worker_id);
                        break;
                    };
                    // Outcome and errors are logged by the processor.
                    let _ = processor.handle(event).await;
                }
            });
        }

        Self { sender, capacity }
    }

    /// Queue without waiting. A full queue is reported as `Transient`.
    pub fn try_submit(&self, event: ChangeEvent) -> Result<(), SyncError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => SyncError::Transient(format!(
                "worker queue full ({} queued), dropping {}",
                self.capacity, event.resource
            )),
            mpsc::error::TrySendError::Closed(event) => {
                SyncError::Transient(format!("worker pool stopped, dropping {}", event.resource))
            }
        })
    }

    pub fn queued(&self) -> usize {
        self.capacity - self.sender.capacity()
    }
}
