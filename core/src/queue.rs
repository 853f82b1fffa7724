//! # Resolution Queue & Worker Pool
//!
//! The snapshot from discovery is loaded into a FIFO [`ResolutionQueue`]. A pool
//! of `min(queued, max_workers)` tasks drains it: each worker pops a client,
//! resolves whatever is missing, and sends the finished record down an unbounded
//! results channel. Arrival order on that channel is whatever order the workers
//! happen to finish in.
//!
//! Every worker checks the shared [`CancelFlag`] before taking the next item,
//! so after a cancel nothing new is started and anything not yet popped stays in
//! the queue where the controller can count it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use lanscope_common::{CancelFlag, LanClient, ResolvedClient};

use crate::resolver::ClientResolver;

/// Upper bound on concurrent lookups, so a large LAN does not flood the local
/// resolver with hundreds of parallel queries.
pub const MAX_WORKERS: usize = 30;

pub fn pool_size(queued: usize, max_workers: usize) -> usize {
    queued.min(max_workers)
}

#[derive(Debug)]
pub struct ResolutionQueue {
    items: Mutex<VecDeque<LanClient>>,
    done: AtomicUsize,
}

impl ResolutionQueue {
    pub fn from_snapshot(snapshot: Vec<LanClient>) -> Self {
        Self {
            items: Mutex::new(snapshot.into()),
            done: AtomicUsize::new(0),
        }
    }

    // A worker that panicked mid-pop cannot leave the deque half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<LanClient>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, client: LanClient) {
        self.lock().push_back(client);
    }

    /// Non-blocking: `None` as soon as the queue is observed empty.
    pub fn pop(&self) -> Option<LanClient> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn task_done(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of items a worker has finished with.
    pub fn completed(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Removes and returns whatever was never picked up.
    pub fn drain_remaining(&self) -> Vec<LanClient> {
        self.lock().drain(..).collect()
    }
}

/// Everything a worker needs; cloned once per worker.
#[derive(Clone)]
pub struct ResolutionContext {
    pub queue: Arc<ResolutionQueue>,
    pub results: UnboundedSender<ResolvedClient>,
    pub cancel: CancelFlag,
    pub resolver: Arc<ClientResolver>,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Spawns `min(queue.len(), max_workers)` workers onto the current runtime.
    pub fn spawn(ctx: ResolutionContext, max_workers: usize) -> Self {
        let size = pool_size(ctx.queue.len(), max_workers);
        debug!("Spawning {size} resolution worker(s)");

        let handles = (0..size)
            .map(|id| tokio::spawn(run_worker(id, ctx.clone())))
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker and returns how many items they handled in total.
    pub async fn join(self) -> usize {
        let mut handled = 0;
        for handle in self.handles {
            match handle.await {
                Ok(count) => handled += count,
                Err(e) => warn!("Resolution worker failed: {e}"),
            }
        }
        handled
    }
}

async fn run_worker(id: usize, ctx: ResolutionContext) -> usize {
    let mut handled = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            debug!("Worker {id} stopping on cancel");
            break;
        }

        let Some(client) = ctx.queue.pop() else {
            break;
        };

        let ip = client.ip;
        let resolved = ctx.resolver.resolve(client).await;
        trace!("Worker {id} resolved {resolved}");

        if ctx.results.send(resolved).is_err() {
            warn!("Results receiver dropped, worker {id} discarding {ip}");
            ctx.queue.task_done();
            break;
        }

        ctx.queue.task_done();
        handled += 1;
    }

    trace!("Worker {id} exiting after {handled} item(s)");
    handled
}
