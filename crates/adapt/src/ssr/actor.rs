// crates/adapt/src/ssr/actor.rs

use super::context::{RenderJob, RenderOutput};
use super::error::SsrError;
use super::runtime::RenderRuntime;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Commands handled by the render workers.
enum RenderCommand {
    Render {
        job: RenderJob,
        /// Fired when a worker picks the job up; the timeout starts then.
        started: oneshot::Sender<()>,
        reply: oneshot::Sender<Result<RenderOutput, SsrError>>,
        /// Claimed by whichever side finishes first: the worker with a
        /// result, or the caller giving up.
        settled: Arc<AtomicBool>,
    },

    /// Stop one worker; it passes the command on to the next.
    Shutdown,
}

struct Pool {
    runtime: Arc<RenderRuntime>,
    tx: mpsc::UnboundedSender<RenderCommand>,
    rx: Mutex<mpsc::UnboundedReceiver<RenderCommand>>,
    timeout: Duration,
    stopping: AtomicBool,
    spawned: AtomicUsize,
}

/// Client handle for the render workers.
///
/// JS engines are not `Send`, so every render happens on a dedicated OS
/// thread that builds its own engine. HTTP handlers on any tokio worker talk
/// to the pool through this handle.
#[derive(Clone)]
pub struct RenderClient {
    pool: Arc<Pool>,
}

impl RenderClient {
    /// Spawn `workers` render threads sharing `runtime`.
    pub fn spawn(
        runtime: RenderRuntime,
        workers: usize,
        timeout: Duration,
    ) -> Result<Self, SsrError> {
        let (tx, rx) = mpsc::unbounded_channel::<RenderCommand>();
        let pool = Arc::new(Pool {
            runtime: Arc::new(runtime),
            tx,
            rx: Mutex::new(rx),
            timeout,
            stopping: AtomicBool::new(false),
            spawned: AtomicUsize::new(0),
        });

        for _ in 0..workers.max(1) {
            spawn_worker(&pool)?;
        }
        tracing::debug!(workers = workers.max(1), ?timeout, "render workers started");

        Ok(Self { pool })
    }

    /// Render a page; fails with `Timeout` when the render runs longer than
    /// the configured timeout. Time spent queued does not count.
    ///
    /// A worker stuck in a synchronous script past the timeout is replaced;
    /// it retires once the script returns.
    pub async fn render(&self, job: RenderJob) -> Result<RenderOutput, SsrError> {
        if self.pool.stopping.load(Ordering::Acquire) {
            return Err(channel_error("render workers stopped"));
        }

        let (started_tx, started_rx) = oneshot::channel();
        let (reply_tx, mut reply_rx) = oneshot::channel();
        let settled = Arc::new(AtomicBool::new(false));

        self.pool
            .tx
            .send(RenderCommand::Render {
                job,
                started: started_tx,
                reply: reply_tx,
                settled: Arc::clone(&settled),
            })
            .map_err(|_| channel_error("render workers terminated before render"))?;

        if started_rx.await.is_err() {
            // Refused without starting; the reply says why.
            return reply_rx
                .await
                .map_err(|_| channel_error("render worker dropped the job"))?;
        }

        match tokio::time::timeout(self.pool.timeout, &mut reply_rx).await {
            Ok(reply) => reply.map_err(|_| channel_error("render worker dropped render reply"))?,
            Err(_) if settled.swap(true, Ordering::AcqRel) => {
                // The worker finished right at the deadline.
                reply_rx
                    .await
                    .map_err(|_| channel_error("render worker dropped render reply"))?
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.pool.timeout, "render timed out, replacing its worker");
                if let Err(e) = spawn_worker(&self.pool) {
                    tracing::error!(error = %e, "failed to replace render worker");
                }
                Err(SsrError::Timeout(self.pool.timeout))
            }
        }
    }

    /// Fire-and-forget shutdown signal.
    pub fn stop(&self) {
        self.pool.stopping.store(true, Ordering::Release);
        let _ = self.pool.tx.send(RenderCommand::Shutdown);
    }
}

fn channel_error(msg: &str) -> SsrError {
    SsrError::Channel(msg.to_string())
}

fn spawn_worker(pool: &Arc<Pool>) -> Result<(), SsrError> {
    let id = pool.spawned.fetch_add(1, Ordering::Relaxed);
    let pool = Arc::clone(pool);

    thread::Builder::new()
        .name(format!("ssr-render-{id}"))
        .spawn(move || render_worker_loop(pool, id))
        .map(|_| ())
        .map_err(|e| channel_error(&format!("failed to spawn render thread: {e}")))
}

fn render_worker_loop(pool: Arc<Pool>, id: usize) {
    loop {
        let next = {
            let mut rx = match pool.rx.lock() {
                Ok(rx) => rx,
                Err(poisoned) => poisoned.into_inner(),
            };
            rx.blocking_recv()
        };

        let Some(cmd) = next else {
            break;
        };

        match cmd {
            RenderCommand::Render {
                job,
                started,
                reply,
                settled,
            } => {
                if pool.stopping.load(Ordering::Acquire) {
                    let _ = reply.send(Err(channel_error("render workers stopped")));
                    continue;
                }
                // Caller already gave up (disconnect).
                if started.send(()).is_err() || reply.is_closed() {
                    continue;
                }

                let res = panic::catch_unwind(AssertUnwindSafe(|| {
                    pool.runtime.render_within(&job, pool.timeout)
                }))
                .unwrap_or_else(|payload| Err(SsrError::Panicked(panic_message(&*payload))));

                if settled.swap(true, Ordering::AcqRel) {
                    // The caller timed out and a replacement took this slot.
                    tracing::debug!(worker = id, "retiring replaced render worker");
                    return;
                }
                let _ = reply.send(res);
            }

            RenderCommand::Shutdown => {
                let _ = pool.tx.send(RenderCommand::Shutdown);
                break;
            }
        }
    }
    tracing::debug!(worker = id, "render worker stopped");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
