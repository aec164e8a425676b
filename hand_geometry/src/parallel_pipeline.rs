// THEORY:
// The `ParallelPipeline` runs independent frames on a pool of worker tasks. Frames
// share nothing, so unlike a tracking pipeline there is no temporal state to thread
// from one frame to the next and no reordering buffer: each caller simply awaits
// the reply for the frame it submitted.
//
// A single dispatcher task hands frames to the workers round-robin over unbounded
// channels; every frame carries its own oneshot sender for the reply.

use crate::config::PipelineConfig;
use crate::core_modules::raster::RasterBuffer;
use crate::error::{GeometryError, Result};
use crate::pipeline::{HandGeometry, HandPipeline};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// The result for one submitted frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Sequence number assigned at submission, starting at 0.
    pub frame_id: u64,
    pub geometry: HandGeometry,
    /// Wall time spent by the worker on this frame.
    pub elapsed: Duration,
}

struct FrameTask {
    frame_id: u64,
    raster: RasterBuffer,
    result_sender: oneshot::Sender<Result<FrameAnalysis>>,
}

/// A fixed set of workers, each running its own `HandPipeline`.
pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<FrameTask>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns the dispatcher and `worker_count` workers. Must be called inside a
    /// tokio runtime.
    pub fn new(pipeline: HandPipeline, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<FrameTask>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task
                        .result_sender
                        .send(Err(GeometryError::Worker(format!("worker {worker_idx} has stopped"))));
                }
                worker_idx = (worker_idx + 1) % worker_count;
            }
        });

        let pipeline = Arc::new(pipeline);
        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(index, mut worker_receiver)| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    while let Some(task) = worker_receiver.recv().await {
                        let started = Instant::now();
                        let result = pipeline.process_frame(&task.raster).await.map(|geometry| FrameAnalysis {
                            frame_id: task.frame_id,
                            geometry,
                            elapsed: started.elapsed(),
                        });
                        debug!("WorkerPool: worker {} finished frame {}", index, task.frame_id);
                        let _ = task.result_sender.send(result);
                    }
                })
            })
            .collect();

        Self {
            task_sender,
            dispatcher,
            workers,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    async fn submit(&self, frame_id: u64, raster: RasterBuffer) -> Result<FrameAnalysis> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(FrameTask {
                frame_id,
                raster,
                result_sender,
            })
            .map_err(|_| GeometryError::Worker("failed to send frame to worker pool".into()))?;

        result_receiver
            .await
            .map_err(|_| GeometryError::Worker("failed to receive result from worker".into()))?
    }

    /// Closes the queue and waits for every worker to drain.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.task_sender);
        self.dispatcher.await?;
        for worker in self.workers {
            worker.await?;
        }
        Ok(())
    }
}

/// Processes independent frames concurrently.
pub struct ParallelPipeline {
    worker_pool: WorkerPool,
    frame_counter: AtomicU64,
}

impl ParallelPipeline {
    /// Builds the pool with `config.effective_worker_count()` workers. Must be
    /// called inside a tokio runtime.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let worker_count = config.effective_worker_count();
        let pipeline = HandPipeline::new(config)?;
        debug!("ParallelPipeline: starting {} workers", worker_count);
        Ok(Self {
            worker_pool: WorkerPool::new(pipeline, worker_count),
            frame_counter: AtomicU64::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.worker_count()
    }

    pub async fn process_frame(&self, raster: RasterBuffer) -> Result<FrameAnalysis> {
        let frame_id = self.frame_counter.fetch_add(1, Ordering::Relaxed);
        self.worker_pool.submit(frame_id, raster).await
    }

    pub async fn shutdown(self) -> Result<()> {
        self.worker_pool.shutdown().await
    }
}
