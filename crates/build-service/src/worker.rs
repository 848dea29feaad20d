//! Build worker - runs accepted builds through the pipeline

use crate::models::{BuildOutcome, BuildRequest, BuildStatus, BuildStatusRecord};
use crate::notifier::EvaluationClient;
use crate::publisher::Publisher;
use crate::storage::StatusStore;
use anyhow::Result;
use app_generator::AppGenerator;
use autobuild_common::Error;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Reason recorded for builds stopped by shutdown
const SHUTDOWN_REASON: &str = "service shutting down";

/// Build worker configuration
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Number of concurrent workers
    pub num_workers: usize,

    /// Accepted builds that may wait for a free worker
    pub queue_capacity: usize,
}

/// One accepted submission
#[derive(Debug)]
pub struct BuildJob {
    pub build_id: String,
    pub request: BuildRequest,
}

/// Runs a single build from generation to evaluator notification
pub struct Pipeline {
    generator: Arc<dyn AppGenerator>,
    publisher: Publisher,
    notifier: EvaluationClient,
    store: Arc<StatusStore>,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn AppGenerator>,
        publisher: Publisher,
        notifier: EvaluationClient,
        store: Arc<StatusStore>,
    ) -> Self {
        Self {
            generator,
            publisher,
            notifier,
            store,
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Run the build and record its terminal status.
    ///
    /// A job whose record was replaced while it waited in the queue is skipped.
    pub async fn run(&self, job: &BuildJob, shutdown: &CancellationToken) {
        let task = &job.request.task;
        if !self.store.is_current(task, &job.build_id).await {
            info!(
                "Skipping build {} for task {}: superseded while queued",
                job.build_id, task
            );
            return;
        }

        info!("Starting build process for task: {} build: {}", task, job.build_id);

        match self.execute(job, shutdown).await {
            Ok(outcome) => {
                info!("Build completed successfully for task: {}", task);
                info!("Repo: {}", outcome.repo_url);
                info!("Pages: {}", outcome.pages_url);
                self.store
                    .update(task, &job.build_id, |r| r.mark_completed(outcome))
                    .await;
            }
            Err(e) => {
                error!("Build failed for task {}: {:#}", task, e);
                self.fail(job, e.to_string()).await;
            }
        }
    }

    /// Record a terminal failure for a job
    pub async fn fail(&self, job: &BuildJob, error: String) {
        self.store
            .update(&job.request.task, &job.build_id, |r| r.mark_failed(error))
            .await;
    }

    async fn execute(&self, job: &BuildJob, shutdown: &CancellationToken) -> Result<BuildOutcome> {
        let request = &job.request;

        self.enter(job, BuildStatus::GeneratingCode, shutdown).await?;
        info!("Generating application code...");
        let app = self
            .generator
            .generate(&request.brief, &request.attachments, &request.checks)?;

        self.enter(job, BuildStatus::CreatingRepo, shutdown).await?;
        info!("Creating GitHub repository...");
        let published = self
            .publisher
            .create_repository(&request.task, &request.brief)
            .await?;

        self.enter(job, BuildStatus::CommittingFiles, shutdown).await?;
        info!("Committing {} files to repository...", app.file_count());
        let report = self.publisher.commit_files(&published, &app.files).await;
        if !report.is_complete() {
            warn!(
                "{} of {} files were not committed for task: {}",
                report.failed.len(),
                app.file_count(),
                request.task
            );
        }

        self.enter(job, BuildStatus::EnablingPages, shutdown).await?;
        let pages_url = self.publisher.pages_url(&published.repository);

        let commit_sha = report
            .last_commit_sha
            .clone()
            .unwrap_or_else(|| published.license_sha.clone());

        self.enter(job, BuildStatus::NotifyingEvaluation, shutdown)
            .await?;
        let payload = request.evaluation_payload(
            &published.repository.html_url,
            &commit_sha,
            &pages_url,
        );
        let evaluation_notified = self.notifier.notify(&request.evaluation_url, &payload).await;

        Ok(BuildOutcome {
            repo_url: published.repository.html_url,
            pages_url,
            commit_sha,
            explanation: app.explanation,
            failed_files: report.failed,
            evaluation_notified,
        })
    }

    /// Move the record to the next phase, unless shutdown has been requested
    async fn enter(
        &self,
        job: &BuildJob,
        status: BuildStatus,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        if shutdown.is_cancelled() {
            return Err(Error::Cancelled(SHUTDOWN_REASON.to_string()).into());
        }

        let owned = self
            .store
            .update(&job.request.task, &job.build_id, |r| r.advance(status))
            .await;
        if !owned {
            warn!(
                "Record for task {} now belongs to a newer build; {} continues unrecorded",
                job.request.task, job.build_id
            );
        }

        Ok(())
    }
}

/// Hands accepted requests to the worker pool
#[derive(Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<BuildJob>,
    store: Arc<StatusStore>,
}

impl Dispatcher {
    /// Queue a build, creating its status record.
    ///
    /// Fails without touching the store when the queue is full or closed.
    pub async fn submit(&self, request: BuildRequest) -> autobuild_common::Result<String> {
        let permit = self.sender.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(()) => Error::Cancelled(SHUTDOWN_REASON.to_string()),
        })?;

        let build_id = Uuid::new_v4().to_string();
        let record = BuildStatusRecord::new(request.task.clone(), request.round, build_id.clone());
        self.store.insert(record).await;

        info!(
            "Build queued: {} for task: {} round: {}",
            build_id, request.task, request.round
        );
        permit.send(BuildJob {
            build_id: build_id.clone(),
            request,
        });

        Ok(build_id)
    }
}

/// Fixed set of workers draining a bounded queue
pub struct WorkerPool {
    dispatcher: Dispatcher,
    receiver: Arc<Mutex<mpsc::Receiver<BuildJob>>>,
    pipeline: Arc<Pipeline>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the workers
    pub fn start(config: WorkerConfig, pipeline: Arc<Pipeline>) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();

        let handles = (0..config.num_workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    receiver.clone(),
                    pipeline.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        info!("Started {} build workers", config.num_workers.max(1));

        Self {
            dispatcher: Dispatcher {
                sender,
                store: pipeline.store().clone(),
            },
            receiver,
            pipeline,
            shutdown,
            handles,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Signal workers to stop after their current phase
    pub fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Stop accepting work, wait for workers, and fail builds still queued
    pub async fn shutdown(self) {
        info!("Shutting down build workers...");
        self.cancel();

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Build worker panicked: {}", e);
            }
        }

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        while let Ok(job) = receiver.try_recv() {
            warn!("Dropping queued build for task: {}", job.request.task);
            self.pipeline
                .fail(&job, Error::Cancelled(SHUTDOWN_REASON.to_string()).to_string())
                .await;
        }

        info!("Build workers stopped");
    }
}

async fn worker_loop(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<BuildJob>>>,
    pipeline: Arc<Pipeline>,
    shutdown: CancellationToken,
) {
    info!("Build worker {} started, waiting for jobs...", id);

    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = async { receiver.lock().await.recv().await } => job,
        };

        match job {
            Some(job) => pipeline.run(&job, &shutdown).await,
            None => break,
        }
    }

    info!("Build worker {} stopped", id);
}
