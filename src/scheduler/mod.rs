//! Scheduler (C9): one interval loop per registered task, an overlap guard so a slow
//! run is never double-started, and cooperative cancellation checked between papers.

mod lock;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::TaskConfig;
use crate::error::{Error, Result};
use crate::history::{ListFilter, RunStatus, TaskHistoryStore, TaskRunRecord};
use crate::index::IndexClient;
use crate::orchestrator::{Orchestrator, PipelineContext, RunSummary};
use crate::store::DbPool;

pub use lock::RunLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
}

struct TaskHandle {
    config: TaskConfig,
    cancel: Arc<AtomicBool>,
    status: TaskStatus,
    #[allow(dead_code)]
    loop_handle: JoinHandle<()>,
}

/// Process-wide scheduling authority. Constructed once; registered tasks each get
/// their own background interval loop for the process lifetime.
pub struct Scheduler {
    ctx: Arc<PipelineContext>,
    index: Arc<dyn IndexClient>,
    history: Arc<TaskHistoryStore>,
    lock_pool: DbPool,
    tasks: AsyncMutex<HashMap<String, TaskHandle>>,
}

impl Scheduler {
    pub fn new(
        ctx: Arc<PipelineContext>,
        index: Arc<dyn IndexClient>,
        history: Arc<TaskHistoryStore>,
        lock_pool: DbPool,
    ) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            index,
            history,
            lock_pool,
            tasks: AsyncMutex::new(HashMap::new()),
        })
    }

    /// Register a task and start its interval loop. Re-registering an already-known
    /// `task_id` replaces its stored config and restarts the loop; an in-flight run
    /// under the old config is left to finish on its own.
    pub async fn register(self: &Arc<Self>, config: TaskConfig) -> Result<()> {
        config.validate()?;

        let task_id = config.task_id.clone();
        let interval_secs = config.interval_seconds.max(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let scheduler = Arc::clone(self);
        let loop_cancel = Arc::clone(&cancel);
        let loop_task_id = task_id.clone();
        let loop_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.tick().await; // first tick fires immediately; skip it, wait one full period
            loop {
                ticker.tick().await;
                if loop_cancel.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = scheduler.run_once(&loop_task_id).await {
                    warn!(task_id = %loop_task_id, error = %e, "scheduled run failed");
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        if let Some(old) = tasks.remove(&task_id) {
            old.cancel.store(true, Ordering::SeqCst);
            old.loop_handle.abort();
        }
        tasks.insert(
            task_id,
            TaskHandle {
                config,
                cancel,
                status: TaskStatus::Idle,
                loop_handle,
            },
        );
        Ok(())
    }

    pub async fn trigger_once(self: &Arc<Self>, task_id: &str) -> Result<RunSummary> {
        self.run_once(task_id).await
    }

    /// Request cooperative cancellation of a task's in-flight (or next) run. Returns
    /// `false` if `task_id` is not registered.
    pub async fn cancel(&self, task_id: &str) -> bool {
        let tasks = self.tasks.lock().await;
        match tasks.get(task_id) {
            Some(handle) => {
                handle.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub async fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.lock().await.get(task_id).map(|h| h.status)
    }

    pub async fn recent_runs(&self, task_id: &str, limit: usize) -> Result<Vec<TaskRunRecord>> {
        let all = self
            .history
            .list(ListFilter {
                limit: 0,
                ..Default::default()
            })
            .await?;
        Ok(all
            .into_iter()
            .filter(|r| r.task_id == task_id)
            .take(limit)
            .collect())
    }

    /// Re-run deep analysis for one already-persisted paper, bypassing index search,
    /// fetch, OCR, and relevance scoring entirely.
    pub async fn analyze_single(
        &self,
        paper_id: &str,
        model: &str,
        vision_model: &str,
    ) -> Result<String> {
        self.orchestrator().reanalyze(paper_id, model, vision_model).await
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(Arc::clone(&self.ctx))
    }

    async fn run_once(&self, task_id: &str) -> Result<RunSummary> {
        let (config, cancel) = {
            let mut tasks = self.tasks.lock().await;
            let handle = tasks.get_mut(task_id).ok_or_else(|| {
                Error::InvalidConfig(format!("no task registered with id {task_id}"))
            })?;
            if handle.status == TaskStatus::Running {
                warn!(task_id, "skipping run: previous run still in progress");
                return Ok(RunSummary::default());
            }
            handle.status = TaskStatus::Running;
            (handle.config.clone(), Arc::clone(&handle.cancel))
        };

        let run_id = uuid::Uuid::new_v4().to_string();
        let run_lock = match RunLock::acquire(&self.lock_pool, task_id, &run_id).await {
            Ok(lock) => lock,
            Err(_) => {
                warn!(task_id, "skipping run: another run is already in progress");
                self.set_status(task_id, TaskStatus::Idle).await;
                return Ok(RunSummary::default());
            }
        };

        let mut run_record = TaskRunRecord::started(task_id, &config)?;

        let outcome = self
            .index
            .search(&config.search_query, &config.search_mode, config.max_hits_per_search)
            .await;

        let result = match outcome {
            Ok(candidates) => {
                let summary = self.orchestrator().run(candidates, &config, &cancel).await;
                run_record.total_seen = summary.total_seen;
                run_record.relevant = summary.relevant;
                run_record.persisted = summary.persisted;
                run_record.deep_analyzed = summary.deep_analyzed;
                run_record.status = if cancel.load(Ordering::SeqCst) {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Completed
                };
                Ok(summary)
            }
            Err(e) => {
                run_record.status = RunStatus::Failed;
                run_record.error = Some(e.to_string());
                Err(e)
            }
        };

        run_record.ended_at = Some(chrono::Utc::now());
        run_lock.release().await?;
        self.history.append(run_record).await?;
        self.set_status(task_id, TaskStatus::Idle).await;

        result
    }

    async fn set_status(&self, task_id: &str, status: TaskStatus) {
        if let Some(handle) = self.tasks.lock().await.get_mut(task_id) {
            handle.status = status;
        }
    }
}
