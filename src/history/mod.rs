//! Task History Store (C10): append-only journal sharded by calendar month.

pub mod presets;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::TaskConfig;
use crate::config_version;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunRecord {
    pub task_id: String,
    pub config: serde_json::Value,
    pub total_seen: usize,
    pub relevant: usize,
    pub persisted: usize,
    pub deep_analyzed: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub error: Option<String>,
}

impl TaskRunRecord {
    pub fn started(task_id: &str, config: &TaskConfig) -> Result<Self> {
        Ok(Self {
            task_id: task_id.to_string(),
            config: serde_json::to_value(config)?,
            total_seen: 0,
            relevant: 0,
            persisted: 0,
            deep_analyzed: 0,
            started_at: Utc::now(),
            ended_at: None,
            status: RunStatus::Running,
            error: None,
        })
    }
}

/// Filter parameters for `list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub limit: usize,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<RunStatus>,
}

/// File-backed journal, one JSON array per calendar month, grounded on the
/// original's `{year}_{month:02}_tasks.json` shard key. Writes are serialized behind
/// a single mutex since the write rate is low.
pub struct TaskHistoryStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl TaskHistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn shard_path_for(&self, when: DateTime<Utc>) -> PathBuf {
        self.root
            .join(format!("{:04}_{:02}_tasks.json", when.year(), when.month()))
    }

    async fn read_shard(path: &Path) -> Result<Vec<TaskRunRecord>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_shard(path: &Path, records: &[TaskRunRecord]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(records)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    /// Append (or replace, by `task_id`, within the shard for `record.started_at`) a
    /// run record, matching the original's dedupe-on-append behavior.
    pub async fn append(&self, record: TaskRunRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.shard_path_for(record.started_at);
        let mut records = Self::read_shard(&path).await?;
        records.retain(|r| r.task_id != record.task_id);
        records.push(record);
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Self::write_shard(&path, &records).await
    }

    async fn all_shard_paths_newest_first(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(paths),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with("_tasks.json") {
                paths.push(entry.path());
            }
        }
        paths.sort_by(|a, b| b.cmp(a));
        Ok(paths)
    }

    pub async fn list(&self, filter: ListFilter) -> Result<Vec<TaskRunRecord>> {
        let mut out = Vec::new();
        for path in self.all_shard_paths_newest_first().await? {
            if filter.limit != 0 && out.len() >= filter.limit {
                break;
            }
            let shard = Self::read_shard(&path).await?;
            for record in shard {
                if filter.limit != 0 && out.len() >= filter.limit {
                    break;
                }
                if let Some(start) = filter.start_date {
                    if record.started_at < start {
                        continue;
                    }
                }
                if let Some(end) = filter.end_date {
                    if record.started_at > end {
                        continue;
                    }
                }
                if let Some(status) = filter.status {
                    if record.status != status {
                        continue;
                    }
                }
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Load the most recent stored config for `task_id`, upgraded to the current
    /// schema.
    pub async fn get_config(&self, task_id: &str) -> Result<Option<TaskConfig>> {
        for path in self.all_shard_paths_newest_first().await? {
            let shard = Self::read_shard(&path).await?;
            if let Some(record) = shard.into_iter().find(|r| r.task_id == task_id) {
                return Ok(Some(config_version::upgrade(record.config)?));
            }
        }
        Ok(None)
    }

    pub async fn update_config(&self, task_id: &str, new_config: &TaskConfig) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        for path in self.all_shard_paths_newest_first().await? {
            let mut shard = Self::read_shard(&path).await?;
            let mut touched = false;
            for record in shard.iter_mut() {
                if record.task_id == task_id {
                    record.config = serde_json::to_value(new_config)?;
                    touched = true;
                }
            }
            if touched {
                Self::write_shard(&path, &shard).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn delete(&self, task_id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut removed = 0;
        for path in self.all_shard_paths_newest_first().await? {
            let mut shard = Self::read_shard(&path).await?;
            let before = shard.len();
            shard.retain(|r| r.task_id != task_id);
            removed += before - shard.len();
            if before != shard.len() {
                Self::write_shard(&path, &shard).await?;
            }
        }
        Ok(removed)
    }

    pub async fn cleanup(&self, older_than_months: u32) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(30 * older_than_months as i64);
        let mut removed = 0;
        for path in self.all_shard_paths_newest_first().await? {
            let file_name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            let parts: Vec<&str> = file_name.splitn(3, '_').collect();
            if parts.len() < 2 {
                continue;
            }
            let (Ok(year), Ok(month)) = (parts[0].parse::<i32>(), parts[1].parse::<u32>()) else {
                continue;
            };
            if let Some(shard_date) = chrono::NaiveDate::from_ymd_opt(year, month, 1) {
                if DateTime::<Utc>::from_naive_utc_and_offset(
                    shard_date.and_hms_opt(0, 0, 0).unwrap(),
                    Utc,
                ) < cutoff
                {
                    tokio::fs::remove_file(&path).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TaskConfig {
        crate::config_version::test_support::default_current_config("t1", "task-one")
    }

    #[tokio::test]
    async fn append_dedupes_by_task_id_within_a_shard() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TaskHistoryStore::new(tmp.path());
        let config = sample_config();

        let mut record = TaskRunRecord::started("t1", &config).unwrap();
        record.status = RunStatus::Completed;
        let started_at = record.started_at;
        store.append(record).await.unwrap();

        let mut second = TaskRunRecord::started("t1", &config).unwrap();
        second.started_at = started_at;
        second.status = RunStatus::Failed;
        store.append(second).await.unwrap();

        let all = store.list(ListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn a_later_run_for_the_same_task_replaces_the_earlier_one_in_the_shard() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TaskHistoryStore::new(tmp.path());
        let config = sample_config();

        let mut first = TaskRunRecord::started("t1", &config).unwrap();
        first.status = RunStatus::Completed;
        store.append(first).await.unwrap();

        let mut second = TaskRunRecord::started("t1", &config).unwrap();
        second.status = RunStatus::Failed;
        store.append(second.clone()).await.unwrap();

        let all = store.list(ListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, RunStatus::Failed);
        assert_eq!(all[0].started_at, second.started_at);
    }

    #[tokio::test]
    async fn list_respects_limit_and_status_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TaskHistoryStore::new(tmp.path());
        let config = sample_config();

        for i in 0..3 {
            let mut record = TaskRunRecord::started(&format!("t{i}"), &config).unwrap();
            record.status = if i == 0 {
                RunStatus::Failed
            } else {
                RunStatus::Completed
            };
            store.append(record).await.unwrap();
        }

        let completed = store
            .list(ListFilter {
                limit: 0,
                status: Some(RunStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 2);
    }
}
