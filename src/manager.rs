use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    handler::auth::Principal,
    packaging::{PackagingRequest, orchestrator::Packager},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    InProgress,
    Completed,
    Failed { reason: String },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed { .. })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    #[serde(flatten)]
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {0} already finished")]
    AlreadyTerminal(String),
}

/// In-memory task states for the process lifetime.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new task id, visible as `InProgress` once this returns.
    pub async fn create(&self) -> String {
        let task_id = uuid::Uuid::new_v4().to_string();
        let record = TaskRecord {
            task_id: task_id.clone(),
            state: TaskState::InProgress,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.tasks.write().await.insert(task_id.clone(), record);
        task_id
    }

    pub async fn set_state(&self, task_id: &str, state: TaskState) -> Result<(), RegistryError> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| RegistryError::NotFound(task_id.to_string()))?;
        if record.state.is_terminal() {
            return Err(RegistryError::AlreadyTerminal(task_id.to_string()));
        }
        if state.is_terminal() {
            record.finished_at = Some(Utc::now());
        }
        record.state = state;
        Ok(())
    }

    pub async fn get(&self, task_id: &str) -> Result<TaskRecord, RegistryError> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(task_id.to_string()))
    }

    /// All tasks, oldest first.
    pub async fn list(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tasks
    }
}

/// Registers a task and runs the packaging in the background. Returns as
/// soon as the task is visible in the registry.
pub(crate) async fn spawn_packaging(
    registry: Arc<TaskRegistry>,
    packager: Arc<Packager>,
    request: PackagingRequest,
    principal: &Principal,
) -> String {
    let task_id = registry.create().await;
    log::info!(
        "task {}: packaging {} requested by {}",
        task_id,
        request.input_file,
        principal.subject
    );

    let id = task_id.clone();
    tokio::spawn(async move {
        let state = match packager.package(&request).await {
            Ok(masters) => {
                log::info!(
                    "task {}: completed, masters {} and {}",
                    id,
                    masters.hls.display(),
                    masters.dash.display()
                );
                TaskState::Completed
            }
            Err(e) => {
                log::error!("task {}: failed: {}", id, e);
                TaskState::Failed {
                    reason: e.to_string(),
                }
            }
        };
        if let Err(e) = registry.set_state(&id, state).await {
            log::error!("task {}: failed to record final state: {}", id, e);
        }
    });

    task_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_is_visible_in_progress() {
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.task_id, id);
        assert_eq!(record.state, TaskState::InProgress);
        assert!(record.finished_at.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = TaskRegistry::new();
        let a = registry.create().await;
        let b = registry.create().await;
        assert_ne!(a, b);
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let registry = TaskRegistry::new();
        assert_eq!(
            registry.get("nope").await.unwrap_err(),
            RegistryError::NotFound("nope".to_string())
        );
        assert_eq!(
            registry
                .set_state("nope", TaskState::Completed)
                .await
                .unwrap_err(),
            RegistryError::NotFound("nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        registry
            .set_state(
                &id,
                TaskState::Failed {
                    reason: "boom".to_string(),
                },
            )
            .await
            .unwrap();

        let err = registry
            .set_state(&id, TaskState::Completed)
            .await
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyTerminal(id.clone()));

        let record = registry.get(&id).await.unwrap();
        assert_eq!(
            record.state,
            TaskState::Failed {
                reason: "boom".to_string()
            }
        );
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_reads_see_whole_states() {
        let registry = Arc::new(TaskRegistry::new());
        let id = registry.create().await;

        let mut readers = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            readers.push(tokio::spawn(async move {
                let state = registry.get(&id).await.unwrap().state;
                assert!(matches!(state, TaskState::InProgress | TaskState::Completed));
            }));
        }
        registry.set_state(&id, TaskState::Completed).await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
        assert_eq!(registry.get(&id).await.unwrap().state, TaskState::Completed);
    }

    #[test]
    fn test_record_json_shape() {
        let record = TaskRecord {
            task_id: "t1".to_string(),
            state: TaskState::Failed {
                reason: "ffmpeg exited".to_string(),
            },
            created_at: Utc::now(),
            finished_at: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["taskId"], "t1");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "ffmpeg exited");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("finishedAt").is_none());

        let json = serde_json::to_value(TaskState::InProgress).unwrap();
        assert_eq!(json["status"], "in_progress");
    }
}
