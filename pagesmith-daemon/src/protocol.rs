//! Wire types of the intake HTTP API.

use serde::{Deserialize, Serialize};

use pagesmith_core::{Attachment, Task, TaskId};

/// Body of `POST /deploy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    #[serde(default)]
    pub secret: String,
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    #[serde(default)]
    pub checks: Vec<String>,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl DeployRequest {
    /// The task this request describes. The secret is dropped here.
    pub fn into_task(self) -> Task {
        Task {
            id: TaskId(self.task),
            round: self.round,
            nonce: self.nonce,
            email: self.email,
            brief: self.brief,
            checks: self.checks,
            attachments: self.attachments,
            callback_url: self.evaluation_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub message: String,
}

impl AcceptedResponse {
    pub fn for_task(task: &Task) -> Self {
        Self {
            status: "accepted".to_string(),
            message: format!("task {} round {} accepted", task.id, task.round),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "running".to_string(),
            message: "pagesmith intake is accepting tasks".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
