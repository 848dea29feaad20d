//! Data models for Build Service

use autobuild_common::{Error, EvaluationPayload, Result};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields every build or revise request must carry, in the order they are checked
pub const REQUIRED_FIELDS: [&str; 7] = [
    "email",
    "secret",
    "task",
    "round",
    "nonce",
    "brief",
    "evaluation_url",
];

/// Round number used by revision requests
pub const REVISION_ROUND: u32 = 2;

/// Build status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// Request accepted, waiting for or starting on a worker
    Processing,
    GeneratingCode,
    CreatingRepo,
    CommittingFiles,
    EnablingPages,
    NotifyingEvaluation,
    /// Build finished and the repository is published
    Completed,
    /// Build stopped on an error
    Failed,
    /// No record exists for the task
    Unknown,
}

impl BuildStatus {
    /// Phases a successful build passes through, in order
    pub const PIPELINE: [BuildStatus; 7] = [
        BuildStatus::Processing,
        BuildStatus::GeneratingCode,
        BuildStatus::CreatingRepo,
        BuildStatus::CommittingFiles,
        BuildStatus::EnablingPages,
        BuildStatus::NotifyingEvaluation,
        BuildStatus::Completed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, BuildStatus::Completed | BuildStatus::Failed)
    }
}

/// A build request as received on `/build` or `/revise`
#[derive(Debug)]
pub struct BuildRequest {
    pub email: String,
    pub secret: SecretString,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub evaluation_url: String,
    pub attachments: Vec<Value>,
    pub checks: Vec<Value>,
}

impl BuildRequest {
    /// Validate a JSON body and extract the request.
    ///
    /// Reports the first missing field in [`REQUIRED_FIELDS`] order before
    /// looking at any field's type.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = body.as_object().ok_or(Error::InvalidBody)?;

        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !obj.contains_key(**f)) {
            return Err(Error::MissingField(missing.to_string()));
        }

        Ok(Self {
            email: string_field(obj, "email")?,
            secret: SecretString::from(string_field(obj, "secret")?),
            task: string_field(obj, "task")?,
            round: round_field(obj)?,
            nonce: string_field(obj, "nonce")?,
            brief: string_field(obj, "brief")?,
            evaluation_url: string_field(obj, "evaluation_url")?,
            attachments: list_field(obj, "attachments")?,
            checks: list_field(obj, "checks")?,
        })
    }

    /// Payload reported to the evaluator for this request
    pub fn evaluation_payload(
        &self,
        repo_url: &str,
        commit_sha: &str,
        pages_url: &str,
    ) -> EvaluationPayload {
        EvaluationPayload {
            email: self.email.clone(),
            task: self.task.clone(),
            round: self.round,
            nonce: self.nonce.clone(),
            repo_url: repo_url.to_string(),
            commit_sha: commit_sha.to_string(),
            pages_url: pages_url.to_string(),
        }
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn string_field(obj: &Map<String, Value>, field: &str) -> Result<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(field, "expected a string"))
}

fn round_field(obj: &Map<String, Value>) -> Result<u32> {
    obj.get("round")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| invalid("round", "expected a positive integer"))
}

fn list_field(obj: &Map<String, Value>, field: &str) -> Result<Vec<Value>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(invalid(field, "expected a list")),
    }
}

/// One entry of a record's phase history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub status: BuildStatus,
    pub at: DateTime<Utc>,
}

/// A generated file that could not be committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

/// Everything a finished build reports
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub explanation: String,
    pub failed_files: Vec<FailedFile>,
    pub evaluation_notified: bool,
}

/// Status of the latest build for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStatusRecord {
    /// Current status
    pub status: BuildStatus,

    /// Task identifier
    pub task: String,

    /// Round of the submission that owns this record
    pub round: u32,

    /// Identifier of the submission that owns this record
    pub build_id: String,

    /// When the submission was accepted
    pub started_at: DateTime<Utc>,

    /// When the record last changed
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,

    /// Published repository URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Advisory Pages URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_url: Option<String>,

    /// Most recent commit in the published repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,

    /// Generator explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// Whether the evaluator acknowledged the notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_notified: Option<bool>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Generated files that were not committed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFile>,

    /// Every status the record has held, oldest first
    pub history: Vec<PhaseEntry>,
}

impl BuildStatusRecord {
    /// Create the record for a freshly accepted submission
    pub fn new(task: String, round: u32, build_id: String) -> Self {
        let now = Utc::now();
        Self {
            status: BuildStatus::Processing,
            task,
            round,
            build_id,
            started_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
            repo_url: None,
            pages_url: None,
            commit_sha: None,
            explanation: None,
            evaluation_notified: None,
            error: None,
            failed_files: Vec::new(),
            history: vec![PhaseEntry {
                status: BuildStatus::Processing,
                at: now,
            }],
        }
    }

    /// Move to the next status
    pub fn advance(&mut self, status: BuildStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        self.history.push(PhaseEntry { status, at: now });
    }

    /// Mark record as completed
    pub fn mark_completed(&mut self, outcome: BuildOutcome) {
        self.advance(BuildStatus::Completed);
        self.completed_at = Some(self.updated_at);
        self.repo_url = Some(outcome.repo_url);
        self.pages_url = Some(outcome.pages_url);
        self.commit_sha = Some(outcome.commit_sha);
        self.explanation = Some(outcome.explanation);
        self.failed_files = outcome.failed_files;
        self.evaluation_notified = Some(outcome.evaluation_notified);
    }

    /// Mark record as failed
    pub fn mark_failed(&mut self, error: String) {
        self.advance(BuildStatus::Failed);
        self.failed_at = Some(self.updated_at);
        self.error = Some(error);
    }

    /// Statuses in the order they were entered
    pub fn status_sequence(&self) -> Vec<BuildStatus> {
        self.history.iter().map(|entry| entry.status).collect()
    }
}

/// Response to an accepted build or revise request
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}
