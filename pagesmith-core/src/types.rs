//! Domain types for the deployment pipeline.
//!
//! A [`Task`] lives for exactly one pipeline run and is never persisted.
//! Hosting references ([`BlobRef`], [`TreeRef`], [`CommitRef`]) are content
//! addresses handed out by the hosting provider; this crate never computes
//! them itself.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// Path of the file every artifact set must contain.
pub const ENTRY_POINT: &str = "index.html";

/// Maximum number of brief characters carried into a commit message.
const COMMIT_SUMMARY_CHARS: usize = 60;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Caller-chosen identifier of a deployment task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of a hosted repository, unique per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoName(pub String);

impl RepoName {
    /// Derive the repository name for a task round: `<task>-r<round>`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` become `-`, so the same task and
    /// round always map to the same repository.
    pub fn for_task(task: &TaskId, round: u32) -> Self {
        let stem: String = task
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let stem = if stem.is_empty() { "task".to_string() } else { stem };
        Self(format!("{stem}-r{round}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Hex content address of a hosted object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Address of one stored file body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub ObjectId);

/// Address of a flat path → blob mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeRef(pub ObjectId);

/// Address of a commit object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitRef(pub ObjectId);

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Mode recorded for a tree entry. Only regular files are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileMode {
    #[default]
    #[serde(rename = "100644")]
    Regular,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A named resource the generator may draw on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// One accepted deployment task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub round: u32,
    pub nonce: String,
    pub email: String,
    pub brief: String,
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub callback_url: String,
}

impl Task {
    pub fn repo_name(&self) -> RepoName {
        RepoName::for_task(&self.id, self.round)
    }

    /// Commit message for this task's publish: `<task> round <n>: <summary>`.
    pub fn commit_message(&self) -> String {
        format!(
            "{} round {}: {}",
            self.id,
            self.round,
            summarize(&self.brief, COMMIT_SUMMARY_CHARS)
        )
    }
}

/// First non-empty line of `text`, cut to at most `max_chars` characters.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

// ---------------------------------------------------------------------------
// ArtifactSet
// ---------------------------------------------------------------------------

/// Relative path → text content. Paths are unique and iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet(BTreeMap<String, String>);

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Rejects absolute paths, `..` segments, and duplicates.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), ArtifactError> {
        let path = path.into();
        validate_path(&path)?;
        if self.0.contains_key(&path) {
            return Err(ArtifactError::DuplicatePath(path));
        }
        self.0.insert(path, content.into());
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn has_entry_point(&self) -> bool {
        self.contains(ENTRY_POINT)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

impl TryFrom<BTreeMap<String, String>> for ArtifactSet {
    type Error = ArtifactError;

    fn try_from(files: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        for path in files.keys() {
            validate_path(path)?;
        }
        Ok(Self(files))
    }
}

fn validate_path(path: &str) -> Result<(), ArtifactError> {
    let reason = if path.is_empty() {
        Some("path is empty")
    } else if path.starts_with('/') || path.starts_with('\\') {
        Some("path must be relative")
    } else if path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
        Some("path contains an empty or `..` segment")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ArtifactError::InvalidPath {
            path: path.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Hosting + notification
// ---------------------------------------------------------------------------

/// A provisioned repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryHandle {
    pub name: RepoName,
    pub owner: String,
    /// Browser URL of the repository.
    pub url: String,
}

impl RepositoryHandle {
    pub fn new(owner: impl Into<String>, name: RepoName) -> Self {
        let owner = owner.into();
        let url = format!("https://github.com/{owner}/{name}");
        Self { name, owner, url }
    }

    /// Static-site URL the repository is served from once publication is active.
    pub fn pages_url(&self) -> String {
        format!(
            "https://{}.github.io/{}/",
            self.owner.to_ascii_lowercase(),
            self.name
        )
    }
}

/// Completion report POSTed to the task's callback URL. Retried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: TaskId,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: CommitRef,
    pub pages_url: String,
}

impl NotificationPayload {
    pub fn new(task: &Task, repo: &RepositoryHandle, commit: &CommitRef) -> Self {
        Self {
            email: task.email.clone(),
            task: task.id.clone(),
            round: task.round,
            nonce: task.nonce.clone(),
            repo_url: repo.url.clone(),
            commit_sha: commit.clone(),
            pages_url: repo.pages_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn task(brief: &str) -> Task {
        Task {
            id: TaskId::from("quiz"),
            round: 1,
            nonce: "n-1".to_string(),
            email: "dev@example.com".to_string(),
            brief: brief.to_string(),
            checks: vec![],
            attachments: vec![],
            callback_url: "http://localhost/cb".to_string(),
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(TaskId::from("quiz").to_string(), "quiz");
        assert_eq!(RepoName::from("quiz-r1").to_string(), "quiz-r1");
        assert_eq!(CommitRef(ObjectId::from("abc")).to_string(), "abc");
    }

    #[test]
    fn commit_message_uses_first_line_of_brief() {
        let t = task("\n  Build a quiz page  \nwith extra detail");
        assert_eq!(t.commit_message(), "quiz round 1: Build a quiz page");
    }

    #[test]
    fn summarize_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        let s = summarize(&long, 60);
        assert_eq!(s.chars().count(), 63);
        assert!(s.ends_with("..."));
    }

    #[test]
    fn artifact_set_rejects_duplicates() {
        let mut set = ArtifactSet::new();
        set.insert("index.html", "<html></html>").unwrap();
        let err = set.insert("index.html", "again").unwrap_err();
        assert_eq!(err, ArtifactError::DuplicatePath("index.html".to_string()));
    }

    #[test]
    fn artifact_set_rejects_escaping_paths() {
        let mut set = ArtifactSet::new();
        assert!(set.insert("../etc/passwd", "x").is_err());
        assert!(set.insert("/abs.txt", "x").is_err());
        assert!(set.insert("", "x").is_err());
        assert!(set.insert("a//b", "x").is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn artifact_set_iterates_sorted() {
        let mut set = ArtifactSet::new();
        set.insert("README.md", "r").unwrap();
        set.insert("LICENSE", "l").unwrap();
        set.insert("index.html", "i").unwrap();
        let paths: Vec<_> = set.paths().collect();
        assert_eq!(paths, vec!["LICENSE", "README.md", "index.html"]);
        assert!(set.has_entry_point());
    }

    #[test]
    fn handle_urls() {
        let handle = RepositoryHandle::new("OctoCat", RepoName::from("quiz-r1"));
        assert_eq!(handle.url, "https://github.com/OctoCat/quiz-r1");
        assert_eq!(handle.pages_url(), "https://octocat.github.io/quiz-r1/");
    }

    #[test]
    fn payload_serializes_with_wire_field_names() {
        let t = task("brief");
        let handle = RepositoryHandle::new("octo", t.repo_name());
        let payload =
            NotificationPayload::new(&t, &handle, &CommitRef(ObjectId::from("c0ffee")));
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["task"], "quiz");
        assert_eq!(json["round"], 1);
        assert_eq!(json["commit_sha"], "c0ffee");
        assert_eq!(json["repo_url"], "https://github.com/octo/quiz-r1");
        assert_eq!(json["pages_url"], "https://octo.github.io/quiz-r1/");
    }

    #[test]
    fn file_mode_serializes_as_git_mode() {
        let json = serde_json::to_string(&FileMode::Regular).unwrap();
        assert_eq!(json, "\"100644\"");
    }
}
