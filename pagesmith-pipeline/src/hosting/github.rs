//! GitHub REST v3 [`HostingProvider`].
//!
//! | Operation      | Request                                              |
//! |----------------|------------------------------------------------------|
//! | who am I       | `GET /user` (once, cached)                           |
//! | create repo    | `POST /user/repos` or `POST /orgs/{owner}/repos`     |
//! | delete repo    | `DELETE /repos/{owner}/{repo}`                       |
//! | blob           | `POST /repos/{owner}/{repo}/git/blobs`               |
//! | tree           | `POST /repos/{owner}/{repo}/git/trees`               |
//! | commit         | `POST /repos/{owner}/{repo}/git/commits`             |
//! | create ref     | `POST /repos/{owner}/{repo}/git/refs`                |
//! | update ref     | `PATCH /repos/{owner}/{repo}/git/refs/heads/{branch}`|
//! | pages          | `POST /repos/{owner}/{repo}/pages`                   |
//!
//! Repositories are created under the configured owner: the token's own
//! account when the login matches, otherwise the organisation of that name.
//! Deletion targets the same owner.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use pagesmith_core::{BlobRef, CommitRef, ObjectId, RepoName, RepositoryHandle, TreeRef};

use super::{HostingProvider, TreeEntry};
use crate::error::HostingError;

const API_VERSION: &str = "2022-11-28";

pub struct GitHubHosting {
    client: Client,
    api_base: String,
    owner: String,
    create_path: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedRepo {
    name: String,
    html_url: String,
    owner: Account,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    sha: String,
}

impl GitHubHosting {
    /// Build a client for `api_base` (normally `https://api.github.com`).
    ///
    /// `owner` is the user or organisation repositories are created under.
    pub fn new(
        api_base: &str,
        owner: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, HostingError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| HostingError::InvalidToken("contains characters not allowed in a header"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pagesmith/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.into(),
            create_path: OnceCell::new(),
        })
    }

    /// Endpoint that creates repositories under `owner`, resolved on first use.
    async fn create_path(&self) -> Result<&str, HostingError> {
        let path = self
            .create_path
            .get_or_try_init(|| async {
                let resp = send(self.request(Method::GET, "/user")).await?;
                let me: Account = resp.json().await?;
                Ok::<_, HostingError>(repo_create_path(&me.login, &self.owner))
            })
            .await?;
        Ok(path.as_str())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.api_base, path))
    }

    fn repo_path(&self, repo: &RepositoryHandle, rest: &str) -> String {
        format!("/repos/{}/{}{}", repo.owner, repo.name, rest)
    }

    async fn create_object(
        &self,
        repo: &RepositoryHandle,
        kind: &str,
        body: Value,
    ) -> Result<ObjectId, HostingError> {
        let path = self.repo_path(repo, &format!("/git/{kind}"));
        let resp = send(self.request(Method::POST, &path).json(&body)).await?;
        let created: CreatedObject = resp.json().await?;
        Ok(ObjectId(created.sha))
    }
}

/// Send and map non-success statuses to [`HostingError`].
async fn send(req: RequestBuilder) -> Result<Response, HostingError> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify(status, &body))
}

fn repo_create_path(login: &str, owner: &str) -> String {
    if login.eq_ignore_ascii_case(owner) {
        "/user/repos".to_string()
    } else {
        format!("/orgs/{owner}/repos")
    }
}

fn classify(status: StatusCode, body: &str) -> HostingError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    match status {
        StatusCode::UNPROCESSABLE_ENTITY if body.to_ascii_lowercase().contains("already exists") => {
            HostingError::AlreadyExists(message)
        }
        StatusCode::CONFLICT => HostingError::Conflict(message),
        StatusCode::NOT_FOUND => HostingError::NotFound(message),
        _ => HostingError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl HostingProvider for GitHubHosting {
    async fn create_repository(&self, name: &RepoName) -> Result<RepositoryHandle, HostingError> {
        let body = json!({ "name": name.as_str(), "private": false, "auto_init": false });
        let path = self.create_path().await?;
        let resp = send(self.request(Method::POST, path).json(&body)).await?;
        let created: CreatedRepo = resp.json().await?;
        tracing::debug!(repo = %created.name, owner = %created.owner.login, "repository created");
        Ok(RepositoryHandle {
            name: RepoName(created.name),
            owner: created.owner.login,
            url: created.html_url,
        })
    }

    async fn delete_repository(&self, name: &RepoName) -> Result<(), HostingError> {
        let path = format!("/repos/{}/{}", self.owner, name);
        send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn create_blob(
        &self,
        repo: &RepositoryHandle,
        content: &str,
    ) -> Result<BlobRef, HostingError> {
        let body = json!({ "content": content, "encoding": "utf-8" });
        Ok(BlobRef(self.create_object(repo, "blobs", body).await?))
    }

    async fn create_tree(
        &self,
        repo: &RepositoryHandle,
        entries: &[TreeEntry],
    ) -> Result<TreeRef, HostingError> {
        let tree: Vec<Value> = entries
            .iter()
            .map(|e| {
                json!({
                    "path": e.path,
                    "mode": e.mode.as_str(),
                    "type": "blob",
                    "sha": e.blob.0 .0,
                })
            })
            .collect();
        Ok(TreeRef(self.create_object(repo, "trees", json!({ "tree": tree })).await?))
    }

    async fn create_commit(
        &self,
        repo: &RepositoryHandle,
        message: &str,
        tree: &TreeRef,
        parents: &[CommitRef],
    ) -> Result<CommitRef, HostingError> {
        let parents: Vec<&str> = parents.iter().map(|p| p.0 .0.as_str()).collect();
        let body = json!({ "message": message, "tree": tree.0 .0, "parents": parents });
        Ok(CommitRef(self.create_object(repo, "commits", body).await?))
    }

    async fn create_ref(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        commit: &CommitRef,
    ) -> Result<(), HostingError> {
        let path = self.repo_path(repo, "/git/refs");
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": commit.0 .0 });
        send(self.request(Method::POST, &path).json(&body)).await?;
        Ok(())
    }

    async fn update_ref(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        commit: &CommitRef,
        force: bool,
    ) -> Result<(), HostingError> {
        let path = self.repo_path(repo, &format!("/git/refs/heads/{branch}"));
        let body = json!({ "sha": commit.0 .0, "force": force });
        send(self.request(Method::PATCH, &path).json(&body)).await?;
        Ok(())
    }

    async fn enable_pages(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        path: &str,
    ) -> Result<(), HostingError> {
        let url = self.repo_path(repo, "/pages");
        let body = json!({ "source": { "branch": branch, "path": path } });
        send(self.request(Method::POST, &url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_name_is_recognised_from_validation_errors() {
        let body = r#"{"message":"Repository creation failed.","errors":[{"resource":"Repository","code":"custom","field":"name","message":"name already exists on this account"}]}"#;
        let err = classify(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(matches!(err, HostingError::AlreadyExists(m) if m == "Repository creation failed."));
    }

    #[test]
    fn other_validation_errors_stay_api_errors() {
        let err = classify(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"Validation Failed"}"#);
        assert!(matches!(err, HostingError::Api { status: 422, .. }));
    }

    #[test]
    fn conflict_and_not_found_map_to_variants() {
        assert!(matches!(
            classify(StatusCode::CONFLICT, "GitHub Pages is already enabled."),
            HostingError::Conflict(_)
        ));
        assert!(matches!(classify(StatusCode::NOT_FOUND, "{}"), HostingError::NotFound(_)));
    }

    #[test]
    fn create_path_follows_owner() {
        assert_eq!(repo_create_path("Octo", "octo"), "/user/repos");
        assert_eq!(repo_create_path("octo", "acme"), "/orgs/acme/repos");
    }

    #[test]
    fn rejects_token_with_newline() {
        let result = GitHubHosting::new(
            "https://api.github.com",
            "octo",
            "bad\ntoken",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(HostingError::InvalidToken(_))));
    }
}
