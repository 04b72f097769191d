//! In-memory [`HostingProvider`].
//!
//! Objects are addressed by the SHA-256 of a git-style encoding
//! (`"<kind> <len>\0<body>"`), so identical content always gets the same
//! id. Used by `pagesmith run --dry-run` and throughout the tests, which
//! also rely on its call log and one-shot failure injection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use pagesmith_core::{BlobRef, CommitRef, ObjectId, RepoName, RepositoryHandle, TreeRef};

use super::{HostingOp, HostingProvider, TreeEntry};
use crate::error::HostingError;

const AUTHOR: &str = "pagesmith <pagesmith@localhost> 0 +0000";

#[derive(Debug, Clone)]
enum Object {
    Blob(String),
    Tree(Vec<TreeEntry>),
    Commit(CommitInfo),
}

/// A stored commit, as seen through [`InMemoryHosting::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub tree: TreeRef,
    pub message: String,
    pub parents: Vec<CommitRef>,
}

#[derive(Debug, Default)]
struct Repository {
    objects: HashMap<ObjectId, Object>,
    refs: BTreeMap<String, CommitRef>,
    pages: Option<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    repos: BTreeMap<RepoName, Repository>,
    calls: Vec<HostingOp>,
    failures: HashMap<HostingOp, VecDeque<HostingError>>,
}

pub struct InMemoryHosting {
    owner: String,
    state: Mutex<State>,
}

fn object_id(kind: &str, body: &[u8]) -> ObjectId {
    let mut h = Sha256::new();
    h.update(format!("{kind} {}\0", body.len()).as_bytes());
    h.update(body);
    ObjectId(hex::encode(h.finalize()))
}

fn tree_body(entries: &[TreeEntry]) -> Vec<u8> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    let mut body = Vec::new();
    for e in sorted {
        body.extend_from_slice(format!("{} {}\0{}\n", e.mode, e.path, e.blob).as_bytes());
    }
    body
}

fn commit_body(info: &CommitInfo) -> Vec<u8> {
    let mut body = format!("tree {}\n", info.tree);
    for p in &info.parents {
        body.push_str(&format!("parent {p}\n"));
    }
    body.push_str(&format!("author {AUTHOR}\ncommitter {AUTHOR}\n\n{}\n", info.message));
    body.into_bytes()
}

impl InMemoryHosting {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pre-create an empty repository, as if left over from an earlier run.
    pub fn seed_repository(&self, name: &RepoName) {
        self.lock().repos.entry(name.clone()).or_default();
    }

    /// Make the next call of `op` fail with `error`. Queued errors are
    /// consumed in order, one per call.
    pub fn fail_next(&self, op: HostingOp, error: HostingError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<HostingOp> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: HostingOp) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn repository_exists(&self, name: &RepoName) -> bool {
        self.lock().repos.contains_key(name)
    }

    pub fn branch_target(&self, name: &RepoName, branch: &str) -> Option<CommitRef> {
        self.lock().repos.get(name)?.refs.get(branch).cloned()
    }

    pub fn commit(&self, name: &RepoName, commit: &CommitRef) -> Option<CommitInfo> {
        match self.lock().repos.get(name)?.objects.get(&commit.0)? {
            Object::Commit(info) => Some(info.clone()),
            _ => None,
        }
    }

    /// Resolve a tree to path → content.
    pub fn tree_files(&self, name: &RepoName, tree: &TreeRef) -> Option<BTreeMap<String, String>> {
        let state = self.lock();
        let repo = state.repos.get(name)?;
        let Object::Tree(entries) = repo.objects.get(&tree.0)? else {
            return None;
        };
        let mut files = BTreeMap::new();
        for e in entries {
            let Object::Blob(content) = repo.objects.get(&e.blob.0)? else {
                return None;
            };
            files.insert(e.path.clone(), content.clone());
        }
        Some(files)
    }

    /// Files visible on `branch`, following the branch to its commit tree.
    pub fn published_files(&self, name: &RepoName, branch: &str) -> Option<BTreeMap<String, String>> {
        let commit = self.branch_target(name, branch)?;
        let info = self.commit(name, &commit)?;
        self.tree_files(name, &info.tree)
    }

    /// `(branch, path)` publication is enabled for, if any.
    pub fn pages(&self, name: &RepoName) -> Option<(String, String)> {
        self.lock().repos.get(name)?.pages.clone()
    }

    /// Record the call and pop an injected failure for it, if one is queued.
    fn enter(&self, state: &mut State, op: HostingOp) -> Result<(), HostingError> {
        state.calls.push(op);
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn insert_object(repo: &mut Repository, kind: &str, body: &[u8], object: Object) -> ObjectId {
    let id = object_id(kind, body);
    repo.objects.insert(id.clone(), object);
    id
}

fn repo_mut<'a>(state: &'a mut State, name: &RepoName) -> Result<&'a mut Repository, HostingError> {
    state
        .repos
        .get_mut(name)
        .ok_or_else(|| HostingError::NotFound(format!("repository {name}")))
}

fn require(repo: &Repository, id: &ObjectId, what: &str) -> Result<(), HostingError> {
    if repo.objects.contains_key(id) {
        Ok(())
    } else {
        Err(HostingError::NotFound(format!("{what} {id}")))
    }
}

#[async_trait]
impl HostingProvider for InMemoryHosting {
    async fn create_repository(&self, name: &RepoName) -> Result<RepositoryHandle, HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::CreateRepository)?;
        if state.repos.contains_key(name) {
            return Err(HostingError::AlreadyExists(format!("repository {name}")));
        }
        state.repos.insert(name.clone(), Repository::default());
        Ok(RepositoryHandle::new(self.owner.clone(), name.clone()))
    }

    async fn delete_repository(&self, name: &RepoName) -> Result<(), HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::DeleteRepository)?;
        state
            .repos
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| HostingError::NotFound(format!("repository {name}")))
    }

    async fn create_blob(
        &self,
        repo: &RepositoryHandle,
        content: &str,
    ) -> Result<BlobRef, HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::CreateBlob)?;
        let stored = repo_mut(&mut state, &repo.name)?;
        let id = insert_object(stored, "blob", content.as_bytes(), Object::Blob(content.to_string()));
        Ok(BlobRef(id))
    }

    async fn create_tree(
        &self,
        repo: &RepositoryHandle,
        entries: &[TreeEntry],
    ) -> Result<TreeRef, HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::CreateTree)?;
        let stored = repo_mut(&mut state, &repo.name)?;
        for e in entries {
            require(stored, &e.blob.0, "blob")?;
        }
        let id = insert_object(stored, "tree", &tree_body(entries), Object::Tree(entries.to_vec()));
        Ok(TreeRef(id))
    }

    async fn create_commit(
        &self,
        repo: &RepositoryHandle,
        message: &str,
        tree: &TreeRef,
        parents: &[CommitRef],
    ) -> Result<CommitRef, HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::CreateCommit)?;
        let stored = repo_mut(&mut state, &repo.name)?;
        require(stored, &tree.0, "tree")?;
        for p in parents {
            require(stored, &p.0, "commit")?;
        }
        let info = CommitInfo {
            tree: tree.clone(),
            message: message.to_string(),
            parents: parents.to_vec(),
        };
        let body = commit_body(&info);
        let id = insert_object(stored, "commit", &body, Object::Commit(info));
        Ok(CommitRef(id))
    }

    async fn create_ref(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        commit: &CommitRef,
    ) -> Result<(), HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::CreateRef)?;
        let stored = repo_mut(&mut state, &repo.name)?;
        require(stored, &commit.0, "commit")?;
        if stored.refs.contains_key(branch) {
            return Err(HostingError::AlreadyExists(format!("refs/heads/{branch}")));
        }
        stored.refs.insert(branch.to_string(), commit.clone());
        Ok(())
    }

    async fn update_ref(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        commit: &CommitRef,
        force: bool,
    ) -> Result<(), HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::UpdateRef)?;
        let stored = repo_mut(&mut state, &repo.name)?;
        require(stored, &commit.0, "commit")?;
        let Some(current) = stored.refs.get(branch).cloned() else {
            return Err(HostingError::NotFound(format!("refs/heads/{branch}")));
        };
        if !force {
            let fast_forward = match stored.objects.get(&commit.0) {
                Some(Object::Commit(info)) => info.parents.contains(&current),
                _ => false,
            };
            if !fast_forward {
                return Err(HostingError::Api {
                    status: 422,
                    message: "update is not a fast forward".to_string(),
                });
            }
        }
        stored.refs.insert(branch.to_string(), commit.clone());
        Ok(())
    }

    async fn enable_pages(
        &self,
        repo: &RepositoryHandle,
        branch: &str,
        path: &str,
    ) -> Result<(), HostingError> {
        let mut state = self.lock();
        self.enter(&mut state, HostingOp::EnablePages)?;
        let stored = repo_mut(&mut state, &repo.name)?;
        if stored.pages.is_some() {
            return Err(HostingError::Conflict("publication already enabled".to_string()));
        }
        stored.pages = Some((branch.to_string(), path.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pagesmith_core::FileMode;

    use super::*;

    fn handle(hosting: &InMemoryHosting) -> RepositoryHandle {
        RepositoryHandle::new(hosting.owner.clone(), RepoName::from("demo-r1"))
    }

    #[tokio::test]
    async fn identical_content_gets_identical_ids() {
        let hosting = InMemoryHosting::new("octo");
        let repo = hosting.create_repository(&RepoName::from("demo-r1")).await.unwrap();
        let a = hosting.create_blob(&repo, "hello").await.unwrap();
        let b = hosting.create_blob(&repo, "hello").await.unwrap();
        let c = hosting.create_blob(&repo, "hello!").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.0 .0.len(), 64);
    }

    #[tokio::test]
    async fn objects_require_an_existing_repository() {
        let hosting = InMemoryHosting::new("octo");
        let err = hosting.create_blob(&handle(&hosting), "x").await.unwrap_err();
        assert!(matches!(err, HostingError::NotFound(_)));
    }

    #[tokio::test]
    async fn tree_rejects_unknown_blob() {
        let hosting = InMemoryHosting::new("octo");
        let repo = hosting.create_repository(&RepoName::from("demo-r1")).await.unwrap();
        let entries = vec![TreeEntry {
            path: "index.html".to_string(),
            mode: FileMode::Regular,
            blob: BlobRef(ObjectId::from("missing")),
        }];
        let err = hosting.create_tree(&repo, &entries).await.unwrap_err();
        assert!(matches!(err, HostingError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_repository_and_pages_are_reported() {
        let hosting = InMemoryHosting::new("octo");
        let name = RepoName::from("demo-r1");
        let repo = hosting.create_repository(&name).await.unwrap();
        assert!(matches!(
            hosting.create_repository(&name).await,
            Err(HostingError::AlreadyExists(_))
        ));
        hosting.enable_pages(&repo, "main", "/").await.unwrap();
        assert!(matches!(
            hosting.enable_pages(&repo, "main", "/").await,
            Err(HostingError::Conflict(_))
        ));
        assert_eq!(hosting.pages(&name), Some(("main".to_string(), "/".to_string())));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_once() {
        let hosting = InMemoryHosting::new("octo");
        hosting.fail_next(
            HostingOp::CreateRepository,
            HostingError::Api { status: 500, message: "boom".to_string() },
        );
        let name = RepoName::from("demo-r1");
        assert!(hosting.create_repository(&name).await.is_err());
        assert!(hosting.create_repository(&name).await.is_ok());
        assert_eq!(hosting.count(HostingOp::CreateRepository), 2);
    }
}
