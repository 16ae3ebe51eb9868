mod lock;
pub mod types;

pub use lock::WriterLock;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::platform::{NativePlatform, Platform};
use types::{AgentStateDoc, Communication, Proposal, Task};

/// The four JSON documents kept in the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Proposals,
    Tasks,
    Messages,
    AgentState,
}

impl Collection {
    #[cfg(test)]
    pub const ALL: [Collection; 4] = [
        Collection::Proposals,
        Collection::Tasks,
        Collection::Messages,
        Collection::AgentState,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Proposals => "proposals.json",
            Collection::Tasks => "tasks.json",
            Collection::Messages => "agent-messages.json",
            Collection::AgentState => "agents-state.json",
        }
    }

    fn index(self) -> usize {
        match self {
            Collection::Proposals => 0,
            Collection::Tasks => 1,
            Collection::Messages => 2,
            Collection::AgentState => 3,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

enum Loaded<T> {
    Missing,
    Parsed(T),
    Unreadable(std::io::Error),
    Malformed(serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set aside malformed {path}: {source}")]
    SetAside {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {collection}: {source}")]
    Encode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File-backed document store.
///
/// Reads never fail: a missing or malformed document yields the type's default.
/// Updates never overwrite bytes they could not parse.
/// Writes go to a sibling `.tmp` file that is renamed over the target, so a
/// reader sees either the previous or the new document. `update` holds a
/// per-document lock across read, mutate and write.
pub struct RecordStore {
    data_dir: PathBuf,
    locks: [Mutex<()>; 4],
}

impl RecordStore {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> std::io::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }
        NativePlatform::restrict_dir_permissions(&data_dir);

        Ok(Self {
            data_dir,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(()), Mutex::new(())],
        })
    }

    pub fn path_of(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    async fn load<T>(&self, collection: Collection) -> Loaded<T>
    where
        T: DeserializeOwned,
    {
        let path = self.path_of(collection);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Loaded::Missing,
            Err(e) => return Loaded::Unreadable(e),
        };
        if raw.trim().is_empty() {
            return Loaded::Missing;
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Loaded::Parsed(value),
            Err(e) => Loaded::Malformed(e),
        }
    }

    pub async fn read<T>(&self, collection: Collection) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load(collection).await {
            Loaded::Parsed(value) => value,
            Loaded::Missing => T::default(),
            Loaded::Unreadable(e) => {
                warn!("Could not read {}: {}", collection, e);
                T::default()
            }
            Loaded::Malformed(e) => {
                warn!("Treating malformed {} as empty: {}", collection, e);
                T::default()
            }
        }
    }

    /// Rename an unparseable document to `<file>.malformed-<timestamp>` so the
    /// next write starts from an empty document without destroying the bytes.
    async fn set_aside(&self, collection: Collection) -> Result<PathBuf, StoreError> {
        let path = self.path_of(collection);
        let kept = path.with_extension(format!(
            "json.malformed-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        fs::rename(&path, &kept)
            .await
            .map_err(|source| StoreError::SetAside {
                path: path.clone(),
                source,
            })?;
        Ok(kept)
    }

    pub async fn write<T>(&self, collection: Collection, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let path = self.path_of(collection);
        let json = serde_json::to_string_pretty(value)
            .map_err(|source| StoreError::Encode { collection, source })?;

        let tmp_path = path.with_extension("json.tmp");
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(write_err)?;
        NativePlatform::restrict_file_permissions(&tmp_path);
        fs::rename(&tmp_path, &path).await.map_err(write_err)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Read-modify-write under the document's lock. Nothing is written when `f` fails.
    ///
    /// An unreadable document refuses the write. A malformed one is set aside
    /// first and the update starts from the empty default.
    pub async fn update<T, R, E, F>(&self, collection: Collection, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StoreError>,
    {
        let _guard = self.locks[collection.index()].lock().await;
        let mut doc: T = match self.load(collection).await {
            Loaded::Parsed(value) => value,
            Loaded::Missing => T::default(),
            Loaded::Unreadable(source) => {
                return Err(StoreError::Read {
                    path: self.path_of(collection),
                    source,
                }
                .into());
            }
            Loaded::Malformed(e) => {
                let kept = self.set_aside(collection).await?;
                warn!(
                    "Malformed {} ({}) moved to {}; starting from an empty document",
                    collection,
                    e,
                    kept.display()
                );
                T::default()
            }
        };
        let out = f(&mut doc)?;
        self.write(collection, &doc).await?;
        Ok(out)
    }

    pub async fn proposals(&self) -> Vec<Proposal> {
        self.read(Collection::Proposals).await
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.read(Collection::Tasks).await
    }

    pub async fn communication(&self) -> Communication {
        self.read(Collection::Messages).await
    }

    pub async fn agent_state(&self) -> AgentStateDoc {
        self.read(Collection::AgentState).await
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> (tempfile::TempDir, std::sync::Arc<RecordStore>) {
    let tmpdir = tempfile::tempdir().expect("create temp dir");
    let store = RecordStore::open(tmpdir.path().join("data"))
        .await
        .expect("open store");
    (tmpdir, std::sync::Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use types::{Priority, ProposalStatus};

    fn sample_proposal(id: &str) -> Proposal {
        Proposal {
            id: id.to_string(),
            agent: "Debugger".to_string(),
            agent_id: "debugger".to_string(),
            task: "Trace the crash".to_string(),
            reason: String::new(),
            expected_outcome: String::new(),
            priority: Priority::Medium,
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            votes: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[tokio::test]
    async fn open_creates_missing_data_dir() {
        let tmpdir = tempfile::tempdir().unwrap();
        let dir = tmpdir.path().join("nested").join("data");
        let store = RecordStore::open(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.path_of(Collection::Tasks), dir.join("tasks.json"));
    }

    #[tokio::test]
    async fn missing_documents_read_as_empty_defaults() {
        let (_tmp, store) = test_store().await;
        assert!(store.proposals().await.is_empty());
        assert!(store.tasks().await.is_empty());
        let comm = store.communication().await;
        assert!(comm.messages.is_empty());
        assert!(comm.feedbacks.is_empty());
        assert!(store.agent_state().await.agents.is_empty());
    }

    #[tokio::test]
    async fn malformed_documents_read_as_empty_defaults() {
        let (_tmp, store) = test_store().await;
        for collection in Collection::ALL {
            std::fs::write(store.path_of(collection), "{ not json").unwrap();
        }
        assert!(store.proposals().await.is_empty());
        assert!(store.tasks().await.is_empty());
        assert!(store.communication().await.messages.is_empty());
        assert!(store.agent_state().await.agents.is_empty());
    }

    #[tokio::test]
    async fn update_sets_malformed_document_aside_instead_of_overwriting() {
        let (tmp, store) = test_store().await;
        let path = store.path_of(Collection::Proposals);
        std::fs::write(&path, "[{ \"id\": \"prop_old\" }]").unwrap();

        store
            .update(Collection::Proposals, |doc: &mut Vec<Proposal>| {
                assert!(doc.is_empty());
                doc.push(sample_proposal("prop_new"));
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();

        assert_eq!(store.proposals().await[0].id, "prop_new");
        let kept: Vec<_> = std::fs::read_dir(tmp.path().join("data"))
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().contains("proposals.json.malformed-"))
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(std::fs::read_to_string(&kept[0]).unwrap().contains("prop_old"));
    }

    #[tokio::test]
    async fn update_refuses_an_unreadable_document() {
        let (_tmp, store) = test_store().await;
        std::fs::create_dir(store.path_of(Collection::Tasks)).unwrap();

        let res = store
            .update(Collection::Tasks, |_doc: &mut Vec<Task>| Ok::<_, StoreError>(()))
            .await;
        assert!(matches!(res, Err(StoreError::Read { .. })));
        assert!(store.path_of(Collection::Tasks).is_dir());
    }

    #[tokio::test]
    async fn write_replaces_document_and_leaves_no_tmp_file() {
        let (_tmp, store) = test_store().await;
        store
            .write(Collection::Proposals, &vec![sample_proposal("prop_a")])
            .await
            .unwrap();
        store
            .write(Collection::Proposals, &vec![sample_proposal("prop_b")])
            .await
            .unwrap();

        let proposals = store.proposals().await;
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].id, "prop_b");
        assert!(
            !store
                .path_of(Collection::Proposals)
                .with_extension("json.tmp")
                .exists()
        );
    }

    #[tokio::test]
    async fn failed_update_leaves_document_untouched() {
        let (_tmp, store) = test_store().await;
        store
            .write(Collection::Proposals, &vec![sample_proposal("prop_a")])
            .await
            .unwrap();

        #[derive(Debug)]
        struct Refused;
        impl From<StoreError> for Refused {
            fn from(_: StoreError) -> Self {
                Refused
            }
        }

        let res: Result<(), Refused> = store
            .update(Collection::Proposals, |doc: &mut Vec<Proposal>| {
                doc.clear();
                Err(Refused)
            })
            .await;
        assert!(res.is_err());
        assert_eq!(store.proposals().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_writes() {
        let (_tmp, store) = test_store().await;
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(Collection::Proposals, |doc: &mut Vec<Proposal>| {
                        doc.insert(0, sample_proposal(&format!("prop_{}", i)));
                        Ok::<_, StoreError>(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.proposals().await.len(), 16);
    }
}
