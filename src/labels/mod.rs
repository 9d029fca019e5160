//! Persistent cluster labels and the sibling account-tag store.
//!
//! Labels are keyed by cluster signature: the stable dendrogram id for tree
//! nodes, a content hash for synthetic groups. Both survive budget and
//! granularity changes.
//!
//! Each call locks the document, applies its change to a copy, writes the copy
//! through a temp file and rename, and only then swaps it in. A failed write
//! leaves both memory and disk untouched.

pub mod tags;

pub use tags::{AccountTag, LeafTags, Polarity, TagCount, TagSummary, count_tags, suggest, summarize};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::artifact::SpectralArtifact;
use crate::nav_error::NavError;

/// Where a label came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelProvenance {
    User,
    Auto,
    TagSuggestion,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub signature: String,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub provenance: LabelProvenance,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct LabelDocument {
    #[serde(default)]
    labels: BTreeMap<String, Label>,
    /// ego -> account -> tags
    #[serde(default)]
    tags: BTreeMap<String, BTreeMap<String, Vec<AccountTag>>>,
}

/// Content signature for a member set: `h_` plus a SHA-256 prefix of the
/// sorted member ids.
pub fn content_signature<S: AsRef<str>>(member_ids: &[S]) -> String {
    let mut ids: Vec<&str> = member_ids.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("h_{hex}")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Label and tag persistence.
pub struct ClusterLabelStore {
    path: Option<PathBuf>,
    doc: Mutex<LabelDocument>,
}

impl ClusterLabelStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(LabelDocument::default()),
        }
    }

    /// Open (or start) a JSON-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            LabelDocument::default()
        };
        log::info!(
            "opened label store {} ({} labels)",
            path.display(),
            doc.labels.len()
        );
        Ok(Self {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    fn persist(&self, doc: &LabelDocument) -> Result<(), NavError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Apply `f` to a copy of the document, persist it, then commit.
    fn transact<T>(
        &self,
        f: impl FnOnce(&mut LabelDocument) -> Result<T, NavError>,
    ) -> Result<T, NavError> {
        let mut guard = self.doc.lock();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    pub fn get_label(&self, signature: &str) -> Option<Label> {
        self.doc.lock().labels.get(signature).cloned()
    }

    pub fn upsert_label(
        &self,
        signature: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
        provenance: LabelProvenance,
    ) -> Result<Label, NavError> {
        if name.trim().is_empty() {
            return Err(NavError::validation("name", "label name is empty"));
        }
        if signature.is_empty() {
            return Err(NavError::validation("signature", "signature is empty"));
        }
        let now = now_secs();
        self.transact(|doc| {
            let created_at = doc
                .labels
                .get(signature)
                .map_or(now, |existing| existing.created_at);
            let label = Label {
                signature: signature.to_string(),
                name: name.trim().to_string(),
                color: color.map(str::to_string),
                description: description.map(str::to_string),
                provenance,
                created_at,
                updated_at: now,
            };
            doc.labels.insert(signature.to_string(), label.clone());
            Ok(label)
        })
    }

    pub fn delete_label(&self, signature: &str) -> Result<bool, NavError> {
        self.transact(|doc| Ok(doc.labels.remove(signature).is_some()))
    }

    pub fn list_labels(&self) -> Vec<Label> {
        self.doc.lock().labels.values().cloned().collect()
    }

    /// Tag `account` for `ego`, replacing any earlier polarity for that tag.
    pub fn add_tag(
        &self,
        ego: &str,
        account: &str,
        tag: &str,
        polarity: Polarity,
    ) -> Result<(), NavError> {
        if tag.trim().is_empty() {
            return Err(NavError::validation("tag", "tag is empty"));
        }
        self.transact(|doc| {
            let tags = doc
                .tags
                .entry(ego.to_string())
                .or_default()
                .entry(account.to_string())
                .or_default();
            match tags.iter_mut().find(|t| t.tag == tag) {
                Some(existing) => existing.polarity = polarity,
                None => tags.push(AccountTag::new(tag, polarity)),
            }
            Ok(())
        })
    }

    pub fn remove_tag(&self, ego: &str, account: &str, tag: &str) -> Result<bool, NavError> {
        self.transact(|doc| {
            let Some(tags) = doc.tags.get_mut(ego).and_then(|m| m.get_mut(account)) else {
                return Ok(false);
            };
            let before = tags.len();
            tags.retain(|t| t.tag != tag);
            Ok(tags.len() != before)
        })
    }

    pub fn tags_for(&self, ego: &str, account: &str) -> Vec<AccountTag> {
        self.doc
            .lock()
            .tags
            .get(ego)
            .and_then(|m| m.get(account))
            .cloned()
            .unwrap_or_default()
    }

    /// All of `ego`'s tags, resolved to dendrogram leaves. Accounts missing
    /// from the artifact are skipped.
    pub fn leaf_tags(&self, ego: &str, artifact: &SpectralArtifact) -> LeafTags {
        let doc = self.doc.lock();
        let Some(by_account) = doc.tags.get(ego) else {
            return LeafTags::new();
        };
        by_account
            .iter()
            .filter_map(|(account, tags)| Some((artifact.leaf_of(account)?, tags.clone())))
            .collect()
    }

    /// Tag tallies and suggested label for a cluster's members.
    pub fn tag_summary<S: AsRef<str>>(
        &self,
        cluster_id: &str,
        ego: &str,
        member_ids: &[S],
    ) -> TagSummary {
        let doc = self.doc.lock();
        let empty = BTreeMap::new();
        let by_account = doc.tags.get(ego).unwrap_or(&empty);
        summarize(
            cluster_id,
            member_ids
                .iter()
                .filter_map(|m| by_account.get(m.as_ref()).map(Vec::as_slice)),
        )
    }
}
