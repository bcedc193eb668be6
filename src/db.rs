// src/db.rs
//! Single-file JSON document store.
//!
//! The whole document lives in memory behind one async mutex. A mutation is
//! applied to a copy, written to disk, and only swapped in once the write
//! succeeded, so a failed write or a rejected update leaves both the file
//! and the in-memory state untouched.

use crate::merge::Rejection;
use crate::models::Subscription;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store document is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("subscription {0} not found")]
    NotFound(u64),
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Document {
    #[serde(default)]
    pub users: BTreeMap<String, UserData>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    /// Highest id ever handed out, so deleted ids are never reissued.
    #[serde(default)]
    pub last_assigned_id: u64,
}

impl UserData {
    fn next_id(&self) -> u64 {
        let max_existing = self.subscriptions.iter().map(|s| s.id).max().unwrap_or(0);
        max_existing.max(self.last_assigned_id) + 1
    }
}

pub struct Store {
    path: PathBuf,
    document: Mutex<Document>,
}

impl Store {
    /// Loads the document at `path`, creating it when missing or empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Document::default(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };
        write_document(&path, &document).await?;
        tracing::info!("Opened subscription store at {}", path.display());
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Makes sure `user_id` has a (possibly empty) collection.
    pub async fn ensure_user(&self, user_id: &str) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        if document.users.contains_key(user_id) {
            return Ok(());
        }
        let mut next = document.clone();
        next.users.insert(user_id.to_string(), UserData::default());
        write_document(&self.path, &next).await?;
        *document = next;
        tracing::info!("Created subscription collection for user {}", user_id);
        Ok(())
    }

    pub async fn list(&self, user_id: &str) -> Vec<Subscription> {
        let document = self.document.lock().await;
        document
            .users
            .get(user_id)
            .map(|user| user.subscriptions.clone())
            .unwrap_or_default()
    }

    /// Assigns the next id and stores whatever `build` makes of it.
    pub async fn insert_with<F>(&self, user_id: &str, build: F) -> Result<Subscription, StoreError>
    where
        F: FnOnce(u64) -> Result<Subscription, Rejection>,
    {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        let user = next.users.entry(user_id.to_string()).or_default();

        let id = user.next_id();
        let subscription = build(id)?;
        user.subscriptions.push(subscription.clone());
        user.last_assigned_id = id;

        write_document(&self.path, &next).await?;
        *document = next;
        Ok(subscription)
    }

    /// Replaces subscription `id` with the result of `apply`.
    pub async fn update_with<F>(
        &self,
        user_id: &str,
        id: u64,
        apply: F,
    ) -> Result<Subscription, StoreError>
    where
        F: FnOnce(&Subscription) -> Result<Subscription, Rejection>,
    {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        let slot = next
            .users
            .get_mut(user_id)
            .and_then(|user| user.subscriptions.iter_mut().find(|s| s.id == id))
            .ok_or(StoreError::NotFound(id))?;

        let updated = apply(&*slot)?;
        *slot = updated.clone();

        write_document(&self.path, &next).await?;
        *document = next;
        Ok(updated)
    }

    pub async fn delete(&self, user_id: &str, id: u64) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        let user = next
            .users
            .get_mut(user_id)
            .ok_or(StoreError::NotFound(id))?;

        let before = user.subscriptions.len();
        user.subscriptions.retain(|s| s.id != id);
        if user.subscriptions.len() == before {
            return Err(StoreError::NotFound(id));
        }
        // Older documents may lack the counter; keep the deleted id reserved.
        user.last_assigned_id = user.last_assigned_id.max(id);

        write_document(&self.path, &next).await?;
        *document = next;
        Ok(())
    }
}

async fn write_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(document)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
