//! In-memory object store for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, TemplarError};
use crate::store::{ObjectPage, ObjectRef, ObjectStore};

/// Deterministic object store backed by a vector of keyed payloads.
///
/// Records every listing and retrieval so tests can assert that fast-skip
/// paths made no remote calls.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Vec<(String, Bytes)>,
    page_size: usize,
    failing_keys: HashSet<String>,
    list_calls: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            page_size: 1000,
            ..Default::default()
        }
    }

    /// Split listings into pages of `page_size` keys.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Add an object to the store.
    pub fn insert(mut self, key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        self.objects.push((key.into(), payload.into()));
        self
    }

    /// Make retrieval of `key` fail with a transient error.
    pub fn failing_get(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Number of `list_page` calls made so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Keys retrieved so far, in request order.
    pub fn fetched_keys(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ObjectPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let matching: Vec<&(String, Bytes)> = self
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();

        let start = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| TemplarError::ObjectStore(format!("bad continuation token {token}")))?,
            None => 0,
        };

        let end = (start + self.page_size.max(1)).min(matching.len());
        let objects = matching[start..end]
            .iter()
            .map(|(key, payload)| ObjectRef {
                key: key.clone(),
                size: Some(payload.len() as i64),
            })
            .collect();

        let continuation = (end < matching.len()).then(|| end.to_string());
        Ok(ObjectPage {
            objects,
            continuation,
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.fetched.lock().unwrap().push(key.to_string());

        if self.failing_keys.contains(key) {
            return Err(TemplarError::Retrieval {
                key: key.to_string(),
                reason: "injected failure".into(),
            });
        }

        self.objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, payload)| payload.clone())
            .ok_or_else(|| TemplarError::Retrieval {
                key: key.to_string(),
                reason: "no such key".into(),
            })
    }
}
