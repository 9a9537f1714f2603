//! In-memory ObjectStore implementation, intended primarily for testing.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    HASH_METADATA_KEY, ListPage, MAX_DELETE_BATCH, ObjectStore, PutRequest, Result, StoreError,
};

/// Default page size for listings, matching the common store cap.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// A recorded upload, kept for assertions.
#[derive(Debug, Clone)]
pub struct PutRecord {
    pub key: String,
    pub content_type: String,
    pub cache_control: String,
    pub digest: String,
}

/// A stored object.
#[derive(Debug, Clone, Default)]
struct StoredObject {
    metadata: HashMap<String, String>,
}

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<String, StoredObject>,
    puts: Vec<PutRecord>,
    delete_calls: Vec<Vec<String>>,
    list_calls: usize,
    fail_put_keys: Vec<String>,
    fail_deletes: bool,
}

/// An in-memory [`ObjectStore`] with recorded calls and injectable failures.
///
/// Listing pages are keyed the way a real store pages: keys strictly after
/// the marker in lexicographic order, at most `page_size` per page.
pub struct MemoryObjectStore {
    state: Mutex<MemoryState>,
    page_size: usize,
}

impl MemoryObjectStore {
    /// Create a new empty store with the default page size.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the listing page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Insert an object directly, optionally with a stored digest.
    pub fn insert_object(&self, key: impl Into<String>, digest: Option<&str>) {
        let mut metadata = HashMap::new();
        if let Some(digest) = digest {
            metadata.insert(HASH_METADATA_KEY.to_string(), digest.to_string());
        }
        let mut state = self.state.lock().unwrap();
        state.objects.insert(key.into(), StoredObject { metadata });
    }

    /// Make uploads of the given key fail.
    pub fn fail_put_for(&self, key: impl Into<String>) {
        self.state.lock().unwrap().fail_put_keys.push(key.into());
    }

    /// Make all delete calls fail.
    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    /// Keys currently present, in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Recorded uploads, in completion order.
    pub fn put_records(&self) -> Vec<PutRecord> {
        self.state.lock().unwrap().puts.clone()
    }

    /// Recorded delete calls, one entry per batch.
    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    /// Number of listing page requests served.
    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_page(&self, marker: Option<&str>) -> Result<ListPage> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;

        let lower = match marker {
            Some(marker) => Bound::Excluded(marker.to_string()),
            None => Bound::Unbounded,
        };

        let mut keys: Vec<String> = state
            .objects
            .range((lower, Bound::Unbounded))
            .map(|(key, _)| key.clone())
            .collect();

        let is_truncated = keys.len() > self.page_size;
        keys.truncate(self.page_size);

        Ok(ListPage { keys, is_truncated })
    }

    async fn head_metadata(&self, key: &str) -> Result<HashMap<String, String>> {
        let state = self.state.lock().unwrap();
        match state.objects.get(key) {
            Some(object) => Ok(object.metadata.clone()),
            None => Err(StoreError::Read {
                key: key.to_string(),
                source: "no such key".into(),
            }),
        }
    }

    async fn put_object(&self, request: PutRequest<'_>) -> Result<()> {
        // Read the body outside the lock, like a real store streaming it
        let read_result = tokio::fs::read(request.body_path).await;

        let mut state = self.state.lock().unwrap();

        if state.fail_put_keys.iter().any(|key| key == request.key) {
            return Err(StoreError::Write {
                key: request.key.to_string(),
                source: "injected upload failure".into(),
            });
        }

        read_result.map_err(|err| StoreError::Write {
            key: request.key.to_string(),
            source: Box::new(err),
        })?;

        let mut metadata = HashMap::new();
        metadata.insert(HASH_METADATA_KEY.to_string(), request.digest.to_string());
        state
            .objects
            .insert(request.key.to_string(), StoredObject { metadata });
        state.puts.push(PutRecord {
            key: request.key.to_string(),
            content_type: request.content_type.to_string(),
            cache_control: request.cache_control.to_string(),
            digest: request.digest.to_string(),
        });

        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.fail_deletes {
            return Err(StoreError::Delete {
                source: "injected delete failure".into(),
            });
        }

        // Enforce the protocol limit the way the real store would
        if keys.len() > MAX_DELETE_BATCH {
            return Err(StoreError::Delete {
                source: format!("batch of {} keys exceeds limit", keys.len()).into(),
            });
        }

        for key in keys {
            state.objects.remove(key);
        }
        state.delete_calls.push(keys.to_vec());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_page_respects_marker_and_page_size() {
        let store = MemoryObjectStore::new().with_page_size(2);
        store.insert_object("a", None);
        store.insert_object("b", None);
        store.insert_object("c", None);

        let first = store.list_page(None).await.unwrap();
        assert_eq!(first.keys, vec!["a", "b"]);
        assert!(first.is_truncated);

        let second = store.list_page(Some("b")).await.unwrap();
        assert_eq!(second.keys, vec!["c"]);
        assert!(!second.is_truncated);
    }

    #[tokio::test]
    async fn test_delete_rejects_oversized_batch() {
        let store = MemoryObjectStore::new();
        let keys: Vec<String> = (0..MAX_DELETE_BATCH + 1).map(|i| format!("k{i}")).collect();
        assert!(matches!(
            store.delete_objects(&keys).await,
            Err(StoreError::Delete { .. })
        ));
    }
}
