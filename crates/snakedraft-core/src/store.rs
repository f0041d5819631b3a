// Persistence seam for the draft state blob.

use std::sync::Mutex;

use anyhow::anyhow;
use serde_json::Value;

/// Durable storage for the serialized draft state.
///
/// The blob is opaque to implementations; shape validation happens in
/// `DraftState::from_json` when the engine loads it.
pub trait DraftStore {
    /// The last saved blob, or `None` if nothing was ever saved.
    fn load_blob(&self) -> anyhow::Result<Option<Value>>;

    fn save_blob(&self, blob: &Value) -> anyhow::Result<()>;
}

impl<S: DraftStore + ?Sized> DraftStore for &S {
    fn load_blob(&self) -> anyhow::Result<Option<Value>> {
        (**self).load_blob()
    }

    fn save_blob(&self, blob: &Value) -> anyhow::Result<()> {
        (**self).save_blob(blob)
    }
}

impl<S: DraftStore + ?Sized> DraftStore for std::sync::Arc<S> {
    fn load_blob(&self) -> anyhow::Result<Option<Value>> {
        (**self).load_blob()
    }

    fn save_blob(&self, blob: &Value) -> anyhow::Result<()> {
        (**self).save_blob(blob)
    }
}

/// In-process store. Holds one blob and counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    blob: Option<Value>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with a blob, as if saved by an earlier run.
    pub fn with_blob(blob: Value) -> Self {
        MemoryStore {
            inner: Mutex::new(MemoryInner {
                blob: Some(blob),
                saves: 0,
            }),
        }
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.inner.lock().map(|g| g.saves).unwrap_or(0)
    }

    pub fn blob(&self) -> Option<Value> {
        self.inner.lock().ok().and_then(|g| g.blob.clone())
    }
}

impl DraftStore for MemoryStore {
    fn load_blob(&self) -> anyhow::Result<Option<Value>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| anyhow!("memory store lock poisoned: {e}"))?;
        Ok(guard.blob.clone())
    }

    fn save_blob(&self, blob: &Value) -> anyhow::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| anyhow!("memory store lock poisoned: {e}"))?;
        guard.blob = Some(blob.clone());
        guard.saves += 1;
        Ok(())
    }
}
