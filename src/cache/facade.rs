use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::{decode, encode, replay, Buffers};
use crate::store::BackingStore;

struct FacadeState {
  store: Option<Arc<dyn BackingStore>>,
  suspended: bool,
  buffers: Buffers,
}

/// Single-owner cache with dirty tracking and transaction buffering.
///
/// When not suspended and a store is attached, operations write through
/// immediately. While suspended (or while no store is attached) they land in
/// an in-memory overlay; `spill` pushes the accumulated state into the store
/// in one pass. Missing a store is not an error: lookups degrade to
/// overlay-only results and `is_dirty` fails open to stale.
pub struct ObjectCacheFacade {
  owner: Uuid,
  state: Mutex<FacadeState>,
}

impl ObjectCacheFacade {
  pub fn new(owner: Uuid) -> Self {
    Self {
      owner,
      state: Mutex::new(FacadeState {
        store: None,
        suspended: false,
        buffers: Buffers::default(),
      }),
    }
  }

  pub fn with_store(owner: Uuid, store: Arc<dyn BackingStore>) -> Self {
    Self {
      owner,
      state: Mutex::new(FacadeState {
        store: Some(store),
        suspended: false,
        buffers: Buffers::default(),
      }),
    }
  }

  pub fn owner(&self) -> Uuid {
    self.owner
  }

  pub fn is_suspended(&self) -> bool {
    self.state.lock().suspended
  }

  /// Enter transaction mode: until `spill`, writes and removals accumulate
  /// in the overlay instead of reaching the store.
  pub fn suspend(&self) {
    self.state.lock().suspended = true;
  }

  /// End transaction mode and push buffered state into the store. The lock
  /// is held only to snapshot and clear the buffers; callers writing during
  /// the replay land in a fresh overlay generation and are not lost. With no
  /// store attached, suspension ends but the buffered content is retained
  /// for a later `attach_store`.
  pub async fn spill(&self) {
    let (store, buffers) = {
      let mut state = self.state.lock();
      state.suspended = false;
      match state.store.clone() {
        Some(store) => (store, mem::take(&mut state.buffers)),
        None => return,
      }
    };
    replay(&store, self.owner, buffers).await;
  }

  /// Rebind the store. The swap is an implicit spill: any pre-existing
  /// overlay content is pushed into the new store and suspension ends.
  pub async fn attach_store(&self, store: Arc<dyn BackingStore>) {
    let buffers = {
      let mut state = self.state.lock();
      state.suspended = false;
      state.store = Some(store.clone());
      mem::take(&mut state.buffers)
    };
    if !buffers.is_empty() {
      replay(&store, self.owner, buffers).await;
    }
  }

  pub async fn set<T>(&self, key: &str, value: &T, dirty: bool)
  where
    T: Serialize + ?Sized,
  {
    let Some(bytes) = encode(value) else { return };
    let store = {
      let mut state = self.state.lock();
      if state.suspended || state.store.is_none() {
        state.buffers.insert(key, bytes, dirty);
        return;
      }
      state.store.clone()
    };
    if let Some(store) = store {
      store.set(self.owner, key, bytes, dirty).await;
    }
  }

  /// Pure lookup: overlay first (a pending removal masks the store), then
  /// the store. Never triggers recomputation.
  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, anyhow::Error> {
    let (buffered, store) = {
      let state = self.state.lock();
      (state.buffers.lookup(key), state.store.clone())
    };
    match buffered {
      Some(Some(bytes)) => decode(&bytes).map(Some),
      Some(None) => Ok(None),
      None => match store {
        Some(store) => match store.get(self.owner, key).await? {
          Some(bytes) => decode(&bytes).map(Some),
          None => Ok(None),
        },
        None => Ok(None),
      },
    }
  }

  pub async fn remove(&self, key: &str) {
    let store = {
      let mut state = self.state.lock();
      if state.suspended || state.store.is_none() {
        state.buffers.remove(key);
        return;
      }
      state.store.clone()
    };
    if let Some(store) = store {
      store.remove(self.owner, key).await;
    }
  }

  pub async fn is_dirty(&self, key: &str) -> bool {
    let (buffered, store) = {
      let state = self.state.lock();
      (state.buffers.dirty_state(key), state.store.clone())
    };
    match buffered {
      Some(flag) => flag,
      None => match store {
        Some(store) => store.is_dirty(self.owner, key).await,
        None => true,
      },
    }
  }

  pub async fn mark_dirty(&self, key: &str, dirty: bool) {
    let store = {
      let mut state = self.state.lock();
      if state.suspended || state.store.is_none() {
        state.buffers.mark_dirty(key, dirty);
        return;
      }
      state.store.clone()
    };
    if let Some(store) = store {
      store.mark_dirty(self.owner, key, dirty).await;
    }
  }

  /// Owner teardown: drop every buffered and stored entry of this owner.
  /// Teardown is immediate, not part of any transaction in progress.
  pub async fn clear(&self) {
    let store = {
      let mut state = self.state.lock();
      state.buffers = Buffers::default();
      state.store.clone()
    };
    if let Some(store) = store {
      store.remove_owner(self.owner).await;
    }
  }
}
