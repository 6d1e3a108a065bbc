use std::sync::Arc;

use framestash::{BackingStore, DurableStore, InMemoryStore, SuspendableOverlay};
use uuid::Uuid;

#[tokio::test]
async fn one_burst_spans_many_owners() {
  let store = Arc::new(InMemoryStore::new());
  let overlay = SuspendableOverlay::new(store.clone());
  let a = Uuid::new_v4();
  let b = Uuid::new_v4();

  overlay.suspend();
  overlay.set(a, "thumbnail", &vec![1u8], false).await;
  overlay.set(b, "thumbnail", &vec![2u8], true).await;

  // Transparent before the spill, invisible below it.
  assert_eq!(
    overlay.get::<Vec<u8>>(a, "thumbnail").await.unwrap(),
    Some(vec![1])
  );
  assert!(store.is_empty());

  overlay.spill().await;
  assert_eq!(store.len(), 2);
  assert_eq!(store.get(a, "thumbnail").await.unwrap(), Some(vec![1]));
  assert!(store.is_dirty(b, "thumbnail").await);
  assert!(!store.is_dirty(a, "thumbnail").await);
}

#[tokio::test]
async fn writes_through_when_not_suspended() {
  let store = Arc::new(InMemoryStore::new());
  let overlay = SuspendableOverlay::new(store.clone());
  let owner = Uuid::new_v4();

  overlay.set(owner, "histogram", &vec![4u8], false).await;
  assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn last_operation_wins_per_owner() {
  let store = Arc::new(InMemoryStore::new());
  let overlay = SuspendableOverlay::new(store.clone());
  let a = Uuid::new_v4();
  let b = Uuid::new_v4();

  overlay.set(b, "h", &vec![0u8], false).await;

  overlay.suspend();
  overlay.set(a, "h", &vec![1u8], false).await;
  overlay.remove(a, "h").await;
  overlay.remove(b, "h").await;
  overlay.set(b, "h", &vec![2u8], false).await;
  overlay.spill().await;

  assert_eq!(store.get(a, "h").await.unwrap(), None);
  assert_eq!(store.get(b, "h").await.unwrap(), Some(vec![2]));
}

#[tokio::test]
async fn unbuffered_owner_falls_through_to_store() {
  let store = Arc::new(InMemoryStore::new());
  let settled = Uuid::new_v4();
  store.set(settled, "thumbnail", vec![7], false).await;

  let overlay = SuspendableOverlay::new(store.clone());
  overlay.suspend();

  assert_eq!(
    overlay.get::<Vec<u8>>(settled, "thumbnail").await.unwrap(),
    Some(vec![7])
  );
  assert!(!overlay.is_dirty(settled, "thumbnail").await);
  assert!(overlay.is_dirty(Uuid::new_v4(), "thumbnail").await);
}

#[tokio::test]
async fn remove_owner_is_scoped_and_immediate() {
  let store = Arc::new(InMemoryStore::new());
  let overlay = SuspendableOverlay::new(store.clone());
  let a = Uuid::new_v4();
  let b = Uuid::new_v4();

  overlay.set(a, "thumbnail", &vec![1u8], false).await;
  overlay.set(b, "thumbnail", &vec![2u8], false).await;

  overlay.suspend();
  overlay.set(a, "histogram", &vec![3u8], false).await;
  overlay.remove_owner(a).await;
  overlay.spill().await;

  assert_eq!(overlay.get::<Vec<u8>>(a, "thumbnail").await.unwrap(), None);
  assert_eq!(overlay.get::<Vec<u8>>(a, "histogram").await.unwrap(), None);
  assert_eq!(
    overlay.get::<Vec<u8>>(b, "thumbnail").await.unwrap(),
    Some(vec![2])
  );
}

#[tokio::test]
async fn spill_into_durable_store() {
  let store = Arc::new(DurableStore::in_memory().unwrap());
  let overlay = SuspendableOverlay::new(store.clone());
  let owner = Uuid::new_v4();

  overlay.suspend();
  for i in 0..16u8 {
    overlay.set(owner, &format!("frame-{i}"), &vec![i], false).await;
  }
  overlay.spill().await;

  for i in 0..16u8 {
    assert_eq!(
      overlay
        .get::<Vec<u8>>(owner, &format!("frame-{i}"))
        .await
        .unwrap(),
      Some(vec![i])
    );
  }
  store.close().await;
}
