use framestash::{BackingStore, InMemoryStore};
use uuid::Uuid;

#[tokio::test]
async fn round_trip() {
  let store = InMemoryStore::new();
  let owner = Uuid::new_v4();

  store.set(owner, "thumbnail", vec![1, 2, 3], false).await;
  assert_eq!(
    store.get(owner, "thumbnail").await.unwrap(),
    Some(vec![1, 2, 3])
  );
}

#[tokio::test]
async fn overwrite_replaces_value_and_flag() {
  let store = InMemoryStore::new();
  let owner = Uuid::new_v4();

  store.set(owner, "histogram", vec![1], true).await;
  store.set(owner, "histogram", vec![2], false).await;

  assert_eq!(store.get(owner, "histogram").await.unwrap(), Some(vec![2]));
  assert!(!store.is_dirty(owner, "histogram").await);
}

#[tokio::test]
async fn absent_entry_is_dirty() {
  let store = InMemoryStore::new();
  assert!(store.is_dirty(Uuid::new_v4(), "anything").await);
}

#[tokio::test]
async fn mark_dirty_round_trip() {
  let store = InMemoryStore::new();
  let owner = Uuid::new_v4();

  store.set(owner, "thumbnail", vec![9], true).await;
  assert!(store.is_dirty(owner, "thumbnail").await);

  store.mark_dirty(owner, "thumbnail", false).await;
  assert!(!store.is_dirty(owner, "thumbnail").await);
}

#[tokio::test]
async fn mark_dirty_on_absent_entry_changes_nothing() {
  let store = InMemoryStore::new();
  let owner = Uuid::new_v4();

  store.mark_dirty(owner, "ghost", false).await;
  assert!(store.is_empty());
  assert!(store.is_dirty(owner, "ghost").await);
}

#[tokio::test]
async fn remove_deletes_entry() {
  let store = InMemoryStore::new();
  let owner = Uuid::new_v4();

  store.set(owner, "thumbnail", vec![1], false).await;
  store.remove(owner, "thumbnail").await;

  assert_eq!(store.get(owner, "thumbnail").await.unwrap(), None);
  assert!(store.is_empty());

  // Removing again is a no-op.
  store.remove(owner, "thumbnail").await;
}

#[tokio::test]
async fn remove_owner_is_scoped() {
  let store = InMemoryStore::new();
  let a = Uuid::new_v4();
  let b = Uuid::new_v4();

  store.set(a, "thumbnail", vec![1], false).await;
  store.set(a, "histogram", vec![2], false).await;
  store.set(b, "thumbnail", vec![3], false).await;

  store.remove_owner(a).await;

  assert_eq!(store.len(), 1);
  assert_eq!(store.get(a, "thumbnail").await.unwrap(), None);
  assert_eq!(store.get(b, "thumbnail").await.unwrap(), Some(vec![3]));
}
