
use super::*;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use crate::object_store::MemoryObjectStore;

fn engine_with(store: Arc<MemoryObjectStore>) -> TransferEngine {
    TransferEngine::new(Storage::with_object_store(store))
}

fn local_engine() -> TransferEngine {
    engine_with(Arc::new(MemoryObjectStore::new()))
}

fn dir_location(path: &Path) -> StorageLocation {
    // Trailing separator so the rendered paths read like configured ones.
    StorageLocation::parse(&format!("{}/", path.display()))
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn test_explicit_local_keys_keep_order_and_bytes() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    std::fs::write(src.path().join("a.txt"), "alpha").unwrap();
    std::fs::write(src.path().join("b.txt"), "bravo").unwrap();
    std::fs::write(src.path().join("c.txt"), "not selected").unwrap();

    let outcome = local_engine()
        .transfer(
            &dir_location(src.path()),
            &dir_location(dst.path()),
            &keys(&["b.txt", "a.txt"]),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.source_items(),
        vec![
            src.path().join("b.txt").display().to_string(),
            src.path().join("a.txt").display().to_string(),
        ]
    );
    assert_eq!(
        outcome.target_items(),
        vec![
            dst.path().join("b.txt").display().to_string(),
            dst.path().join("a.txt").display().to_string(),
        ]
    );
    assert_eq!(std::fs::read(dst.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(dst.path().join("b.txt")).unwrap(), b"bravo");
    assert!(!dst.path().join("c.txt").exists());
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn test_one_missing_key_among_ten() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let mut selected = Vec::new();
    for i in 0..10 {
        let name = format!("f{}.txt", i);
        if i != 4 {
            std::fs::write(src.path().join(&name), &name).unwrap();
        }
        selected.push(name);
    }

    let outcome = local_engine()
        .transfer(&dir_location(src.path()), &dir_location(dst.path()), &selected)
        .await
        .unwrap();

    assert_eq!(outcome.files_processed(), 9);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].item.ends_with("f4.txt"));
    assert!(!outcome.source_items().iter().any(|s| s.ends_with("f4.txt")));
    assert!(!outcome.target_items().iter().any(|s| s.ends_with("f4.txt")));
}

#[tokio::test]
async fn test_explicit_directory_key_expands() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    std::fs::create_dir_all(src.path().join("batch/inner")).unwrap();
    std::fs::write(src.path().join("batch/one.csv"), "1").unwrap();
    std::fs::write(src.path().join("batch/inner/two.csv"), "2").unwrap();

    let outcome = local_engine()
        .transfer(
            &dir_location(src.path()),
            &dir_location(dst.path()),
            &keys(&["batch"]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.files_processed(), 2);
    assert_eq!(std::fs::read_to_string(dst.path().join("batch/one.csv")).unwrap(), "1");
    assert_eq!(
        std::fs::read_to_string(dst.path().join("batch/inner/two.csv")).unwrap(),
        "2"
    );
}

#[tokio::test]
async fn test_local_enumeration_mirrors_tree() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    std::fs::create_dir_all(src.path().join("nested/empty")).unwrap();
    std::fs::write(src.path().join("top.txt"), "top").unwrap();
    std::fs::write(src.path().join("nested/deep.txt"), "deep").unwrap();

    let engine = local_engine();
    let source = dir_location(src.path());
    let target = dir_location(dst.path());

    let batch = engine.resolve_batch(&source, &target, &[]).await.unwrap();
    assert_eq!(
        batch.directories,
        vec![
            ItemRef::Local(dst.path().join("nested")),
            ItemRef::Local(dst.path().join("nested/empty")),
        ]
    );

    let outcome = engine.transfer(&source, &target, &[]).await.unwrap();
    assert_eq!(outcome.files_processed(), 2);
    assert_eq!(
        outcome.source_items(),
        vec![
            src.path().join("nested/deep.txt").display().to_string(),
            src.path().join("top.txt").display().to_string(),
        ]
    );
    assert!(dst.path().join("nested/empty").is_dir());
    assert_eq!(std::fs::read_to_string(dst.path().join("top.txt")).unwrap(), "top");
}

#[tokio::test]
async fn test_missing_local_root_is_fatal() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let err = local_engine()
        .transfer(
            &dir_location(&src.path().join("absent")),
            &dir_location(dst.path()),
            &[],
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_object_prefix_substitution() {
    let store = Arc::new(MemoryObjectStore::new().with_page_size(2));
    store.insert("bkt", "in/2024/a.csv", b"a".to_vec()).await;
    store.insert("bkt", "in/2024/sub/b.csv", b"b".to_vec()).await;
    store.insert("bkt", "in/2024/c.csv", b"c".to_vec()).await;
    store.insert("bkt", "in/2023/old.csv", b"old".to_vec()).await;

    let outcome = engine_with(store.clone())
        .transfer(
            &StorageLocation::parse("s3://bkt/in/2024/"),
            &StorageLocation::parse("s3://bkt2/out/2024/"),
            &[],
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.target_items(),
        vec![
            "s3://bkt2/out/2024/a.csv",
            "s3://bkt2/out/2024/c.csv",
            "s3://bkt2/out/2024/sub/b.csv",
        ]
    );
    assert_eq!(
        store.keys("bkt2").await,
        vec!["out/2024/a.csv", "out/2024/c.csv", "out/2024/sub/b.csv"]
    );
    assert_eq!(store.get("bkt2", "out/2024/sub/b.csv").await.unwrap(), b"b");
}

#[tokio::test]
async fn test_object_listing_failure_is_fatal() {
    let store = Arc::new(MemoryObjectStore::new().with_failing_key("in/"));
    let result = engine_with(store)
        .transfer(
            &StorageLocation::parse("s3://bkt/in/"),
            &StorageLocation::parse("s3://bkt2/out/"),
            &[],
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_object_explicit_key_failure_is_per_item() {
    let store = Arc::new(MemoryObjectStore::new().with_failing_key("in/bad.csv"));
    store.insert("bkt", "in/good.csv", b"g".to_vec()).await;
    store.insert("bkt", "in/bad.csv", b"b".to_vec()).await;

    let outcome = engine_with(store.clone())
        .transfer(
            &StorageLocation::parse("s3://bkt/in/"),
            &StorageLocation::parse("s3://bkt/out/"),
            &keys(&["bad.csv", "good.csv", "gone.csv"]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.source_items(), vec!["s3://bkt/in/good.csv"]);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(store.get("bkt", "out/good.csv").await.unwrap(), b"g");
}

#[tokio::test]
async fn test_object_to_local_transfer() {
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("bkt", "in/20240305/orders.csv", b"id,qty".to_vec()).await;
    let dst = TempDir::new().unwrap();

    let outcome = engine_with(store)
        .transfer(
            &StorageLocation::parse("s3://bkt/in/20240305/"),
            &dir_location(&dst.path().join("orders")),
            &[],
        )
        .await
        .unwrap();

    assert_eq!(outcome.files_processed(), 1);
    assert_eq!(
        std::fs::read(dst.path().join("orders/orders.csv")).unwrap(),
        b"id,qty"
    );
}

#[tokio::test]
async fn test_local_to_object_transfer() {
    let src = TempDir::new().unwrap();
    std::fs::create_dir_all(src.path().join("day")).unwrap();
    std::fs::write(src.path().join("day/x.json"), "{}").unwrap();
    let store = Arc::new(MemoryObjectStore::new());

    let outcome = engine_with(store.clone())
        .transfer(
            &dir_location(src.path()),
            &StorageLocation::parse("s3://bkt/landing/"),
            &[],
        )
        .await
        .unwrap();

    assert_eq!(outcome.target_items(), vec!["s3://bkt/landing/day/x.json"]);
    assert_eq!(store.get("bkt", "landing/day/x.json").await.unwrap(), b"{}");
}

#[tokio::test]
async fn test_missing_container_is_rejected() {
    let err = local_engine()
        .transfer(
            &StorageLocation::parse("s3://"),
            &StorageLocation::parse("s3://bkt/out/"),
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidLocation(_)));
}

#[tokio::test]
async fn test_concurrency_preserves_order() {
    let store = Arc::new(MemoryObjectStore::new());
    let mut expected = Vec::new();
    for i in 0..20 {
        let key = format!("in/{:02}.bin", i);
        store.insert("bkt", &key, vec![i as u8]).await;
        expected.push(format!("s3://bkt/{}", key));
    }

    for max in [1, 3, 16] {
        let outcome = engine_with(store.clone())
            .with_max_concurrent_items(max)
            .transfer(
                &StorageLocation::parse("s3://bkt/in/"),
                &StorageLocation::parse("s3://bkt/out/"),
                &[],
            )
            .await
            .unwrap();
        assert_eq!(outcome.source_items(), expected, "max_concurrent_items = {}", max);
    }
}

#[tokio::test]
async fn test_repeated_copy_is_idempotent() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    std::fs::write(src.path().join("a.txt"), "same").unwrap();

    let engine = local_engine();
    let source = dir_location(src.path());
    let target = dir_location(dst.path());
    let first = engine.transfer(&source, &target, &[]).await.unwrap();
    let second = engine.transfer(&source, &target, &[]).await.unwrap();

    assert_eq!(first.files_processed(), second.files_processed());
    assert_eq!(std::fs::read_to_string(dst.path().join("a.txt")).unwrap(), "same");
}

#[tokio::test]
async fn test_object_key_cannot_escape_local_target() {
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("bkt", "in/ok.csv", b"ok".to_vec()).await;
    store.insert("bkt", "in/../../escaped.txt", b"evil".to_vec()).await;
    let root = TempDir::new().unwrap();
    let dst = root.path().join("a/b");

    let outcome = engine_with(store)
        .transfer(&StorageLocation::parse("s3://bkt/in/"), &dir_location(&dst), &[])
        .await
        .unwrap();

    assert_eq!(outcome.target_items(), vec![dst.join("ok.csv").display().to_string()]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].item, "s3://bkt/in/../../escaped.txt");
    assert!(!root.path().join("escaped.txt").exists());
    assert!(!root.path().join("a/escaped.txt").exists());
}

#[tokio::test]
async fn test_explicit_key_with_parent_component_is_per_item() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    std::fs::create_dir_all(src.path().join("in")).unwrap();
    std::fs::write(src.path().join("in/a.txt"), "a").unwrap();
    std::fs::write(src.path().join("secret.txt"), "s").unwrap();

    let outcome = local_engine()
        .transfer(
            &dir_location(&src.path().join("in")),
            &dir_location(&dst.path().join("out")),
            &keys(&["a.txt", "../secret.txt"]),
        )
        .await
        .unwrap();

    assert_eq!(outcome.files_processed(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert!(!dst.path().join("secret.txt").exists());
}

#[tokio::test]
async fn test_folder_markers_become_local_directories() {
    let store = Arc::new(MemoryObjectStore::new());
    store.insert("bkt", "in/", Vec::new()).await;
    store.insert("bkt", "in/empty/", Vec::new()).await;
    store.insert("bkt", "in/data/", Vec::new()).await;
    store.insert("bkt", "in/data/a.csv", b"a".to_vec()).await;
    let dst = TempDir::new().unwrap();

    let outcome = engine_with(store)
        .transfer(&StorageLocation::parse("s3://bkt/in/"), &dir_location(dst.path()), &[])
        .await
        .unwrap();

    assert_eq!(outcome.files_processed(), 1);
    assert!(outcome.failures.is_empty());
    assert!(dst.path().join("empty").is_dir());
    assert_eq!(std::fs::read(dst.path().join("data/a.csv")).unwrap(), b"a");
}

#[tokio::test]
async fn test_same_source_and_target_keeps_content() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "payload").unwrap();
    let location = dir_location(dir.path());

    let outcome = local_engine()
        .transfer(&location, &location, &[])
        .await
        .unwrap();

    assert_eq!(outcome.files_processed(), 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "payload");
}
