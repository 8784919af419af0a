use memesearch::Error;
use memesearch::db::MetaDB;
use rstest::*;
use tempfile::TempDir;

struct Store {
    _dir: TempDir,
    db: MetaDB,
}

#[fixture]
async fn store() -> Store {
    let dir = TempDir::new().unwrap();
    let db = MetaDB::open(dir.path().join("meta.db")).await.unwrap();
    Store { _dir: dir, db }
}

#[rstest]
#[tokio::test]
async fn insert_and_get(#[future] store: Store) {
    let store = store.await;
    let id1 = store.db.insert("/memes/a.png", "hello world").await.unwrap();
    let id2 = store.db.insert("/memes/b.png", "").await.unwrap();
    assert!(id2 > id1);

    let record = store.db.get(id1).await.unwrap();
    assert_eq!(record.id, id1);
    assert_eq!(record.path, "/memes/a.png");
    assert_eq!(record.ocr_text, "hello world");
    assert_eq!(store.db.get(id2).await.unwrap().ocr_text, "");

    assert!(store.db.contains_path("/memes/a.png").await.unwrap());
    assert!(!store.db.contains_path("/memes/c.png").await.unwrap());
    assert_eq!(store.db.count().await.unwrap(), 2);
}

#[rstest]
#[tokio::test]
async fn keyword_round_trip(#[future] store: Store) {
    let store = store.await;
    let id = store.db.insert("a.png", "hello world").await.unwrap();
    store.db.insert("b.png", "goodbye").await.unwrap();
    let hits = store.db.keyword_search("hello", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, id);
}

#[rstest]
#[tokio::test]
async fn duplicate_path(#[future] store: Store) {
    let store = store.await;
    store.db.insert("/memes/a.png", "first").await.unwrap();
    let result = store.db.insert("/memes/a.png", "second").await;
    assert!(matches!(result, Err(Error::DuplicateRecord(path)) if path == "/memes/a.png"));

    // 重复插入不会留下全文索引
    assert_eq!(store.db.count().await.unwrap(), 1);
    assert!(store.db.keyword_search("second", 10).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn get_unknown_id(#[future] store: Store) {
    let store = store.await;
    assert!(matches!(store.db.get(42).await, Err(Error::NotFound(42))));
}

#[rstest]
#[tokio::test]
async fn fetch_by_ids(#[future] store: Store) {
    let store = store.await;
    let a = store.db.insert("/a.png", "a").await.unwrap();
    let b = store.db.insert("/b.png", "b").await.unwrap();

    let records = store.db.fetch_by_ids(&[b, 1000, a]).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[&a].path, "/a.png");
    assert_eq!(records[&b].path, "/b.png");
    assert!(store.db.fetch_by_ids(&[]).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn keyword_search_ranking(#[future] store: Store) {
    let store = store.await;
    let cat = store.db.insert("/cat.png", "cat cat cat").await.unwrap();
    let both = store.db.insert("/both.png", "a cat and a dog and other things").await.unwrap();
    let dog = store.db.insert("/dog.png", "dog").await.unwrap();

    let hits = store.db.keyword_search("cat", 10).await.unwrap();
    let ids = hits.iter().map(|(id, _)| *id).collect::<Vec<_>>();
    assert_eq!(ids, vec![cat, both]);
    assert!(hits[0].1 >= hits[1].1);

    // 多个词之间为 AND
    let hits = store.db.keyword_search("dog cat", 10).await.unwrap();
    assert_eq!(hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![both]);

    let hits = store.db.keyword_search("DOG", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].0 == dog || hits[0].0 == both);
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
#[case::quote("\"")]
#[case::operators("cat OR dog* NEAR(")]
#[case::punctuation("-:^()")]
#[tokio::test]
async fn keyword_search_tolerates_any_input(#[future] store: Store, #[case] query: &str) {
    let store = store.await;
    store.db.insert("/cat.png", "cat").await.unwrap();
    assert!(store.db.keyword_search(query, 10).await.is_ok());
}

#[rstest]
#[tokio::test]
async fn keyword_search_zero_limit(#[future] store: Store) {
    let store = store.await;
    store.db.insert("/cat.png", "cat").await.unwrap();
    assert!(store.db.keyword_search("cat", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_existing_requires_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.db");
    assert!(matches!(MetaDB::open_existing(&path).await, Err(Error::ResourceLoad(_))));
    assert!(!path.exists());

    let db = MetaDB::open(&path).await.unwrap();
    let id = db.insert("/a.png", "persisted").await.unwrap();
    db.close().await;

    let db = MetaDB::open_existing(&path).await.unwrap();
    assert_eq!(db.get(id).await.unwrap().ocr_text, "persisted");
    assert_eq!(db.keyword_search("persisted", 5).await.unwrap().len(), 1);
}
