use crate::db::*;
use crate::error::{DatabaseError, Error};
use crate::types::BlockRecord;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_lookup_missing_block_is_none() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    assert!(db.lookup(19_000_000).await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_store_then_lookup_preserves_large_values() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    // Well beyond i64::MAX so the text encoding is exercised
    let record = BlockRecord {
        number: 19_000_000,
        timestamp: 1_705_000_000,
        gas_used: 29_999_123,
        tips: u128::MAX - 7,
    };
    db.store(&record).await.unwrap();

    let cached = db.lookup(19_000_000).await.unwrap();
    assert_eq!(cached, Some(record));

    db.close().await;
}

#[tokio::test]
async fn test_store_is_insert_or_replace() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let record = BlockRecord {
        number: 5,
        timestamp: 10,
        gas_used: 20,
        tips: 30,
    };
    db.store(&record).await.unwrap();
    db.store(&record).await.unwrap();

    assert_eq!(db.count_cached_blocks().await.unwrap(), 1);
    assert_eq!(db.lookup(5).await.unwrap(), Some(record));

    db.close().await;
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    let record = BlockRecord {
        number: 42,
        timestamp: 1,
        gas_used: 2,
        tips: 3,
    };

    let db = Database::new(temp_file.path()).await.unwrap();
    db.store(&record).await.unwrap();
    db.close().await;

    let db = Database::new(temp_file.path()).await.unwrap();
    assert_eq!(db.lookup(42).await.unwrap(), Some(record));
    db.close().await;
}

#[tokio::test]
async fn test_corrupt_row_is_reported_not_panicked() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    sqlx::query(
        "INSERT INTO block_cache (block_num, timestamp, gas_used, total_tips) VALUES (7, 1, 'lots', '0')",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let err = db.lookup(7).await.unwrap_err();
    assert!(
        matches!(err, Error::Database(DatabaseError::CorruptRow(_))),
        "expected CorruptRow, got {err:?}"
    );

    db.close().await;
}

#[tokio::test]
async fn test_block_number_beyond_sqlite_range_is_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    assert!(db.lookup(u64::MAX - 1).await.is_err());

    db.close().await;
}
