//! Tests for database initialization
//!
//! File creation on first run, idempotent re-open, and enforcement of the
//! schema-level invariants (non-negative points, coordinate ranges).

use sqlx::SqlitePool;
use t2c_common::db::init::{create_schema, init_database};
use tempfile::TempDir;

#[tokio::test]
async fn creates_the_database_file_on_first_run() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("trash2cash.db");
    assert!(!db_path.exists());

    let pool = init_database(&db_path).await.expect("init");
    assert!(db_path.exists(), "database file was not created");
    drop(pool);
}

#[tokio::test]
async fn reopening_an_existing_database_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("trash2cash.db");

    let pool1 = init_database(&db_path).await.expect("first init");
    drop(pool1);
    // Second open re-runs every CREATE TABLE IF NOT EXISTS without error.
    let pool2 = init_database(&db_path).await.expect("second init");

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool2)
            .await
            .expect("list tables");
    for expected in [
        "appointments",
        "notifications",
        "profiles",
        "recycling_centres",
        "users",
        "voucher_instances",
        "vouchers",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }
}

#[tokio::test]
async fn creates_missing_parent_directories() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("nested/data/trash2cash.db");

    init_database(&db_path).await.expect("init with nested path");
    assert!(db_path.exists());
}

#[tokio::test]
async fn schema_rejects_negative_points() {
    let pool = SqlitePool::connect("sqlite::memory:").await.expect("pool");
    create_schema(&pool).await.expect("schema");

    sqlx::query("INSERT INTO users (id, username, email, created_at) VALUES ('u1', 'a', 'a@x', '2026-01-01T00:00:00Z')")
        .execute(&pool)
        .await
        .expect("insert user");

    let result = sqlx::query("INSERT INTO profiles (user_id, points) VALUES ('u1', -5)")
        .execute(&pool)
        .await;
    assert!(result.is_err(), "negative points must violate the CHECK");
}

#[tokio::test]
async fn schema_rejects_out_of_range_coordinates() {
    let pool = SqlitePool::connect("sqlite::memory:").await.expect("pool");
    create_schema(&pool).await.expect("schema");

    let result = sqlx::query(
        "INSERT INTO recycling_centres (id, name, latitude, longitude, opening_time, closing_time) \
         VALUES ('c1', 'Bad', 123.0, 0.0, '08:00:00', '18:00:00')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "latitude outside -90..90 must violate the CHECK");
}
