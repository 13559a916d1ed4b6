//! Integration tests for centre listing and the category junction

use chrono::NaiveTime;
use sqlx::SqlitePool;
use t2c_api::db;
use t2c_common::db::{Category, RecyclingCentre};
use uuid::Uuid;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    t2c_common::db::create_schema(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

async fn seed_centre(pool: &SqlitePool, name: &str) -> Uuid {
    let centre = RecyclingCentre {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{name}@example.com"),
        address: "1 Recycling Way".to_string(),
        latitude: 51.5,
        longitude: -0.1,
        opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        closing_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    };
    db::centres::insert(pool, &centre).await.expect("insert centre");
    centre.id
}

async fn seed_category(pool: &SqlitePool, name: &str) -> Uuid {
    let category = Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    db::centres::insert_category(pool, &category)
        .await
        .expect("insert category");
    category.id
}

#[tokio::test]
async fn category_filter_restricts_the_listing() {
    let pool = test_pool().await;
    let glass_depot = seed_centre(&pool, "Glass Depot").await;
    let metal_yard = seed_centre(&pool, "Metal Yard").await;

    let glass = seed_category(&pool, "glass").await;
    let metal = seed_category(&pool, "metal").await;
    db::centres::link_category(&pool, glass_depot, glass).await.unwrap();
    db::centres::link_category(&pool, metal_yard, metal).await.unwrap();
    db::centres::link_category(&pool, metal_yard, glass).await.unwrap();

    let all = db::centres::list(&pool, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let glass_only = db::centres::list(&pool, Some("glass")).await.unwrap();
    assert_eq!(glass_only.len(), 2);

    let metal_only = db::centres::list(&pool, Some("metal")).await.unwrap();
    assert_eq!(metal_only.len(), 1);
    assert_eq!(metal_only[0].id, metal_yard);

    let none = db::centres::list(&pool, Some("furniture")).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn linking_a_category_twice_is_harmless() {
    let pool = test_pool().await;
    let centre = seed_centre(&pool, "Glass Depot").await;
    let glass = seed_category(&pool, "glass").await;

    db::centres::link_category(&pool, centre, glass).await.unwrap();
    db::centres::link_category(&pool, centre, glass).await.unwrap();

    let listed = db::centres::list(&pool, Some("glass")).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn categories_list_alphabetically() {
    let pool = test_pool().await;
    seed_category(&pool, "plastic").await;
    seed_category(&pool, "glass").await;
    seed_category(&pool, "metal").await;

    let names: Vec<String> = db::centres::list_categories(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["glass", "metal", "plastic"]);
}
