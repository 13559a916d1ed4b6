//! Integration tests for the notification side-channel

use chrono::Utc;
use sqlx::SqlitePool;
use t2c_api::db;
use t2c_common::db::{Profile, User};
use t2c_common::events::EventBus;
use t2c_common::rewards::TierLevel;
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

async fn seed_user(pool: &SqlitePool, name: &str) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        username: name.to_string(),
        email: format!("{name}@example.com"),
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        created_at: Utc::now(),
    };
    db::users::insert(pool, &user).await.expect("insert user");
    let profile = Profile {
        user_id: user.id,
        street: String::new(),
        city: String::new(),
        postcode: String::new(),
        points: 0,
        tier: TierLevel::Bronze,
        is_verified: true,
        is_seller: false,
        request_seller: false,
    };
    db::profiles::insert(pool, &profile).await.expect("insert profile");
    user.id
}

#[tokio::test]
async fn unread_list_is_newest_first_and_unread_only() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let user = seed_user(&pool, "alice").await;

    let first = db::notifications::create(&pool, &bus, user, "first".into())
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = db::notifications::create(&pool, &bus, user, "second".into())
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let third = db::notifications::create(&pool, &bus, user, "third".into())
        .await
        .unwrap();

    db::notifications::mark_read(&pool, second.id, user).await.unwrap();

    let unread = db::notifications::list_unread(&pool, user).await.unwrap();
    let ids: Vec<Uuid> = unread.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);
}

#[tokio::test]
async fn mark_read_flips_only_the_targeted_row() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let alice = seed_user(&pool, "alice").await;
    let bob = seed_user(&pool, "bob").await;

    let mine = db::notifications::create(&pool, &bus, alice, "mine".into())
        .await
        .unwrap();
    let theirs = db::notifications::create(&pool, &bus, bob, "theirs".into())
        .await
        .unwrap();

    // Alice cannot mark bob's notification.
    assert_eq!(
        db::notifications::mark_read(&pool, theirs.id, alice).await.unwrap(),
        0
    );
    assert_eq!(
        db::notifications::mark_read(&pool, mine.id, alice).await.unwrap(),
        1
    );

    assert!(db::notifications::list_unread(&pool, alice).await.unwrap().is_empty());
    assert_eq!(db::notifications::list_unread(&pool, bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn mark_all_read_returns_the_count_marked() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let user = seed_user(&pool, "alice").await;

    for i in 0..3 {
        db::notifications::create(&pool, &bus, user, format!("message {i}"))
            .await
            .unwrap();
    }

    assert_eq!(db::notifications::mark_all_read(&pool, user).await.unwrap(), 3);
    assert!(db::notifications::list_unread(&pool, user).await.unwrap().is_empty());
    // Re-running marks nothing further.
    assert_eq!(db::notifications::mark_all_read(&pool, user).await.unwrap(), 0);
}

#[tokio::test]
async fn every_append_is_announced_on_the_bus() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let user = seed_user(&pool, "alice").await;

    let mut rx = bus.subscribe();
    let created = db::notifications::create(&pool, &bus, user, "hello".into())
        .await
        .unwrap();

    let event = rx.try_recv().expect("event on the bus");
    assert_eq!(event.event_type(), "NotificationCreated");
    match event {
        t2c_common::events::DomainEvent::NotificationCreated {
            notification_id, user_id, ..
        } => {
            assert_eq!(notification_id, created.id);
            assert_eq!(user_id, user);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
