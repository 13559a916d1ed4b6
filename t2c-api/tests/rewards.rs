//! Integration tests for the points/tier engine and vouchers

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use t2c_api::domain;
use t2c_api::email::EmailDispatcher;
use t2c_api::{db, Error};
use t2c_common::config::RewardsConfig;
use t2c_common::db::{Profile, RecyclingCentre, User, Voucher};
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

async fn seed_user_with_points(pool: &SqlitePool, name: &str, points: i64, tier: TierLevel) -> Uuid {
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
        points,
        tier,
        is_verified: true,
        is_seller: false,
        request_seller: false,
    };
    db::profiles::insert(pool, &profile).await.expect("insert profile");
    user.id
}

async fn seed_centre(pool: &SqlitePool) -> Uuid {
    let centre = RecyclingCentre {
        id: Uuid::new_v4(),
        name: "Greenpoint Depot".to_string(),
        email: "depot@example.com".to_string(),
        address: "1 Recycling Way".to_string(),
        latitude: 51.5,
        longitude: -0.1,
        opening_time: chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        closing_time: chrono::NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    };
    db::centres::insert(pool, &centre).await.expect("insert centre");
    centre.id
}

async fn seed_voucher(
    pool: &SqlitePool,
    centre_id: Uuid,
    tier: TierLevel,
    points: i64,
    expires_in_days: i64,
) -> Uuid {
    let voucher = Voucher {
        id: Uuid::new_v4(),
        name: "Free Coffee".to_string(),
        description: "One free coffee at the depot cafe".to_string(),
        tier,
        points,
        discount_amt: 2.5,
        centre_id,
        claimed_count: 0,
        claimable_count: 10,
        expiration_date: Utc::now().date_naive() + Duration::days(expires_in_days),
        is_active: true,
    };
    db::vouchers::insert(pool, &voucher).await.expect("insert voucher");
    voucher.id
}

#[tokio::test]
async fn tier_recomputation_is_idempotent_with_one_notification() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    // Stored tier lags the points: 3000 points still marked Bronze.
    let user = seed_user_with_points(&pool, "alice", 3000, TierLevel::Bronze).await;

    let profile = domain::profiles::recompute_tier(&pool, &bus, &config, user)
        .await
        .expect("recompute");
    assert_eq!(profile.tier, TierLevel::Silver);

    let unread = db::notifications::list_unread(&pool, user).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert!(unread[0].message.contains("upgraded"));
    assert!(unread[0].message.contains("Silver"));

    // Second recomputation with unchanged points does nothing.
    let again = domain::profiles::recompute_tier(&pool, &bus, &config, user)
        .await
        .expect("recompute again");
    assert_eq!(again.tier, TierLevel::Silver);
    let unread = db::notifications::list_unread(&pool, user).await.unwrap();
    assert_eq!(unread.len(), 1);
}

#[tokio::test]
async fn award_points_crossing_a_threshold_emits_tier_changed() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let user = seed_user_with_points(&pool, "alice", 2900, TierLevel::Bronze).await;

    let mut rx = bus.subscribe();
    let profile = domain::profiles::award_points(&pool, &bus, &config, user, 200)
        .await
        .expect("award");
    assert_eq!(profile.points, 3100);
    assert_eq!(profile.tier, TierLevel::Silver);

    let mut saw_tier_changed = false;
    while let Ok(event) = rx.try_recv() {
        if event.event_type() == "TierChanged" {
            saw_tier_changed = true;
        }
    }
    assert!(saw_tier_changed);
}

#[tokio::test]
async fn demotion_uses_different_wording() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let user = seed_user_with_points(&pool, "alice", 1000, TierLevel::Gold).await;

    let profile = domain::profiles::recompute_tier(&pool, &bus, &config, user)
        .await
        .expect("recompute");
    assert_eq!(profile.tier, TierLevel::Bronze);

    let unread = db::notifications::list_unread(&pool, user).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert!(!unread[0].message.contains("upgraded"));
    assert!(unread[0].message.contains("Bronze"));
}

#[tokio::test]
async fn redeem_with_insufficient_points_is_a_conflict() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let centre = seed_centre(&pool).await;
    let user = seed_user_with_points(&pool, "alice", 100, TierLevel::Bronze).await;
    let voucher = seed_voucher(&pool, centre, TierLevel::Bronze, 500, 30).await;

    let instance = domain::vouchers::claim(&pool, voucher, user).await.expect("claim");
    let err = domain::vouchers::redeem(&pool, &bus, &config, instance.id, user)
        .await
        .expect_err("not enough points");
    match err {
        Error::Conflict(msg) => assert!(msg.contains("not have enough points")),
        other => panic!("expected conflict, got {other:?}"),
    }

    // Nothing was deducted and the instance is still unredeemed.
    let profile = db::profiles::get(&pool, user).await.unwrap();
    assert_eq!(profile.points, 100);
    assert!(!db::vouchers::get_instance(&pool, instance.id).await.unwrap().redeemed);
}

#[tokio::test]
async fn redeem_deducts_points_and_may_demote() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let centre = seed_centre(&pool).await;
    let user = seed_user_with_points(&pool, "alice", 5000, TierLevel::Gold).await;
    let voucher = seed_voucher(&pool, centre, TierLevel::Bronze, 3000, 30).await;

    let instance = domain::vouchers::claim(&pool, voucher, user).await.expect("claim");
    let redeemed = domain::vouchers::redeem(&pool, &bus, &config, instance.id, user)
        .await
        .expect("redeem");
    assert!(redeemed.redeemed);

    let profile = db::profiles::get(&pool, user).await.unwrap();
    assert_eq!(profile.points, 2000);
    assert_eq!(profile.tier, TierLevel::Bronze);

    // Double redemption conflicts.
    let err = domain::vouchers::redeem(&pool, &bus, &config, instance.id, user)
        .await
        .expect_err("already redeemed");
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn claim_is_gated_on_tier() {
    let pool = test_pool().await;
    let centre = seed_centre(&pool).await;
    let user = seed_user_with_points(&pool, "alice", 100, TierLevel::Bronze).await;
    let voucher = seed_voucher(&pool, centre, TierLevel::Gold, 50, 30).await;

    let err = domain::vouchers::claim(&pool, voucher, user)
        .await
        .expect_err("tier too low");
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn use_voucher_requires_a_redeemed_instance() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let centre = seed_centre(&pool).await;
    let user = seed_user_with_points(&pool, "alice", 1000, TierLevel::Bronze).await;
    let voucher = seed_voucher(&pool, centre, TierLevel::Bronze, 500, 30).await;

    let instance = domain::vouchers::claim(&pool, voucher, user).await.expect("claim");
    let err = domain::vouchers::use_voucher(&pool, instance.id, user)
        .await
        .expect_err("not redeemed yet");
    assert!(matches!(err, Error::NotFound(_)));

    domain::vouchers::redeem(&pool, &bus, &config, instance.id, user)
        .await
        .expect("redeem");
    domain::vouchers::use_voucher(&pool, instance.id, user)
        .await
        .expect("use");
    assert!(matches!(
        db::vouchers::get_instance(&pool, instance.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn expiry_reminder_fires_exactly_once_across_sweeps() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let dispatcher = EmailDispatcher::Null;
    let centre = seed_centre(&pool).await;
    let user = seed_user_with_points(&pool, "alice", 1000, TierLevel::Bronze).await;
    // Expires in exactly the configured reminder window.
    let voucher = seed_voucher(
        &pool,
        centre,
        TierLevel::Bronze,
        500,
        config.voucher_reminder_days,
    )
    .await;
    domain::vouchers::claim(&pool, voucher, user).await.expect("claim");

    let first = domain::vouchers::send_expiry_reminders(&pool, &bus, &dispatcher, &config)
        .await
        .expect("first sweep");
    assert_eq!(first, 1);

    let second = domain::vouchers::send_expiry_reminders(&pool, &bus, &dispatcher, &config)
        .await
        .expect("second sweep");
    assert_eq!(second, 0);

    let unread = db::notifications::list_unread(&pool, user).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert!(unread[0].message.contains("expires"));
}

#[tokio::test]
async fn latest_item_drives_the_points_award() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let config = RewardsConfig::default();
    let centre = seed_centre(&pool).await;
    let user = seed_user_with_points(&pool, "alice", 0, TierLevel::Bronze).await;

    let now = Utc::now();
    let appt = t2c_common::db::Appointment {
        id: Uuid::new_v4(),
        user_id: Some(user),
        centre_id: centre,
        category: None,
        item_weight_kg: None,
        points_earned: None,
        date: now.date_naive(),
        time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        is_dropoff: true,
        driver_id: None,
        arrival_time: None,
        status: t2c_common::db::AppointmentStatus::Booked,
        created_at: now,
        updated_at: now,
    };
    db::appointments::insert(&pool, &appt).await.unwrap();

    // Older item, then the one the booking was made for.
    for (category, weight, age_mins) in [("paper", 1.0, 10), ("metal", 2.5, 0)] {
        let item = t2c_common::db::Item {
            id: Uuid::new_v4(),
            user_id: user,
            appointment_id: None,
            category: category.to_string(),
            confidence: 0.9,
            description: None,
            weight_kg: weight,
            labels: None,
            created_at: now - Duration::minutes(age_mins),
        };
        db::items::insert(&pool, &item).await.unwrap();
    }

    let points =
        domain::profiles::award_latest_item_points(&pool, &bus, &config, user, appt.id)
            .await
            .expect("award");
    // 2.5 kg of metal at 20 points/kg, not the older paper item.
    assert_eq!(points, 50);

    let profile = db::profiles::get(&pool, user).await.unwrap();
    assert_eq!(profile.points, 50);
    let stored = db::appointments::get(&pool, appt.id).await.unwrap();
    assert_eq!(stored.points_earned, Some(50));
}

#[tokio::test]
async fn otp_verification_rejects_wrong_and_expired_codes() {
    let pool = test_pool().await;
    let config = RewardsConfig::default();
    let user = seed_user_with_points(&pool, "alice", 0, TierLevel::Bronze).await;
    let email = "alice@example.com";

    let otp = t2c_common::db::Otp {
        id: Uuid::new_v4(),
        email: email.to_string(),
        code: "123456".to_string(),
        created_at: Utc::now(),
    };
    db::otps::insert(&pool, &otp).await.unwrap();

    let err = domain::profiles::verify_otp(&pool, &config, email, "000000")
        .await
        .expect_err("wrong code");
    assert!(matches!(err, Error::InvalidInput(_)));

    domain::profiles::verify_otp(&pool, &config, email, "123456")
        .await
        .expect("correct code");
    assert!(db::profiles::get(&pool, user).await.unwrap().is_verified);

    // An expired code for a second round is rejected.
    let stale = t2c_common::db::Otp {
        id: Uuid::new_v4(),
        email: email.to_string(),
        code: "654321".to_string(),
        created_at: Utc::now() - Duration::minutes(config.otp_expiry_minutes + 1),
    };
    db::otps::insert(&pool, &stale).await.unwrap();
    let err = domain::profiles::verify_otp(&pool, &config, email, "654321")
        .await
        .expect_err("expired code");
    assert!(matches!(err, Error::InvalidInput(_)));
}
