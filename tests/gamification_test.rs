//! Gamification ledger and achievement tests: XP/level bookkeeping, streak
//! transitions, unlock idempotence, habit cap.

use chrono::NaiveDate;
use mamalink::cache::Cache;
use mamalink::db;
use mamalink::models::{habit::HabitDto, user_achievement, user_stats};
use mamalink::services::{achievement_service, habit_service, stats_service, ServiceError};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("bad test date")
}

fn habit_dto(title: &str) -> HabitDto {
    HabitDto {
        title: title.to_string(),
        emoji: None,
        color: None,
        position: None,
    }
}

#[tokio::test]
async fn absent_stats_render_as_zero_value_view() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    let view = stats_service::get_stats_view(&db, &cache, 42)
        .await
        .expect("Failed to get stats view");

    assert_eq!(view.xp, 0);
    assert_eq!(view.level, 1);
    assert_eq!(view.current_streak, 0);
    assert_eq!(view.longest_streak, 0);
    assert_eq!(view.total_completions, 0);
    assert_eq!(view.last_activity_date, None);

    // The view alone must not create a ledger row
    let row = user_stats::Entity::find()
        .filter(user_stats::Column::UserId.eq(42))
        .one(&db)
        .await
        .expect("query failed");
    assert!(row.is_none());
}

#[tokio::test]
async fn stats_view_cache_is_invalidated_by_ledger_mutations() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    // Prime the cached view
    let before = stats_service::get_stats_view(&db, &cache, 1)
        .await
        .expect("Failed to get stats view");
    assert_eq!(before.xp, 0);

    stats_service::record_completion(&db, &cache, 1, 10, 1)
        .await
        .expect("Failed to record completion");

    // The mutation must evict the pre-completion snapshot
    let after = stats_service::get_stats_view(&db, &cache, 1)
        .await
        .expect("Failed to get stats view");
    assert_eq!(after.xp, 10);
    assert_eq!(after.total_completions, 1);

    // Same for streak bookkeeping
    stats_service::record_streak_for_date(&db, &cache, 1, d("2024-03-01"))
        .await
        .expect("Failed to record streak");
    let after_streak = stats_service::get_stats_view(&db, &cache, 1)
        .await
        .expect("Failed to get stats view");
    assert_eq!(after_streak.current_streak, 1);
    assert_eq!(after_streak.last_activity_date.as_deref(), Some("2024-03-01"));
}

#[tokio::test]
async fn xp_never_goes_below_zero() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    stats_service::record_completion(&db, &cache, 1, 10, 1)
        .await
        .expect("Failed to record completion");

    // Apply far more decrements than increments
    for _ in 0..5 {
        let stats = stats_service::record_completion(&db, &cache, 1, -10, -1)
            .await
            .expect("Failed to record decrement");
        assert!(stats.xp >= 0);
        assert!(stats.total_completions >= 0);
    }

    let stats = stats_service::get_or_create_stats(&db, 1)
        .await
        .expect("Failed to load stats");
    assert_eq!(stats.xp, 0);
    assert_eq!(stats.total_completions, 0);
    assert_eq!(stats.level, 1);
}

#[tokio::test]
async fn level_is_always_derived_from_xp() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    let cases = [(0, 1), (90, 1), (100, 2), (150, 2), (200, 3), (1000, 11)];

    let mut current_xp = 0;
    for (target_xp, expected_level) in cases {
        let stats = stats_service::record_completion(&db, &cache, 2, target_xp - current_xp, 0)
            .await
            .expect("Failed to apply xp delta");
        current_xp = target_xp;
        assert_eq!(stats.xp, target_xp);
        assert_eq!(
            stats.level, expected_level,
            "xp {} should be level {}",
            target_xp, expected_level
        );
    }
}

#[tokio::test]
async fn consecutive_days_grow_the_streak() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    for (date, expected) in [("2024-03-01", 1), ("2024-03-02", 2), ("2024-03-03", 3)] {
        let stats = stats_service::record_streak_for_date(&db, &cache, 1, d(date))
            .await
            .expect("Failed to record streak");
        assert_eq!(stats.current_streak, expected);
        assert_eq!(stats.longest_streak, expected);
        assert_eq!(stats.last_activity_date.as_deref(), Some(date));
    }
}

#[tokio::test]
async fn same_day_event_leaves_streak_unchanged() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    stats_service::record_streak_for_date(&db, &cache, 1, d("2024-03-01"))
        .await
        .expect("Failed to record streak");
    let stats = stats_service::record_streak_for_date(&db, &cache, 1, d("2024-03-01"))
        .await
        .expect("Failed to record duplicate");

    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 1);
}

#[tokio::test]
async fn gap_resets_streak_but_keeps_longest() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    // Five consecutive days ending 2024-01-01
    for day in [
        "2023-12-28",
        "2023-12-29",
        "2023-12-30",
        "2023-12-31",
        "2024-01-01",
    ] {
        stats_service::record_streak_for_date(&db, &cache, 1, d(day))
            .await
            .expect("Failed to record streak");
    }

    // Four-day gap: streak restarts at 1, longest stays at 5
    let stats = stats_service::record_streak_for_date(&db, &cache, 1, d("2024-01-05"))
        .await
        .expect("Failed to record after gap");
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 5);
    assert_eq!(stats.last_activity_date.as_deref(), Some("2024-01-05"));
}

#[tokio::test]
async fn set_streak_maintains_longest_maximum() {
    let db = setup_test_db().await;
    let cache = Cache::new();

    stats_service::set_streak(&db, &cache, 1, 7, Some(d("2024-02-10")))
        .await
        .expect("Failed to set streak");
    let stats = stats_service::set_streak(&db, &cache, 1, 2, Some(d("2024-02-15")))
        .await
        .expect("Failed to lower streak");

    assert_eq!(stats.current_streak, 2);
    assert_eq!(stats.longest_streak, 7);
}

#[tokio::test]
async fn achievement_unlock_is_idempotent() {
    let db = setup_test_db().await;

    let first = achievement_service::unlock(&db, 1, "first_step")
        .await
        .expect("Failed to unlock");
    assert!(first.is_some());

    let second = achievement_service::unlock(&db, 1, "first_step")
        .await
        .expect("Second unlock should not error");
    assert!(second.is_none());

    let count = user_achievement::Entity::find()
        .filter(user_achievement::Column::UserId.eq(1))
        .count(&db)
        .await
        .expect("Failed to count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn thresholds_unlock_matching_achievements() {
    let db = setup_test_db().await;

    let stats = user_stats::Model {
        id: 0,
        user_id: 1,
        xp: 100,
        level: 2,
        current_streak: 3,
        longest_streak: 3,
        total_completions: 10,
        last_activity_date: Some("2024-03-03".to_string()),
        created_at: String::new(),
        updated_at: String::new(),
    };

    let mut unlocked = achievement_service::check_and_unlock(&db, 1, &stats)
        .await
        .expect("Failed to evaluate");
    unlocked.sort();

    assert_eq!(
        unlocked,
        vec!["completions_10", "first_step", "streak_3"],
        "counters past a threshold should unlock via >= checks"
    );

    // Re-evaluating the same snapshot unlocks nothing new
    let again = achievement_service::check_and_unlock(&db, 1, &stats)
        .await
        .expect("Failed to re-evaluate");
    assert!(again.is_empty());
}

#[tokio::test]
async fn habit_count_achievements_fire_on_creation() {
    let db = setup_test_db().await;

    let mut all_new = Vec::new();
    for i in 0..3 {
        let (_, new_achievements) =
            habit_service::create_habit(&db, 1, habit_dto(&format!("Habit {}", i)))
                .await
                .expect("Failed to create habit");
        all_new.extend(new_achievements);
    }

    assert_eq!(all_new, vec!["habits_3".to_string()]);
}

#[tokio::test]
async fn sixth_habit_is_rejected() {
    let db = setup_test_db().await;

    for i in 0..5 {
        habit_service::create_habit(&db, 1, habit_dto(&format!("Habit {}", i)))
            .await
            .expect("Failed to create habit");
    }

    let result = habit_service::create_habit(&db, 1, habit_dto("One too many")).await;
    assert!(matches!(result, Err(ServiceError::LimitExceeded(_))));

    // Nothing was persisted
    let count = mamalink::models::habit::Entity::find()
        .filter(mamalink::models::habit::Column::UserId.eq(1))
        .count(&db)
        .await
        .expect("Failed to count habits");
    assert_eq!(count, 5);
}

#[tokio::test]
async fn habit_title_is_validated() {
    let db = setup_test_db().await;

    let empty = habit_service::create_habit(&db, 1, habit_dto("   ")).await;
    assert!(matches!(empty, Err(ServiceError::InvalidState(_))));

    let long_title = "x".repeat(51);
    let too_long = habit_service::create_habit(&db, 1, habit_dto(&long_title)).await;
    assert!(matches!(too_long, Err(ServiceError::InvalidState(_))));
}
