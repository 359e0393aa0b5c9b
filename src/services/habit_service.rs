//! Habit Aggregator - habit CRUD plus the completion pipeline that feeds the
//! gamification ledger and achievement evaluator.

use chrono::{Duration, Local, NaiveDate, Utc};
use sea_orm::*;
use std::collections::{HashMap, HashSet};

use super::stats_service::StatsView;
use super::streak::calculate_streak;
use super::{achievement_service, stats_service, ServiceError, DATE_FMT};
use crate::cache::{Cache, HABITS_CACHE_TTL};
use crate::models::habit::{self, Entity as Habit, HabitDto};
use crate::models::habit_completion::{self, Entity as HabitCompletion};

/// Maximum habits a user may track at once.
pub const MAX_HABITS: u64 = 5;
/// Lookback window for streak computation, matching the calculator's cap.
const COMPLETION_WINDOW_DAYS: i64 = 365;

fn completions_cache_key(user_id: i32, window_start: NaiveDate, today: NaiveDate) -> String {
    format!(
        "habits:{}:{}:{}",
        user_id,
        window_start.format(DATE_FMT),
        today.format(DATE_FMT)
    )
}

/// A habit enriched with today's completion flag and its current streak.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HabitWithStats {
    #[serde(flatten)]
    pub habit: habit::Model,
    pub completed_today: bool,
    pub streak: u32,
    pub completed_at: Option<String>,
}

/// Result of a completion / un-completion event.
#[derive(Debug)]
pub struct CompletionOutcome {
    /// True when the habit was already in the requested state, so nothing
    /// was mutated.
    pub already_completed: bool,
    pub stats: StatsView,
    pub new_achievements: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WeekStats {
    pub completed: u64,
    pub total: u64,
}

#[derive(Debug, serde::Deserialize)]
pub struct ReorderItem {
    pub id: i32,
    pub position: i32,
}

/// The user's habits with per-habit completion state, as of today.
pub async fn get_habits_with_stats(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
) -> Result<Vec<HabitWithStats>, ServiceError> {
    get_habits_with_stats_on(db, cache, user_id, Local::now().date_naive()).await
}

pub async fn get_habits_with_stats_on(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    today: NaiveDate,
) -> Result<Vec<HabitWithStats>, ServiceError> {
    let habits = Habit::find()
        .filter(habit::Column::UserId.eq(user_id))
        .order_by_asc(habit::Column::Position)
        .all(db)
        .await?;

    if habits.is_empty() {
        return Ok(Vec::new());
    }

    let window_start = today - Duration::days(COMPLETION_WINDOW_DAYS);
    let completions =
        load_completions_cached(db, cache, user_id, &habits, window_start, today).await?;

    // One pass over the batched rows: per-habit date sets plus today's
    // completion timestamps
    let today_str = today.format(DATE_FMT).to_string();
    let mut dates_by_habit: HashMap<i32, HashSet<NaiveDate>> = HashMap::new();
    let mut completed_at_today: HashMap<i32, String> = HashMap::new();

    for completion in &completions {
        if let Ok(date) = NaiveDate::parse_from_str(&completion.date, DATE_FMT) {
            dates_by_habit
                .entry(completion.habit_id)
                .or_default()
                .insert(date);
        }
        if completion.date == today_str {
            completed_at_today.insert(completion.habit_id, completion.completed_at.clone());
        }
    }

    let empty = HashSet::new();
    let result = habits
        .into_iter()
        .map(|habit| {
            let dates = dates_by_habit.get(&habit.id).unwrap_or(&empty);
            HabitWithStats {
                completed_today: dates.contains(&today),
                streak: calculate_streak(dates, today),
                completed_at: completed_at_today.get(&habit.id).cloned(),
                habit,
            }
        })
        .collect();

    Ok(result)
}

/// Fetch the completion window through the cache. One batched range query
/// covers every habit; querying per habit per day would be
/// O(habits x days).
async fn load_completions_cached(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    habits: &[habit::Model],
    window_start: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<habit_completion::Model>, ServiceError> {
    let key = completions_cache_key(user_id, window_start, today);

    if let Some(cached) = cache.get(&key) {
        if let Ok(completions) = serde_json::from_value::<Vec<habit_completion::Model>>(cached) {
            return Ok(completions);
        }
    }

    let habit_ids: Vec<i32> = habits.iter().map(|h| h.id).collect();
    let completions = HabitCompletion::find()
        .filter(habit_completion::Column::HabitId.is_in(habit_ids))
        .filter(habit_completion::Column::Date.gte(window_start.format(DATE_FMT).to_string()))
        .filter(habit_completion::Column::Date.lte(today.format(DATE_FMT).to_string()))
        .all(db)
        .await?;

    if let Ok(value) = serde_json::to_value(&completions) {
        cache.set(&key, value, HABITS_CACHE_TTL);
    }

    Ok(completions)
}

/// Completions over the trailing 7 days versus the maximum possible.
///
/// `total` is habit_count x 7 even for habits created mid-week, so a fresh
/// habit drags the ratio down. Known overcount, kept deliberately.
pub async fn get_week_stats(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<WeekStats, ServiceError> {
    get_week_stats_on(db, user_id, Local::now().date_naive()).await
}

pub async fn get_week_stats_on(
    db: &DatabaseConnection,
    user_id: i32,
    today: NaiveDate,
) -> Result<WeekStats, ServiceError> {
    let habit_count = Habit::find()
        .filter(habit::Column::UserId.eq(user_id))
        .count(db)
        .await?;

    if habit_count == 0 {
        return Ok(WeekStats {
            completed: 0,
            total: 0,
        });
    }

    let week_start = today - Duration::days(6);
    let completed = HabitCompletion::find()
        .filter(habit_completion::Column::UserId.eq(user_id))
        .filter(habit_completion::Column::Date.gte(week_start.format(DATE_FMT).to_string()))
        .filter(habit_completion::Column::Date.lte(today.format(DATE_FMT).to_string()))
        .count(db)
        .await?;

    Ok(WeekStats {
        completed,
        total: habit_count * 7,
    })
}

/// Create a habit, enforcing the per-user cap before anything is written.
pub async fn create_habit(
    db: &DatabaseConnection,
    user_id: i32,
    dto: HabitDto,
) -> Result<(habit::Model, Vec<String>), ServiceError> {
    let title = dto.title.trim();
    if title.is_empty() {
        return Err(ServiceError::InvalidState("Title is required".to_string()));
    }
    if title.chars().count() > 50 {
        return Err(ServiceError::InvalidState(
            "Title must be 50 characters or less".to_string(),
        ));
    }

    let count = Habit::find()
        .filter(habit::Column::UserId.eq(user_id))
        .count(db)
        .await?;

    if count >= MAX_HABITS {
        return Err(ServiceError::LimitExceeded(format!(
            "You can track up to {} habits at a time",
            MAX_HABITS
        )));
    }

    let new_habit = habit::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_string()),
        emoji: Set(dto.emoji.unwrap_or_else(|| "✨".to_string())),
        color: Set(dto.color.unwrap_or_else(|| "rose".to_string())),
        position: Set(dto.position.unwrap_or(count as i32)),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };

    let saved = new_habit.insert(db).await?;

    let new_achievements =
        achievement_service::check_habit_count_achievements(db, user_id, (count + 1) as i32)
            .await?;

    Ok((saved, new_achievements))
}

/// Mark a habit done for today. Idempotent: a second call the same day
/// reports `already_completed` and leaves the ledger untouched.
pub async fn complete_habit(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    habit_id: i32,
) -> Result<CompletionOutcome, ServiceError> {
    complete_habit_on(db, cache, user_id, habit_id, Local::now().date_naive()).await
}

pub async fn complete_habit_on(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    habit_id: i32,
    today: NaiveDate,
) -> Result<CompletionOutcome, ServiceError> {
    find_owned_habit(db, user_id, habit_id).await?;

    let today_str = today.format(DATE_FMT).to_string();
    let existing = HabitCompletion::find()
        .filter(habit_completion::Column::HabitId.eq(habit_id))
        .filter(habit_completion::Column::Date.eq(today_str.clone()))
        .one(db)
        .await?;

    if existing.is_some() {
        // Read-only path: report the current view without touching the ledger
        let stats = stats_service::get_stats_view(db, cache, user_id).await?;
        return Ok(CompletionOutcome {
            already_completed: true,
            stats,
            new_achievements: Vec::new(),
        });
    }

    let completion = habit_completion::ActiveModel {
        habit_id: Set(habit_id),
        user_id: Set(user_id),
        date: Set(today_str),
        completed_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    completion.insert(db).await?;

    // Drop every cached window touching this user before the ledger runs, so
    // no reader repopulates from a pre-completion snapshot
    cache.delete_user_entries(user_id);

    stats_service::record_completion(db, cache, user_id, stats_service::XP_PER_COMPLETION, 1)
        .await?;
    let stats = stats_service::record_streak_for_date(db, cache, user_id, today).await?;

    let new_achievements = achievement_service::check_and_unlock(db, user_id, &stats).await?;

    Ok(CompletionOutcome {
        already_completed: false,
        stats: StatsView::from(stats),
        new_achievements,
    })
}

/// Remove today's completion. A missing completion is a valid state and a
/// silent no-op.
pub async fn uncomplete_habit(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    habit_id: i32,
) -> Result<CompletionOutcome, ServiceError> {
    uncomplete_habit_on(db, cache, user_id, habit_id, Local::now().date_naive()).await
}

pub async fn uncomplete_habit_on(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    habit_id: i32,
    today: NaiveDate,
) -> Result<CompletionOutcome, ServiceError> {
    find_owned_habit(db, user_id, habit_id).await?;

    let today_str = today.format(DATE_FMT).to_string();
    let existing = HabitCompletion::find()
        .filter(habit_completion::Column::HabitId.eq(habit_id))
        .filter(habit_completion::Column::Date.eq(today_str))
        .one(db)
        .await?;

    let Some(completion) = existing else {
        // Nothing to remove; stay read-only so a no-op never creates the
        // lazily-initialized stats row
        let stats = stats_service::get_stats_view(db, cache, user_id).await?;
        return Ok(CompletionOutcome {
            already_completed: false,
            stats,
            new_achievements: Vec::new(),
        });
    };

    completion.delete(db).await?;
    cache.delete_user_entries(user_id);

    stats_service::record_completion(db, cache, user_id, -stats_service::XP_PER_COMPLETION, -1)
        .await?;

    // The running streak counter cannot tell whether removing this day broke
    // the chain; recompute from the remaining completions and set directly.
    let (streak, last_activity) = recompute_user_streak(db, user_id, today).await?;
    let stats = stats_service::set_streak(db, cache, user_id, streak, last_activity).await?;

    Ok(CompletionOutcome {
        already_completed: false,
        stats: StatsView::from(stats),
        new_achievements: Vec::new(),
    })
}

/// Scan the user's completion history backward from today and derive the
/// true streak plus the most recent activity date.
async fn recompute_user_streak(
    db: &DatabaseConnection,
    user_id: i32,
    today: NaiveDate,
) -> Result<(i32, Option<NaiveDate>), ServiceError> {
    let window_start = today - Duration::days(COMPLETION_WINDOW_DAYS);
    let completions = HabitCompletion::find()
        .filter(habit_completion::Column::UserId.eq(user_id))
        .filter(habit_completion::Column::Date.gte(window_start.format(DATE_FMT).to_string()))
        .filter(habit_completion::Column::Date.lte(today.format(DATE_FMT).to_string()))
        .all(db)
        .await?;

    let dates: HashSet<NaiveDate> = completions
        .iter()
        .filter_map(|c| NaiveDate::parse_from_str(&c.date, DATE_FMT).ok())
        .collect();

    let streak = calculate_streak(&dates, today) as i32;
    let last_activity = dates.into_iter().max();

    Ok((streak, last_activity))
}

/// Delete a habit and all its completion records.
pub async fn delete_habit(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    habit_id: i32,
) -> Result<(), ServiceError> {
    let habit = find_owned_habit(db, user_id, habit_id).await?;

    // Explicit cascade; SQLite foreign key enforcement is connection-dependent
    HabitCompletion::delete_many()
        .filter(habit_completion::Column::HabitId.eq(habit_id))
        .exec(db)
        .await?;
    habit.delete(db).await?;

    cache.delete_user_entries(user_id);
    Ok(())
}

/// Batch-update display positions.
pub async fn reorder_habits(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    items: Vec<ReorderItem>,
) -> Result<(), ServiceError> {
    for item in items {
        let habit = find_owned_habit(db, user_id, item.id).await?;
        let mut active: habit::ActiveModel = habit.into();
        active.position = Set(item.position);
        active.update(db).await?;
    }

    cache.delete_user_entries(user_id);
    Ok(())
}

async fn find_owned_habit(
    db: &DatabaseConnection,
    user_id: i32,
    habit_id: i32,
) -> Result<habit::Model, ServiceError> {
    let habit = Habit::find_by_id(habit_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if habit.user_id != user_id {
        return Err(ServiceError::NotFound);
    }

    Ok(habit)
}
