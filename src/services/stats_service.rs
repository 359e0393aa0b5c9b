//! Gamification Ledger - XP, level and user-level streak bookkeeping.
//!
//! The ledger owns the single `user_stats` row per user. Updates are plain
//! read-modify-write cycles; two simultaneous completions for the same user
//! can race and lose an increment. Accepted for gamification points - the
//! completion records themselves are never affected.

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::*;

use super::{ServiceError, DATE_FMT};
use crate::cache::{Cache, STATS_CACHE_TTL};
use crate::models::user_stats::{self, Entity as UserStats};

/// XP needed per level step: level = xp / 100 + 1
pub const XP_PER_LEVEL: i32 = 100;
/// XP granted for one habit completion (and removed on un-completion).
pub const XP_PER_COMPLETION: i32 = 10;

pub fn level_for_xp(xp: i32) -> i32 {
    xp / XP_PER_LEVEL + 1
}

fn stats_cache_key(user_id: i32) -> String {
    format!("stats:{}", user_id)
}

/// Load the user's stats row, creating the zero-value row on first use.
pub async fn get_or_create_stats(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<user_stats::Model, ServiceError> {
    if let Some(stats) = UserStats::find()
        .filter(user_stats::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(stats);
    }

    let now = Utc::now().to_rfc3339();
    let fresh = user_stats::ActiveModel {
        user_id: Set(user_id),
        xp: Set(0),
        level: Set(1),
        current_streak: Set(0),
        longest_streak: Set(0),
        total_completions: Set(0),
        last_activity_date: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(fresh.insert(db).await?)
}

/// Apply an XP delta and a completion-count delta. Both floor at zero; level
/// is always rederived from the new XP.
pub async fn record_completion(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    xp_delta: i32,
    completion_delta: i32,
) -> Result<user_stats::Model, ServiceError> {
    let stats = get_or_create_stats(db, user_id).await?;

    let new_xp = (stats.xp + xp_delta).max(0);
    let new_total = (stats.total_completions + completion_delta).max(0);

    let mut active: user_stats::ActiveModel = stats.into();
    active.xp = Set(new_xp);
    active.level = Set(level_for_xp(new_xp));
    active.total_completions = Set(new_total);
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active.update(db).await?;
    cache.delete(&stats_cache_key(user_id));
    Ok(updated)
}

/// Advance the user-level streak for an activity on `date`.
///
/// First activity ever starts at 1; activity on the day after the last one
/// extends the streak; a duplicate same-day event leaves it unchanged; any
/// larger gap resets to 1. longest_streak tracks the running maximum.
pub async fn record_streak_for_date(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    date: NaiveDate,
) -> Result<user_stats::Model, ServiceError> {
    let stats = get_or_create_stats(db, user_id).await?;

    let last_activity = stats
        .last_activity_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FMT).ok());

    let new_streak = match last_activity {
        None => 1,
        Some(prev) if prev == date => stats.current_streak,
        Some(prev) if date - prev == Duration::days(1) => stats.current_streak + 1,
        Some(_) => 1,
    };
    let new_longest = stats.longest_streak.max(new_streak);

    let mut active: user_stats::ActiveModel = stats.into();
    active.current_streak = Set(new_streak);
    active.longest_streak = Set(new_longest);
    active.last_activity_date = Set(Some(date.format(DATE_FMT).to_string()));
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active.update(db).await?;
    cache.delete(&stats_cache_key(user_id));
    Ok(updated)
}

/// Set the streak outright. Used after an un-completion, where the caller
/// has recomputed the true streak from the completion records - the running
/// counters alone cannot tell whether removing one day broke the chain.
pub async fn set_streak(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
    streak: i32,
    last_activity: Option<NaiveDate>,
) -> Result<user_stats::Model, ServiceError> {
    let stats = get_or_create_stats(db, user_id).await?;
    let new_longest = stats.longest_streak.max(streak);

    let mut active: user_stats::ActiveModel = stats.into();
    active.current_streak = Set(streak);
    active.longest_streak = Set(new_longest);
    active.last_activity_date = Set(last_activity.map(|d| d.format(DATE_FMT).to_string()));
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active.update(db).await?;
    cache.delete(&stats_cache_key(user_id));
    Ok(updated)
}

/// Read-only stats view. An absent row is a valid state and renders as the
/// zero-value view rather than an error.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatsView {
    pub user_id: i32,
    pub xp: i32,
    pub level: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub total_completions: i32,
    pub last_activity_date: Option<String>,
}

impl StatsView {
    fn empty(user_id: i32) -> Self {
        Self {
            user_id,
            xp: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            total_completions: 0,
            last_activity_date: None,
        }
    }
}

impl From<user_stats::Model> for StatsView {
    fn from(m: user_stats::Model) -> Self {
        Self {
            user_id: m.user_id,
            xp: m.xp,
            level: m.level,
            current_streak: m.current_streak,
            longest_streak: m.longest_streak,
            total_completions: m.total_completions,
            last_activity_date: m.last_activity_date,
        }
    }
}

/// Fetch the stats view through the cache (30 min TTL, invalidated by every
/// ledger mutation).
pub async fn get_stats_view(
    db: &DatabaseConnection,
    cache: &Cache,
    user_id: i32,
) -> Result<StatsView, ServiceError> {
    let key = stats_cache_key(user_id);

    if let Some(cached) = cache.get(&key) {
        if let Ok(view) = serde_json::from_value::<StatsView>(cached) {
            return Ok(view);
        }
    }

    let view = UserStats::find()
        .filter(user_stats::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .map(StatsView::from)
        .unwrap_or_else(|| StatsView::empty(user_id));

    if let Ok(value) = serde_json::to_value(&view) {
        cache.set(&key, value, STATS_CACHE_TTL);
    }

    Ok(view)
}
