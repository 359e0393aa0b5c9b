//! Achievement Evaluator - unlocks catalog achievements from stat snapshots.
//!
//! The seeded `achievements` catalog doubles as the rule table: each row
//! carries a requirement type and threshold. Checks use `>=` and lean on the
//! idempotent unlock, so a counter that jumps past a threshold still fires
//! the achievement exactly once.

use chrono::Utc;
use sea_orm::*;

use super::ServiceError;
use crate::models::achievement::{self, Entity as Achievement};
use crate::models::user_achievement::{self, Entity as UserAchievement};
use crate::models::user_stats;

/// Unlock one achievement for a user. Returns `None` if it was already
/// unlocked - a no-op, not an error.
pub async fn unlock(
    db: &DatabaseConnection,
    user_id: i32,
    achievement_id: &str,
) -> Result<Option<user_achievement::Model>, ServiceError> {
    let existing = UserAchievement::find()
        .filter(user_achievement::Column::UserId.eq(user_id))
        .filter(user_achievement::Column::AchievementId.eq(achievement_id))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(None);
    }

    let unlocked = user_achievement::ActiveModel {
        user_id: Set(user_id),
        achievement_id: Set(achievement_id.to_string()),
        unlocked_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };

    match unlocked.insert(db).await {
        Ok(model) => {
            tracing::info!("Achievement unlocked: user={} id={}", user_id, achievement_id);
            Ok(Some(model))
        }
        // A concurrent request may have won the race; the UNIQUE index makes
        // the second insert fail, which is the same no-op outcome.
        Err(e) if e.to_string().contains("UNIQUE") => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Evaluate activity-based achievements (streak, completions, level) against
/// a stats snapshot. Returns the ids actually unlocked by this call.
pub async fn check_and_unlock(
    db: &DatabaseConnection,
    user_id: i32,
    stats: &user_stats::Model,
) -> Result<Vec<String>, ServiceError> {
    let catalog = Achievement::find().all(db).await?;
    let mut newly_unlocked = Vec::new();

    for entry in catalog {
        let reached = match entry.requirement_type.as_str() {
            "streak" => stats.current_streak >= entry.requirement_value,
            "completions" => stats.total_completions >= entry.requirement_value,
            "level" => stats.level >= entry.requirement_value,
            // habit_count achievements fire on habit creation, not activity
            _ => false,
        };

        if reached && unlock(db, user_id, &entry.id).await?.is_some() {
            newly_unlocked.push(entry.id);
        }
    }

    Ok(newly_unlocked)
}

/// Evaluate habit-count achievements. Fired on habit creation since these
/// key off how many habits exist, not off completion activity.
pub async fn check_habit_count_achievements(
    db: &DatabaseConnection,
    user_id: i32,
    habit_count: i32,
) -> Result<Vec<String>, ServiceError> {
    let catalog = Achievement::find()
        .filter(achievement::Column::RequirementType.eq("habit_count"))
        .all(db)
        .await?;

    let mut newly_unlocked = Vec::new();
    for entry in catalog {
        if habit_count >= entry.requirement_value && unlock(db, user_id, &entry.id).await?.is_some()
        {
            newly_unlocked.push(entry.id);
        }
    }

    Ok(newly_unlocked)
}

/// Catalog entry enriched with the user's unlock state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AchievementWithStatus {
    #[serde(flatten)]
    pub achievement: achievement::Model,
    pub unlocked: bool,
    pub unlocked_at: Option<String>,
}

/// Full catalog with the user's unlock status attached.
pub async fn list_with_status(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<AchievementWithStatus>, ServiceError> {
    let catalog = Achievement::find().all(db).await?;

    let unlocked: std::collections::HashMap<String, String> = UserAchievement::find()
        .filter(user_achievement::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|ua| (ua.achievement_id, ua.unlocked_at))
        .collect();

    Ok(catalog
        .into_iter()
        .map(|entry| {
            let unlocked_at = unlocked.get(&entry.id).cloned();
            AchievementWithStatus {
                unlocked: unlocked_at.is_some(),
                unlocked_at,
                achievement: entry,
            }
        })
        .collect())
}
