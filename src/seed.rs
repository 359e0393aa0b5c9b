//! Demo data seeding (SEED_DEMO=1): a sample user with a few habits and a
//! realistic completion history, so the frontend has something to show.

use chrono::{Duration, Local, Utc};
use sea_orm::*;

use crate::models::{habit, habit_completion};
use crate::services::DATE_FMT;

const DEMO_USER_ID: i32 = 1;

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let existing = habit::Entity::find()
        .filter(habit::Column::UserId.eq(DEMO_USER_ID))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();
    let habits = [
        ("Drink water", "💧", "blue"),
        ("Prenatal vitamins", "💊", "rose"),
        ("Gentle walk", "🚶‍♀️", "green"),
    ];

    let mut habit_ids = Vec::new();
    for (position, (title, emoji, color)) in habits.iter().enumerate() {
        let model = habit::ActiveModel {
            user_id: Set(DEMO_USER_ID),
            title: Set(title.to_string()),
            emoji: Set(emoji.to_string()),
            color: Set(color.to_string()),
            position: Set(position as i32),
            created_at: Set(now.clone()),
            ..Default::default()
        };
        let res = habit::Entity::insert(model).exec(db).await?;
        habit_ids.push(res.last_insert_id);
    }

    // Completion history: the first two habits done every day for the last
    // five days, the third only on the last two
    let today = Local::now().date_naive();
    for days_back in 0..5 {
        let date = (today - Duration::days(days_back)).format(DATE_FMT).to_string();
        for (i, habit_id) in habit_ids.iter().enumerate() {
            if i == 2 && days_back > 1 {
                continue;
            }
            let completion = habit_completion::ActiveModel {
                habit_id: Set(*habit_id),
                user_id: Set(DEMO_USER_ID),
                date: Set(date.clone()),
                completed_at: Set(now.clone()),
                ..Default::default()
            };
            habit_completion::Entity::insert(completion)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::columns([
                        habit_completion::Column::HabitId,
                        habit_completion::Column::Date,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec(db)
                .await?;
        }
    }

    Ok(())
}
