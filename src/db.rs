use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create habits table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS habits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            emoji TEXT NOT NULL DEFAULT '✨',
            color TEXT NOT NULL DEFAULT 'rose',
            position INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create habit_completions table
    // user_id is denormalized so the 1-year window query skips the join
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS habit_completions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habit_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            UNIQUE(habit_id, date),
            FOREIGN KEY (habit_id) REFERENCES habits(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_habit_completions_user_date ON habit_completions(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_habit_completions_habit_id ON habit_completions(habit_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create user_stats table - one gamification ledger row per user
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS user_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE,
            xp INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1,
            current_streak INTEGER NOT NULL DEFAULT 0,
            longest_streak INTEGER NOT NULL DEFAULT 0,
            total_completions INTEGER NOT NULL DEFAULT 0,
            last_activity_date TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create achievements catalog table (read-only reference data)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS achievements (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            emoji TEXT NOT NULL,
            requirement_type TEXT NOT NULL,
            requirement_value INTEGER NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create user_achievements table - unlocked achievements per user
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS user_achievements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            achievement_id TEXT NOT NULL,
            unlocked_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, achievement_id),
            FOREIGN KEY (achievement_id) REFERENCES achievements(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_user_achievements_user ON user_achievements(user_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Seed the achievement catalog (idempotent)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        INSERT OR IGNORE INTO achievements (id, title, description, emoji, requirement_type, requirement_value) VALUES
            ('first_step', 'First Step', 'Complete your first habit', '🌱', 'completions', 1),
            ('completions_10', 'Getting Into It', 'Complete habits 10 times', '💪', 'completions', 10),
            ('completions_50', 'Habit Hero', 'Complete habits 50 times', '🏆', 'completions', 50),
            ('completions_100', 'Century Club', 'Complete habits 100 times', '💯', 'completions', 100),
            ('streak_3', 'Warming Up', 'Keep a 3-day streak', '🔥', 'streak', 3),
            ('streak_7', 'One Full Week', 'Keep a 7-day streak', '📅', 'streak', 7),
            ('streak_30', 'Unstoppable', 'Keep a 30-day streak', '🚀', 'streak', 30),
            ('level_5', 'Rising Star', 'Reach level 5', '⭐', 'level', 5),
            ('level_10', 'Shining Bright', 'Reach level 10', '🌟', 'level', 10),
            ('habits_3', 'Building Routines', 'Track 3 habits at once', '📋', 'habit_count', 3),
            ('habits_5', 'Full House', 'Track 5 habits at once', '🏠', 'habit_count', 5)
        "#
        .to_owned(),
    ))
    .await?;

    Ok(())
}
