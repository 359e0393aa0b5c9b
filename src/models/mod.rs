pub mod achievement;
pub mod habit;
pub mod habit_completion;
pub mod user_achievement;
pub mod user_stats;
