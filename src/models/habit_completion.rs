use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habit_completions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub habit_id: i32,
    /// Denormalized from the habit so range queries skip the join.
    pub user_id: i32,
    pub date: String, // 'YYYY-MM-DD', one completion per habit per day
    pub completed_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::habit::Entity",
        from = "Column::HabitId",
        to = "super::habit::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Habit,
}

impl Related<super::habit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Habit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
