use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub emoji: String,
    pub color: String,
    pub position: i32,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::habit_completion::Entity")]
    HabitCompletion,
}

impl Related<super::habit_completion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HabitCompletion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct HabitDto {
    pub title: String,
    pub emoji: Option<String>,
    pub color: Option<String>,
    pub position: Option<i32>,
}
