use sea_orm::entity::prelude::*;

/// Single row table, see `torq_db::SINGULAR_TABLE_FIXED_ID`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub torq_uuid: String,
    pub preferred_timezone: String,
    pub default_date_range: String,
    pub default_language: String,
    pub week_starts_on: String,
    pub vector_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
