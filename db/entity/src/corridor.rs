use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "corridor")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub corridor_id: i64,
    pub corridor_type_id: i32,
    pub reference_id: i64,
    pub flag: i32,
    pub inverse: bool,
    pub priority: i32,
    pub from_tag_id: Option<i64>,
    pub from_node_id: Option<i64>,
    pub to_tag_id: Option<i64>,
    pub to_node_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub created_on: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
