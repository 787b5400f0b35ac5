use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "channel")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub channel_id: i64,
    #[sea_orm(unique)]
    pub short_channel_id: Option<String>,
    pub lnd_short_channel_id: Option<i64>,
    pub funding_transaction_hash: String,
    pub funding_output_index: i32,
    pub closing_transaction_hash: Option<String>,
    pub capacity: i64,
    pub private: bool,
    pub first_node_id: i64,
    pub second_node_id: i64,
    pub initiating_node_id: Option<i64>,
    pub accepting_node_id: Option<i64>,
    pub closing_node_id: Option<i64>,
    pub status_id: i32,
    pub funding_block_height: Option<i32>,
    pub funded_on: Option<DateTimeUtc>,
    pub closing_block_height: Option<i32>,
    pub closed_on: Option<DateTimeUtc>,
    pub flags: i32,
    pub created_on: DateTimeUtc,
    pub updated_on: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
