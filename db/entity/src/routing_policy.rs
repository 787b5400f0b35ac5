//! Append-only history of routing policies, one row per observed change.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "routing_policy")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ts: DateTimeUtc,
    pub channel_id: i64,
    pub announcing_node_id: i64,
    pub connecting_node_id: i64,
    pub node_id: i64,
    pub disabled: bool,
    pub time_lock_delta: i32,
    pub min_htlc_msat: i64,
    pub max_htlc_msat: i64,
    pub fee_base_msat: i64,
    pub fee_rate_milli_msat: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
