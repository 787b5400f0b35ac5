use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "htlc_event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub time_ns: i64,
    pub event_type: i32,
    pub kind: i32,
    pub incoming_channel_id: Option<i64>,
    pub outgoing_channel_id: Option<i64>,
    pub incoming_htlc_id: Option<i64>,
    pub outgoing_htlc_id: Option<i64>,
    pub incoming_amount_msat: Option<i64>,
    pub outgoing_amount_msat: Option<i64>,
    pub incoming_timelock: Option<i32>,
    pub outgoing_timelock: Option<i32>,
    pub wire_failure: Option<i32>,
    pub failure_detail: Option<i32>,
    pub failure_string: Option<String>,
    pub settled: Option<bool>,
    pub offchain: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
