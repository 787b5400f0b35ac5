use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub payment_hash: String,
    pub payment_index: i64,
    pub value_msat: i64,
    pub fee_msat: i64,
    pub status: i32,
    pub failure_reason: Option<String>,
    pub creation_time: DateTimeUtc,
    pub payment_preimage: Option<String>,
    pub payment_request: Option<String>,
    pub htlc_attempts: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
