use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "forward")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub time_ns: i64,
    pub incoming_channel_id: Option<i64>,
    pub outgoing_channel_id: Option<i64>,
    pub amount_in_msat: i64,
    pub amount_out_msat: i64,
    pub fee_msat: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
