use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub payment_hash: String,
    pub payment_request: String,
    pub memo: String,
    pub value_msat: i64,
    pub amount_paid_msat: i64,
    pub state: i32,
    pub creation_date: DateTimeUtc,
    pub settle_date: Option<DateTimeUtc>,
    pub add_index: i64,
    pub settle_index: i64,
    pub expiry: i64,
    pub private: bool,
    pub is_keysend: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
