use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tx")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub tx_hash: String,
    pub timestamp: DateTimeUtc,
    pub amount: i64,
    pub total_fees: i64,
    pub num_confirmations: i32,
    pub block_height: i32,
    pub block_hash: Option<String>,
    /// JSON encoded list of destination addresses.
    pub dest_addresses: String,
    pub raw_tx_hex: Option<String>,
    pub label: Option<String>,
    pub flags: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
