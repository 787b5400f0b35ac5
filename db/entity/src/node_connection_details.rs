use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "node_connection_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub node_id: i64,
    pub name: String,
    pub implementation: i32,
    pub grpc_address: Option<String>,
    pub tls_data: Option<Vec<u8>>,
    pub macaroon_data: Option<Vec<u8>>,
    pub certificate_data: Option<Vec<u8>>,
    pub key_data: Option<Vec<u8>>,
    pub status_id: i32,
    pub ping_system: i32,
    pub created_on: DateTimeUtc,
    pub updated_on: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
