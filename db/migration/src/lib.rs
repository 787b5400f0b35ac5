pub use sea_orm_migration::prelude::*;

mod m001_create_torq_tables;
mod m002_create_torq_indices;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_torq_tables::Migration),
            Box::new(m002_create_torq_indices::Migration),
        ]
    }
}
