pub use sea_orm_migration::prelude::*;

mod m20250901_000001_initial;
mod m20250910_000001_add_api_keys_and_team_members;
mod m20250918_000001_add_webhook_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_initial::Migration),
            Box::new(m20250910_000001_add_api_keys_and_team_members::Migration),
            Box::new(m20250918_000001_add_webhook_events::Migration),
        ]
    }
}
