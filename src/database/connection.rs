use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut options = ConnectOptions::new(config.url.clone());
    options.max_connections(config.max_connections);

    let pool = Database::connect(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    migration::Migrator::up(pool, None).await?;
    Ok(())
}
