//! Halaqa API server.
//!
//! Reads configuration from the environment (and `.env`), makes sure the
//! schema exists, then serves until the process is stopped. Run
//! `db-migrate` once beforehand to bootstrap the first admin account.

use color_eyre::eyre::{Result, WrapErr};
use dotenv::dotenv;
use halaqa_api::{config::ApiConfig, start_server};
use halaqa_db::{create_pool, schema::initialize_database};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let config = ApiConfig::from_env()?;

    let db_pool = create_pool(&config.database_url)
        .await
        .wrap_err("Could not connect to the halaqa database")?;
    initialize_database(&db_pool).await?;

    start_server(config, db_pool).await
}
