use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use city_expert::bot::{callback_handler, message_handler};
use city_expert::config::Config;
use city_expert::db::init_database_schema;
use city_expert::places::PlacesClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    let default_level = if config.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting City Expert bot");

    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {parent:?}"))?;
        }
    }

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    init_database_schema(&conn)?;
    info!(path = %config.database_path, "Database ready");

    let db = Arc::new(tokio::sync::Mutex::new(conn));
    let places = Arc::new(PlacesClient::new(config.rapidapi_key.clone())?);
    let bot = Bot::new(config.telegram_bot_token.clone());
    let config = Arc::new(config);

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    info!("Dispatcher starting");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, places, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
