pub mod cli;
pub mod commands;
pub mod db;
pub mod export;
pub mod models;
pub mod report;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;

use anyhow::Result;
use log::LevelFilter;

use cli::{Cli, Commands};
use commands::AppContext;
use db::Database;
use settings::SettingsStore;

fn init_logging() {
    let level = if settings::debug_enabled() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // RUST_LOG, when set, refines the default level.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

pub async fn run(cli: Cli) -> Result<()> {
    init_logging();
    log::info!("bruxlog starting up...");

    let data_dir = cli.data_dir.clone().unwrap_or_else(settings::data_dir);
    let settings = SettingsStore::new(data_dir)?;
    let db = Database::new(settings.database_path())?;
    let ctx = AppContext { settings, db };

    match cli.command {
        Commands::Record { seconds, discard } => commands::record(&ctx, seconds, discard).await,
        Commands::Replay { path, discard } => commands::replay(&ctx, &path, discard).await,
        Commands::List { limit, offset } => commands::list(&ctx, limit, offset).await,
        Commands::Show { id } => commands::show(&ctx, &id).await,
        Commands::Report { id } => commands::report(&ctx, &id).await,
        Commands::Export { id, path } => commands::export(&ctx, &id, &path).await,
        Commands::ExportAll { path } => commands::export_all(&ctx, &path).await,
        Commands::Import { path, label } => commands::import(&ctx, &path, label).await,
        Commands::Delete { id } => commands::delete(&ctx, &id).await,
    }
}
