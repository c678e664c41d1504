mod config;
mod error;
mod voting;
mod web;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Settings;
use error::{BallotError, StartupError};
use voting::{BallotStore, MemoryStore};
use web::db::{self, PgStore};
use web::{AppState, PhotoStore};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Settings::load()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "voting server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), StartupError> {
    let photos = PhotoStore::new(settings.upload_dir.clone(), settings.max_photo_bytes);
    photos.prepare().await.map_err(StartupError::Uploads)?;

    let store: Arc<dyn BallotStore> = match settings.database_url.clone() {
        Some(db_url) => {
            let pool_size = settings.db_pool_size;
            tokio::task::spawn_blocking(move || -> Result<Arc<dyn BallotStore>, StartupError> {
                let pool = db::establish_pool(&db_url, pool_size)?;
                db::run_migrations(&pool)?;
                Ok(Arc::new(PgStore::new(pool)))
            })
            .await??
        }
        None => {
            warn!("DATABASE_URL not set, votes are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, photos, settings.environment.clone());

    let roster = settings.roster();
    let bootstrap = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), BallotError> {
        bootstrap.accounts.seed(&roster)?;
        bootstrap.admin.rebuild_counters()?;
        Ok(())
    })
    .await??;

    info!(environment = %settings.environment, "database ready");
    web::serve(&settings, state).await?;
    Ok(())
}
