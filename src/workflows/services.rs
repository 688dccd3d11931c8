//! Process-wide service bundle (spec §4.H), the Rust analogue of the
//! source's module-level `get_session()`/connector singletons.
//!
//! [`crate::workflows::nodes::registry::NodeFn`] is a plain function
//! pointer with no room for per-call dependency injection, so node
//! factories reach [`Services::global`] instead of receiving their
//! dependencies as constructor arguments — the same shape the source
//! project's node functions use when they import a module-level
//! session getter rather than accepting one as a parameter.

use once_cell::sync::OnceCell;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

use crate::batch::{BatchConfig, BatchProcessor, RateLimiter};
use crate::config::Config;
use crate::connectors::lastfm::LastFmConnector;
use crate::connectors::musicbrainz::MusicBrainzConnector;
use crate::connectors::spotify::SpotifyConnector;
use crate::db::session::SessionFactory;
use crate::error::{AppError, Result};

pub struct Services {
    pub config: Config,
    pub sessions: SessionFactory,
    pub spotify: SpotifyConnector,
    pub lastfm: LastFmConnector,
    pub musicbrainz: MusicBrainzConnector,
    pub batch: BatchProcessor,
}

static SERVICES: OnceCell<Arc<Services>> = OnceCell::new();

impl Services {
    /// Connects to the database, builds every connector, and installs
    /// the process-wide singleton. Must be called exactly once, before
    /// any workflow runs; calling it twice is a programming error.
    pub async fn init(config: Config) -> Result<Arc<Services>> {
        let db: DatabaseConnection = Database::connect(&config.database_url).await.map_err(AppError::from_db_err)?;
        let services = Arc::new(Services {
            sessions: SessionFactory::new(db),
            spotify: SpotifyConnector::new(),
            lastfm: LastFmConnector::new(&config),
            musicbrainz: MusicBrainzConnector::new(format!("narada/{}", env!("CARGO_PKG_VERSION"))),
            batch: BatchProcessor::new(BatchConfig::from_app_config(&config), Some(RateLimiter::per_second(config.api_rate_limit))),
            config,
        });
        SERVICES
            .set(Arc::clone(&services))
            .map_err(|_| AppError::Configuration("Services::init called more than once".into()))?;
        Ok(services)
    }

    /// Returns the process-wide singleton. Panics if [`Services::init`]
    /// has not run — node functions only ever run downstream of a
    /// successful engine startup, which always calls `init` first.
    pub fn global() -> Arc<Services> {
        Arc::clone(SERVICES.get().expect("Services::init must run before any node executes"))
    }
}
