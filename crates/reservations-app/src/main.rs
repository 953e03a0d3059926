//! # Reservations - Service entry point
//!
//! Wires everything together explicitly; there is no container.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  main.rs (this file) - Wiring                                   │
//! │    │                                                            │
//! │    ├── Loads:   DatabaseConfig (MONGODB_URI)                    │
//! │    ├── Opens:   Database for the configured scheme (adapter)    │
//! │    ├── Creates: ReservationRepository + TracingLogger           │
//! │    └── Runs:    a create / read / update / delete pass          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use database::{Database, Document};
use database_adapter::{InMemoryDatabase, MongoDatabase};
use reservations::{
    CreateReservation, Reservation, ReservationRepository, ReservationsService, ServiceError,
    UpdateReservation,
};
use shared::{DatabaseConfig, DatabaseScheme, TracingLogger};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Open the database the configuration points at
async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Database>> {
    let database: Arc<dyn Database> = match config.scheme() {
        DatabaseScheme::Memory => Arc::new(InMemoryDatabase::new(config.database_name())),
        DatabaseScheme::Mongodb | DatabaseScheme::MongodbSrv => Arc::new(
            MongoDatabase::connect(config.uri(), config.database_name())
                .await
                .with_context(|| format!("failed to open {} database", config.scheme()))?,
        ),
    };
    Ok(database)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ========================================
    // Configuration
    // ========================================

    let config = DatabaseConfig::from_env().context("invalid database configuration")?;
    info!(scheme = %config.scheme(), database = %config.database_name(), "configuration loaded");

    // ========================================
    // Wiring
    // ========================================

    let database = connect(&config).await?;
    let repository = ReservationRepository::from_database(
        database.as_ref(),
        Arc::new(TracingLogger::new("ReservationRepository")),
    );
    let service = ReservationsService::new(repository);

    let collection = Reservation::COLLECTION;
    info!(collection = %collection, "reservations service ready");

    // ========================================
    // Create / Read / Update / Delete
    // ========================================

    let start = Utc::now() + Duration::days(7);
    let created = service
        .create(
            CreateReservation {
                start_date: start,
                end_date: start + Duration::days(3),
                place_id: "place-001".to_string(),
                invoice_id: "invoice-001".to_string(),
            },
            "user-001",
        )
        .await?;
    let id = created.id().to_string();
    info!(id = %id, place = %created.place_id(), "created reservation");

    let listed = service.find_for_user("user-001").await?;
    info!(count = listed.len(), "reservations for user-001");

    let updated = service
        .update(
            &id,
            UpdateReservation {
                place_id: Some("place-002".to_string()),
                ..Default::default()
            },
        )
        .await?;
    info!(id = %id, place = %updated.place_id(), "moved reservation");

    let removed = service.remove(&id).await?;
    info!(id = %removed.id(), "removed reservation");

    match service.find_one(&id).await {
        Err(ServiceError::NotFound { id }) => info!(id = %id, "reservation is gone"),
        Err(err) => return Err(err.into()),
        Ok(still_there) => warn!(id = %still_there.id(), "reservation survived removal"),
    }

    Ok(())
}
