//! ReservationsService - CRUD over the reservations collection
//!
//! A thin passthrough: it stamps new reservations, turns payloads into
//! filters and updates, and translates "no such document" into an error
//! keyed by the reservation id so callers can answer with a 404.

use std::sync::Arc;

use chrono::Utc;
use database::{Database, Document, DocumentId, Filter, PayloadError, RepositoryError, Update};
use shared::Logger;
use thiserror::Error;

use crate::model::reservation::{
    CreateReservation, Reservation, ReservationRepository, UpdateReservation,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Reservation '{id}' was not found")]
    NotFound { id: String },

    #[error("Invalid reservation id '{id}'")]
    InvalidId { id: String },

    #[error(transparent)]
    InvalidPayload(#[from] PayloadError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone)]
pub struct ReservationsService {
    repository: ReservationRepository,
}

impl ReservationsService {
    pub fn new(repository: ReservationRepository) -> Self {
        Self { repository }
    }

    /// Wire the service to the `reservations` collection of `database`
    pub fn from_database(database: &dyn Database, logger: Arc<dyn Logger>) -> Self {
        Self::new(ReservationRepository::from_database(database, logger))
    }

    pub async fn create(
        &self,
        payload: CreateReservation,
        user_id: &str,
    ) -> Result<Reservation, ServiceError> {
        let reservation = self
            .repository
            .create(payload.into_new(user_id, Utc::now()))
            .await?;

        tracing::info!(id = %reservation.id(), user_id = %user_id, "reservation created");
        Ok(reservation)
    }

    pub async fn find_all(&self) -> Result<Vec<Reservation>, ServiceError> {
        Ok(self.repository.find(&Filter::new()).await?)
    }

    pub async fn find_for_user(&self, user_id: &str) -> Result<Vec<Reservation>, ServiceError> {
        Ok(self
            .repository
            .find(&Filter::new().eq("userId", user_id))
            .await?)
    }

    pub async fn find_one(&self, id: &str) -> Result<Reservation, ServiceError> {
        let filter = Self::filter_for(id)?;
        self.repository
            .find_one(&filter)
            .await
            .map_err(|err| Self::translate(err, id))
    }

    /// Apply the fields present in `payload`. An empty payload changes
    /// nothing and returns the current reservation.
    pub async fn update(
        &self,
        id: &str,
        payload: UpdateReservation,
    ) -> Result<Reservation, ServiceError> {
        let filter = Self::filter_for(id)?;
        let value = serde_json::to_value(&payload).map_err(RepositoryError::from)?;
        let update = Update::try_from(value)?;

        self.repository
            .find_one_and_update(&filter, &update)
            .await
            .map_err(|err| Self::translate(err, id))
    }

    pub async fn remove(&self, id: &str) -> Result<Reservation, ServiceError> {
        let filter = Self::filter_for(id)?;
        let removed = self
            .repository
            .find_one_and_delete(&filter)
            .await
            .map_err(|err| Self::translate(err, id))?;

        tracing::info!(id = %removed.id(), "reservation removed");
        Ok(removed)
    }

    fn filter_for(id: &str) -> Result<Filter, ServiceError> {
        let id = DocumentId::parse_str(id).map_err(|_| ServiceError::InvalidId { id: id.to_string() })?;
        Ok(Filter::by_id(&id))
    }

    fn translate(err: RepositoryError, id: &str) -> ServiceError {
        match err {
            RepositoryError::NotFound { .. } => ServiceError::NotFound { id: id.to_string() },
            other => ServiceError::Repository(other),
        }
    }
}
