//! # Reservations
//!
//! The reservations feature: the `Reservation` document bound to the
//! `reservations` collection, and a service that passes requests straight
//! through to its repository. There are no booking rules here.

pub mod model;
pub mod service;

pub use model::reservation::{
    CreateReservation, NewReservation, Reservation, ReservationRepository, UpdateReservation,
};
pub use service::{ReservationsService, ServiceError};
