//! Reservation documents and request payloads

pub mod reservation;
