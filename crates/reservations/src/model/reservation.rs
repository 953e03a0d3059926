//! Reservation - A booked place for a user over a date range
//!
//! Reservation is an Entity stored in the `reservations` collection.
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use database::{Document, DocumentId, DocumentRepository};
use serde::{Deserialize, Serialize};

/// Repository over the `reservations` collection
pub type ReservationRepository = DocumentRepository<Reservation>;

/// A stored reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    id: DocumentId,
    /// When the reservation was made
    timestamp: DateTime<Utc>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    user_id: String,
    place_id: String,
    invoice_id: String,
}

impl Reservation {
    // ========== Getters ==========

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn place_id(&self) -> &str {
        &self.place_id
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }
}

impl Document for Reservation {
    const COLLECTION: &'static str = "reservations";
    type Fields = NewReservation;

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// A reservation before it has been stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub timestamp: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub user_id: String,
    pub place_id: String,
    pub invoice_id: String,
}

/// Create request payload, already validated upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub place_id: String,
    pub invoice_id: String,
}

impl CreateReservation {
    /// Stamp the payload with its owner and creation time
    pub fn into_new(self, user_id: impl Into<String>, timestamp: DateTime<Utc>) -> NewReservation {
        NewReservation {
            timestamp,
            start_date: self.start_date,
            end_date: self.end_date,
            user_id: user_id.into(),
            place_id: self.place_id,
            invoice_id: self.invoice_id,
        }
    }
}

/// Partial update payload: only present fields are changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

impl UpdateReservation {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_wire_format_is_camel_case() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let reservation = Reservation {
            id: DocumentId::new(),
            timestamp: start,
            start_date: start,
            end_date: start,
            user_id: "u-1".to_string(),
            place_id: "p-1".to_string(),
            invoice_id: "inv-1".to_string(),
        };

        let value = serde_json::to_value(&reservation).unwrap();
        let object = value.as_object().unwrap();
        for key in ["_id", "timestamp", "startDate", "endDate", "userId", "placeId", "invoiceId"] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(object.len(), 7);
    }

    #[test]
    fn test_create_payload_stamped() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap();
        let payload: CreateReservation = serde_json::from_value(json!({
            "startDate": "2026-03-01T00:00:00Z",
            "endDate": "2026-03-04T00:00:00Z",
            "placeId": "p-7",
            "invoiceId": "inv-7"
        }))
        .unwrap();

        let now = Utc::now();
        let new = payload.into_new("u-9", now);

        assert_eq!(new.start_date, start);
        assert_eq!(new.end_date, end);
        assert_eq!(new.user_id, "u-9");
        assert_eq!(new.timestamp, now);
    }

    #[test]
    fn test_update_payload_skips_absent_fields() {
        let update = UpdateReservation {
            place_id: Some("p-2".to_string()),
            ..Default::default()
        };

        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"placeId": "p-2"}));
        assert!(!update.is_empty());
        assert!(UpdateReservation::default().is_empty());
    }
}
