use crate::geo::Coordinate;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the `maydays` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressEvent {
    pub id: u64,
    #[serde(rename = "users_id")]
    pub owner_id: UserId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl DistressEvent {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMayday {
    #[serde(rename = "users_id")]
    pub owner_id: UserId,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewMayday {
    pub fn new(owner_id: UserId, coordinate: Coordinate) -> Self {
        Self {
            owner_id,
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Change notification for a single inserted row, shaped like a
/// `postgres_changes` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub record: DistressEvent,
}

impl ChangeEvent {
    pub const SCHEMA: &'static str = "public";
    pub const TABLE: &'static str = "maydays";
    pub const INSERT: &'static str = "INSERT";

    pub fn insert(record: DistressEvent) -> Self {
        Self {
            schema: Self::SCHEMA.to_string(),
            table: Self::TABLE.to_string(),
            kind: Self::INSERT.to_string(),
            record,
        }
    }
}
