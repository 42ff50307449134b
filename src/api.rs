// This file contains the basic types used to communicate through the API
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::catalog::RequestType;

/// A restaurant, addressed by its slug in customer URLs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Restaurant {
    /// Unique ID, given by the server on creation
    pub id: u32,
    /// Display name
    pub name: String,
    /// Unique URL segment
    pub slug: String,
}

/// A table of a restaurant
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Table {
    /// Unique ID, given by the server on creation
    pub id: u32,
    /// Restaurant owning the table
    pub restaurant_id: u32,
    /// Label printed on the table, unique within the restaurant
    pub label: String,
    /// Floor-plan coordinates, if the table was placed
    pub x_position: Option<i32>,
    pub y_position: Option<i32>,
}

/// Lifecycle of a service request
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [
        RequestStatus::Pending,
        RequestStatus::InProgress,
        RequestStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
        }
    }

    /// Pending and in-progress requests still need someone to act on them
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::InProgress)
    }

    /// Statuses staff can move a request to from this one
    pub fn next_actions(&self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::Pending => &[RequestStatus::InProgress, RequestStatus::Completed],
            RequestStatus::InProgress => &[RequestStatus::Completed],
            RequestStatus::Completed => &[RequestStatus::Pending],
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::errors::Error::BadRequest(format!("Unknown status '{}'", s)))
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service request made from a table, as returned by the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    /// Unique ID, given by the server on creation
    pub id: u32,
    /// Table the request was made from
    pub table_id: u32,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub status: RequestStatus,
    /// Public URL of the attached photo
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of a new restaurant request
#[derive(Serialize, Deserialize, Debug)]
pub struct NewRestaurant {
    pub name: String,
    pub slug: String,
}

/// Body of a new table request
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct NewTable {
    pub label: String,
    #[serde(default)]
    pub x_position: Option<i32>,
    #[serde(default)]
    pub y_position: Option<i32>,
}

/// Body of a request submission, sent from a table page
#[derive(Serialize, Deserialize, Debug)]
pub struct NewServiceRequest {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Body of a status change made by staff
#[derive(Serialize, Deserialize, Debug)]
pub struct StatusUpdate {
    pub status: RequestStatus,
}

/// Returned after a photo upload
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct UploadedPhoto {
    /// Object path inside the photo store
    pub path: String,
    /// Public URL to attach to a request
    pub url: String,
}

/// Cooldown of one request type for a table, at the time of the response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CooldownView {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    /// When the type becomes available again, None if it already is
    pub until: Option<DateTime<Utc>>,
    /// Remaining time formatted for display, empty if available
    pub time_left: String,
}

/// Everything a table page needs on load
#[derive(Serialize, Deserialize, Debug)]
pub struct TablePage {
    pub restaurant: Restaurant,
    pub table: Table,
    pub cooldowns: Vec<CooldownView>,
}

/// Aggregated status of a table on the staff floor plan
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Urgent,
    Pending,
    Clear,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub id: u32,
    pub label: String,
    pub x_position: i32,
    pub y_position: i32,
    pub urgent_count: usize,
    pub pending_count: usize,
    pub status: TableStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub total: usize,
    pub urgent: usize,
}

/// Staff view of every table and request
#[derive(Serialize, Deserialize, Debug)]
pub struct Dashboard {
    pub tables: Vec<TableSummary>,
    pub requests: Vec<ServiceRequest>,
    pub stats: DashboardStats,
}

/// Printable QR code for one table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QrCode {
    pub table_label: String,
    /// Page the code points to
    pub url: String,
    /// Image of the code, rendered by the external service
    pub image_url: String,
}

/// Catalog entry as returned by the API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestTypeInfo {
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub label: String,
    pub cooldown_minutes: i64,
    pub priority: crate::catalog::Priority,
    pub requires_photo: bool,
}

/// Body of every error response
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Returned after a bulk clear
#[derive(Serialize, Deserialize, Debug)]
pub struct Cleared {
    pub deleted: usize,
}
