//! Staff-side aggregation of requests into per-table statuses.
use chrono::{DateTime, Utc};

use crate::api::{DashboardStats, RequestStatus, ServiceRequest, Table, TableStatus, TableSummary};

/// Classify a table from the requests made from it.
///
/// Only open requests (pending or in progress) count. Any open high-priority request makes
/// the table urgent, otherwise any pending request makes it pending.
pub fn classify<'a, I>(requests: I) -> TableStatus
where
    I: IntoIterator<Item = &'a ServiceRequest>,
{
    let (urgent, pending) = count_open(requests);
    status_from_counts(urgent, pending)
}

fn status_from_counts(urgent: usize, pending: usize) -> TableStatus {
    if urgent > 0 {
        TableStatus::Urgent
    } else if pending > 0 {
        TableStatus::Pending
    } else {
        TableStatus::Clear
    }
}

/// Count open high-priority requests and pending requests
fn count_open<'a, I>(requests: I) -> (usize, usize)
where
    I: IntoIterator<Item = &'a ServiceRequest>,
{
    requests
        .into_iter()
        .filter(|r| r.status.is_open())
        .fold((0, 0), |(urgent, pending), r| {
            (
                urgent + r.request_type.is_high_priority() as usize,
                pending + (r.status == RequestStatus::Pending) as usize,
            )
        })
}

/// Summarize every table for the floor plan, in the order the tables are given
pub fn summarize(tables: &[Table], requests: &[ServiceRequest]) -> Vec<TableSummary> {
    tables
        .iter()
        .map(|table| {
            let (urgent_count, pending_count) =
                count_open(requests.iter().filter(|r| r.table_id == table.id));
            TableSummary {
                id: table.id,
                label: table.label.clone(),
                x_position: table.x_position.unwrap_or(0),
                y_position: table.y_position.unwrap_or(0),
                urgent_count,
                pending_count,
                status: status_from_counts(urgent_count, pending_count),
            }
        })
        .collect()
}

/// Counters shown at the top of the dashboard
pub fn stats(requests: &[ServiceRequest], tables: &[TableSummary]) -> DashboardStats {
    let count = |status: RequestStatus| requests.iter().filter(|r| r.status == status).count();
    DashboardStats {
        pending: count(RequestStatus::Pending),
        in_progress: count(RequestStatus::InProgress),
        completed: count(RequestStatus::Completed),
        total: requests.len(),
        urgent: tables.iter().map(|t| t.urgent_count).sum(),
    }
}

/// Order requests by creation time, newest first
pub fn sort_newest_first(requests: &mut [ServiceRequest]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Selection of requests shown in the staff list
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RequestFilter {
    /// Only requests with this status, all of them if None
    pub status: Option<RequestStatus>,
    /// Only requests made from this table
    pub table_id: Option<u32>,
}

impl RequestFilter {
    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self.table_id.map_or(true, |id| request.table_id == id)
    }

    pub fn apply(&self, requests: Vec<ServiceRequest>) -> Vec<ServiceRequest> {
        requests.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Human readable age of a request
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        format!("{}h ago", hours)
    } else {
        "A while ago".to_string()
    }
}
