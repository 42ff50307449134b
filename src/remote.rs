//! Typed access to the HTTP API, used by the client binary and the integration tests.
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::{
    Cleared, Dashboard, NewRestaurant, NewServiceRequest, NewTable, QrCode, Restaurant,
    RequestStatus, RequestTypeInfo, ServiceRequest, StatusUpdate, Table, TablePage, UploadedPhoto,
};
use crate::catalog::RequestType;
use crate::cooldown::CooldownTracker;
use crate::errors::{Error, Result};
use crate::http::{HttpClient, Response, JSON};
use crate::routes::{self, paths};
use crate::status::RequestFilter;

/// Client of a table service server.
///
/// The server closes the connection after every exchange, so each call opens its own.
pub struct ApiClient {
    address: String,
}

impl ApiClient {
    pub fn new(address: &str) -> Self {
        ApiClient {
            address: address.to_string(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn send(
        &self,
        method: &str,
        endpoint: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Response> {
        HttpClient::new(&self.address)?.send(method, endpoint, content_type, body)
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send("GET", endpoint, None, &[])?.json_body()
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_vec(body)?;
        self.send(method, endpoint, Some(JSON), &body)?.json_body()
    }

    pub fn restaurants(&self) -> Result<Vec<Restaurant>> {
        self.get(paths::RESTAURANTS)
    }

    pub fn create_restaurant(&self, name: &str, slug: &str) -> Result<Restaurant> {
        let body = NewRestaurant {
            name: name.to_string(),
            slug: slug.to_string(),
        };
        self.send_json("POST", paths::RESTAURANTS, &body)
    }

    pub fn tables(&self, slug: &str) -> Result<Vec<Table>> {
        self.get(&routes::tables(slug))
    }

    pub fn create_table(&self, slug: &str, table: &NewTable) -> Result<Table> {
        self.send_json("POST", &routes::tables(slug), table)
    }

    pub fn table_page(&self, slug: &str, label: &str) -> Result<TablePage> {
        self.get(&routes::table(slug, label))
    }

    pub fn upload_photo(&self, file_name: &str, bytes: &[u8]) -> Result<UploadedPhoto> {
        let endpoint = routes::photo(&urlencoding::encode(file_name));
        self.send("POST", &endpoint, Some("application/octet-stream"), bytes)?
            .json_body()
    }

    /// Download a photo from its object path
    pub fn photo(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.send("GET", &routes::photo(path), None, &[])?;
        response.check()?;
        Ok(response.body)
    }

    pub fn submit_request(
        &self,
        slug: &str,
        label: &str,
        request_type: RequestType,
        photo_url: Option<String>,
    ) -> Result<ServiceRequest> {
        let body = NewServiceRequest {
            request_type,
            photo_url,
        };
        self.send_json("POST", &routes::table_requests(slug, label), &body)
    }

    pub fn request_types(&self) -> Result<Vec<RequestTypeInfo>> {
        self.get(paths::REQUEST_TYPES)
    }

    pub fn requests(&self, filter: &RequestFilter) -> Result<Vec<ServiceRequest>> {
        self.get(&with_filter(paths::REQUESTS, filter))
    }

    pub fn update_status(&self, request_id: u32, status: RequestStatus) -> Result<ServiceRequest> {
        self.send_json(
            "PATCH",
            &routes::request_by_id(request_id),
            &StatusUpdate { status },
        )
    }

    pub fn clear_requests(&self) -> Result<usize> {
        let cleared: Cleared = self.send("DELETE", paths::REQUESTS, None, &[])?.json_body()?;
        Ok(cleared.deleted)
    }

    pub fn dashboard(&self, filter: &RequestFilter) -> Result<Dashboard> {
        self.get(&with_filter(paths::DASHBOARD, filter))
    }

    pub fn qr_codes(&self, slug: &str, selection: &[String]) -> Result<Vec<QrCode>> {
        let mut endpoint = routes::qr_codes(slug);
        if !selection.is_empty() {
            let labels = selection
                .iter()
                .map(|label| urlencoding::encode(label).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            endpoint = format!("{}?tables={}", endpoint, labels);
        }
        self.get(&endpoint)
    }
}

/// Customer side of a table page: cooldowns fetched once on load, then tracked locally
pub struct TableSession<'a> {
    client: &'a ApiClient,
    pub page: TablePage,
    pub tracker: CooldownTracker,
}

impl<'a> TableSession<'a> {
    /// Resolve the table and load its current cooldowns
    pub fn open(client: &'a ApiClient, slug: &str, label: &str, now: DateTime<Utc>) -> Result<Self> {
        let page = client.table_page(slug, label)?;
        let mut tracker = CooldownTracker::new();
        tracker.load(&page.cooldowns, now);
        Ok(TableSession {
            client,
            page,
            tracker,
        })
    }

    /// Send a request from this table.
    ///
    /// Refused without any call while the type is cooling down, or when the type needs a photo
    /// and none is given. The photo is only read and uploaded for types needing one. On success
    /// the cooldown of the type starts at `now`.
    pub fn submit(
        &mut self,
        request_type: RequestType,
        photo: Option<&Path>,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest> {
        self.tracker.tick(now);
        if let Some(remaining) = self.tracker.remaining(request_type) {
            return Err(Error::CooldownActive {
                remaining: remaining.to_string(),
            });
        }

        let photo_url = if request_type.requires_photo() {
            let file = photo.ok_or_else(|| Error::PhotoRequired(request_type.to_string()))?;
            let bytes = fs::read(file)?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("photo.jpg");
            Some(self.client.upload_photo(file_name, &bytes)?.url)
        } else {
            None
        };

        let request = self.client.submit_request(
            &self.page.restaurant.slug,
            &self.page.table.label,
            request_type,
            photo_url,
        )?;
        self.tracker.start(request_type, now);
        Ok(request)
    }
}

/// Append the query string of a request filter to an endpoint
fn with_filter(endpoint: &str, filter: &RequestFilter) -> String {
    let mut query = Vec::new();
    if let Some(status) = filter.status {
        query.push(format!("status={}", status));
    }
    if let Some(table_id) = filter.table_id {
        query.push(format!("table={}", table_id));
    }
    if query.is_empty() {
        endpoint.to_string()
    } else {
        format!("{}?{}", endpoint, query.join("&"))
    }
}
