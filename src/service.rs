//! Operations behind the customer, staff and admin screens.
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::api::{
    CooldownView, Dashboard, NewTable, QrCode, RequestStatus, Restaurant, ServiceRequest, Table,
    TablePage, UploadedPhoto,
};
use crate::catalog::RequestType;
use crate::cooldown::{self, CooldownState};
use crate::database::Database;
use crate::errors::{Error, Result};
use crate::qr::QrGenerator;
use crate::status::{self, RequestFilter};
use crate::storage::{self, PhotoStore};

/// Uploads sharing a millisecond get numbered paths, up to this many
const MAX_PATH_ATTEMPTS: u32 = 64;

/// Everything the request handlers work with
pub struct TableService {
    db: Box<dyn Database + Send>,
    photos: Box<dyn PhotoStore + Send>,
    qr: QrGenerator,
    allow_bulk_clear: bool,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::BadRequest(format!("Missing {}", field)))
    } else {
        Ok(value)
    }
}

impl TableService {
    pub fn new(
        db: Box<dyn Database + Send>,
        photos: Box<dyn PhotoStore + Send>,
        qr: QrGenerator,
        allow_bulk_clear: bool,
    ) -> Self {
        TableService {
            db,
            photos,
            qr,
            allow_bulk_clear,
        }
    }

    pub fn create_restaurant(&mut self, name: &str, slug: &str) -> Result<Restaurant> {
        let restaurant = self
            .db
            .insert_restaurant(required("name", name)?, required("slug", slug)?)?;
        info!("Created restaurant '{}' ({})", restaurant.slug, restaurant.id);
        Ok(restaurant)
    }

    pub fn restaurants(&self) -> Result<Vec<Restaurant>> {
        self.db.list_restaurants()
    }

    pub fn create_table(&mut self, slug: &str, table: &NewTable) -> Result<Table> {
        let restaurant = self.db.get_restaurant_by_slug(slug)?;
        let table = NewTable {
            label: required("label", &table.label)?.to_string(),
            x_position: table.x_position,
            y_position: table.y_position,
        };
        let table = self.db.insert_table(restaurant.id, &table)?;
        info!("Created table '{}' in '{}'", table.label, slug);
        Ok(table)
    }

    pub fn tables(&self, slug: &str) -> Result<Vec<Table>> {
        let restaurant = self.db.get_restaurant_by_slug(slug)?;
        self.db.list_tables(Some(restaurant.id))
    }

    /// Find the table a customer scanned. Unknown restaurants and tables are `NotFound`.
    pub fn resolve_table(&self, slug: &str, label: &str) -> Result<(Restaurant, Table)> {
        let restaurant = self.db.get_restaurant_by_slug(slug)?;
        let table = self.db.get_table(restaurant.id, label)?;
        Ok((restaurant, table))
    }

    /// Cooldown of every request type for a table at `now`
    pub fn cooldowns(&self, table_id: u32, now: DateTime<Utc>) -> Result<Vec<CooldownView>> {
        RequestType::ALL
            .into_iter()
            .map(|request_type| {
                let last = self.db.last_request_time(table_id, request_type)?;
                Ok(cooldown::view(request_type, last, now))
            })
            .collect()
    }

    /// Data shown when a customer opens the page of a table
    pub fn open_table(&self, slug: &str, label: &str, now: DateTime<Utc>) -> Result<TablePage> {
        let (restaurant, table) = self.resolve_table(slug, label)?;
        let cooldowns = self.cooldowns(table.id, now)?;
        Ok(TablePage {
            restaurant,
            table,
            cooldowns,
        })
    }

    /// Store a photo and return the URL to attach to a request
    pub fn upload_photo(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<UploadedPhoto> {
        if bytes.is_empty() {
            return Err(Error::BadRequest("Empty photo".to_string()));
        }
        for attempt in 0..MAX_PATH_ATTEMPTS {
            let path = storage::photo_path(file_name, now, attempt);
            match self.photos.upload(&path, bytes) {
                Ok(()) => {
                    let url = self.photos.public_url(&path);
                    info!("Uploaded photo {} ({} bytes)", path, bytes.len());
                    return Ok(UploadedPhoto { path, url });
                }
                Err(Error::Conflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::Conflict(format!(
            "No free photo path for {}",
            now.timestamp_millis()
        )))
    }

    pub fn photo(&self, path: &str) -> Result<Vec<u8>> {
        self.photos.download(path)
    }

    /// Create a request from a table.
    ///
    /// Refused while the type is cooling down for this table, or when the type needs a photo
    /// and no photo URL is given. Photos given for other types are dropped.
    pub fn submit_request(
        &mut self,
        table_id: u32,
        request_type: RequestType,
        photo_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest> {
        self.db.get_table_by_id(table_id)?;

        let last = self.db.last_request_time(table_id, request_type)?;
        if let CooldownState::Active { until } = cooldown::check(request_type, last, now) {
            let remaining = cooldown::format_remaining(until, now).unwrap_or_default();
            info!(
                "Refused {} for table {}: cooling down for {}",
                request_type, table_id, remaining
            );
            return Err(Error::CooldownActive { remaining });
        }

        let photo_url = if request_type.requires_photo() {
            let url = photo_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .ok_or_else(|| Error::PhotoRequired(request_type.to_string()))?;
            Some(url)
        } else {
            None
        };

        let request = self
            .db
            .insert_request(table_id, request_type, photo_url, now)?;
        info!(
            "New {} request {} from table {}",
            request_type, request.id, table_id
        );
        Ok(request)
    }

    pub fn update_status(
        &mut self,
        request_id: u32,
        status: RequestStatus,
    ) -> Result<ServiceRequest> {
        let request = self.db.update_request_status(request_id, status)?;
        info!("Request {} is now {}", request_id, status);
        Ok(request)
    }

    /// Requests matching `filter`, newest first
    pub fn requests(&self, filter: &RequestFilter) -> Result<Vec<ServiceRequest>> {
        Ok(filter.apply(self.db.list_requests()?))
    }

    /// Staff view: every table with its aggregated status, the filtered request list and the
    /// counters computed over all requests
    pub fn dashboard(&self, filter: &RequestFilter) -> Result<Dashboard> {
        let requests = self.db.list_requests()?;
        let tables = self.db.list_tables(None)?;
        let tables = status::summarize(&tables, &requests);
        let stats = status::stats(&requests, &tables);
        Ok(Dashboard {
            requests: filter.apply(requests),
            tables,
            stats,
        })
    }

    /// Delete every request. Only allowed when enabled in the configuration.
    pub fn clear_requests(&mut self) -> Result<usize> {
        if !self.allow_bulk_clear {
            return Err(Error::BulkClearDisabled);
        }
        let deleted = self.db.delete_all_requests()?;
        warn!("Cleared all requests, {} deleted", deleted);
        Ok(deleted)
    }

    /// Printable codes for the tables of a restaurant, restricted to `selection` if not empty
    pub fn qr_codes(&self, slug: &str, selection: &[String]) -> Result<Vec<QrCode>> {
        let restaurant = self.db.get_restaurant_by_slug(slug)?;
        let tables = self.db.list_tables(Some(restaurant.id))?;
        Ok(self.qr.codes(&restaurant.slug, &tables, selection))
    }
}
