use chrono::{DateTime, Utc};

use crate::api::{NewTable, RequestStatus, Restaurant, ServiceRequest, Table};
use crate::catalog::RequestType;
use crate::errors::Result;

pub mod sqlite;

/// Trait hiding the database implementation
///
/// The mock is used by unit tests and the SQLite implementation by the server. Both must
/// report unknown rows as `Error::NotFound` and duplicate slugs or table labels as
/// `Error::Conflict`.
pub trait Database {
    /// Create a new empty database
    fn new() -> Result<Self>
    where
        Self: Sized;

    /// Insert a restaurant. Slugs are unique.
    fn insert_restaurant(&mut self, name: &str, slug: &str) -> Result<Restaurant>;

    /// All restaurants, ordered by name
    fn list_restaurants(&self) -> Result<Vec<Restaurant>>;

    fn get_restaurant_by_slug(&self, slug: &str) -> Result<Restaurant>;

    /// Insert a table in an existing restaurant. Labels are unique within a restaurant.
    fn insert_table(&mut self, restaurant_id: u32, table: &NewTable) -> Result<Table>;

    /// Tables of one restaurant, or of all of them, ordered by label
    fn list_tables(&self, restaurant_id: Option<u32>) -> Result<Vec<Table>>;

    fn get_table(&self, restaurant_id: u32, label: &str) -> Result<Table>;

    fn get_table_by_id(&self, table_id: u32) -> Result<Table>;

    /// Insert a pending request for an existing table
    fn insert_request(
        &mut self,
        table_id: u32,
        request_type: RequestType,
        photo_url: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<ServiceRequest>;

    /// Creation time of the most recent request of the given type made from the table
    fn last_request_time(
        &self,
        table_id: u32,
        request_type: RequestType,
    ) -> Result<Option<DateTime<Utc>>>;

    /// Every request, newest first
    fn list_requests(&self) -> Result<Vec<ServiceRequest>>;

    /// Set the status of a request, whatever its current status is
    fn update_request_status(
        &mut self,
        request_id: u32,
        status: RequestStatus,
    ) -> Result<ServiceRequest>;

    /// Delete every request, returning how many were deleted
    fn delete_all_requests(&mut self) -> Result<usize>;
}

pub mod mock {

    use super::*;
    use crate::errors::Error;
    use crate::status::sort_newest_first;

    /// In-memory database, only meant for tests
    #[derive(Default)]
    pub struct MockDB {
        restaurants: Vec<Restaurant>,
        tables: Vec<Table>,
        requests: Vec<ServiceRequest>,
        next_id: u32,
    }

    impl MockDB {
        fn next_id(&mut self) -> u32 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl Database for MockDB {
        fn new() -> Result<Self> {
            Ok(MockDB::default())
        }

        fn insert_restaurant(&mut self, name: &str, slug: &str) -> Result<Restaurant> {
            if self.restaurants.iter().any(|r| r.slug == slug) {
                return Err(Error::Conflict(format!("Slug '{}' is already taken", slug)));
            }
            let restaurant = Restaurant {
                id: self.next_id(),
                name: name.to_string(),
                slug: slug.to_string(),
            };
            self.restaurants.push(restaurant.clone());
            Ok(restaurant)
        }

        fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
            let mut restaurants = self.restaurants.clone();
            restaurants.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(restaurants)
        }

        fn get_restaurant_by_slug(&self, slug: &str) -> Result<Restaurant> {
            self.restaurants
                .iter()
                .find(|r| r.slug == slug)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Restaurant '{}'", slug)))
        }

        fn insert_table(&mut self, restaurant_id: u32, table: &NewTable) -> Result<Table> {
            if !self.restaurants.iter().any(|r| r.id == restaurant_id) {
                return Err(Error::NotFound(format!("Restaurant {}", restaurant_id)));
            }
            if self
                .tables
                .iter()
                .any(|t| t.restaurant_id == restaurant_id && t.label == table.label)
            {
                return Err(Error::Conflict(format!(
                    "Table '{}' already exists",
                    table.label
                )));
            }
            let table = Table {
                id: self.next_id(),
                restaurant_id,
                label: table.label.clone(),
                x_position: table.x_position,
                y_position: table.y_position,
            };
            self.tables.push(table.clone());
            Ok(table)
        }

        fn list_tables(&self, restaurant_id: Option<u32>) -> Result<Vec<Table>> {
            let mut tables: Vec<_> = self
                .tables
                .iter()
                .filter(|t| restaurant_id.map_or(true, |id| t.restaurant_id == id))
                .cloned()
                .collect();
            tables.sort_by(|a, b| a.label.cmp(&b.label));
            Ok(tables)
        }

        fn get_table(&self, restaurant_id: u32, label: &str) -> Result<Table> {
            self.tables
                .iter()
                .find(|t| t.restaurant_id == restaurant_id && t.label == label)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Table '{}'", label)))
        }

        fn get_table_by_id(&self, table_id: u32) -> Result<Table> {
            self.tables
                .iter()
                .find(|t| t.id == table_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Table {}", table_id)))
        }

        fn insert_request(
            &mut self,
            table_id: u32,
            request_type: RequestType,
            photo_url: Option<&str>,
            created_at: DateTime<Utc>,
        ) -> Result<ServiceRequest> {
            self.get_table_by_id(table_id)?;
            let request = ServiceRequest {
                id: self.next_id(),
                table_id,
                request_type,
                status: RequestStatus::Pending,
                photo_url: photo_url.map(str::to_string),
                created_at,
            };
            self.requests.push(request.clone());
            Ok(request)
        }

        fn last_request_time(
            &self,
            table_id: u32,
            request_type: RequestType,
        ) -> Result<Option<DateTime<Utc>>> {
            Ok(self
                .requests
                .iter()
                .filter(|r| r.table_id == table_id && r.request_type == request_type)
                .map(|r| r.created_at)
                .max())
        }

        fn list_requests(&self) -> Result<Vec<ServiceRequest>> {
            let mut requests = self.requests.clone();
            sort_newest_first(&mut requests);
            Ok(requests)
        }

        fn update_request_status(
            &mut self,
            request_id: u32,
            status: RequestStatus,
        ) -> Result<ServiceRequest> {
            let request = self
                .requests
                .iter_mut()
                .find(|r| r.id == request_id)
                .ok_or_else(|| Error::NotFound(format!("Request {}", request_id)))?;
            request.status = status;
            Ok(request.clone())
        }

        fn delete_all_requests(&mut self) -> Result<usize> {
            let deleted = self.requests.len();
            self.requests.clear();
            Ok(deleted)
        }
    }

}
