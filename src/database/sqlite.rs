use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::api::{NewTable, RequestStatus, Restaurant, ServiceRequest, Table};
use crate::catalog::RequestType;
use crate::database::Database;
use crate::errors::{Error, Result};

/// Contains the SQL queries used to interact with the database
pub mod sql_queries {
    pub const CREATE_TABLES: &str = "
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS restaurants (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS tables (
            id INTEGER PRIMARY KEY,
            restaurant_id INTEGER NOT NULL REFERENCES restaurants(id) ON DELETE CASCADE,
            label TEXT NOT NULL,
            x_position INTEGER,
            y_position INTEGER,
            UNIQUE (restaurant_id, label)
        );
        CREATE TABLE IF NOT EXISTS requests (
            id INTEGER PRIMARY KEY,
            table_id INTEGER NOT NULL REFERENCES tables(id) ON DELETE CASCADE,
            request_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            photo_url TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS requests_by_table_type
            ON requests (table_id, request_type, created_at);";

    pub const INSERT_RESTAURANT: &str = "INSERT INTO restaurants (name, slug) VALUES (?1, ?2)";
    pub const SELECT_RESTAURANTS: &str = "SELECT id, name, slug FROM restaurants ORDER BY name";
    pub const SELECT_RESTAURANT_BY_SLUG: &str =
        "SELECT id, name, slug FROM restaurants WHERE slug = ?1";
    pub const SELECT_RESTAURANT_BY_ID: &str = "SELECT id FROM restaurants WHERE id = ?1";

    pub const INSERT_TABLE: &str =
        "INSERT INTO tables (restaurant_id, label, x_position, y_position) VALUES (?1, ?2, ?3, ?4)";
    pub const SELECT_TABLES: &str =
        "SELECT id, restaurant_id, label, x_position, y_position FROM tables ORDER BY label";
    pub const SELECT_TABLES_OF_RESTAURANT: &str = "SELECT id, restaurant_id, label, x_position, y_position FROM tables WHERE restaurant_id = ?1 ORDER BY label";
    pub const SELECT_TABLE: &str = "SELECT id, restaurant_id, label, x_position, y_position FROM tables WHERE restaurant_id = ?1 AND label = ?2";
    pub const SELECT_TABLE_BY_ID: &str =
        "SELECT id, restaurant_id, label, x_position, y_position FROM tables WHERE id = ?1";

    pub const INSERT_REQUEST: &str = "INSERT INTO requests (table_id, request_type, status, photo_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5)";
    pub const SELECT_LAST_REQUEST_TIME: &str =
        "SELECT MAX(created_at) FROM requests WHERE table_id = ?1 AND request_type = ?2";
    pub const SELECT_REQUESTS: &str = "SELECT id, table_id, request_type, status, photo_url, created_at FROM requests ORDER BY created_at DESC, id DESC";
    pub const SELECT_REQUEST: &str = "SELECT id, table_id, request_type, status, photo_url, created_at FROM requests WHERE id = ?1";
    pub const UPDATE_REQUEST_STATUS: &str = "UPDATE requests SET status = ?2 WHERE id = ?1";
    pub const DELETE_REQUESTS: &str = "DELETE FROM requests";
}

/// Database stored in SQLite, in memory or in a file
pub struct SQLiteConnection {
    conn: Connection,
}

impl SQLiteConnection {
    /// Open (and create if needed) the database at `path`. ":memory:" keeps it in memory.
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute_batch(sql_queries::CREATE_TABLES)?;
        Ok(SQLiteConnection { conn })
    }

    fn get_request(&self, request_id: u32) -> Result<ServiceRequest> {
        self.conn
            .prepare_cached(sql_queries::SELECT_REQUEST)?
            .query_row(params![request_id], request_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Request {}", request_id)))
    }
}

impl Database for SQLiteConnection {
    fn new() -> Result<Self> {
        Self::open(":memory:")
    }

    fn insert_restaurant(&mut self, name: &str, slug: &str) -> Result<Restaurant> {
        self.conn
            .execute(sql_queries::INSERT_RESTAURANT, params![name, slug])
            .map_err(|err| conflict_or(err, || format!("Slug '{}' is already taken", slug)))?;
        Ok(Restaurant {
            id: self.conn.last_insert_rowid() as u32,
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }

    fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
        self.conn
            .prepare_cached(sql_queries::SELECT_RESTAURANTS)?
            .query_map([], restaurant_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    fn get_restaurant_by_slug(&self, slug: &str) -> Result<Restaurant> {
        self.conn
            .prepare_cached(sql_queries::SELECT_RESTAURANT_BY_SLUG)?
            .query_row(params![slug], restaurant_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Restaurant '{}'", slug)))
    }

    fn insert_table(&mut self, restaurant_id: u32, table: &NewTable) -> Result<Table> {
        let exists = self
            .conn
            .prepare_cached(sql_queries::SELECT_RESTAURANT_BY_ID)?
            .exists(params![restaurant_id])?;
        if !exists {
            return Err(Error::NotFound(format!("Restaurant {}", restaurant_id)));
        }

        self.conn
            .execute(
                sql_queries::INSERT_TABLE,
                params![
                    restaurant_id,
                    table.label,
                    table.x_position,
                    table.y_position
                ],
            )
            .map_err(|err| conflict_or(err, || format!("Table '{}' already exists", table.label)))?;
        Ok(Table {
            id: self.conn.last_insert_rowid() as u32,
            restaurant_id,
            label: table.label.clone(),
            x_position: table.x_position,
            y_position: table.y_position,
        })
    }

    fn list_tables(&self, restaurant_id: Option<u32>) -> Result<Vec<Table>> {
        let tables = match restaurant_id {
            Some(id) => self
                .conn
                .prepare_cached(sql_queries::SELECT_TABLES_OF_RESTAURANT)?
                .query_map(params![id], table_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => self
                .conn
                .prepare_cached(sql_queries::SELECT_TABLES)?
                .query_map([], table_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(tables)
    }

    fn get_table(&self, restaurant_id: u32, label: &str) -> Result<Table> {
        self.conn
            .prepare_cached(sql_queries::SELECT_TABLE)?
            .query_row(params![restaurant_id, label], table_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Table '{}'", label)))
    }

    fn get_table_by_id(&self, table_id: u32) -> Result<Table> {
        self.conn
            .prepare_cached(sql_queries::SELECT_TABLE_BY_ID)?
            .query_row(params![table_id], table_from_row)
            .optional()?
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

        let millis = created_at.timestamp_millis();
        self.conn.execute(
            sql_queries::INSERT_REQUEST,
            params![
                table_id,
                request_type,
                RequestStatus::Pending,
                photo_url,
                millis
            ],
        )?;
        Ok(ServiceRequest {
            id: self.conn.last_insert_rowid() as u32,
            table_id,
            request_type,
            status: RequestStatus::Pending,
            photo_url: photo_url.map(str::to_string),
            created_at: from_millis(millis)?,
        })
    }

    fn last_request_time(
        &self,
        table_id: u32,
        request_type: RequestType,
    ) -> Result<Option<DateTime<Utc>>> {
        let millis: Option<i64> = self
            .conn
            .prepare_cached(sql_queries::SELECT_LAST_REQUEST_TIME)?
            .query_row(params![table_id, request_type], |row| row.get(0))?;
        millis.map(from_millis).transpose().map_err(Error::from)
    }

    fn list_requests(&self) -> Result<Vec<ServiceRequest>> {
        self.conn
            .prepare_cached(sql_queries::SELECT_REQUESTS)?
            .query_map([], request_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    fn update_request_status(
        &mut self,
        request_id: u32,
        status: RequestStatus,
    ) -> Result<ServiceRequest> {
        let updated = self
            .conn
            .execute(sql_queries::UPDATE_REQUEST_STATUS, params![request_id, status])?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Request {}", request_id)));
        }
        self.get_request(request_id)
    }

    fn delete_all_requests(&mut self) -> Result<usize> {
        Ok(self.conn.execute(sql_queries::DELETE_REQUESTS, [])?)
    }
}

/// Unique constraint violations become conflicts, everything else stays a database error
fn conflict_or<F>(err: rusqlite::Error, message: F) -> Error
where
    F: FnOnce() -> String,
{
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => Error::Conflict(message()),
        _ => Error::Database(err),
    }
}

fn from_millis(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        5, millis,
    ))
}

fn restaurant_from_row(row: &Row) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
    })
}

fn table_from_row(row: &Row) -> rusqlite::Result<Table> {
    Ok(Table {
        id: row.get(0)?,
        restaurant_id: row.get(1)?,
        label: row.get(2)?,
        x_position: row.get(3)?,
        y_position: row.get(4)?,
    })
}

fn request_from_row(row: &Row) -> rusqlite::Result<ServiceRequest> {
    Ok(ServiceRequest {
        id: row.get(0)?,
        table_id: row.get(1)?,
        request_type: row.get(2)?,
        status: row.get(3)?,
        photo_url: row.get(4)?,
        created_at: from_millis(row.get(5)?)?,
    })
}

impl ToSql for RequestType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RequestType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

impl ToSql for RequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}
