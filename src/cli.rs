use std::sync::OnceLock;

use clap::{Parser, Subcommand};
use regex::Regex;
use thiserror::Error;

use crate::api::RequestStatus;
use crate::catalog::RequestType;

/// Default address for both the client and the server
///
/// Used when neither the command line nor the configuration provide one.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9898";

/// Errors that can occur when parsing the command line arguments
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CLIError {
    #[error("Invalid target format. Should be <host>:<port>")]
    InvalidUrlFormat,
}

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\.\-]+:\d{1,5}$").expect("valid address regex"))
}

/// Validate the format of the TCP address provided by the user
///
/// Returns its input if the address is in the format <host>:<port>, otherwise InvalidUrlFormat
pub fn validate_address(url: &str) -> std::result::Result<&str, CLIError> {
    if address_regex().is_match(url) {
        Ok(url)
    } else {
        Err(CLIError::InvalidUrlFormat)
    }
}

fn parse_address(url: &str) -> std::result::Result<String, CLIError> {
    validate_address(url).map(str::to_string)
}

/// Arguments of the server binary
#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Table service request server")]
pub struct ServerArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Arguments of the client binary
#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Table service request client")]
pub struct ClientArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Server address, <host>:<port>
    #[arg(short, long, value_parser = parse_address)]
    pub address: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List the restaurants
    Restaurants,
    /// Register a restaurant
    AddRestaurant { name: String, slug: String },
    /// List the tables of a restaurant
    Tables { slug: String },
    /// Add a table to a restaurant
    AddTable {
        slug: String,
        label: String,
        #[arg(short = 'x', long)]
        x_position: Option<i32>,
        #[arg(short = 'y', long)]
        y_position: Option<i32>,
    },
    /// Open a table page and follow its cooldowns
    Open { slug: String, label: String },
    /// Send a service request from a table
    Request {
        slug: String,
        label: String,
        #[arg(value_enum)]
        request_type: RequestType,
        /// Photo of the issue, required for toilet cleaning
        #[arg(short, long)]
        photo: Option<String>,
        /// Exit once sent instead of following the cooldowns
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the staff dashboard
    Dashboard {
        /// Refresh periodically until interrupted
        #[arg(short, long)]
        watch: bool,
        #[arg(short, long, value_enum)]
        status: Option<RequestStatus>,
        /// Only show requests of this table id
        #[arg(short, long)]
        table: Option<u32>,
    },
    /// Move a request to another status
    Status {
        request_id: u32,
        #[arg(value_enum)]
        status: RequestStatus,
    },
    /// Delete every request
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Print the QR codes of a restaurant
    Qr {
        slug: String,
        /// Comma separated labels, every table if absent
        #[arg(short, long, value_delimiter = ',')]
        tables: Vec<String>,
    },
    /// List the request types
    Types,
}
