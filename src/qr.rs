//! URLs printed as QR codes on the tables.
//!
//! Images are rendered by an external service; this module only builds the URLs.
use crate::api::{QrCode, Table};

/// Default image service, taking the encoded data as a query parameter
pub const DEFAULT_IMAGE_SERVICE: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Default side of the generated image, in pixels
pub const DEFAULT_SIZE: u32 = 200;

/// Page opened by customers scanning the code of a table
pub fn table_url(base_url: &str, restaurant_slug: &str, table_label: &str) -> String {
    format!(
        "{}/u/{}/{}",
        base_url.trim_end_matches('/'),
        restaurant_slug,
        table_label
    )
}

/// Image of the QR code encoding `url`
pub fn qr_image_url(image_service: &str, url: &str, size: u32) -> String {
    format!(
        "{}?size={}x{}&data={}",
        image_service,
        size,
        size,
        urlencoding::encode(url)
    )
}

/// Generates the printable codes of a restaurant
#[derive(Debug, Clone)]
pub struct QrGenerator {
    pub base_url: String,
    pub image_service: String,
    pub size: u32,
}

impl QrGenerator {
    pub fn new(base_url: &str) -> Self {
        QrGenerator {
            base_url: base_url.to_string(),
            image_service: DEFAULT_IMAGE_SERVICE.to_string(),
            size: DEFAULT_SIZE,
        }
    }

    pub fn code(&self, restaurant_slug: &str, table_label: &str) -> QrCode {
        let url = table_url(&self.base_url, restaurant_slug, table_label);
        QrCode {
            table_label: table_label.to_string(),
            image_url: qr_image_url(&self.image_service, &url, self.size),
            url,
        }
    }

    /// Codes for the tables whose label is in `selection`, or every table if it is empty.
    ///
    /// Codes are ordered by table label.
    pub fn codes(&self, restaurant_slug: &str, tables: &[Table], selection: &[String]) -> Vec<QrCode> {
        let mut labels: Vec<&str> = tables
            .iter()
            .map(|t| t.label.as_str())
            .filter(|label| selection.is_empty() || selection.iter().any(|s| s == label))
            .collect();
        labels.sort_unstable();
        labels
            .into_iter()
            .map(|label| self.code(restaurant_slug, label))
            .collect()
    }
}
