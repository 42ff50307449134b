//! Object storage for the photos attached to requests.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;

use crate::errors::{Error, Result};
use crate::routes;

/// Folder of the photos attached to restroom requests
pub const TOILET_PHOTOS: &str = "toilet-photos";

/// Trait hiding where photos are kept
pub trait PhotoStore {
    /// Store `bytes` under `path`. An existing object is never replaced, `Error::Conflict`
    /// is returned instead.
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read back the object stored under `path`
    fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// URL under which the object is publicly served
    fn public_url(&self, path: &str) -> String;
}

/// Object path for a photo uploaded at `now` from a file named `file_name`.
///
/// `attempt` disambiguates uploads landing on the same millisecond, 0 for the first one.
pub fn photo_path(file_name: &str, now: DateTime<Utc>, attempt: u32) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());
    let suffix = if attempt == 0 {
        String::new()
    } else {
        format!("-{}", attempt)
    };
    format!(
        "{}/toilet-{}{}.{}",
        TOILET_PHOTOS,
        now.timestamp_millis(),
        suffix,
        extension
    )
}

/// Reject paths that could escape the store
pub fn validate_path(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && path.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    if valid {
        Ok(())
    } else {
        Err(Error::BadRequest(format!("Invalid photo path '{}'", path)))
    }
}

fn public_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), routes::photo(path))
}

/// Photos kept as files under a root directory
pub struct LocalPhotoStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPhotoStore {
    /// Create the store, creating `root` if it does not exist yet
    pub fn new(root: &Path, public_base_url: &str) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(LocalPhotoStore {
            root: root.to_path_buf(),
            public_base_url: public_base_url.to_string(),
        })
    }

    fn file(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

impl PhotoStore for LocalPhotoStore {
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let file = self.file(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file)
        {
            Ok(out) => out,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::Conflict(format!("Photo '{}' already exists", path)));
            }
            Err(err) => return Err(err.into()),
        };
        out.write_all(bytes)?;
        debug!("Stored {} bytes in {}", bytes.len(), file.display());
        Ok(())
    }

    fn download(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.file(path)?;
        match fs::read(&file) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Photo '{}'", path)))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        public_url(&self.public_base_url, path)
    }
}

pub mod mock {
    use std::collections::hash_map::Entry;
    use std::collections::HashMap;

    use super::*;

    /// Photos kept in memory, only meant for tests
    #[derive(Default)]
    pub struct MemoryPhotoStore {
        pub objects: HashMap<String, Vec<u8>>,
    }

    impl PhotoStore for MemoryPhotoStore {
        fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
            validate_path(path)?;
            match self.objects.entry(path.to_string()) {
                Entry::Occupied(_) => {
                    Err(Error::Conflict(format!("Photo '{}' already exists", path)))
                }
                Entry::Vacant(entry) => {
                    entry.insert(bytes.to_vec());
                    Ok(())
                }
            }
        }

        fn download(&self, path: &str) -> Result<Vec<u8>> {
            self.objects
                .get(path)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Photo '{}'", path)))
        }

        fn public_url(&self, path: &str) -> String {
            public_url("http://localhost", path)
        }
    }
}
