use std::io::Read;

use crate::errors::{Error, Result};

/// Largest head (request or status line plus headers) accepted
pub const MAX_HEAD_SIZE: usize = 128 * 1024;
/// Largest body accepted, photos included
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
/// Maximum number of headers in a message
pub const MAX_HEADERS: usize = 64;

/// Read one HTTP message (request or response) from `reader`.
///
/// `parse_head` is called on the bytes received so far until it returns the length of the
/// head, the length of the body and whatever it extracted from the head. The body is then
/// read until complete. Bytes received after the body are dropped, which is fine as long as
/// connections carry a single exchange.
pub(crate) fn read_message<R, T, F>(reader: &mut R, mut parse_head: F) -> Result<(T, Vec<u8>)>
where
    R: Read,
    F: FnMut(&[u8]) -> Result<Option<(usize, usize, T)>>,
{
    let mut buf = Vec::new();
    let mut chunk = [0; 4096];

    let (head_len, body_len, head) = loop {
        let bytes_read = reader.read(&mut chunk)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        buf.extend_from_slice(&chunk[..bytes_read]);

        if let Some(parsed) = parse_head(&buf)? {
            break parsed;
        }
        if buf.len() > MAX_HEAD_SIZE {
            return Err(Error::BadRequest("Message head too large".to_string()));
        }
    };

    if body_len > MAX_BODY_SIZE {
        return Err(Error::BadRequest(format!(
            "Body of {} bytes is too large",
            body_len
        )));
    }

    while buf.len() - head_len < body_len {
        let bytes_read = reader.read(&mut chunk)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        buf.extend_from_slice(&chunk[..bytes_read]);
    }

    Ok((head, buf[head_len..head_len + body_len].to_vec()))
}

/// Copy the headers parsed by httparse
pub(crate) fn owned_headers(headers: &[httparse::Header]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect()
}

/// Case-insensitive header lookup
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Value of the Content-Length header, 0 when absent
pub(crate) fn content_length(headers: &[(String, String)]) -> Result<usize> {
    match find_header(headers, "Content-Length") {
        Some(length) => length
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::BadRequest(format!("Invalid Content-Length '{}'", length))),
        None => Ok(0),
    }
}
