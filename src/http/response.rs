use std::io::{BufReader, Read};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::ErrorBody;
use crate::errors::{Error, Result};
use crate::http::message::{content_length, find_header, owned_headers, read_message, MAX_HEADERS};

pub const JSON: &str = "application/json";

/// An HTTP response to be sent to a client
#[derive(Debug)]
pub struct Response {
    /// Status code of the response. Optional because that's what httparse returns, but it
    /// shouldn't happen in practice since we control the responses.
    pub status: Option<u16>,
    /// Headers for the response. It is not necessary to add Content-Length to it, this is done
    /// automatically on serialization.
    pub headers: Vec<(String, String)>,
    /// Body of the response. Empty for no body
    pub body: Vec<u8>,
}

impl Response {
    /// Creates an empty OK response (204)
    pub fn ok() -> Response {
        Response {
            status: Some(204),
            headers: vec![],
            body: vec![],
        }
    }

    /// Creates an OK (200) response with the given body
    pub fn ok_with_body(content_type: &str, body: Vec<u8>) -> Response {
        Response {
            status: Some(200),
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    /// Creates a response with the given status and a JSON body
    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Response> {
        Ok(Response {
            status: Some(status),
            headers: vec![("Content-Type".to_string(), JSON.to_string())],
            body: serde_json::to_vec(value)?,
        })
    }

    /// Creates an error response with the given code and message.
    ///
    /// The code must be in the 4xx or 5xx range.
    pub fn error(code: u16, message: &str) -> Response {
        assert!((400..600).contains(&code), "Invalid error code");
        let body = ErrorBody {
            error: message.to_string(),
        };
        Response {
            status: Some(code),
            headers: vec![("Content-Type".to_string(), JSON.to_string())],
            body: serde_json::to_vec(&body).unwrap_or_default(),
        }
    }

    /// Turns an error into the response sent to the client.
    ///
    /// Internal errors are reported without details.
    pub fn from_error(err: &Error) -> Response {
        match err.status_code() {
            code @ 400..=499 => Self::error(code, &err.to_string()),
            _ => Self::internal_server_error(),
        }
    }

    /// Creates an Internal Server Error (500) response.
    pub fn internal_server_error() -> Response {
        Self::error(500, "Internal server error")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }

    /// Deserialize a successful JSON body, or turn an error response into `Error::Remote`
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T> {
        self.check()?;
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn an error response into `Error::Remote`, using the message of its body
    pub fn check(&self) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        let message = serde_json::from_slice::<ErrorBody>(&self.body)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.body).to_string());
        Err(Error::Remote {
            status: self.status.unwrap_or(500),
            message,
        })
    }
}

/// Parse an HTTP response from a byte stream
pub fn parse_response<T>(mut buf_reader: BufReader<T>) -> Result<Response>
where
    T: Sized + Read,
{
    let (mut response, body) = read_message(&mut buf_reader, |buf| {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut resp = httparse::Response::new(&mut headers);
        match resp.parse(buf)? {
            httparse::Status::Complete(parsed_len) => {
                let headers = owned_headers(resp.headers);
                let body_len = content_length(&headers)?;
                let response = Response {
                    status: resp.code,
                    headers,
                    body: vec![],
                };
                Ok(Some((parsed_len, body_len, response)))
            }
            httparse::Status::Partial => Ok(None),
        }
    })?;
    response.body = body;

    Ok(response)
}
