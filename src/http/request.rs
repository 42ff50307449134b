use std::collections::HashMap;
use std::io::{BufReader, Read};

use serde::de::DeserializeOwned;

use crate::errors::{Error, Result};
use crate::http::message::{content_length, find_header, owned_headers, read_message, MAX_HEADERS};

/// Represents an HTTP request.
#[derive(Debug)]
pub struct Request {
    /// The HTTP method used in the request
    pub method: String,
    /// The full target of the request, query string included
    pub path: String,
    /// Headers of the request
    pub headers: Vec<(String, String)>,
    /// Body of the request
    pub body: Vec<u8>,
}

impl Request {
    /// Create a new request from scratch
    pub fn new(method: &str, path: &str, headers: Vec<(String, String)>, body: Vec<u8>) -> Request {
        Request {
            method: method.to_string(),
            path: path.to_string(),
            headers,
            body,
        }
    }
    /// Create a new GET request for the given path, with an empty body
    pub fn get(path: &str) -> Request {
        Self::new("GET", path, vec![], vec![])
    }
    /// Create a new POST request for the given path, with the given body
    pub fn post(path: &str, body: impl Into<Vec<u8>>) -> Request {
        Self::new("POST", path, vec![], body.into())
    }
    /// Create a new PATCH request for the given path, with the given body
    pub fn patch(path: &str, body: impl Into<Vec<u8>>) -> Request {
        Self::new("PATCH", path, vec![], body.into())
    }
    /// Create a new DELETE request for the given path, with an empty body
    pub fn delete(path: &str) -> Request {
        Self::new("DELETE", path, vec![], vec![])
    }

    /// Path of the request, without the query string
    pub fn route_path(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(path, _)| path)
    }

    /// Decoded query string parameters. Later occurrences of a key win.
    pub fn query(&self) -> HashMap<String, String> {
        let Some((_, query)) = self.path.split_once('?') else {
            return HashMap::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }

    /// Comma separated list parameter, split before decoding so items may hold an encoded
    /// comma. Empty items are skipped, an absent key yields an empty list.
    pub fn query_list(&self, name: &str) -> Vec<String> {
        let Some((_, query)) = self.path.split_once('?') else {
            return Vec::new();
        };
        query
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .filter(|(key, _)| decode_component(key) == name)
            .last()
            .map(|(_, value)| {
                value
                    .split(',')
                    .map(decode_component)
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Deserialize the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|err| Error::BadRequest(format!("Invalid body: {}", err)))
    }
}

/// Decode a percent-encoded query component, '+' standing for a space
pub fn decode_component(component: &str) -> String {
    let component = component.replace('+', " ");
    urlencoding::decode(&component)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(component)
}

/// Parse an HTTP request from a byte stream
pub fn parse_request<T>(mut buf_reader: BufReader<T>) -> Result<Request>
where
    T: Sized + Read,
{
    let (mut request, body) = read_message(&mut buf_reader, |buf| {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(buf)? {
            httparse::Status::Complete(parsed_len) => {
                let headers = owned_headers(req.headers);
                let body_len = content_length(&headers)?;
                let request = Request::new(
                    req.method.unwrap_or("GET"),
                    req.path.unwrap_or("/"),
                    headers,
                    vec![],
                );
                Ok(Some((parsed_len, body_len, request)))
            }
            httparse::Status::Partial => Ok(None),
        }
    })?;
    request.body = body;

    Ok(request)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    fn random_text(len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen_range('a'..='z')).collect()
    }

    #[test]
    fn test_parse_simple_request() {
        let req_str = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\n\r\n";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "GET");
        assert_eq!(parsed_req.path, "/");
        assert_eq!(parsed_req.headers.len(), 3);
        assert!(parsed_req.body.is_empty());
    }

    #[test]
    fn test_parse_incomplete_request() {
        let req_str =
            b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed_req = parse_request(buf_reader);

        assert!(parsed_req.is_err());
    }

    #[test]
    fn test_parse_request_with_body() {
        let body = "{ \"type\": \"table_clean\" }";
        let req_str = format!(
            "POST /api/v1/restaurants/bistro/tables/A1/requests HTTP/1.1\r\nHost: localhost:8080\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let parsed_req = parse_request(BufReader::new(req_str.as_bytes())).unwrap();

        assert_eq!(parsed_req.method, "POST");
        assert_eq!(parsed_req.path, "/api/v1/restaurants/bistro/tables/A1/requests");
        assert_eq!(parsed_req.headers.len(), 3);
        assert_eq!(parsed_req.header("content-type"), Some("application/json"));
        assert_eq!(parsed_req.body, body.as_bytes());
    }

    #[test]
    fn test_parse_request_with_binary_body() {
        let photo: Vec<u8> = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46, 0x49, 0x46];
        let mut req = format!(
            "POST /api/v1/photos/stall.jpg HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            photo.len()
        )
        .into_bytes();
        req.extend_from_slice(&photo);

        let parsed_req = parse_request(BufReader::new(&req[..])).unwrap();

        assert_eq!(parsed_req.body, photo);
    }

    #[test]
    fn test_parse_request_with_very_large_body_and_header() {
        let body = random_text(40960);
        let x_test_header = random_text(40960);

        let req_str = format!(
            "POST / HTTP/1.1\r\nHost: localhost:8080\r\nContent-Length: {}\r\nX-TEST: {}\r\n\r\n{}",
            body.len(),
            x_test_header,
            body
        );

        let parsed_req = parse_request(BufReader::new(req_str.as_bytes())).unwrap();

        assert_eq!(parsed_req.headers.len(), 3);
        assert_eq!(parsed_req.body, body.as_bytes());
        assert_eq!(parsed_req.header("X-TEST"), Some(x_test_header.as_str()));
    }

    #[test]
    fn test_query() {
        let req = Request::get("/api/v1/requests?status=in_progress&table=4&note=two+words%21");
        assert_eq!(req.route_path(), "/api/v1/requests");
        let query = req.query();
        assert_eq!(query.get("status").map(String::as_str), Some("in_progress"));
        assert_eq!(query.get("table").map(String::as_str), Some("4"));
        assert_eq!(query.get("note").map(String::as_str), Some("two words!"));

        let req = Request::get("/api/v1/requests");
        assert_eq!(req.route_path(), "/api/v1/requests");
        assert!(req.query().is_empty());
    }

    #[test]
    fn test_query_list_keeps_encoded_commas() {
        let req = Request::get("/api/v1/restaurants/b/qr-codes?tables=Bar%2C1,+A2+,,Patio%202");
        assert_eq!(req.query_list("tables"), vec!["Bar,1", "A2", "Patio 2"]);
        assert!(req.query_list("missing").is_empty());
        assert!(Request::get("/api/v1/restaurants/b/qr-codes")
            .query_list("tables")
            .is_empty());
    }

    #[test]
    fn test_json_body() {
        #[derive(serde::Deserialize)]
        struct Body {
            label: String,
        }
        let req = Request::post("/", "{\"label\": \"A1\"}");
        assert_eq!(req.json::<Body>().unwrap().label, "A1");

        let req = Request::post("/", "not json");
        assert!(matches!(req.json::<Body>(), Err(Error::BadRequest(_))));
    }
}
