use std::io::{BufReader, Write};
use std::net::TcpStream;

use log::debug;

use crate::errors;
use crate::http::{parse_response, Response};

/// Simple HTTP client
///
/// It sends HTTP requests from a set of parameters, then parses and yields the server response.
pub struct HttpClient {
    stream: TcpStream,
}

impl HttpClient {
    /// Create a new client connected to the given server.
    ///
    /// An error is returned if the connection cannot be made for whatever reason
    pub fn new(server: &str) -> errors::Result<Self> {
        Ok(HttpClient {
            stream: TcpStream::connect(server)?,
        })
    }

    /// Send an HTTP request on the open connection.
    ///
    /// The server closes the connection after answering, drop the object after the response
    /// is retrieved.
    pub fn send(
        &mut self,
        method: &str,
        endpoint: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> errors::Result<Response> {
        debug!("{} {} ({} bytes)", method, endpoint, body.len());
        let content_type = content_type
            .map(|t| format!("Content-Type: {}\r\n", t))
            .unwrap_or_default();
        let mut message = format!(
            "{} {} HTTP/1.1\r\n{}Content-Length: {}\r\n\r\n",
            method,
            endpoint,
            content_type,
            body.len()
        )
        .into_bytes();
        message.extend_from_slice(body);
        self.stream.write_all(&message)?;

        let buf_reader = BufReader::new(&mut self.stream);
        parse_response(buf_reader)
    }
}
