use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use log::{debug, error, warn};

use crate::errors::{self, Error};
use crate::http::{parse_request, Request, Response};
use crate::threadpool::ThreadPool;

/// Turn an HTTP status code into its reason phrase
pub fn code_to_string(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// This is the main server.
///
/// It listens for incoming connections on a TCP socket, parses the requests and dispatches them
/// to a handler. Whatever the handler produces is then converted in an HTTP response and sent
/// back to the client. Each connection carries a single exchange.
pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Create a new server listening on the given address
    pub fn new(addr: &str) -> errors::Result<Self> {
        Ok(HttpServer {
            listener: TcpListener::bind(addr)?,
        })
    }

    /// Address the server is bound to, useful when binding to port 0
    pub fn local_addr(&self) -> errors::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the server
    ///
    /// Calls the handler with the incoming requests on a pool of `workers` threads.
    ///
    /// This function is blocking, and only returns if the worker pool goes away.
    pub fn serve<F>(&self, workers: usize, handler: F) -> errors::Result<()>
    where
        F: Fn(Request) -> Response + Send + Sync + 'static + Clone,
    {
        let threadpool = ThreadPool::new(workers)?;
        for stream in self.listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("Failed to accept connection: {}", err);
                    continue;
                }
            };
            let handler = handler.clone();
            threadpool.execute(move || handle_stream(&mut stream, &handler))?;
        }
        Ok(())
    }

    /// Utility function for one-shot servers.
    ///
    /// This is mostly for testing, it listens to a single connection, processes the
    /// request and exit.
    pub fn serve_once<F>(&self, handler: F) -> errors::Result<()>
    where
        F: Fn(Request) -> Response,
    {
        let (mut stream, _) = self.listener.accept()?;
        handle_stream(&mut stream, &handler);
        Ok(())
    }
}

/// Parse an HTTP request from a TCP stream, calls the handler and write back the answer
fn handle_stream<F>(mut stream: &mut TcpStream, handler: F)
where
    F: Fn(Request) -> Response,
{
    let buf_reader = BufReader::new(&mut stream);
    match parse_request(buf_reader) {
        Ok(req) => respond(stream, handler(req)),
        Err(Error::ConnectionReset) => debug!("Connection closed before a full request"),
        Err(err) => {
            warn!("Rejected malformed request: {}", err);
            respond(stream, Response::from_error(&err))
        }
    }
}

/// Writes an HTTP response to a stream
fn respond(stream: &mut TcpStream, resp: Response) {
    let code = resp.status.unwrap_or(500);
    let mut message = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        code,
        code_to_string(code),
        resp.body.len(),
        resp.headers
            .iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect::<Vec<_>>()
            .join(""),
    )
    .into_bytes();
    message.extend_from_slice(&resp.body);

    if let Err(err) = stream.write_all(&message).and_then(|_| stream.flush()) {
        error!("Failed to respond: {}", err);
    }
}
