use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

/// Raw HTTP reply handed back by a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpReply {
    /// Creates a reply from a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP layer: nothing usable came back from the server.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request did not finish within its timeout.
    #[error("request timed out")]
    Timeout,
    /// Any other failure while sending or reading the body.
    #[error("transport error: {0}")]
    Other(String),
}

/// Blocking HTTP transport used to reach the model server.
///
/// Implementors only move bytes; serialization and error mapping live in
/// [`crate::ModelClient`], which keeps test doubles trivial.
pub trait Transport {
    /// Sends `body` as `application/json` to `url` and waits at most `timeout`.
    fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;

    /// Issues a GET request to `url` and waits at most `timeout`.
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        (**self).post_json(url, body, timeout)
    }

    fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError> {
        (**self).get(url, timeout)
    }
}

/// [`Transport`] backed by a blocking `reqwest` client.
///
/// Must not be driven from inside an async runtime thread; use
/// `tokio::task::spawn_blocking` there.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh blocking client.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    fn finish(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<HttpReply, TransportError> {
        let response = request.send().map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(classify)?;
        Ok(HttpReply { status, body })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        self.finish(
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .timeout(timeout),
        )
    }

    fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError> {
        self.finish(self.client.get(url).timeout(timeout))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        thread,
    };

    // reads one request off the socket and returns its body
    fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    #[test]
    fn posts_json_and_reads_reply() -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;

        let server = thread::spawn(move || -> std::io::Result<String> {
            let (mut stream, _) = listener.accept()?;
            let body = read_request(&mut stream)?;
            let reply = r#"{"response":"ok"}"#;
            write!(
                stream,
                "HTTP/1.1 201 Created\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                reply.len(),
                reply
            )?;
            Ok(body)
        });

        let transport = HttpTransport::new()?;
        let reply = transport.post_json(
            &format!("http://{addr}/api/generate"),
            r#"{"model":"m"}"#.to_string(),
            Duration::from_secs(5),
        )?;

        assert_eq!(reply, HttpReply::new(201, r#"{"response":"ok"}"#));
        assert!(reply.is_success());
        let received = server.join().map_err(|_| "server thread panicked")??;
        assert_eq!(received, r#"{"model":"m"}"#);
        Ok(())
    }

    #[test]
    fn refused_connection_is_connect_error() -> Result<(), Box<dyn std::error::Error>> {
        // bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0")?.local_addr()?;

        let transport = HttpTransport::new()?;
        let err = transport
            .get(&format!("http://{addr}/api/tags"), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
        Ok(())
    }

    #[test]
    fn silent_server_times_out() -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;

        let server = thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = read_request(&mut stream);
                thread::sleep(Duration::from_secs(2));
            }
        });

        let transport = HttpTransport::new()?;
        let err = transport
            .post_json(
                &format!("http://{addr}/api/generate"),
                "{}".to_string(),
                Duration::from_millis(200),
            )
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout);
        let _ = server.join();
        Ok(())
    }

    #[test]
    fn status_ranges() {
        assert!(HttpReply::new(200, "").is_success());
        assert!(!HttpReply::new(404, "").is_success());
        assert!(!HttpReply::new(500, "").is_success());
    }
}
