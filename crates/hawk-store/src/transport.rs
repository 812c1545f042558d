// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Blocking remote download seam and its HTTP implementation.
// Author: Lukas Bower

use std::io::{self, Write};

use log::debug;
use ureq::{Agent, AgentBuilder};

use crate::error::TransportError;

/// Streams the body behind a remote locator into a sink.
///
/// One call is one request; implementations do not retry.
pub trait Transport: Send + Sync {
    /// Download `locator` into `sink`, returning the number of bytes written.
    fn fetch(&self, locator: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

/// HTTP(S) GET transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: Agent,
}

impl HttpTransport {
    /// Transport with ureq's default agent settings.
    pub fn new() -> Self {
        Self {
            agent: AgentBuilder::new().build(),
        }
    }

    /// Transport over a caller-configured agent (proxies, timeouts).
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, locator: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        debug!("GET {locator}");
        let response = match self.agent.get(locator).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(TransportError::Status { code }),
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::Connection(err.to_string()))
            }
        };
        let mut reader = response.into_reader();
        let written = io::copy(&mut reader, sink)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned response on an ephemeral local port.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}/files/1", listener.local_addr().expect("addr"));
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut line = String::new();
            while reader.read_line(&mut line).expect("read request") > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            stream.write_all(response.as_bytes()).expect("respond");
        });
        (url, handle)
    }

    #[test]
    fn success_streams_body_into_sink() {
        let (url, server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello");
        let mut sink = Vec::new();
        let written = HttpTransport::new().fetch(&url, &mut sink).expect("fetch");
        server.join().expect("server");
        assert_eq!(written, 5);
        assert_eq!(sink, b"hello");
    }

    #[test]
    fn error_status_maps_to_status() {
        let (url, server) =
            serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let mut sink = Vec::new();
        let err = HttpTransport::new().fetch(&url, &mut sink).unwrap_err();
        server.join().expect("server");
        assert!(matches!(err, TransportError::Status { code: 404 }));
        assert!(sink.is_empty());
    }

    #[test]
    fn refused_connection_maps_to_connection() {
        let port = TcpListener::bind("127.0.0.1:0")
            .expect("bind")
            .local_addr()
            .expect("addr")
            .port();
        let mut sink = Vec::new();
        let err = HttpTransport::new()
            .fetch(&format!("http://127.0.0.1:{port}/files/1"), &mut sink)
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }
}
