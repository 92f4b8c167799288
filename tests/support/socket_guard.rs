//! Skips socket-bound tests on hosts where localhost cannot be bound.

use std::net::TcpListener;

use wiremock::MockServer;

/// Starts a mock server, or returns `None` (and logs why) when the sandbox
/// forbids binding a local port.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    match TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => drop(listener),
        Err(e) => {
            eprintln!("skipping socket-bound test: cannot bind localhost: {e}");
            return None;
        }
    }
    Some(MockServer::start().await)
}
