//! Skips wiremock tests on hosts where binding a localhost socket is denied.
//!
//! Set `SPECFETCH_REQUIRE_SOCKET_TESTS=1` to turn a skip into a failure.

use std::net::TcpListener;

use wiremock::MockServer;

const REQUIRE_ENV: &str = "SPECFETCH_REQUIRE_SOCKET_TESTS";

fn sockets_required() -> bool {
    std::env::var(REQUIRE_ENV)
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Starts a mock server, or returns `None` after logging why the test is skipped.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if let Err(e) = TcpListener::bind("127.0.0.1:0") {
        assert!(
            !sockets_required(),
            "cannot bind a localhost socket ({e}) and {REQUIRE_ENV} is set"
        );
        eprintln!("[socket-bound-test] cannot bind a localhost socket ({e}); skipping");
        return None;
    }
    Some(MockServer::start().await)
}

/// Value returned from a skipped test body.
pub trait SocketSkipReturn {
    fn socket_skip_return() -> Self;
}

impl SocketSkipReturn for () {
    fn socket_skip_return() -> Self {}
}

pub fn socket_skip_return<T: SocketSkipReturn>() -> T {
    T::socket_skip_return()
}
