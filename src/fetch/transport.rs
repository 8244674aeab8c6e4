//! Pinned-address HTTP transport for a single hop.
//!
//! The client's address-resolution step is overridden to return exactly the
//! address the resolver approved, so the address actually dialed can never
//! drift from the one that passed validation (defeats DNS rebinding between
//! check and connect). TLS server-name indication and certificate checks
//! still use the original hostname - the pinned IP is only the transport
//! destination, never the identity being verified.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_ENCODING};
use reqwest::redirect::Policy as RedirectPolicy;
use reqwest::{Client, Response};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::constants::{ACCEPT_ENCODINGS, ACCEPT_FEED_TYPES};
use super::error::FetchError;

/// Per-hop timer set.
///
/// Connect and response budgets reset fresh on each hop; the total deadline
/// is fixed once at the start of the whole redirect walk and never extended.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HopTimers {
    pub connect: Duration,
    pub response: Duration,
    pub total_deadline: Instant,
}

/// Issues one GET to `url`, dialing exactly `pinned` for its hostname.
///
/// Three timers race the request: the connect budget (enforced inside the
/// client, surfaced as `timeout_connect`), the response-headers budget
/// (`timeout_response`), and the walk-level deadline (`timeout_total`).
/// External cancellation also surfaces as `timeout_total` - from the
/// caller's perspective both mean the operation did not complete within
/// budget. Whichever finishes first wins; the losers are dropped with it.
pub(crate) async fn connect_and_get(
    url: &Url,
    host: &str,
    pinned: IpAddr,
    port: u16,
    user_agent: &str,
    timers: HopTimers,
    cancel: &CancellationToken,
) -> Result<Response, FetchError> {
    let client = Client::builder()
        .resolve(host, SocketAddr::new(pinned, port))
        .redirect(RedirectPolicy::none())
        .connect_timeout(timers.connect)
        .user_agent(user_agent)
        .build()
        .map_err(|e| FetchError::upstream(url.as_str(), format!("client build failed: {e}")))?;

    debug!(%url, %pinned, port, "sending pinned GET");

    let request = client
        .get(url.clone())
        .header(ACCEPT, ACCEPT_FEED_TYPES)
        .header(ACCEPT_ENCODING, ACCEPT_ENCODINGS)
        .send();

    tokio::select! {
        result = request => result.map_err(|e| classify_send_error(url, &e)),
        () = tokio::time::sleep(timers.response) => Err(FetchError::timeout_response(url.as_str())),
        () = tokio::time::sleep_until(timers.total_deadline) => Err(FetchError::timeout_total(url.as_str())),
        () = cancel.cancelled() => Err(FetchError::timeout_total(url.as_str())),
    }
}

/// Maps a transport failure onto the error taxonomy.
///
/// A timed-out connect means the connect budget fired inside the client;
/// everything else wraps as `upstream_error`.
fn classify_send_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_connect() && error.is_timeout() {
        FetchError::timeout_connect(url.as_str())
    } else if error.is_timeout() {
        FetchError::timeout_response(url.as_str())
    } else {
        FetchError::upstream(url.as_str(), error.to_string())
    }
}
