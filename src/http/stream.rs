//! Long-lived event-stream bodies.
//!
//! # Responsibilities
//! - Flush an initial newline so the client sees the connection open
//! - Emit optional keep-alive comments so dead peers surface as write errors
//! - Own the connection lease for as long as the body lives
//!
//! # Design Decisions
//! - The body never ends on its own; it ends on shutdown or when hyper drops
//!   it because the socket closed
//! - Releasing module references is the lease's `Drop`, so every way the
//!   body goes away releases exactly once

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use futures_util::stream::{self, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::lifecycle::Shutdown;
use crate::net::ConnectionLease;

const PREAMBLE: &[u8] = b"\n";
const HEARTBEAT: &[u8] = b":\n\n";

/// Build the streaming body for an open lazy-module connection.
pub fn event_stream(lease: ConnectionLease, shutdown: Shutdown, heartbeat: Option<Duration>) -> Body {
    let preamble = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(PREAMBLE)) });

    let held = stream::unfold(
        (lease, shutdown, heartbeat.map(ticker)),
        |(lease, shutdown, mut ticker)| async move {
            let tick = async {
                match ticker.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = shutdown.wait() => {
                    tracing::debug!(connection_id = %lease.id(), "Closing lazy stream on shutdown");
                    None
                }
                _ = tick => Some((
                    Ok::<_, Infallible>(Bytes::from_static(HEARTBEAT)),
                    (lease, shutdown, ticker),
                )),
            }
        },
    );

    Body::from_stream(preamble.chain(held))
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
