//! Printer address parsing: `ip`, `ip:port`, `[v6]:port` or `host[:port]`.
//!
//! IP literals resolve in place. Host names go through the system resolver on a
//! helper thread so a stalled lookup cannot outlast the caller's timeout.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::TransportError;

/// Resolve a configured printer address, filling in `default_port` when absent.
///
/// A host name lookup that has not answered within `timeout` is reported as
/// [`TransportError::ConnectTimeout`].
pub fn resolve(
    address: &str,
    default_port: u16,
    timeout: Duration,
) -> Result<SocketAddr, TransportError> {
    resolve_with(address, default_port, timeout, system_lookup)
}

fn resolve_with<F>(
    address: &str,
    default_port: u16,
    timeout: Duration,
    lookup: F,
) -> Result<SocketAddr, TransportError>
where
    F: FnOnce(&str) -> Option<SocketAddr> + Send + 'static,
{
    let address = address.trim();
    if address.is_empty() {
        return Err(TransportError::InvalidAddress(address.to_string()));
    }
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = address.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let with_port = if address.contains(':') {
        address.to_string()
    } else {
        format!("{address}:{default_port}")
    };

    let (tx, rx) = mpsc::channel();
    let host = with_port.clone();
    // Detached: a lookup that outlives the timeout finishes into a closed channel.
    thread::Builder::new()
        .name("printer-lookup".into())
        .spawn(move || {
            let _ = tx.send(lookup(&host));
        })
        .map_err(|source| TransportError::Io {
            addr: with_port.clone(),
            source,
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Some(addr)) => Ok(addr),
        Ok(None) | Err(RecvTimeoutError::Disconnected) => {
            Err(TransportError::InvalidAddress(address.to_string()))
        }
        Err(RecvTimeoutError::Timeout) => {
            tracing::debug!(address, timeout_ms = timeout.as_millis() as u64, "printer lookup timed out");
            Err(TransportError::ConnectTimeout {
                addr: with_port,
                timeout,
            })
        }
    }
}

fn system_lookup(host: &str) -> Option<SocketAddr> {
    host.to_socket_addrs().ok().and_then(|mut addrs| addrs.next())
}
