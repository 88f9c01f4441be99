//! Transport errors. Messages end up verbatim in print-job logs.

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid printer address `{0}`")]
    InvalidAddress(String),

    #[error("timed out connecting to {addr} after {}ms", .timeout.as_millis())]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("connection refused by {addr}")]
    ConnectionRefused { addr: String },

    #[error("timed out writing to {addr} after {}ms", .timeout.as_millis())]
    WriteTimeout { addr: String, timeout: Duration },

    #[error("connection to {addr} was reset")]
    ConnectionReset { addr: String },

    #[error("io error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    pub(crate) fn connect(addr: String, timeout: Duration, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                TransportError::ConnectTimeout { addr, timeout }
            }
            io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused { addr },
            _ => TransportError::Io { addr, source },
        }
    }

    pub(crate) fn write(addr: String, timeout: Duration, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                TransportError::WriteTimeout { addr, timeout }
            }
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => TransportError::ConnectionReset { addr },
            _ => TransportError::Io { addr, source },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectTimeout { .. } | TransportError::WriteTimeout { .. }
        )
    }
}
