//! `homeprint-printer`
//!
//! **Responsibility:** deliver an encoded byte stream to a network receipt printer.
//!
//! Raw TCP (port 9100 by default) with explicit connect and write timeouts; a timeout
//! is an error, never a hang. No protocol bytes are sent by [`PrinterTransport::probe`].

pub mod address;
pub mod config;
pub mod error;
pub mod transport;

pub use address::resolve;
pub use config::{DEFAULT_PORT, TransportConfig};
pub use error::TransportError;
pub use transport::{PrinterTransport, TcpPrinterTransport};
