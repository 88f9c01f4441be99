use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use crate::address::resolve;
use crate::config::TransportConfig;
use crate::error::TransportError;

/// Delivery of raw device bytes to a printer.
pub trait PrinterTransport: Send + Sync {
    /// Connect, write the whole payload, close. Blocking, bounded by timeouts.
    fn send(&self, address: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Bare connect within the probe timeout; nothing is written.
    fn probe(&self, address: &str) -> bool;
}

impl<T: PrinterTransport + ?Sized> PrinterTransport for Arc<T> {
    fn send(&self, address: &str, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send(address, payload)
    }

    fn probe(&self, address: &str) -> bool {
        (**self).probe(address)
    }
}

/// Raw TCP printing ("port 9100" / JetDirect style).
#[derive(Debug, Clone, Default)]
pub struct TcpPrinterTransport {
    config: TransportConfig,
}

impl TcpPrinterTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl PrinterTransport for TcpPrinterTransport {
    fn send(&self, address: &str, payload: &[u8]) -> Result<(), TransportError> {
        let connect_timeout = self.config.connect_timeout;
        let addr = resolve(address, self.config.port, connect_timeout)?;
        let label = addr.to_string();
        let write_timeout = self.config.write_timeout;

        tracing::debug!(printer = %label, bytes = payload.len(), "connecting to printer");
        let mut stream = TcpStream::connect_timeout(&addr, connect_timeout)
            .map_err(|e| TransportError::connect(label.clone(), connect_timeout, e))?;
        stream
            .set_write_timeout(Some(write_timeout))
            .map_err(|e| TransportError::write(label.clone(), write_timeout, e))?;
        stream.set_nodelay(true).ok();

        stream
            .write_all(payload)
            .and_then(|_| stream.flush())
            .map_err(|e| TransportError::write(label.clone(), write_timeout, e))?;
        // Peer may already have closed after reading everything.
        let _ = stream.shutdown(Shutdown::Write);

        tracing::info!(printer = %label, bytes = payload.len(), "payload delivered");
        Ok(())
    }

    fn probe(&self, address: &str) -> bool {
        let addr = match resolve(address, self.config.port, self.config.probe_timeout) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::debug!(address, error = %e, "probe skipped");
                return false;
            }
        };
        match TcpStream::connect_timeout(&addr, self.config.probe_timeout) {
            Ok(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
                true
            }
            Err(e) => {
                tracing::debug!(printer = %addr, error = %e, "printer unreachable");
                false
            }
        }
    }
}
