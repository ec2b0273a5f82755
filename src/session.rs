//! Session lifecycle: the single connection to the controller
//!
//! A [`Session`] is created by [`Session::connect`] and torn down exactly once,
//! either by [`Session::close`] or, on any other exit path, when it is dropped.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::transport::{Connector, Transport};
use log::info;

/// Owned handle to an open session
pub struct Session<T: Transport> {
    transport: T,
    endpoint: String,
    closed: bool,
}

impl<T: Transport> Session<T> {
    /// Open a session against `server.endpoint`
    pub fn connect<C>(connector: &C, server: &ServerConfig) -> Result<Self>
    where
        C: Connector<Transport = T>,
    {
        info!("Attempting to connect to: {}", server.endpoint);
        match connector.connect(server) {
            Ok(transport) => {
                info!("Connected to OPC UA Server at {}", server.endpoint);
                Ok(Self {
                    transport,
                    endpoint: server.endpoint.clone(),
                    closed: false,
                })
            }
            // Reported once by the caller through the error's Display
            Err(status) => Err(Error::Connection {
                endpoint: server.endpoint.clone(),
                status,
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Disconnect and release the session
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!("Stopping client...");
        self.transport.disconnect();
        info!("Client stopped");
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
