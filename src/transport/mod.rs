//! Transport layer for OPC UA attribute access
//!
//! Every remote call returns `Result<_, StatusCode>`: either the payload or the
//! status the server (or client stack) reported.

use crate::config::ServerConfig;
use crate::types::NodeRef;
use opcua::types::{StatusCode, Variant};

pub mod mock;
mod opcua_client;

pub use mock::{MockConnector, MockTransport};
pub use opcua_client::{OpcUaConnector, OpcUaTransport};

/// Attribute access on an established session
pub trait Transport {
    /// Read the Value attribute of `node`
    fn read_value(&mut self, node: &NodeRef) -> std::result::Result<Variant, StatusCode>;

    /// Write the Value attribute of `node`
    fn write_value(
        &mut self,
        node: &NodeRef,
        value: Variant,
    ) -> std::result::Result<(), StatusCode>;

    /// Close the session and release the underlying connection
    fn disconnect(&mut self);
}

/// Opens sessions against a server
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, server: &ServerConfig) -> std::result::Result<Self::Transport, StatusCode>;
}
