//! Transport over the `opcua` synchronous client

use super::{Connector, Transport};
use crate::config::ServerConfig;
use crate::types::NodeRef;
use opcua::client::prelude::{AttributeService, Client, ClientBuilder, IdentityToken, Session};
use opcua::crypto::SecurityPolicy;
use opcua::types::{
    AttributeId, DataValue, MessageSecurityMode, QualifiedName, ReadValueId, StatusCode,
    TimestampsToReturn, UAString, UserTokenPolicy, Variant, WriteValue,
};
use opcua::sync::RwLock;
use std::sync::Arc;

/// Builds an `opcua` client and connects with no security and anonymous identity
#[derive(Debug, Default, Clone, Copy)]
pub struct OpcUaConnector;

impl Connector for OpcUaConnector {
    type Transport = OpcUaTransport;

    fn connect(&self, server: &ServerConfig) -> std::result::Result<OpcUaTransport, StatusCode> {
        let retries = i32::try_from(server.connect_retries).map_err(|_| {
            log::error!("connect_retries {} out of range", server.connect_retries);
            StatusCode::BadConfigurationError
        })?;
        let mut builder = ClientBuilder::new()
            .application_name(server.application_name.as_str())
            .application_uri(server.application_uri.as_str())
            .product_uri(server.application_uri.as_str())
            .create_sample_keypair(false)
            .trust_server_certs(true)
            .pki_dir(server.pki_dir.clone())
            .session_retry_limit(retries);
        if server.session_timeout_ms > 0 {
            builder = builder.session_timeout(server.session_timeout_ms);
        }

        let mut client = builder.client().ok_or_else(|| {
            log::error!("Invalid OPC UA client configuration");
            StatusCode::BadConfigurationError
        })?;

        let session = client.connect_to_endpoint(
            (
                server.endpoint.as_str(),
                SecurityPolicy::None.to_str(),
                MessageSecurityMode::None,
                UserTokenPolicy::anonymous(),
            ),
            IdentityToken::Anonymous,
        )?;

        Ok(OpcUaTransport {
            session,
            _client: client,
            connected: true,
        })
    }
}

/// One live OPC UA session
pub struct OpcUaTransport {
    session: Arc<RwLock<Session>>,
    // Dropped after `session`.
    _client: Client,
    connected: bool,
}

impl Transport for OpcUaTransport {
    fn read_value(&mut self, node: &NodeRef) -> std::result::Result<Variant, StatusCode> {
        let request = ReadValueId {
            node_id: node.to_node_id(),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };

        let session = self.session.read();
        let mut results = session.read(&[request], TimestampsToReturn::Neither, 0.0)?;
        let data_value = results.pop().ok_or(StatusCode::BadUnexpectedError)?;

        if let Some(status) = data_value.status {
            if !status.is_good() {
                return Err(status);
            }
        }
        Ok(data_value.value.unwrap_or(Variant::Empty))
    }

    fn write_value(
        &mut self,
        node: &NodeRef,
        value: Variant,
    ) -> std::result::Result<(), StatusCode> {
        let request = WriteValue {
            node_id: node.to_node_id(),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            value: DataValue::value_only(value),
        };

        let session = self.session.read();
        let results = session.write(&[request])?;
        match results.first() {
            Some(status) if status.is_good() => Ok(()),
            Some(status) => Err(*status),
            None => Err(StatusCode::BadUnexpectedError),
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.session.read().disconnect();
            self.connected = false;
        }
    }
}
