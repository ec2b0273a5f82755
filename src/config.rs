//! Configuration for plc-link
//!
//! Loads configuration from a TOML file. Every section has defaults matching
//! the CODESYS Control Win V3 plant setup, so an empty file is a valid config.
//!
//! ```toml
//! [server]
//! endpoint = "opc.tcp://127.0.0.1:4840"
//!
//! [plc]
//! namespace = 4
//! application = "CODESYS Control Win V3 x64.Application"
//! global_list = "GVL"
//!
//! [poll]
//! interval_ms = 1000
//!
//! [[poll.variables]]
//! name = "NUM_PIECES_WAREHOUSE1"
//! type = "int16"
//! ```

use crate::dispatch::recipe::{Recipe, Transformation};
use crate::error::{Error, Result};
use crate::types::{NodeRef, ScalarType, VariableRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub plc: PlcConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OPC UA server connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Endpoint URL (`opc.tcp://host:port`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Application name announced to the server
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Application URI announced to the server
    #[serde(default = "default_application_uri")]
    pub application_uri: String,

    /// Requested session timeout in milliseconds (0 = client default)
    #[serde(default)]
    pub session_timeout_ms: u32,

    /// Connection attempts after the first one fails
    #[serde(default)]
    pub connect_retries: u32,

    /// Directory the OPC UA client keeps its certificate store in.
    /// Created on startup if missing; relative paths resolve against the
    /// working directory.
    #[serde(default = "default_pki_dir")]
    pub pki_dir: PathBuf,
}

fn default_endpoint() -> String {
    "opc.tcp://127.0.0.1:4840".to_string()
}

fn default_application_name() -> String {
    "plc-link".to_string()
}

fn default_application_uri() -> String {
    "urn:plc-link".to_string()
}

fn default_pki_dir() -> PathBuf {
    PathBuf::from("pki")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            application_name: default_application_name(),
            application_uri: default_application_uri(),
            session_timeout_ms: 0,
            connect_retries: 0,
            pki_dir: default_pki_dir(),
        }
    }
}

/// Where the controller's symbols live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlcConfig {
    /// Namespace index of the CODESYS symbol namespace
    #[serde(default = "default_namespace")]
    pub namespace: u16,

    /// Application path, e.g. `CODESYS Control Win V3 x64.Application`
    #[serde(default = "default_application")]
    pub application: String,

    /// Global variable list holding the symbols
    #[serde(default = "default_global_list")]
    pub global_list: String,
}

fn default_namespace() -> u16 {
    4
}

fn default_application() -> String {
    "CODESYS Control Win V3 x64.Application".to_string()
}

fn default_global_list() -> String {
    "GVL".to_string()
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            application: default_application(),
            global_list: default_global_list(),
        }
    }
}

impl PlcConfig {
    /// Node of a symbol in the configured global variable list
    pub fn symbol(&self, variable: &str) -> NodeRef {
        NodeRef::codesys(
            self.namespace,
            &self.application,
            &self.global_list,
            variable,
        )
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    /// Delay between the read and write phase of a cycle
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Polled variables, in order. The first one seeds every write.
    #[serde(default = "default_variables")]
    pub variables: Vec<VariableConfig>,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_variables() -> Vec<VariableConfig> {
    vec![
        VariableConfig::new("NUM_PIECES_WAREHOUSE1", ScalarType::Int16),
        VariableConfig::new("NUM_PIECES_WAREHOUSE2", ScalarType::Int16),
        VariableConfig::new("WAREHOUSE_OUT_1", ScalarType::UInt16),
    ]
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            variables: default_variables(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// One polled variable
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariableConfig {
    /// Symbol name inside the global variable list
    pub name: String,

    /// Declared scalar type
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,

    /// Full string identifier, overriding the `|var|` symbol path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Namespace index, overriding `plc.namespace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<u16>,
}

impl VariableConfig {
    pub fn new(name: &str, scalar_type: ScalarType) -> Self {
        Self {
            name: name.to_string(),
            scalar_type,
            identifier: None,
            namespace: None,
        }
    }

    fn resolve(&self, plc: &PlcConfig) -> VariableRef {
        let namespace = self.namespace.unwrap_or(plc.namespace);
        let node = match &self.identifier {
            Some(identifier) => NodeRef::new(namespace, identifier.clone()),
            None => NodeRef::codesys(namespace, &plc.application, &plc.global_list, &self.name),
        };
        VariableRef::new(self.name.clone(), node, self.scalar_type)
    }
}

/// Recipe dispatch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Directory holding `*.json` order files
    #[serde(default = "default_orders_dir")]
    pub orders_dir: String,

    /// Work cell prefix of the symbols, e.g. `C1` for `C1_free`
    #[serde(default = "default_cell")]
    pub cell: String,

    /// Poll period while waiting for the cell to become free
    #[serde(default = "default_free_poll_interval_ms")]
    pub free_poll_interval_ms: u64,

    /// Length of the tool and time arrays on the controller
    #[serde(default = "default_max_transformations")]
    pub max_transformations: usize,

    /// Known recipes, searched in order
    #[serde(default = "crate::dispatch::recipe::default_recipes")]
    pub recipes: Vec<Recipe>,

    /// `(piece, tool) -> piece` transformation table
    #[serde(default = "crate::dispatch::recipe::default_transformations")]
    pub transformations: Vec<Transformation>,
}

fn default_orders_dir() -> String {
    "Orders".to_string()
}

fn default_cell() -> String {
    "C1".to_string()
}

fn default_free_poll_interval_ms() -> u64 {
    500
}

fn default_max_transformations() -> usize {
    6
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            orders_dir: default_orders_dir(),
            cell: default_cell(),
            free_poll_interval_ms: default_free_poll_interval_ms(),
            max_transformations: default_max_transformations(),
            recipes: crate::dispatch::recipe::default_recipes(),
            transformations: crate::dispatch::recipe::default_transformations(),
        }
    }
}

impl DispatchConfig {
    pub fn free_poll_interval(&self) -> Duration {
        Duration::from_millis(self.free_poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default log filter (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.endpoint.trim().is_empty() {
            return Err(Error::Config("server.endpoint is empty".to_string()));
        }
        if !self.server.endpoint.starts_with("opc.tcp://") {
            return Err(Error::Config(format!(
                "server.endpoint must use the opc.tcp scheme: {}",
                self.server.endpoint
            )));
        }
        if i32::try_from(self.server.connect_retries).is_err() {
            return Err(Error::Config(format!(
                "server.connect_retries must be at most {}",
                i32::MAX
            )));
        }
        if self.poll.variables.is_empty() {
            return Err(Error::Config("poll.variables is empty".to_string()));
        }
        if self.dispatch.max_transformations == 0 {
            return Err(Error::Config(
                "dispatch.max_transformations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Polled variables with addresses resolved against `[plc]`
    pub fn variables(&self) -> Vec<VariableRef> {
        self.poll
            .variables
            .iter()
            .map(|v| v.resolve(&self.plc))
            .collect()
    }
}
