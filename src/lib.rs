//! plc-link - OPC UA link to a CODESYS controller
//!
//! Two operating modes share one session lifecycle:
//!
//! - **poll**: read the configured variables, log them, wait, and write the
//!   first variable's value plus one back to all of them, once per interval
//! - **dispatch**: send machine recipes for queued ERP orders to a work cell
//!
//! All protocol work is done by the `opcua` client; [`transport::Transport`]
//! is the seam that lets the loops run against [`transport::MockTransport`].

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod poll;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use types::{NodeRef, Sample, ScalarType, VariableRef};
