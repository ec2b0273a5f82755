//! Core data types: node addressing, scalar types and samples.
//!
//! Key types:
//! - [`NodeRef`]: namespace index + string identifier of a remote variable
//! - [`VariableRef`]: a named [`NodeRef`] with its declared [`ScalarType`]
//! - [`Sample`]: one typed value read from or written to a variable

use opcua::types::{NodeId, UAString, Variant};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of a variable in the server's address space
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub namespace: u16,
    pub identifier: String,
}

impl NodeRef {
    pub fn new(namespace: u16, identifier: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: identifier.into(),
        }
    }

    /// CODESYS symbol address: `|var|<application>.<global_list>.<variable>`
    pub fn codesys(namespace: u16, application: &str, global_list: &str, variable: &str) -> Self {
        Self::new(
            namespace,
            format!("|var|{}.{}.{}", application, global_list, variable),
        )
    }

    pub fn to_node_id(&self) -> NodeId {
        NodeId::new(self.namespace, UAString::from(self.identifier.as_str()))
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ns={};s={}", self.namespace, self.identifier)
    }
}

/// Declared scalar type of a polled variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int16,
    UInt16,
    Int32,
    UInt32,
}

impl ScalarType {
    /// OPC UA name of the type
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int16 => "Int16",
            ScalarType::UInt16 => "UInt16",
            ScalarType::Int32 => "Int32",
            ScalarType::UInt32 => "UInt32",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime value of a polled variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
}

impl Sample {
    /// Accept `variant` only if its runtime type is exactly `expected`.
    pub fn from_variant(variant: &Variant, expected: ScalarType) -> Option<Self> {
        match (expected, variant) {
            (ScalarType::Int16, Variant::Int16(v)) => Some(Sample::Int16(*v)),
            (ScalarType::UInt16, Variant::UInt16(v)) => Some(Sample::UInt16(*v)),
            (ScalarType::Int32, Variant::Int32(v)) => Some(Sample::Int32(*v)),
            (ScalarType::UInt32, Variant::UInt32(v)) => Some(Sample::UInt32(*v)),
            _ => None,
        }
    }

    /// Convert an integer into `scalar_type`, wrapping like a C integer cast.
    pub fn wrapping_from(scalar_type: ScalarType, value: i64) -> Self {
        match scalar_type {
            ScalarType::Int16 => Sample::Int16(value as i16),
            ScalarType::UInt16 => Sample::UInt16(value as u16),
            ScalarType::Int32 => Sample::Int32(value as i32),
            ScalarType::UInt32 => Sample::UInt32(value as u32),
        }
    }

    /// Zero of the given type, used when a read fails.
    pub fn zero(scalar_type: ScalarType) -> Self {
        Self::wrapping_from(scalar_type, 0)
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Sample::Int16(_) => ScalarType::Int16,
            Sample::UInt16(_) => ScalarType::UInt16,
            Sample::Int32(_) => ScalarType::Int32,
            Sample::UInt32(_) => ScalarType::UInt32,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Sample::Int16(v) => v as i64,
            Sample::UInt16(v) => v as i64,
            Sample::Int32(v) => v as i64,
            Sample::UInt32(v) => v as i64,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

impl From<Sample> for Variant {
    fn from(sample: Sample) -> Self {
        match sample {
            Sample::Int16(v) => Variant::Int16(v),
            Sample::UInt16(v) => Variant::UInt16(v),
            Sample::Int32(v) => Variant::Int32(v),
            Sample::UInt32(v) => Variant::UInt32(v),
        }
    }
}

/// A named variable with its address and declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub name: String,
    pub node: NodeRef,
    pub scalar_type: ScalarType,
}

impl VariableRef {
    pub fn new(name: impl Into<String>, node: NodeRef, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            node,
            scalar_type,
        }
    }
}

/// Type tag of a variant, for diagnostics
pub fn variant_type_name(variant: &Variant) -> &'static str {
    match variant {
        Variant::Empty => "Empty",
        Variant::Boolean(_) => "Boolean",
        Variant::SByte(_) => "SByte",
        Variant::Byte(_) => "Byte",
        Variant::Int16(_) => "Int16",
        Variant::UInt16(_) => "UInt16",
        Variant::Int32(_) => "Int32",
        Variant::UInt32(_) => "UInt32",
        Variant::Int64(_) => "Int64",
        Variant::UInt64(_) => "UInt64",
        Variant::Float(_) => "Float",
        Variant::Double(_) => "Double",
        Variant::String(_) => "String",
        Variant::Array(_) => "Array",
        _ => "Other",
    }
}
