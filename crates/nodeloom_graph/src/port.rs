// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a port, unique within its owning node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub String);

impl PortId {
    /// Create a port id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port, a connection target.
    Input,
    /// Output port, a connection source.
    Output,
}

/// An attachment point on a node where connections terminate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Port id, unique within the owning node.
    pub id: PortId,
    /// Display name.
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
}

impl Port {
    /// Create a new input port.
    pub fn input(id: impl Into<PortId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PortDirection::Input,
        }
    }

    /// Create a new output port.
    pub fn output(id: impl Into<PortId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction: PortDirection::Output,
        }
    }
}

impl From<String> for PortId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
