// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet data model: nodes, vessels, and lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a node
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a node
///
/// Nodes move through these states in order under normal operation.
/// The variants serialize as the lowercase wire names used in stored
/// records and daemon configuration (`acceptdonation`, `canonical`,
/// `onepercentmanyevents`).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Freshly donated, not yet inspected
    AcceptDonation,
    /// Verified and split into the canonical vessel layout
    Canonical,
    /// Serving the one-percent-many-events allocation scheme
    OnePercentManyEvents,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::AcceptDonation => "acceptdonation",
            NodeState::Canonical => "canonical",
            NodeState::OnePercentManyEvents => "onepercentmanyevents",
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a node state name
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown node state: {0}")]
pub struct ParseNodeStateError(pub String);

impl std::str::FromStr for NodeState {
    type Err = ParseNodeStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acceptdonation" => Ok(NodeState::AcceptDonation),
            "canonical" => Ok(NodeState::Canonical),
            "onepercentmanyevents" => Ok(NodeState::OnePercentManyEvents),
            other => Err(ParseNodeStateError(other.to_string())),
        }
    }
}

/// A donor-hosted machine enrolled in the fleet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Network address of the node manager, host:port
    pub address: String,
    pub state: NodeState,
    pub is_active: bool,
    pub is_broken: bool,
    /// Public key identifying the node's owner in the key store
    pub owner_key: String,
    /// When the node last changed lifecycle state
    pub last_transition: DateTime<Utc>,
}

impl Node {
    /// Create a freshly donated node
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            address: address.into(),
            state: NodeState::AcceptDonation,
            is_active: false,
            is_broken: false,
            owner_key: String::new(),
            last_transition: Utc::now(),
        }
    }

    pub fn with_state(mut self, state: NodeState) -> Self {
        self.state = state;
        self
    }

    pub fn with_owner_key(mut self, key: impl Into<String>) -> Self {
        self.owner_key = key.into();
        self
    }

    /// Apply a partial update as one unit
    ///
    /// Stores call this while the writer holds the node's lock, so the
    /// combined write is never observed half-applied.
    pub fn apply(&mut self, update: &NodeUpdate, now: DateTime<Utc>) {
        if let Some(state) = update.state {
            if state != self.state {
                self.last_transition = now;
            }
            self.state = state;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        if let Some(broken) = update.is_broken {
            self.is_broken = broken;
        }
        if let Some(key) = &update.owner_key {
            self.owner_key = key.clone();
        }
    }
}

/// Partial update to a node, persisted atomically by the store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub state: Option<NodeState>,
    pub is_active: Option<bool>,
    pub is_broken: Option<bool>,
    pub owner_key: Option<String>,
}

/// An allocatable compute slice on a node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub name: String,
    pub node_id: NodeId,
    /// Pending cleanup after a release
    pub is_dirty: bool,
    pub ports: Vec<u16>,
}

impl Vessel {
    pub fn new(name: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            name: name.into(),
            node_id,
            is_dirty: false,
            ports: Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
