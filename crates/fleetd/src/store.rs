// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-file node store
//!
//! One file per node under `nodes/` and per vessel under `vessels/`.
//! Writes go through a temp file and rename so a concurrent reader
//! never sees a torn record; cross-node atomicity comes from the
//! callers' locking discipline, not the store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use berth_core::{Node, NodeId, NodeState, NodeStore, NodeUpdate, StoreError, Vessel};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone)]
pub struct JsonNodeStore {
    nodes_dir: PathBuf,
    vessels_dir: PathBuf,
}

impl JsonNodeStore {
    /// Open a store rooted at `root`, creating its directories
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let nodes_dir = root.join("nodes");
        let vessels_dir = root.join("vessels");
        std::fs::create_dir_all(&nodes_dir)?;
        std::fs::create_dir_all(&vessels_dir)?;
        Ok(Self {
            nodes_dir,
            vessels_dir,
        })
    }

    /// Write a node record directly (enrollment and seeding)
    pub fn put_node(&self, node: &Node) -> Result<(), StoreError> {
        write_json(&self.node_path(&node.id), node)
    }

    /// Write a vessel record directly
    pub fn put_vessel(&self, vessel: &Vessel) -> Result<(), StoreError> {
        write_json(&self.vessel_path(&vessel.name), vessel)
    }

    fn node_path(&self, id: &NodeId) -> PathBuf {
        self.nodes_dir.join(format!("{}.json", id))
    }

    fn vessel_path(&self, name: &str) -> PathBuf {
        self.vessels_dir.join(format!("{}.json", name))
    }

    fn load_node(&self, id: &NodeId) -> Result<Node, StoreError> {
        let path = self.node_path(id);
        if !path.exists() {
            return Err(StoreError::missing_node(id));
        }
        read_json(&path)
    }

    fn load_vessel(&self, name: &str) -> Result<Vessel, StoreError> {
        let path = self.vessel_path(name);
        if !path.exists() {
            return Err(StoreError::missing_vessel(name));
        }
        read_json(&path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl NodeStore for JsonNodeStore {
    async fn get_nodes_in_state(&self, state: NodeState) -> Result<Vec<Node>, StoreError> {
        let mut nodes = Vec::new();
        for entry in std::fs::read_dir(&self.nodes_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                let node: Node = read_json(&path)?;
                if node.state == state {
                    nodes.push(node);
                }
            }
        }
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.load_node(id)
    }

    async fn update_node(&self, id: &NodeId, update: NodeUpdate) -> Result<(), StoreError> {
        let mut node = self.load_node(id)?;
        node.apply(&update, Utc::now());
        write_json(&self.node_path(id), &node)
    }

    async fn get_vessels_on_node(&self, id: &NodeId) -> Result<Vec<Vessel>, StoreError> {
        let mut vessels = Vec::new();
        for entry in std::fs::read_dir(&self.vessels_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                let vessel: Vessel = read_json(&path)?;
                if &vessel.node_id == id {
                    vessels.push(vessel);
                }
            }
        }
        vessels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vessels)
    }

    async fn set_vessel_ports(&self, vessel: &Vessel, ports: Vec<u16>) -> Result<(), StoreError> {
        let mut stored = self.load_vessel(&vessel.name)?;
        stored.ports = ports;
        write_json(&self.vessel_path(&vessel.name), &stored)
    }

    async fn record_released_vessel(&self, vessel: &Vessel) -> Result<(), StoreError> {
        let mut stored = self.load_vessel(&vessel.name)?;
        stored.is_dirty = false;
        write_json(&self.vessel_path(&vessel.name), &stored)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
