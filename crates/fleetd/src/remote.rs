// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node manager adapter shelling out to the signing client
//!
//! Key handling and request signing live in the operator-configured
//! client program; this adapter only maps its exit status onto the
//! engine's error taxonomy.

use async_trait::async_trait;
use berth_core::{Node, NodeManager, RemoteError};
use tokio::process::Command;

/// Invokes `<program> <address> <owner_key> <operation> [args...]`
#[derive(Clone)]
pub struct CommandNodeManager {
    program: String,
}

impl CommandNodeManager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl NodeManager for CommandNodeManager {
    async fn invoke(
        &self,
        node: &Node,
        operation: &str,
        args: &[String],
    ) -> Result<String, RemoteError> {
        let output = Command::new(&self.program)
            .arg(&node.address)
            .arg(&node.owner_key)
            .arg(operation)
            .args(args)
            .output()
            .await
            .map_err(|e| RemoteError::Network {
                address: node.address.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("authorization") || stderr.contains("signature") {
                return Err(RemoteError::Authorization {
                    node: node.id.to_string(),
                    message: stderr.to_string(),
                });
            }
            return Err(RemoteError::RemoteState {
                node: node.id.to_string(),
                message: stderr.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
