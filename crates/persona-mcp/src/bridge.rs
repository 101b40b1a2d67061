//! Connection pool over stdio MCP servers.

use async_trait::async_trait;
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParams;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{McpError, McpResult};
use crate::types::{RemoteTool, ServerConfig, ToolResponse, normalize_tool_response};

/// Type alias for a running MCP client service.
type McpService = RunningService<RoleClient, ()>;

/// Calls tools hosted on external servers.
#[async_trait]
pub trait ToolBridge: Send + Sync {
    /// Call `tool` on `server`, connecting first if needed.
    ///
    /// A server-side tool failure is reported through
    /// [`ToolResponse::is_error`], not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unknown, cannot be reached, or the
    /// protocol exchange fails.
    async fn call_tool(&self, server: &str, tool: &str, args: Value) -> McpResult<ToolResponse>;

    /// List the tools a server advertises.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unknown or cannot be reached.
    async fn list_tools(&self, server: &str) -> McpResult<Vec<RemoteTool>>;
}

/// Pool of MCP client connections keyed by server name.
///
/// Connecting to an already-connected server is a no-op.
#[derive(Default)]
pub struct McpBridge {
    configs: RwLock<HashMap<String, ServerConfig>>,
    connections: RwLock<HashMap<String, McpService>>,
}

impl McpBridge {
    /// Create a bridge with no servers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bridge for a set of servers.
    #[must_use]
    pub fn with_servers(servers: HashMap<String, ServerConfig>) -> Self {
        Self {
            configs: RwLock::new(servers),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a server configuration.
    ///
    /// An existing connection is kept until [`disconnect`](Self::disconnect).
    pub async fn add_server(&self, name: impl Into<String>, config: ServerConfig) {
        self.configs.write().await.insert(name.into(), config);
    }

    /// Configured server names, sorted.
    pub async fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a server is currently connected.
    pub async fn is_connected(&self, name: &str) -> bool {
        self.connections.read().await.contains_key(name)
    }

    /// Connect to a configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is not configured, the process cannot be
    /// spawned, or the handshake fails.
    pub async fn connect(&self, name: &str) -> McpResult<()> {
        self.peer(name).await.map(|_| ())
    }

    /// Disconnect from a server. Unknown names are ignored.
    pub async fn disconnect(&self, name: &str) {
        let service = self.connections.write().await.remove(name);
        if let Some(service) = service {
            if let Err(e) = service.cancel().await {
                warn!(server = name, error = %e, "MCP server did not shut down cleanly");
            }
            info!(server = name, "MCP server disconnected");
        }
    }

    /// Disconnect from every server.
    pub async fn disconnect_all(&self) {
        let names: Vec<String> = self.connections.read().await.keys().cloned().collect();
        for name in names {
            self.disconnect(&name).await;
        }
    }

    /// Get a peer handle, connecting if needed.
    async fn peer(&self, name: &str) -> McpResult<Peer<RoleClient>> {
        if let Some(service) = self.connections.read().await.get(name) {
            return Ok(service.peer().clone());
        }

        // Holding the write lock across the handshake keeps concurrent callers
        // from spawning the same server twice.
        let mut connections = self.connections.write().await;
        if let Some(service) = connections.get(name) {
            return Ok(service.peer().clone());
        }

        let config = self
            .configs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| McpError::ServerNotFound {
                name: name.to_string(),
            })?;

        let service = spawn_stdio(name, &config).await?;
        let peer = service.peer().clone();
        connections.insert(name.to_string(), service);
        Ok(peer)
    }
}

async fn spawn_stdio(name: &str, config: &ServerConfig) -> McpResult<McpService> {
    if config.command.trim().is_empty() {
        return Err(McpError::ConfigError(format!(
            "No command specified for stdio server {name}"
        )));
    }

    let mut cmd = tokio::process::Command::new(&config.command);
    cmd.args(&config.args);
    for (key, value) in &config.env {
        cmd.env(key, value);
    }
    if let Some(cwd) = &config.cwd {
        cmd.current_dir(cwd);
    }

    let transport = TokioChildProcess::new(cmd).map_err(|e| McpError::ServerStartFailed {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    let service = ().serve(transport).await.map_err(|e| {
        McpError::InitializationFailed(format!("MCP handshake failed for {name}: {e}"))
    })?;

    info!(server = name, command = %config.command, "MCP connection established");
    Ok(service)
}

#[async_trait]
impl ToolBridge for McpBridge {
    async fn call_tool(&self, server: &str, tool: &str, args: Value) -> McpResult<ToolResponse> {
        let peer = self.peer(server).await?;

        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                // Wrap non-object values
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                Some(map)
            },
        };

        let params = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(tool.to_string()),
            arguments,
            task: None,
        };

        debug!(server, tool, "Calling MCP tool");
        let result = peer
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed {
                server: server.to_string(),
                tool: tool.to_string(),
                reason: e.to_string(),
            })?;

        let raw = serde_json::to_value(&result)?;
        let response = normalize_tool_response(&raw);
        info!(server, tool, is_error = response.is_error, "Tool call completed");
        Ok(response)
    }

    async fn list_tools(&self, server: &str) -> McpResult<Vec<RemoteTool>> {
        let peer = self.peer(server).await?;
        let tools = peer.list_all_tools().await?;
        Ok(tools
            .iter()
            .map(|t| RemoteTool::from_rmcp(t, server))
            .collect())
    }
}

impl std::fmt::Debug for McpBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpBridge").finish_non_exhaustive()
    }
}
