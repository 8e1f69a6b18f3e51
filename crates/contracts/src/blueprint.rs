//! RouterBlueprint - Config Loader output
//!
//! Describes a complete dispatcher: the ordered route list, the strategy that
//! ranks them per request, and how concurrent outcomes are combined.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

use crate::Protocol;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouterBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Router-wide settings
    #[serde(default)]
    #[validate(nested)]
    pub router: RouterConfig,

    /// Ordered route list (configuration order is the default priority)
    #[serde(default)]
    #[validate(nested)]
    pub routes: Vec<RouteConfig>,
}

/// Router-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouterConfig {
    /// Router identifier (used in logs)
    #[serde(default = "default_router_id")]
    #[validate(length(min = 1, message = "router id cannot be empty"))]
    pub id: String,

    /// Protocol of the requests this router is fed
    #[serde(default)]
    pub protocol: Protocol,

    /// Fan-out mode
    #[serde(default)]
    pub mode: DispatchMode,

    /// Outcome combination policy
    #[serde(default)]
    pub combiner: CombinerKind,

    /// Candidate ordering strategy
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            id: default_router_id(),
            protocol: Protocol::default(),
            mode: DispatchMode::default(),
            combiner: CombinerKind::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

fn default_router_id() -> String {
    "router".to_string()
}

/// Fan-out mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Launch every candidate at dispatch start
    #[default]
    Eager,
    /// Launch the next candidate only after the previous one failed
    Lazy,
}

/// Outcome combination policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinerKind {
    /// Highest-ranked success wins; lower ranks never preempt a pending higher rank
    #[default]
    Fallback,
    /// First success to arrive wins, regardless of rank
    FirstSuccess,
}

/// Candidate ordering strategy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Strategy type
    #[serde(default)]
    pub kind: StrategyKind,

    /// Explicit route order (priority strategy); empty = configuration order
    #[serde(default)]
    pub order: Vec<String>,

    /// RNG seed (random strategy)
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Strategy type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Fixed priority order
    #[default]
    Priority,
    /// Rotate the configured order on every request
    RoundRobin,
    /// Random permutation per request
    Random,
    /// Fewest in-flight calls first
    LeastLoaded,
}

/// Route descriptor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteConfig {
    /// Unique route name
    #[validate(length(min = 1, message = "route name cannot be empty"))]
    pub name: String,

    /// Protocol used to reach the backend
    #[serde(default)]
    pub protocol: Protocol,

    /// Backend endpoint (URL for HTTP, `host:port` for RPC)
    #[validate(length(min = 1, message = "endpoint cannot be empty"))]
    pub endpoint: String,

    /// Per-call timeout in milliseconds, must be > 0
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1, message = "timeout_ms must be > 0"))]
    pub timeout_ms: u64,

    /// Adapter-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    1000
}

impl RouteConfig {
    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RouterBlueprint {
    /// Route names in configuration order
    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }

    /// Look up a route by name
    pub fn route(&self, name: &str) -> Option<&RouteConfig> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Route names in the order the priority strategy would rank them
    pub fn priority_order(&self) -> Vec<String> {
        if self.router.strategy.order.is_empty() {
            self.routes.iter().map(|r| r.name.clone()).collect()
        } else {
            self.router.strategy.order.clone()
        }
    }
}
