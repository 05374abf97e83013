//! OpenSec configuration management

use crate::admin::{AgentRecord, AgentStatus};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main OpenSec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSecConfig {
    /// HTTP gateway configuration
    pub gateway: GatewayConfig,

    /// Risk scanner configuration
    pub scanners: ScannersConfig,

    /// Model alias routing table
    pub routes: Vec<RouteConfig>,

    /// Provider HTTP client settings
    pub providers: ProvidersConfig,

    /// Provider response cache
    pub cache: CacheConfig,

    /// Audit trail configuration
    pub audit: AuditConfig,

    /// Agent directory and downstream agent processes
    pub agents: AgentsConfig,

    /// SQL firewall rules
    pub sql: SqlConfig,

    /// Sandbox executor used by the direct execution endpoint
    pub executor: ExecutorConfig,
}

impl Default for OpenSecConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            scanners: ScannersConfig::default(),
            routes: default_routes(),
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
            audit: AuditConfig::default(),
            agents: AgentsConfig::default(),
            sql: SqlConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl OpenSecConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Reject configurations the gateway cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut aliases = HashSet::new();
        for route in &self.routes {
            if !aliases.insert(route.alias.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate route alias '{}'",
                    route.alias
                )));
            }
        }
        if self.audit.capacity == 0 {
            return Err(Error::Config("audit.capacity must be at least 1".to_string()));
        }
        if self.agents.max_concurrent == 0 {
            return Err(Error::Config(
                "agents.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannersConfig {
    /// Per-adapter timeout in seconds
    pub timeout_secs: u64,

    /// Topics rejected by the banned-topic scanner
    pub banned_topics: Vec<String>,

    /// Phrases checked by the keyword fallback
    pub fallback_keywords: Vec<String>,

    /// Command fragments the built-in firewall blocks
    pub dangerous_commands: Vec<String>,

    /// Remote reasoning model
    pub remote_brain: RemoteBrainConfig,
}

impl Default for ScannersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            banned_topics: ["hack", "exploit", "bypass", "malware"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_keywords: ["ignore previous", "system prompt", "bypass", "jailbreak"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dangerous_commands: crate::scanner::default_dangerous_commands(),
            remote_brain: RemoteBrainConfig::default(),
        }
    }
}

/// Remote brain (Ollama generate API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteBrainConfig {
    /// Generate endpoint URL
    pub endpoint: String,

    /// Model name sent in the request
    pub model: String,

    /// Environment variable holding the bearer credential.
    /// The scanner is disabled when it cannot be resolved.
    pub api_key_ref: String,

    /// Network timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RemoteBrainConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "glm-5".to_string(),
            api_key_ref: "OLLAMA_API_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

/// A model alias and its call chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Alias clients request
    pub alias: String,

    /// First target tried
    pub primary: TargetConfig,

    /// Targets tried in order after the primary fails
    #[serde(default)]
    pub fallbacks: Vec<TargetConfig>,
}

/// A single provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// OpenAI-compatible base URL (`/chat/completions` is appended)
    pub endpoint: String,

    /// Provider-side model identifier
    pub model_id: String,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_ref: Option<String>,
}

fn default_routes() -> Vec<RouteConfig> {
    let local_ollama = "http://localhost:11434/v1".to_string();
    vec![
        RouteConfig {
            alias: "glm-5:cloud".to_string(),
            primary: TargetConfig {
                endpoint: local_ollama.clone(),
                model_id: "glm-5:cloud".to_string(),
                api_key_ref: Some("OLLAMA_API_KEY".to_string()),
            },
            fallbacks: vec![TargetConfig {
                endpoint: local_ollama.clone(),
                model_id: "llama3".to_string(),
                api_key_ref: None,
            }],
        },
        RouteConfig {
            alias: "m2.5".to_string(),
            primary: TargetConfig {
                endpoint: "https://api.minimax.io/v1".to_string(),
                model_id: "MiniMax-M2.5".to_string(),
                api_key_ref: Some("MINIMAX_API_KEY".to_string()),
            },
            fallbacks: vec![TargetConfig {
                endpoint: local_ollama,
                model_id: "glm-5:cloud".to_string(),
                api_key_ref: Some("OLLAMA_API_KEY".to_string()),
            }],
        },
    ]
}

/// Provider HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Per-target request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

/// Provider response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached responses
    pub capacity: usize,

    /// Entry lifetime in seconds (None = no expiry)
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            ttl_secs: Some(3600),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Number of events retained
    pub capacity: usize,

    /// Maximum characters of the prompt stored per event
    pub excerpt_chars: usize,

    /// Persist the trail to a JSON file
    pub persist: bool,

    /// JSON file path (defaults to ~/.opensec/audit_log.json)
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            excerpt_chars: 200,
            persist: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Resolved backing file, or None for an in-memory trail
    pub fn storage_path(&self) -> Option<PathBuf> {
        if !self.persist {
            return None;
        }
        Some(self.path.clone().unwrap_or_else(|| {
            dirs_next::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".opensec")
                .join("audit_log.json")
        }))
    }
}

/// Agent directory and dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Reference records served by the directory API
    pub directory: Vec<AgentRecord>,

    /// Downstream agents reachable through agent-to-agent routing
    pub downstream: Vec<DownstreamAgentConfig>,

    /// Dispatch timeout in seconds
    pub dispatch_timeout_secs: u64,

    /// Maximum concurrently running agent processes
    pub max_concurrent: usize,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            directory: default_agent_directory(),
            downstream: Vec::new(),
            dispatch_timeout_secs: 120,
            max_concurrent: 4,
        }
    }
}

fn default_agent_directory() -> Vec<AgentRecord> {
    vec![
        AgentRecord {
            id: "ag-hw1".to_string(),
            name: "OpenClaw".to_string(),
            role: "Local System Access".to_string(),
            tools: ["read_local_file".to_string()].into_iter().collect(),
            last_active: "Just now".to_string(),
            status: AgentStatus::Active,
        },
        AgentRecord {
            id: "ag-hw2".to_string(),
            name: "WebSpider".to_string(),
            role: "Web Scraping & Analysis".to_string(),
            tools: ["fetch_website_content".to_string()].into_iter().collect(),
            last_active: "Just now".to_string(),
            status: AgentStatus::Active,
        },
    ]
}

/// A downstream agent process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamAgentConfig {
    /// Name used as `targetAgent`
    pub name: String,

    /// Executable to spawn
    pub command: String,

    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,
}

/// SQL firewall rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Tables agents may not reference
    pub restricted_tables: Vec<String>,

    /// Statement verbs agents may not issue
    pub destructive_verbs: Vec<String>,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            restricted_tables: ["users", "passwords", "credentials", "api_keys", "payments"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            destructive_verbs: ["DROP", "DELETE", "TRUNCATE", "ALTER", "GRANT", "REVOKE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Sandbox executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Remote sandbox base URL; None uses the mock sandbox
    pub sandbox_url: Option<String>,

    /// Environment variable holding the sandbox API key
    pub api_key_ref: String,

    /// Execution timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            sandbox_url: None,
            api_key_ref: "SANDBOX_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Resolve a credential from the environment.
///
/// Tries the reference as given, then its UPPER_CASE form.
pub fn resolve_credential(credential_ref: &str) -> Option<String> {
    std::env::var(credential_ref)
        .or_else(|_| std::env::var(credential_ref.to_uppercase()))
        .ok()
        .filter(|v| !v.is_empty())
}
