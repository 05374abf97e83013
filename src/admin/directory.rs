//! Registered agent directory

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,
    Suspended,
}

/// An agent known to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub tools: BTreeSet<String>,
    /// Display string shown by the dashboard
    #[serde(default)]
    pub last_active: String,
    pub status: AgentStatus,
}

/// Read-only list of registered agents
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    agents: Vec<AgentRecord>,
}

impl AgentDirectory {
    pub fn new(agents: Vec<AgentRecord>) -> Self {
        Self { agents }
    }

    pub fn list(&self) -> &[AgentRecord] {
        &self.agents
    }

    pub fn get(&self, id: &str) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| a.status == AgentStatus::Active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentsConfig;

    #[test]
    fn test_default_directory() {
        let directory = AgentDirectory::new(AgentsConfig::default().directory);
        assert_eq!(directory.list().len(), 2);
        assert_eq!(directory.active_count(), 2);
        let spider = directory.get("ag-hw2").unwrap();
        assert_eq!(spider.name, "WebSpider");
        assert!(spider.tools.contains("fetch_website_content"));
    }

    #[test]
    fn test_suspended_not_counted() {
        let mut agents = AgentsConfig::default().directory;
        agents[0].status = AgentStatus::Suspended;
        assert_eq!(AgentDirectory::new(agents).active_count(), 1);
    }

    #[test]
    fn test_record_wire_format() {
        let record = &AgentsConfig::default().directory[0];
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["lastActive"], "Just now");
        assert_eq!(json["status"], "Active");
        assert_eq!(json["tools"][0], "read_local_file");
    }
}
