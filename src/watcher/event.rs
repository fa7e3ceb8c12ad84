//! Watch event types

use serde::Serialize;

/// Watch progress events for NDJSON output
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    WatchStarted {
        source: String,
    },
    FileChanged {
        resource: String,
        path: String,
    },
    RebuildStarted {
        resource: String,
    },
    /// A resource rebuilt, followed by its import dependents
    CascadeRebuilt {
        resource: String,
        dependents: Vec<String>,
    },
    RebuildFailed {
        resource: String,
        reason: String,
    },
    /// The external server was asked to restart these resources
    RestartIssued {
        resources: Vec<String>,
    },
    Error {
        message: String,
    },
    Shutdown,
}

impl WatchEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = WatchEvent::CascadeRebuilt {
            resource: "core".to_string(),
            dependents: vec!["banking".to_string()],
        };
        let json = event.to_json();
        assert!(json.contains("\"event\":\"cascade_rebuilt\""));
        assert!(json.contains("\"dependents\":[\"banking\"]"));
    }
}
