//! # Health Types
//!
//! Health state shared by probes and the endpoints that report them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Health state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthState {
    /// Component is healthy
    Healthy,
    /// Component is degraded but functional
    Degraded,
    /// Component is unhealthy
    Unhealthy,
}

impl HealthState {
    /// Combine two states, keeping the worse one
    pub fn worst(self, other: HealthState) -> HealthState {
        self.max(other)
    }

    /// Whether a probe in this state should still receive traffic
    pub fn is_serving(self) -> bool {
        !matches!(self, HealthState::Unhealthy)
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthState::Healthy => "Healthy",
            HealthState::Degraded => "Degraded",
            HealthState::Unhealthy => "Unhealthy",
        };
        f.write_str(s)
    }
}

/// Result of a single health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub name: String,
    pub status: HealthState,
    pub duration: Duration,
    pub description: Option<String>,
    pub details: HashMap<String, String>,
}

impl HealthStatus {
    pub fn healthy(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: HealthState::Healthy,
            duration,
            description: None,
            details: HashMap::new(),
        }
    }

    pub fn unhealthy(
        name: impl Into<String>,
        duration: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status: HealthState::Unhealthy,
            duration,
            description: Some(description.into()),
            details: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_state_wins() {
        assert_eq!(
            HealthState::Healthy.worst(HealthState::Degraded),
            HealthState::Degraded
        );
        assert_eq!(
            HealthState::Unhealthy.worst(HealthState::Healthy),
            HealthState::Unhealthy
        );
        assert!(HealthState::Degraded.is_serving());
        assert!(!HealthState::Unhealthy.is_serving());
    }
}
