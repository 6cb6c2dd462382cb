//! Request audit logging

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Which entity types get their changes attached to audit entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityHistorySelector {
    #[default]
    None,
    AllEntities,
    Only(Vec<String>),
}

impl EntityHistorySelector {
    pub fn matches(&self, entity_type: &str) -> bool {
        match self {
            EntityHistorySelector::None => false,
            EntityHistorySelector::AllEntities => true,
            EntityHistorySelector::Only(types) => types.iter().any(|t| t == entity_type),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditingOptions {
    pub application_name: String,
    pub is_enabled: bool,
    pub entity_history: EntityHistorySelector,
}

impl Default for AuditingOptions {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            is_enabled: true,
            entity_history: EntityHistorySelector::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityChangeType {
    Created,
    Updated,
    Deleted,
}

/// A change to one entity, recorded inside a unit of work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChange {
    pub entity_type: String,
    pub entity_id: String,
    pub change_type: EntityChangeType,
    pub change_time: DateTime<Utc>,
    /// Property name to `(original, new)` value
    pub properties: BTreeMap<String, (Option<String>, Option<String>)>,
}

impl EntityChange {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        change_type: EntityChangeType,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            change_type,
            change_time: Utc::now(),
            properties: BTreeMap::new(),
        }
    }

    /// Record a property only if its value changed
    pub fn property(mut self, name: &str, original: Option<&str>, new: Option<&str>) -> Self {
        if original != new {
            self.properties.insert(
                name.to_string(),
                (original.map(str::to_string), new.map(str::to_string)),
            );
        }
        self
    }
}

/// One audited request
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogEntry {
    pub application_name: String,
    pub user_id: Option<String>,
    pub correlation_id: Option<String>,
    pub http_method: String,
    pub url: String,
    pub status_code: u16,
    pub execution_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub entity_changes: Vec<EntityChange>,
}

/// Destination for audit entries
#[async_trait]
pub trait AuditingStore: Send + Sync {
    async fn save(&self, entry: AuditLogEntry) -> Result<()>;
}

/// Writes audit entries as structured events on the `audit` target
pub struct LoggingAuditStore;

#[async_trait]
impl AuditingStore for LoggingAuditStore {
    async fn save(&self, entry: AuditLogEntry) -> Result<()> {
        info!(
            target: "audit",
            application = %entry.application_name,
            user_id = entry.user_id.as_deref().unwrap_or("-"),
            correlation_id = entry.correlation_id.as_deref().unwrap_or("-"),
            method = %entry.http_method,
            url = %entry.url,
            status = entry.status_code,
            duration_ms = entry.duration_ms,
            entity_changes = entry.entity_changes.len(),
            "Request audited"
        );
        Ok(())
    }
}

/// Entity changes committed while handling the current request
#[derive(Debug, Clone, Default)]
pub struct AuditScope {
    changes: Arc<Mutex<Vec<EntityChange>>>,
}

impl AuditScope {
    pub fn extend(&self, changes: impl IntoIterator<Item = EntityChange>) {
        self.changes.lock().extend(changes);
    }

    pub fn take(&self) -> Vec<EntityChange> {
        std::mem::take(&mut *self.changes.lock())
    }
}

/// Options and store used by the auditing stage
pub struct AuditingService {
    pub options: AuditingOptions,
    pub store: Arc<dyn AuditingStore>,
}

impl AuditingService {
    pub fn new(options: AuditingOptions, store: Arc<dyn AuditingStore>) -> Self {
        Self { options, store }
    }

    /// Keep only changes of entity types selected for history
    pub fn select_changes(&self, changes: Vec<EntityChange>) -> Vec<EntityChange> {
        changes
            .into_iter()
            .filter(|c| self.options.entity_history.matches(&c.entity_type))
            .collect()
    }
}
