//! Per-request unit of work
//!
//! A unit is opened before endpoint dispatch and closed from the response
//! status: success completes it and publishes its entity changes, anything
//! else rolls it back.

use crate::auditing::EntityChange;
use crate::error::{Error, Result};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Active,
    Completed,
    RolledBack,
}

#[derive(Debug)]
struct UnitOfWorkInner {
    state: UnitOfWorkState,
    changes: Vec<EntityChange>,
}

/// Handle to the current unit of work; clones share the same unit
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    id: Uuid,
    inner: Arc<Mutex<UnitOfWorkInner>>,
}

impl UnitOfWork {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.inner.lock().state
    }

    /// Record a change; fails once the unit is closed
    pub fn record(&self, change: EntityChange) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != UnitOfWorkState::Active {
            return Err(Error::Internal {
                message: format!("unit of work {} is already {:?}", self.id, inner.state),
            });
        }
        inner.changes.push(change);
        Ok(())
    }

    /// Close successfully and hand back the recorded changes
    pub fn complete(&self) -> Vec<EntityChange> {
        let mut inner = self.inner.lock();
        if inner.state != UnitOfWorkState::Active {
            return Vec::new();
        }
        inner.state = UnitOfWorkState::Completed;
        debug!(uow = %self.id, changes = inner.changes.len(), "Unit of work completed");
        std::mem::take(&mut inner.changes)
    }

    /// Close and discard the recorded changes
    pub fn rollback(&self) {
        let mut inner = self.inner.lock();
        if inner.state == UnitOfWorkState::Active {
            inner.state = UnitOfWorkState::RolledBack;
            debug!(uow = %self.id, discarded = inner.changes.len(), "Unit of work rolled back");
            inner.changes.clear();
        }
    }
}

/// Opens units of work
#[derive(Debug, Clone, Default)]
pub struct UnitOfWorkManager;

impl UnitOfWorkManager {
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork {
            id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(UnitOfWorkInner {
                state: UnitOfWorkState::Active,
                changes: Vec::new(),
            })),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UnitOfWork {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<UnitOfWork>()
            .cloned()
            .ok_or_else(|| Error::Internal {
                message: "no unit of work is active for this request".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auditing::EntityChangeType;

    fn change() -> EntityChange {
        EntityChange::new("Profile", "1", EntityChangeType::Updated)
    }

    #[test]
    fn test_complete_returns_changes() {
        let uow = UnitOfWorkManager.begin();
        uow.record(change()).unwrap();
        uow.clone().record(change()).unwrap();

        assert_eq!(uow.complete().len(), 2);
        assert_eq!(uow.state(), UnitOfWorkState::Completed);
        assert!(uow.record(change()).is_err());
        assert!(uow.complete().is_empty());
    }

    #[test]
    fn test_rollback_discards() {
        let uow = UnitOfWorkManager.begin();
        uow.record(change()).unwrap();
        uow.rollback();

        assert_eq!(uow.state(), UnitOfWorkState::RolledBack);
        assert!(uow.complete().is_empty());
    }

    #[test]
    fn test_units_are_independent() {
        let a = UnitOfWorkManager.begin();
        let b = UnitOfWorkManager.begin();
        assert_ne!(a.id(), b.id());
        a.record(change()).unwrap();
        assert!(b.complete().is_empty());
    }
}
