use std::collections::HashMap;

use serde::Serialize;

use super::domain::ApplicationId;

/// Which path holds the write lock on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockHolder {
    Drag,
    Bulk,
}

/// At most one outstanding status write per application.
#[derive(Debug, Clone, Default)]
pub struct InFlightLocks {
    held: HashMap<ApplicationId, LockHolder>,
}

impl InFlightLocks {
    /// Returns false when another write is already outstanding for `id`.
    pub fn try_acquire(&mut self, id: &ApplicationId, holder: LockHolder) -> bool {
        if self.held.contains_key(id) {
            return false;
        }
        self.held.insert(id.clone(), holder);
        true
    }

    pub fn release(&mut self, id: &ApplicationId) -> Option<LockHolder> {
        self.held.remove(id)
    }

    pub fn holder(&self, id: &ApplicationId) -> Option<LockHolder> {
        self.held.get(id).copied()
    }

    pub fn is_locked(&self, id: &ApplicationId) -> bool {
        self.held.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Locked ids in sorted order.
    pub fn ids(&self) -> Vec<ApplicationId> {
        let mut ids: Vec<ApplicationId> = self.held.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_until_release() {
        let mut locks = InFlightLocks::default();
        let id = ApplicationId::new("app-7");

        assert!(locks.try_acquire(&id, LockHolder::Drag));
        assert!(!locks.try_acquire(&id, LockHolder::Bulk));
        assert_eq!(locks.holder(&id), Some(LockHolder::Drag));

        assert_eq!(locks.release(&id), Some(LockHolder::Drag));
        assert!(locks.try_acquire(&id, LockHolder::Bulk));
    }
}
