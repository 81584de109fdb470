//! Static directory implementation - answers name lookups from fixed maps.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use wa_bridge::{BridgeError, ChatDirectory, Jid};

/// A directory backed by in-memory contact and group maps.
///
/// Entries can be changed after construction, which lets tests check that
/// stored names are not re-resolved.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    contacts: Mutex<HashMap<Jid, String>>,
    groups: Mutex<HashMap<Jid, String>>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact's full name.
    pub fn with_contact(self, jid: Jid, full_name: impl Into<String>) -> Self {
        self.set_contact(jid, full_name);
        self
    }

    /// Add a group's name.
    pub fn with_group(self, jid: Jid, name: impl Into<String>) -> Self {
        self.set_group(jid, name);
        self
    }

    /// Make every lookup fail.
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Set or replace a contact's full name.
    pub fn set_contact(&self, jid: Jid, full_name: impl Into<String>) {
        if let Ok(mut contacts) = self.contacts.lock() {
            contacts.insert(jid, full_name.into());
        }
    }

    /// Set or replace a group's name.
    pub fn set_group(&self, jid: Jid, name: impl Into<String>) {
        if let Ok(mut groups) = self.groups.lock() {
            groups.insert(jid, name.into());
        }
    }

    /// Number of lookups served so far, failed ones included.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lookup(&self, map: &Mutex<HashMap<Jid, String>>, jid: &Jid) -> Result<Option<String>, BridgeError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Connection("directory unavailable".to_string()));
        }
        let map = map
            .lock()
            .map_err(|_| BridgeError::Connection("directory lock poisoned".to_string()))?;
        Ok(map.get(&jid.to_non_device()).cloned())
    }
}

#[async_trait]
impl ChatDirectory for StaticDirectory {
    async fn contact_full_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError> {
        self.lookup(&self.contacts, jid)
    }

    async fn group_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError> {
        self.lookup(&self.groups, jid)
    }
}
