//! Per-call dedup cache of already converted objects.
//!
//! A push may reference the same object more than once (a member shared by
//! two containers, say). The cache remembers what the current call has
//! already produced so the second reference reuses it instead of creating
//! or converting it again. A fresh cache is built for every top-level call
//! and dropped with it.

use hostbridge_protocol::{DomainObject, NativeId};
use std::collections::HashMap;
use uuid::Uuid;

/// What a cache entry is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Stable identity of a domain object.
    Guid(Uuid),
    /// Native id of a host entity.
    Native(NativeId),
    /// Type and name, for objects without an identity yet.
    Named {
        /// Type name.
        type_name: String,
        /// Object or grouping name.
        name: String,
    },
}

impl CacheKey {
    /// Builds a [`CacheKey::Named`] key.
    pub fn named(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

/// A converted object.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// Host entities produced from a domain object.
    Host(Vec<NativeId>),
    /// A domain object produced from a host entity.
    Domain(DomainObject),
}

impl CacheValue {
    /// Native ids of a host value.
    pub fn as_host(&self) -> Option<&[NativeId]> {
        match self {
            CacheValue::Host(ids) => Some(ids),
            CacheValue::Domain(_) => None,
        }
    }

    /// Domain object of a domain value.
    pub fn as_domain(&self) -> Option<&DomainObject> {
        match self {
            CacheValue::Domain(object) => Some(object),
            CacheValue::Host(_) => None,
        }
    }
}

/// Call-scoped map from identity to converted object.
#[derive(Debug, Default)]
pub struct RefCache {
    entries: HashMap<CacheKey, CacheValue>,
}

impl RefCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<&CacheValue> {
        self.entries.get(key)
    }

    /// Records `value` under `key`, returning what was there before.
    pub fn put(&mut self, key: CacheKey, value: CacheValue) -> Option<CacheValue> {
        self.entries.insert(key, value)
    }

    /// Forgets `key`.
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheValue> {
        self.entries.remove(key)
    }

    /// Native ids already produced for `guid`.
    pub fn host_ids(&self, guid: Uuid) -> Option<&[NativeId]> {
        self.get(&CacheKey::Guid(guid)).and_then(CacheValue::as_host)
    }

    /// Domain object already converted from `native_id`.
    pub fn domain(&self, native_id: NativeId) -> Option<&DomainObject> {
        self.get(&CacheKey::Native(native_id))
            .and_then(CacheValue::as_domain)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
