//! DNS response cache with TTL-based expiration.

use hickory_proto::op::{Message, Query};
use rustc_hash::FxHashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::dns;

/// Cache fingerprint of a question: (name, type, class).
///
/// The name is the raw presentation string, so `Example.com.` and
/// `example.com.` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    qtype: u16,
    qclass: u16,
}

impl CacheKey {
    pub fn new(name: impl Into<String>, qtype: u16, qclass: u16) -> Self {
        Self {
            name: name.into(),
            qtype,
            qclass,
        }
    }

    pub fn from_query(query: &Query) -> Self {
        Self::new(
            query.name().to_ascii(),
            query.query_type().into(),
            query.query_class().into(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

struct CacheEntry {
    message: Message,
    expires_at: Instant,
}

/// TTL-based DNS cache.
///
/// A single reader/writer lock guards the map: lookups share the read lock,
/// inserts take the write lock for one key update. Entries are expired
/// lazily on read; [`DnsCache::purge_expired`] is an optional sweep.
pub struct DnsCache {
    entries: RwLock<FxHashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::with_default_ttl(dns::DEFAULT_TTL)
    }

    /// Cache whose entries for empty answers live `default_ttl`, which is
    /// also the longest any entry lives.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            default_ttl,
        }
    }

    /// Look up a fresh response. The transaction ID is left as stored.
    pub fn get(&self, key: &CacheKey) -> Option<Message> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Message> {
        let Ok(entries) = self.entries.read() else {
            return None;
        };
        let entry = entries.get(key)?;
        (now < entry.expires_at).then(|| entry.message.clone())
    }

    /// Store a copy of `response`, replacing any previous entry for `key`.
    pub fn put(&self, key: CacheKey, response: &Message) {
        self.put_at(key, response, Instant::now());
    }

    pub fn put_at(&self, key: CacheKey, response: &Message, now: Instant) {
        let ttl = dns::effective_ttl(response, self.default_ttl);
        let entry = CacheEntry {
            message: response.clone(),
            expires_at: now + ttl,
        };

        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.insert(key, entry);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new()
    }
}
