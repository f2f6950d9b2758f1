//! Key-value persistence for document and version records.
//!
//! The lifecycle service only talks to the [`KeyValueStore`] trait. Two
//! backends implement it:
//! - [`RedisStore`]: production backend, TTLs enforced by Redis itself.
//! - [`MemoryStore`]: in-process map with lazily enforced TTLs, used by
//!   tests and single-node demos (`--memory-store`).

use async_trait::async_trait;
use redis::{AsyncCommands, ExistenceCheck, SetExpiry, SetOptions};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// `SET key value [EX ttl]`. `None` stores without expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// `SET key value NX [EX ttl]`. Returns `false` if the key already exists.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> StoreResult<bool>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Returns `true` if a key was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    async fn set_add(&self, set: &str, member: &str) -> StoreResult<()>;

    async fn set_remove(&self, set: &str, member: &str) -> StoreResult<()>;

    async fn set_members(&self, set: &str) -> StoreResult<Vec<String>>;

    /// `KEYS pattern` with Redis glob semantics (`*` and `?`).
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Redis refuses sub-second `EX` values; round them up.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[derive(Clone)]
pub struct RedisStore {
    inner: redis::Client,
}

impl RedisStore {
    pub fn new(inner: redis::Client) -> Self {
        Self { inner }
    }

    pub fn open(redis_url: &str) -> StoreResult<Self> {
        Ok(Self::new(redis::Client::open(redis_url)?))
    }

    async fn connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        Ok(self.inner.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut con = self.connection().await?;
        match ttl {
            Some(ttl) => con.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl)).await?,
            None => con.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, value))]
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let mut con = self.connection().await?;
        let mut options = SetOptions::default().conditional_set(ExistenceCheck::NX);
        if let Some(ttl) = ttl {
            options = options.with_expiration(SetExpiry::EX(ttl_seconds(ttl)));
        }
        let reply: Option<String> = con.set_options(key, value, options).await?;
        Ok(reply.is_some())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut con = self.connection().await?;
        Ok(con.get(key).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut con = self.connection().await?;
        let removed: u64 = con.del(key).await?;
        Ok(removed > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn set_add(&self, set: &str, member: &str) -> StoreResult<()> {
        let mut con = self.connection().await?;
        con.sadd::<_, _, ()>(set, member).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_remove(&self, set: &str, member: &str) -> StoreResult<()> {
        let mut con = self.connection().await?;
        con.srem::<_, _, ()>(set, member).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_members(&self, set: &str) -> StoreResult<Vec<String>> {
        let mut con = self.connection().await?;
        Ok(con.smembers(set).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut con = self.connection().await?;
        Ok(con.keys(pattern).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut con = self.connection().await?;
        con.exists::<_, bool>("apiscope:ping").await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
    sets: HashMap<String, HashSet<String>>,
}

/// In-memory [`KeyValueStore`]. Expired keys are treated as absent on read
/// and dropped on the next write that touches them.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(value: &str, ttl: Option<Duration>) -> Entry {
        Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + Duration::from_secs(ttl_seconds(ttl))),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        state.entries.insert(key.to_string(), Self::entry(value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let now = Instant::now();
        if state.entries.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        state.entries.insert(key.to_string(), Self::entry(value, ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let now = Instant::now();
        Ok(state
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let now = Instant::now();
        Ok(state
            .entries
            .remove(key)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn set_add(&self, set: &str, member: &str) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        state
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, set: &str, member: &str) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(members) = state.sets.get_mut(set) {
            members.remove(member);
            if members.is_empty() {
                state.sets.remove(set);
            }
        }
        Ok(())
    }

    async fn set_members(&self, set: &str) -> StoreResult<Vec<String>> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut members: Vec<String> = state
            .sets
            .get(set)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let now = Instant::now();
        state.entries.retain(|_, e| e.is_live(now));
        let mut keys: Vec<String> = state
            .entries
            .keys()
            .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> StoreResult<()> {
        let _state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(())
    }
}

/// Glob match supporting `*` (any run) and `?` (any single byte).
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == b'?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_patterns() {
        assert!(glob_match(b"version:abc:*", b"version:abc:123"));
        assert!(glob_match(b"version:abc:*", b"version:abc:"));
        assert!(!glob_match(b"version:abc:*", b"version:abcd:1"));
        assert!(glob_match(b"a?c", b"abc"));
        assert!(glob_match(b"*:x:*", b"doc:x:1"));
        assert!(!glob_match(b"exact", b"exactly"));
    }

    #[tokio::test]
    async fn memory_store_basic_ops() {
        let store = MemoryStore::new();
        store.set("document:1", "a", None).await.unwrap();
        store.set("version:1:a", "v", None).await.unwrap();
        store.set("version:2:b", "v", None).await.unwrap();

        assert_eq!(store.get("document:1").await.unwrap().as_deref(), Some("a"));
        assert_eq!(
            store.keys("version:1:*").await.unwrap(),
            vec!["version:1:a".to_string()]
        );
        assert!(store.delete("document:1").await.unwrap());
        assert!(!store.delete("document:1").await.unwrap());
        assert_eq!(store.get("document:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_sets() {
        let store = MemoryStore::new();
        store.set_add("active", "b").await.unwrap();
        store.set_add("active", "a").await.unwrap();
        store.set_add("active", "a").await.unwrap();
        assert_eq!(store.set_members("active").await.unwrap(), vec!["a", "b"]);
        store.set_remove("active", "a").await.unwrap();
        assert_eq!(store.set_members("active").await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn set_if_absent_claims_once() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("share:x", "1", None).await.unwrap());
        assert!(!store.set_if_absent("share:x", "2", None).await.unwrap());
        assert_eq!(store.get("share:x").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn memory_store_ttl_is_enforced() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());
        // Sub-second TTLs round up to one second, as in Redis.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.keys("*").await.unwrap().is_empty());
        assert!(store.set_if_absent("k", "again", None).await.unwrap());
    }
}
