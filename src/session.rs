use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::jolokia::JolokiaClient;

/// Process-wide registry of validated Jolokia clients, keyed by the
/// caller-chosen broker alias.
///
/// Owned by the composition root and cloned into every handler; entries are
/// installed by login and looked up by the verification middleware. Entries
/// expire with the session token: `get` evicts lazily, a re-login overwrites.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: DashMap<String, SessionEntry>,
    ttl: Duration,
}

struct SessionEntry {
    client: Arc<JolokiaClient>,
    expires_at: DateTime<Utc>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: DashMap::new(),
                ttl,
            }),
        }
    }

    pub fn put(&self, key: impl Into<String>, client: Arc<JolokiaClient>) {
        self.inner.sessions.insert(
            key.into(),
            SessionEntry {
                client,
                expires_at: Utc::now() + self.inner.ttl,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Arc<JolokiaClient>> {
        let expired = {
            let entry = self.inner.sessions.get(key)?;
            if entry.expires_at <= Utc::now() {
                true
            } else {
                return Some(Arc::clone(&entry.client));
            }
        };
        if expired {
            self.inner.sessions.remove(key);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jolokia::BrokerIdentity;

    fn test_client() -> Arc<JolokiaClient> {
        Arc::new(JolokiaClient::new(BrokerIdentity {
            host: "localhost".to_string(),
            port: 8161,
            scheme: "http".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
        }))
    }

    #[test]
    fn put_then_get_returns_same_client() {
        let store = SessionStore::new(Duration::seconds(60));
        let client = test_client();
        store.put("broker-0", Arc::clone(&client));
        let fetched = store.get("broker-0").expect("entry present");
        assert!(Arc::ptr_eq(&client, &fetched));
    }

    #[test]
    fn missing_key_is_absent() {
        let store = SessionStore::new(Duration::seconds(60));
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn expired_entry_is_evicted_on_get() {
        let store = SessionStore::new(Duration::seconds(0));
        store.put("broker-0", test_client());
        assert_eq!(store.len(), 1);
        assert!(store.get("broker-0").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn relogin_overwrites_entry() {
        let store = SessionStore::new(Duration::seconds(60));
        store.put("broker-0", test_client());
        let replacement = test_client();
        store.put("broker-0", Arc::clone(&replacement));
        assert_eq!(store.len(), 1);
        let fetched = store.get("broker-0").unwrap();
        assert!(Arc::ptr_eq(&replacement, &fetched));
    }
}
