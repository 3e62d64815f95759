//! Keyed response cache with in-flight coalescing and key-scoped invalidation.
//!
//! Each key holds either a settled value (fresh or stale) or the shared
//! future of the load currently running for it. Concurrent `fetch` calls for
//! one key all await the same load, so the loader runs once per key until the
//! entry is invalidated. Loads run on their own task and settle their slot
//! whether or not anyone is still waiting.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::VerifyError;

/// Cache keys for the storefront entities the payment flow touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Confirmation result for one gateway reference.
    Verification(String),
    /// A single order.
    Order(String),
    /// The signed-in customer's order list.
    Orders,
    /// The signed-in customer's cart.
    Cart,
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::Verification(reference) => write!(f, "verification/{reference}"),
            QueryKey::Order(id) => write!(f, "orders/{id}"),
            QueryKey::Orders => f.write_str("orders"),
            QueryKey::Cart => f.write_str("cart"),
        }
    }
}

type SharedLoad = Shared<BoxFuture<'static, Result<Value, VerifyError>>>;
type Entries = DashMap<QueryKey, Slot>;

enum Slot {
    Ready { value: Value, stale: bool },
    Loading { id: u64, load: SharedLoad },
}

/// Snapshot of a settled cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub value: Value,
    pub stale: bool,
}

/// Shared response cache. Wrap in an `Arc` to share between flows.
#[derive(Default)]
pub struct QueryCache {
    entries: Arc<Entries>,
    next_load: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the fresh value for `key`, join the load already running for
    /// it, or start `loader`.
    ///
    /// Loads run in their own tokio task and store their result themselves,
    /// so a load finishes and is cached even when every caller has gone.
    /// `loader` is called while the key's shard is locked and must not touch
    /// this cache synchronously. Errors are handed to every joined caller but
    /// never cached.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, loader: F) -> Result<Value, VerifyError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, VerifyError>> + Send + 'static,
    {
        let load = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let joined = match occupied.get() {
                    Slot::Ready {
                        value,
                        stale: false,
                    } => return Ok(value.clone()),
                    Slot::Loading { load, .. } => Some(load.clone()),
                    Slot::Ready { stale: true, .. } => None,
                };
                match joined {
                    Some(load) => {
                        tracing::debug!(key = %key, "joining in-flight load");
                        load
                    }
                    None => {
                        tracing::debug!(key = %key, "reloading stale entry");
                        let (id, load) = self.spawn_load(&key, loader());
                        occupied.insert(Slot::Loading {
                            id,
                            load: load.clone(),
                        });
                        load
                    }
                }
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(key = %key, "loading");
                let (id, load) = self.spawn_load(&key, loader());
                vacant.insert(Slot::Loading {
                    id,
                    load: load.clone(),
                });
                load
            }
        };

        load.await
    }

    /// Typed variant of [`fetch`](Self::fetch).
    pub async fn fetch_as<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<T, VerifyError>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, VerifyError>> + Send + 'static,
    {
        let value = self.fetch(key, loader).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Store a fresh value, replacing whatever the key held.
    pub fn insert(&self, key: QueryKey, value: Value) {
        self.entries.insert(
            key,
            Slot::Ready {
                value,
                stale: false,
            },
        );
    }

    /// Mark `key` stale so the next `fetch` reloads it.
    ///
    /// The value itself is left untouched. A load still running for the key
    /// is detached: its callers get their result, but it is not stored.
    /// Invalidating an absent key does nothing.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Entry::Occupied(mut occupied) = self.entries.entry(key.clone()) {
            match occupied.get_mut() {
                Slot::Ready { stale, .. } => *stale = true,
                Slot::Loading { .. } => {
                    occupied.remove();
                }
            }
            tracing::debug!(key = %key, "invalidated");
        }
    }

    /// Settled entry for `key`, if any. `None` while a load is running.
    pub fn peek(&self, key: &QueryKey) -> Option<CachedEntry> {
        match self.entries.get(key)?.value() {
            Slot::Ready { value, stale } => Some(CachedEntry {
                value: value.clone(),
                stale: *stale,
            }),
            Slot::Loading { .. } => None,
        }
    }

    pub fn is_loading(&self, key: &QueryKey) -> bool {
        matches!(
            self.entries.get(key).as_deref(),
            Some(Slot::Loading { .. })
        )
    }

    /// Run `load` on its own task, which settles the slot tagged `id` when
    /// it finishes. Callers share the task's output.
    fn spawn_load<Fut>(&self, key: &QueryKey, load: Fut) -> (u64, SharedLoad)
    where
        Fut: Future<Output = Result<Value, VerifyError>> + Send + 'static,
    {
        let id = self.next_load.fetch_add(1, Ordering::Relaxed);
        let entries = Arc::clone(&self.entries);
        let settle_key = key.clone();

        let task = tokio::spawn(async move {
            let result = load.await;
            settle(&entries, settle_key, id, &result);
            result
        });

        let shared = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(VerifyError::Client(format!("cache load task failed: {e}"))),
            }
        }
        .boxed()
        .shared();
        (id, shared)
    }
}

/// Replace the in-flight slot `id` with its result, unless the slot was
/// invalidated or replaced by a newer load in the meantime.
fn settle(entries: &Entries, key: QueryKey, id: u64, result: &Result<Value, VerifyError>) {
    if let Entry::Occupied(mut occupied) = entries.entry(key) {
        let current = matches!(occupied.get(), Slot::Loading { id: current, .. } if *current == id);
        if !current {
            return;
        }
        match result {
            Ok(value) => {
                occupied.insert(Slot::Ready {
                    value: value.clone(),
                    stale: false,
                });
            }
            Err(_) => {
                occupied.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: Value,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Value, VerifyError>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_load() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::Verification("ref-1".into());

        let (a, b, c) = tokio::join!(
            cache.fetch(key.clone(), counting_loader(&calls, json!(1))),
            cache.fetch(key.clone(), counting_loader(&calls, json!(2))),
            cache.fetch(key.clone(), counting_loader(&calls, json!(3))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), json!(1));
        assert_eq!(b.unwrap(), json!(1));
        assert_eq!(c.unwrap(), json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_is_served_from_cache() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(QueryKey::Cart, counting_loader(&calls, json!({"items": 2})))
            .await
            .unwrap();
        let second = cache
            .fetch(QueryKey::Cart, counting_loader(&calls, json!({"items": 9})))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second, json!({"items": 2}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_marks_stale_and_next_fetch_reloads() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.insert(QueryKey::Orders, json!(["O1"]));

        cache.invalidate(&QueryKey::Orders);
        let entry = cache.peek(&QueryKey::Orders).unwrap();
        assert!(entry.stale);
        assert_eq!(entry.value, json!(["O1"]));

        let reloaded = cache
            .fetch(QueryKey::Orders, counting_loader(&calls, json!(["O1", "O2"])))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reloaded, json!(["O1", "O2"]));
        assert!(!cache.peek(&QueryKey::Orders).unwrap().stale);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = QueryCache::new();
        let key = QueryKey::Order("O1".into());

        let first = cache
            .fetch(key.clone(), || async {
                Err(VerifyError::Transport("down".into()))
            })
            .await;
        assert!(first.is_err());
        assert!(cache.peek(&key).is_none());
        assert!(!cache.is_loading(&key));

        let second = cache
            .fetch(key.clone(), || async { Ok(json!({"id": "O1"})) })
            .await
            .unwrap();
        assert_eq!(second, json!({"id": "O1"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_load_detaches_result() {
        let cache = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = {
            let cache = Arc::clone(&cache);
            let loader = counting_loader(&calls, json!("old"));
            tokio::spawn(async move { cache.fetch(QueryKey::Cart, loader).await })
        };
        tokio::task::yield_now().await;
        assert!(cache.is_loading(&QueryKey::Cart));

        cache.invalidate(&QueryKey::Cart);
        assert_eq!(pending.await.unwrap().unwrap(), json!("old"));
        assert!(cache.peek(&QueryKey::Cart).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_completes_after_every_caller_is_gone() {
        let cache = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::Verification("ref-abandoned".into());

        let caller = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            let loader = counting_loader(&calls, json!({"verified": true}));
            tokio::spawn(async move { cache.fetch(key, loader).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.is_loading(&key));
        caller.abort();

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!cache.is_loading(&key));
        let entry = cache.peek(&key).expect("abandoned load should be stored");
        assert!(!entry.stale);
        assert_eq!(entry.value, json!({"verified": true}));

        let again = cache
            .fetch(key.clone(), counting_loader(&calls, json!("unused")))
            .await
            .unwrap();
        assert_eq!(again, json!({"verified": true}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalidate_absent_key_is_noop() {
        let cache = QueryCache::new();
        cache.invalidate(&QueryKey::Cart);
        assert!(cache.peek(&QueryKey::Cart).is_none());
    }

    #[tokio::test]
    async fn test_fetch_as_decodes() {
        let cache = QueryCache::new();
        cache.insert(QueryKey::Orders, json!(["O1", "O2"]));
        let orders: Vec<String> = cache
            .fetch_as(QueryKey::Orders, || async { Ok(Value::Null) })
            .await
            .unwrap();
        assert_eq!(orders, vec!["O1".to_string(), "O2".to_string()]);

        let bad: Result<Vec<u32>, _> = cache
            .fetch_as(QueryKey::Orders, || async { Ok(Value::Null) })
            .await;
        assert!(matches!(bad, Err(VerifyError::Decode(_))));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(QueryKey::Verification("r1".into()).to_string(), "verification/r1");
        assert_eq!(QueryKey::Order("O1".into()).to_string(), "orders/O1");
        assert_eq!(QueryKey::Orders.to_string(), "orders");
        assert_eq!(QueryKey::Cart.to_string(), "cart");
    }
}
