use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::sync::Notify;

enum Slot<V> {
    /// A leader is computing the value, waiters park on the notify.
    Pending(Arc<Notify>),
    Ready {
        stored_at: Instant,
        value: V,
    },
}

/// Deduplicating TTL cache for async loaders.
///
/// Concurrent calls for the same key share a single in-flight computation:
/// the first caller becomes the leader and runs the loader, everyone else
/// waits for it to finish. A failed leader evicts the key so one of the
/// waiters takes over. Successful values expire after the TTL and are then
/// treated as misses.
///
/// One instance covers one loader call-site. Wrap an instance in [`Arc`] to
/// coordinate keys across several call-sites.
#[derive(Debug)]
pub struct Cache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<V> std::fmt::Debug for Slot<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Pending(_) => write!(f, "Pending"),
            Slot::Ready { .. } => write!(f, "Ready"),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_fill<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            let wait = {
                let mut slots = self.slots.lock().unwrap();
                match slots.get(&key) {
                    Some(Slot::Ready { stored_at, value }) if stored_at.elapsed() < self.ttl => {
                        return Ok(value.clone());
                    }
                    Some(Slot::Pending(notify)) => Some(notify.clone()),
                    _ => {
                        slots.insert(key.clone(), Slot::Pending(Arc::new(Notify::new())));
                        None
                    }
                }
            };

            let Some(notify) = wait else {
                return self.fill(key, loader().await);
            };

            let notified = notify.notified();
            tokio::pin!(notified);
            // Register interest first, then re-check: the leader may have
            // finished between the lock release and this point.
            notified.as_mut().enable();
            let leader_done = {
                let slots = self.slots.lock().unwrap();
                !matches!(slots.get(&key), Some(Slot::Pending(_)))
            };
            if !leader_done {
                notified.await;
            }
            // The leader either stored a value or failed and removed the
            // key, re-reading decides which.
        }
    }

    fn fill<E>(&self, key: K, result: Result<V, E>) -> Result<V, E> {
        let mut slots = self.slots.lock().unwrap();
        let previous = match &result {
            Ok(value) => slots.insert(
                key,
                Slot::Ready {
                    stored_at: Instant::now(),
                    value: value.clone(),
                },
            ),
            Err(_) => slots.remove(&key),
        };
        if let Some(Slot::Pending(notify)) = previous {
            notify.notify_waiters();
        }
        result
    }

}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::task::JoinSet;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let cache = Arc::new(Cache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = JoinSet::new();
        for _ in 0..50 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.spawn(async move {
                cache
                    .get_or_fill("key", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok::<_, std::convert::Infallible>(42)
                        }
                    })
                    .await
                    .unwrap()
            });
        }
        while let Some(res) = handles.join_next().await {
            assert_eq!(res.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_value_is_reloaded() {
        let cache: Cache<&str, u32> = Cache::new(Duration::from_millis(5));
        let calls = AtomicUsize::new(0);
        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(1)
        };
        cache.get_or_fill("key", load).await.unwrap();
        cache.get_or_fill("key", load).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.get_or_fill("key", load).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_elects_a_new_leader() {
        let cache = Arc::new(Cache::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = cache.get_or_fill("key", || async { Err("boom") }).await;
        assert!(failing.is_err());

        let ok = cache
            .get_or_fill("key", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &str>(7)
                }
            })
            .await;
        assert_eq!(ok.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

}
