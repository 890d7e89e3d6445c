//! At-most-once execution of mutating requests
//!
//! Each key owns a `OnceCell`. The first request for a key runs the
//! operation inside the cell; concurrent duplicates wait on the same cell and
//! read the stored response. A failed operation leaves the cell empty, so
//! the next request with that key runs again.

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// Default lifetime of a stored response
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Response body plus whether it came from the store
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub body: Value,
    pub replayed: bool,
}

struct Entry {
    cell: Arc<OnceCell<Value>>,
    created: Instant,
}

pub struct IdempotencyGuard {
    ttl: Duration,
    entries: Mutex<FxHashMap<String, Entry>>,
}

impl IdempotencyGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Key scoped to a route and caller so tokens never collide across them
    pub fn key(route: &str, identity: &str, token: &str) -> String {
        format!("{route}|{identity}|{token}")
    }

    /// Run `op` unless a live response is already stored under `key`
    pub async fn execute<F, Fut, E>(&self, key: Option<&str>, op: F) -> Result<Outcome, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let Some(key) = key else {
            return op().await.map(|body| Outcome {
                body,
                replayed: false,
            });
        };

        let cell = self.claim(key);
        let mut executed = false;
        let body = cell
            .get_or_try_init(|| {
                executed = true;
                op()
            })
            .await?
            .clone();

        if !executed {
            tracing::debug!(key, "replaying stored response");
        }
        Ok(Outcome {
            body,
            replayed: !executed,
        })
    }

    /// Cell for `key`, created fresh if missing or expired
    fn claim(&self, key: &str) -> Arc<OnceCell<Value>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| now.duration_since(entry.created) < self.ttl);
        entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                cell: Arc::new(OnceCell::new()),
                created: now,
            })
            .cell
            .clone()
    }

    /// Live entries, including ones still executing
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_duplicate_key_runs_once() {
        let guard = IdempotencyGuard::default();
        let runs = AtomicU32::new(0);
        let counter = &runs;
        let op = move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, String>(json!({ "run": n }))
        };

        let first = guard.execute(Some("k"), op).await.unwrap();
        let second = guard.execute(Some("k"), op).await.unwrap();
        assert_eq!(first.body, second.body);
        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_key_always_runs() {
        let guard = IdempotencyGuard::default();
        let runs = AtomicU32::new(0);
        let counter = &runs;
        for _ in 0..3 {
            guard
                .execute(None, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Value::Null)
                })
                .await
                .unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(guard.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_not_stored() {
        let guard = IdempotencyGuard::default();
        let err = guard
            .execute(Some("k"), || async { Err::<Value, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");

        let retry = guard
            .execute(Some("k"), || async { Ok::<_, &str>(json!(1)) })
            .await
            .unwrap();
        assert!(!retry.replayed);
        assert_eq!(retry.body, json!(1));
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_serialize() {
        let guard = Arc::new(IdempotencyGuard::default());
        let runs = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = guard.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                guard
                    .execute(Some("shared"), move || async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        let n = runs.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(json!(n))
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut replays = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            assert_eq!(outcome.body, json!(0));
            if outcome.replayed {
                replays += 1;
            }
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(replays, 7);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let guard = IdempotencyGuard::new(Duration::from_millis(30));
        guard
            .execute(Some("k"), || async { Ok::<_, String>(json!("a")) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let again = guard
            .execute(Some("k"), || async { Ok::<_, String>(json!("b")) })
            .await
            .unwrap();
        assert!(!again.replayed);
        assert_eq!(again.body, json!("b"));
    }

    #[test]
    fn test_key_scoping() {
        assert_ne!(
            IdempotencyGuard::key("POST /a", "1", "t"),
            IdempotencyGuard::key("POST /a", "2", "t")
        );
    }
}
