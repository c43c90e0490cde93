//! Process-wide resources shared read-only by every verification.
//!
//! The HTTP client and the grid worker pool are built lazily on first use and
//! live until [`SharedResources::teardown`] is called. Initialization runs under
//! a mutex, so concurrent first callers cannot build the set twice. Callers keep
//! an `Arc` for the length of one call; teardown only drops the cached handle,
//! and in-flight calls finish with the handle they already hold.

use std::sync::{Arc, Mutex};

use rayon::{ThreadPool, ThreadPoolBuilder};

static SHARED: Mutex<Option<Arc<SharedResources>>> = Mutex::new(None);

const USER_AGENT: &str = concat!("cabinet-verify/", env!("CARGO_PKG_VERSION"));

/// Resources reused across calls.
pub struct SharedResources {
    http: Option<reqwest::Client>,
    pool: Option<ThreadPool>,
}

impl SharedResources {
    /// Return the process-wide instance, building it on first use.
    pub fn acquire() -> Arc<SharedResources> {
        let mut slot = SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }

        let resources = Arc::new(Self::build());
        *slot = Some(Arc::clone(&resources));
        resources
    }

    /// Release the process-wide instance. The next `acquire` rebuilds it.
    pub fn teardown() {
        let mut slot = SHARED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.take().is_some() {
            tracing::info!("Shared verification resources released");
        }
    }

    /// Whether the process-wide instance is currently built.
    pub fn is_initialized() -> bool {
        SHARED
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    fn build() -> Self {
        tracing::info!("Initializing shared verification resources");

        let http = match reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("Failed to build HTTP client, URL sources are unavailable: {e}");
                None
            }
        };

        let pool = match ThreadPoolBuilder::new()
            .thread_name(|i| format!("cabinet-grid-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!("Failed to build grid worker pool, analyzing cells inline: {e}");
                None
            }
        };

        Self { http, pool }
    }

    /// The shared HTTP client, or `None` when it could not be built.
    pub fn http(&self) -> Option<&reqwest::Client> {
        self.http.as_ref()
    }

    /// Run `op` on the grid worker pool, or on the calling thread when no pool is available.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_is_shared_until_teardown() {
        let a = SharedResources::acquire();
        let b = SharedResources::acquire();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(SharedResources::is_initialized());

        // Held handles stay usable after teardown.
        SharedResources::teardown();
        assert_eq!(a.install(|| 2 + 2), 4);

        let c = SharedResources::acquire();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_missing_http_client_is_load_error() {
        let resources = SharedResources {
            http: None,
            pool: None,
        };
        let err = crate::decode::load_image(
            &crate::decode::ImageRef::url("http://127.0.0.1:9/reference.png"),
            &resources,
            std::time::Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "ImageLoadError");
        assert!(err.to_string().contains("HTTP client unavailable"), "got: {err}");

        // Cells still run, inline.
        assert_eq!(resources.install(|| 6 * 7), 42);
    }
}
