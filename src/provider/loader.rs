// src/provider/loader.rs
//! One-shot loading of the provider's script runtime

use crate::error::{MapError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Versioned endpoint serving the provider runtime
pub const DEFAULT_SCRIPT_URL: &str = "https://api-maps.yandex.ru/2.1/?load=package.map&lang=ru-RU";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where scripts get inserted and run
pub trait ScriptHost: Send + Sync {
    /// Insert a script element for `url`. Resolves once the script has
    /// loaded and the runtime's own ready signal fired; a script that
    /// fails to load leaves the future pending.
    fn load_script<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ()>;
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub url: String,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SCRIPT_URL.to_string(),
            timeout: None,
        }
    }
}

/// Process-wide handle for the provider runtime script.
///
/// Create one per process and share it behind an `Arc`; dropping the
/// last handle forgets the loaded state. The script is requested at most
/// once per successful load: concurrent callers wait on the same
/// in-flight load, and every call after it completes returns immediately.
pub struct ResourceLoader {
    config: LoaderConfig,
    host: Arc<dyn ScriptHost>,
    loaded: OnceCell<()>,
}

impl ResourceLoader {
    pub fn new(host: Arc<dyn ScriptHost>, config: LoaderConfig) -> Self {
        Self {
            config,
            host,
            loaded: OnceCell::new(),
        }
    }

    pub fn shared(host: Arc<dyn ScriptHost>, config: LoaderConfig) -> Arc<Self> {
        Arc::new(Self::new(host, config))
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Make sure the runtime is loaded.
    ///
    /// With a timeout configured a stalled load fails with
    /// [`MapError::LoaderTimeout`] and the next call starts a new load.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        self.loaded
            .get_or_try_init(|| async {
                info!(url = %self.config.url, "Loading map provider script");
                let load = self.host.load_script(&self.config.url);
                match self.config.timeout {
                    Some(timeout) => tokio::time::timeout(timeout, load)
                        .await
                        .map_err(|_| MapError::LoaderTimeout(timeout))?,
                    None => load.await,
                }
                debug!("Map provider runtime ready");
                Ok::<(), MapError>(())
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::headless::HeadlessScriptHost;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StalledHost {
        attempts: AtomicUsize,
    }

    impl ScriptHost for StalledHost {
        fn load_script<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, ()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let host = Arc::new(HeadlessScriptHost::with_latency(Duration::from_millis(20)));
        let loader = ResourceLoader::new(host.clone(), LoaderConfig::default());

        let (a, b, c, d) = tokio::join!(
            loader.ensure_loaded(),
            loader.ensure_loaded(),
            loader.ensure_loaded(),
            loader.ensure_loaded()
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
        assert_eq!(host.insertions(), 1);
        assert!(loader.is_loaded());
    }

    #[tokio::test]
    async fn test_loaded_resolves_without_side_effects() {
        let host = Arc::new(HeadlessScriptHost::new());
        let loader = ResourceLoader::new(host.clone(), LoaderConfig::default());

        loader.ensure_loaded().await.unwrap();
        loader.ensure_loaded().await.unwrap();
        loader.ensure_loaded().await.unwrap();

        assert_eq!(host.insertions(), 1);
        assert_eq!(host.urls(), vec![DEFAULT_SCRIPT_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_and_allows_retry() {
        let host = Arc::new(StalledHost {
            attempts: AtomicUsize::new(0),
        });
        let loader = ResourceLoader::new(
            host.clone(),
            LoaderConfig {
                timeout: Some(Duration::from_millis(10)),
                ..Default::default()
            },
        );

        let err = loader.ensure_loaded().await.unwrap_err();
        assert!(matches!(err, MapError::LoaderTimeout(_)));
        assert!(!loader.is_loaded());

        assert!(loader.ensure_loaded().await.is_err());
        assert_eq!(host.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_without_timeout_stays_pending() {
        let host = Arc::new(StalledHost {
            attempts: AtomicUsize::new(0),
        });
        let loader = ResourceLoader::new(host, LoaderConfig::default());

        let waited = tokio::time::timeout(Duration::from_millis(20), loader.ensure_loaded()).await;
        assert!(waited.is_err());
        assert!(!loader.is_loaded());
    }
}
