//! Single-call page fetching on top of a rendering engine.

use crate::error::{Result, ScanError};
use crate::result::RenderedPage;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// A rendering engine. Each call owns whatever browser or connection it needs
/// and releases it before the returned future completes.
pub trait PageRenderer: Send + Sync {
    fn render(&self, url: &str) -> impl Future<Output = Result<RenderedPage>> + Send;

    /// How long past the fetch deadline the renderer may still need to shut
    /// its engine down after giving up on a page.
    fn release_grace(&self) -> Duration {
        Duration::ZERO
    }
}

/// Runs blocking engine work on the blocking pool under `timeout`.
///
/// When the deadline passes, the flag handed to `work` is raised and the call
/// waits for `work` to return, so whatever engine it owns is released before
/// `RenderTimeout` is reported. `work` should check the flag between steps.
pub async fn render_blocking<F>(url: &str, timeout: Duration, work: F) -> Result<RenderedPage>
where
    F: FnOnce(Arc<AtomicBool>) -> Result<RenderedPage> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let mut handle = tokio::task::spawn_blocking(move || work(flag));

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined?,
        Err(_) => {
            cancel.store(true, Ordering::SeqCst);
            debug!("Render of {} overran {:?}, waiting for the engine to stop", url, timeout);
            if let Err(e) = handle.await {
                warn!("Render worker for {} did not exit cleanly: {}", url, e);
            }
            Err(ScanError::RenderTimeout {
                url: url.to_string(),
                timeout,
            })
        }
    }
}

/// Bounds every render with a timeout.
pub struct PageFetcher<R> {
    renderer: R,
    timeout: Duration,
}

impl<R: PageRenderer> PageFetcher<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn fetch_page(&self, url: &str) -> Result<RenderedPage> {
        debug!("Fetching {}", url);
        let limit = self.timeout + self.renderer.release_grace();
        match tokio::time::timeout(limit, self.renderer.render(url)).await {
            Ok(page) => page,
            Err(_) => Err(ScanError::RenderTimeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowRenderer {
        delay: Duration,
    }

    impl PageRenderer for SlowRenderer {
        async fn render(&self, _url: &str) -> Result<RenderedPage> {
            tokio::time::sleep(self.delay).await;
            Ok(RenderedPage::new(vec!["https://cdn.test/x.js".to_string()], vec![]))
        }
    }

    struct BrokenRenderer;

    impl PageRenderer for BrokenRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage> {
            Err(ScanError::render(url, "connection refused"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_within_timeout() {
        let fetcher = PageFetcher::new(SlowRenderer {
            delay: Duration::from_secs(1),
        })
        .with_timeout(Duration::from_secs(5));

        let page = fetcher.fetch_page("https://a.test/").await.unwrap();
        assert_eq!(page.script_sources, vec!["https://cdn.test/x.js"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timeout() {
        let fetcher = PageFetcher::new(SlowRenderer {
            delay: Duration::from_secs(60),
        })
        .with_timeout(Duration::from_secs(5));

        match fetcher.fetch_page("https://a.test/").await {
            Err(ScanError::RenderTimeout { url, timeout }) => {
                assert_eq!(url, "https://a.test/");
                assert_eq!(timeout, Duration::from_secs(5));
            }
            other => panic!("expected a render timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_render_failure_passes_through() {
        let fetcher = PageFetcher::new(BrokenRenderer);
        let err = fetcher.fetch_page("https://a.test/").await.unwrap_err();
        assert!(matches!(err, ScanError::RenderFailure { .. }));
    }

    /// Flips `released` when the engine it stands for goes away.
    struct EngineGuard(Arc<AtomicBool>);

    impl Drop for EngineGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Holds an engine on a blocking thread until told to stop or `work` elapses.
    struct BlockingRenderer {
        work: Duration,
        deadline: Duration,
        released: Arc<AtomicBool>,
    }

    impl PageRenderer for BlockingRenderer {
        async fn render(&self, url: &str) -> Result<RenderedPage> {
            let released = self.released.clone();
            let work = self.work;
            render_blocking(url, self.deadline, move |cancel| {
                let _engine = EngineGuard(released);
                let started = std::time::Instant::now();
                while started.elapsed() < work {
                    if cancel.load(Ordering::SeqCst) {
                        return Ok(RenderedPage::default());
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(RenderedPage::new(vec!["https://cdn.test/x.js".to_string()], vec![]))
            })
            .await
        }

        fn release_grace(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    #[tokio::test]
    async fn test_blocking_render_releases_engine_before_timeout_error() {
        let released = Arc::new(AtomicBool::new(false));
        let fetcher = PageFetcher::new(BlockingRenderer {
            work: Duration::from_secs(10),
            deadline: Duration::from_millis(200),
            released: released.clone(),
        })
        .with_timeout(Duration::from_millis(200));

        let err = fetcher.fetch_page("https://a.test/").await.unwrap_err();

        assert!(matches!(err, ScanError::RenderTimeout { .. }));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_blocking_render_within_deadline() {
        let released = Arc::new(AtomicBool::new(false));
        let fetcher = PageFetcher::new(BlockingRenderer {
            work: Duration::from_millis(20),
            deadline: Duration::from_secs(5),
            released: released.clone(),
        });

        let page = fetcher.fetch_page("https://a.test/").await.unwrap();

        assert_eq!(page.script_sources, vec!["https://cdn.test/x.js"]);
        assert!(released.load(Ordering::SeqCst));
    }
}
