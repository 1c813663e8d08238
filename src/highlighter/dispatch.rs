//! Remote-first highlighting with a one-way circuit breaker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;

use super::local::LocalHighlighter;
use super::remote::{HighlightRequest, HttpTransport, Transport};
use super::{HighlightOptions, HighlightResult, Highlighter, ThemeSelection};
use crate::error::Result;

/// Records that the remote service is absent. Once tripped it stays tripped
/// for the lifetime of the breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    unavailable: AtomicBool,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            unavailable: AtomicBool::new(false),
        }
    }

    /// Process-wide breaker shared by every default highlighter
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<CircuitBreaker>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(CircuitBreaker::new())))
    }

    pub fn remote_available(&self) -> bool {
        !self.unavailable.load(Ordering::Acquire)
    }

    /// Mark the remote as unavailable; returns true on the first trip
    pub fn trip(&self) -> bool {
        !self.unavailable.swap(true, Ordering::AcqRel)
    }
}

/// Remote service first, local tokenizer once the service is known absent
pub struct DefaultHighlighter {
    transport: Arc<dyn Transport>,
    local: Arc<LocalHighlighter>,
    breaker: Arc<CircuitBreaker>,
}

impl std::fmt::Debug for DefaultHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHighlighter")
            .field("remote_available", &self.breaker.remote_available())
            .finish()
    }
}

impl DefaultHighlighter {
    /// HTTP transport to `endpoint`, sharing the process-wide breaker
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let transport = HttpTransport::new(endpoint, timeout)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            Arc::new(LocalHighlighter::new()),
            CircuitBreaker::global(),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        local: Arc<LocalHighlighter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            transport,
            local,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[async_trait]
impl Highlighter for DefaultHighlighter {
    async fn resolve(
        &self,
        code: &str,
        lang: &str,
        theme: &ThemeSelection,
        options: &HighlightOptions,
    ) -> HighlightResult {
        if !self.breaker.remote_available() {
            return self.local.resolve(code, lang, theme, options).await;
        }

        let request = HighlightRequest::new(code, lang, theme, options);
        match self.transport.fetch(&request).await {
            Ok(result) => result,
            Err(e) if e.is_unavailable() => {
                if self.breaker.trip() {
                    tracing::warn!("Remote highlighter not found, switching to local highlighting");
                }
                self.local.resolve(code, lang, theme, options).await
            }
            Err(e) => {
                tracing::warn!("Remote highlighting failed, passing code through: {}", e);
                HighlightResult::plain(code)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HighlightError;
    use std::sync::atomic::AtomicUsize;

    /// Fails every call with a fixed error kind and counts calls
    struct FailingTransport {
        calls: AtomicUsize,
        not_found: bool,
    }

    #[async_trait]
    impl Transport for FailingTransport {
        async fn fetch(&self, _request: &HighlightRequest) -> Result<HighlightResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.not_found {
                Err(HighlightError::TransportUnavailable)
            } else {
                Err(HighlightError::Status(500))
            }
        }
    }

    fn highlighter(not_found: bool) -> (DefaultHighlighter, Arc<FailingTransport>) {
        let transport = Arc::new(FailingTransport {
            calls: AtomicUsize::new(0),
            not_found,
        });
        let highlighter = DefaultHighlighter::with_transport(
            transport.clone(),
            Arc::new(LocalHighlighter::new()),
            Arc::new(CircuitBreaker::new()),
        );
        (highlighter, transport)
    }

    #[test]
    fn test_breaker_trips_once() {
        let breaker = CircuitBreaker::new();
        assert!(breaker.remote_available());
        assert!(breaker.trip());
        assert!(!breaker.trip());
        assert!(!breaker.remote_available());
    }

    #[tokio::test]
    async fn test_not_found_falls_back_and_stops_calling() {
        let (highlighter, transport) = highlighter(true);
        let theme = ThemeSelection::default();
        let options = HighlightOptions::default();

        let first = highlighter.resolve("fn a() {}", "rust", &theme, &options).await;
        assert!(!first.is_plain());
        assert!(!highlighter.breaker().remote_available());

        for _ in 0..3 {
            highlighter.resolve("fn a() {}", "rust", &theme, &options).await;
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_failures_pass_through() {
        let (highlighter, transport) = highlighter(false);
        let result = highlighter
            .resolve(
                "fn a() {}",
                "rust",
                &ThemeSelection::default(),
                &HighlightOptions::default(),
            )
            .await;
        assert_eq!(result, HighlightResult::plain("fn a() {}"));
        assert!(highlighter.breaker().remote_available());

        highlighter
            .resolve(
                "x",
                "rust",
                &ThemeSelection::default(),
                &HighlightOptions::default(),
            )
            .await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_global_breaker_is_shared() {
        assert!(Arc::ptr_eq(&CircuitBreaker::global(), &CircuitBreaker::global()));
    }
}
