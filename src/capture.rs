//! Copy interception for the vehicle console.
//!
//! The console shows the area map version only behind a "Copy" control.
//! Instead of hijacking a global clipboard, the control is handed a
//! one-shot [`ClipboardSink`] and the captured text is returned to the
//! caller.

use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

use crate::error::{ScanError, ScanResult};

/// Bounded retry schedule for waiting on page controls
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// First delay between lookups
    pub interval: Duration,
    /// Upper bound for a single delay
    pub max_interval: Duration,
    /// Growth factor applied after every failed lookup
    pub multiplier: f64,
    /// Overall deadline
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            multiplier: 1.5,
            timeout: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.interval.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(delay as u64)
    }
}

/// Write end of an intercepted clipboard, usable once
#[derive(Debug)]
pub struct ClipboardSink {
    tx: oneshot::Sender<String>,
}

impl ClipboardSink {
    pub fn write_text(self, text: impl Into<String>) {
        // Receiver gone means the capture already gave up
        let _ = self.tx.send(text.into());
    }
}

/// A page-native control that copies something when clicked
#[async_trait]
pub trait CopyControl: Send + Sync {
    async fn click(&self, clipboard: ClipboardSink) -> ScanResult<()>;
}

/// Finds copy controls on the current page
#[async_trait]
pub trait CopyControlLocator: Send + Sync {
    /// All controls currently present, in document order
    async fn find_all(&self) -> Vec<Arc<dyn CopyControl>>;
}

/// Poll until a control shows up and return the last one on the page.
///
/// The lookup future is dropped on timeout, so no sleep outlives the call.
pub async fn wait_for_control(
    locator: &dyn CopyControlLocator,
    policy: &PollPolicy,
) -> ScanResult<Arc<dyn CopyControl>> {
    let poll = async {
        let mut attempt = 0u32;
        loop {
            if let Some(control) = locator.find_all().await.pop() {
                debug!("Copy control found after {} attempt(s)", attempt + 1);
                return control;
            }
            sleep(policy.delay_for_attempt(attempt)).await;
            attempt = attempt.saturating_add(1);
        }
    };

    timeout(policy.timeout, poll).await.map_err(|_| ScanError::CopyControlTimeout(policy.timeout))
}

/// Click `control` and return what it wrote to the clipboard.
///
/// The click and the clipboard write share one deadline.
pub async fn capture_copied_text(
    control: &dyn CopyControl,
    policy: &PollPolicy,
) -> ScanResult<String> {
    let (tx, rx) = oneshot::channel();
    let capture = async {
        control.click(ClipboardSink { tx }).await?;
        rx.await.map_err(|_| ScanError::NothingCopied)
    };

    match timeout(policy.timeout, capture).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Clipboard write did not arrive within {:?}", policy.timeout);
            Err(ScanError::NothingCopied)
        }
    }
}

/// Wait for the last copy control, click it, and return the copied text
pub async fn capture_from_page(
    locator: &dyn CopyControlLocator,
    policy: &PollPolicy,
) -> ScanResult<String> {
    let control = wait_for_control(locator, policy).await?;
    capture_copied_text(control.as_ref(), policy).await
}

/// Control that copies a fixed value
#[derive(Debug, Clone)]
pub struct StaticCopyControl {
    value: String,
}

impl StaticCopyControl {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

#[async_trait]
impl CopyControl for StaticCopyControl {
    async fn click(&self, clipboard: ClipboardSink) -> ScanResult<()> {
        clipboard.write_text(self.value.clone());
        Ok(())
    }
}

/// Locator over controls that are already present
#[derive(Default, Clone)]
pub struct ReadyControls {
    controls: Vec<Arc<dyn CopyControl>>,
}

impl ReadyControls {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(control: impl CopyControl + 'static) -> Self {
        Self { controls: vec![Arc::new(control)] }
    }
}

#[async_trait]
impl CopyControlLocator for ReadyControls {
    async fn find_all(&self) -> Vec<Arc<dyn CopyControl>> {
        self.controls.clone()
    }
}

/// Control backed by a file written by another process (e.g. a clipboard dump)
#[derive(Debug, Clone)]
pub struct FileCopyControl {
    path: PathBuf,
}

#[async_trait]
impl CopyControl for FileCopyControl {
    async fn click(&self, clipboard: ClipboardSink) -> ScanResult<()> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ScanError::CopyControl(format!("{}: {}", self.path.display(), e)))?;
        clipboard.write_text(content.trim());
        Ok(())
    }
}

/// Locator that sees a control once the file exists
#[derive(Debug, Clone)]
pub struct FileCopyLocator {
    path: PathBuf,
}

impl FileCopyLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CopyControlLocator for FileCopyLocator {
    async fn find_all(&self) -> Vec<Arc<dyn CopyControl>> {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => vec![Arc::new(FileCopyControl { path: self.path.clone() })],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn quick_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            multiplier: 2.0,
            timeout: Duration::from_millis(300),
        }
    }

    /// Locator whose control appears after a number of lookups
    struct AppearsLater {
        lookups: AtomicUsize,
        after: usize,
    }

    #[async_trait]
    impl CopyControlLocator for AppearsLater {
        async fn find_all(&self) -> Vec<Arc<dyn CopyControl>> {
            let seen = self.lookups.fetch_add(1, Ordering::SeqCst);
            if seen >= self.after {
                vec![
                    Arc::new(StaticCopyControl::new("first")),
                    Arc::new(StaticCopyControl::new("last")),
                ]
            } else {
                Vec::new()
            }
        }
    }

    struct SilentControl;

    #[async_trait]
    impl CopyControl for SilentControl {
        async fn click(&self, _clipboard: ClipboardSink) -> ScanResult<()> {
            Ok(())
        }
    }

    /// Control whose click never completes
    struct StuckControl;

    #[async_trait]
    impl CopyControl for StuckControl {
        async fn click(&self, _clipboard: ClipboardSink) -> ScanResult<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[test]
    fn test_delay_backoff_is_capped() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(150));
        assert_eq!(policy.delay_for_attempt(20), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_picks_last_control_after_retries() {
        let locator = AppearsLater { lookups: AtomicUsize::new(0), after: 3 };
        let text = capture_from_page(&locator, &quick_policy()).await.unwrap();
        assert_eq!(text, "last");
        assert_eq!(locator.lookups.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_wait_times_out_without_control() {
        let policy = quick_policy();
        let started = Instant::now();
        let result = wait_for_control(&ReadyControls::none(), &policy).await;
        assert!(matches!(result, Err(ScanError::CopyControlTimeout(t)) if t == policy.timeout));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_control_that_never_copies() {
        let result = capture_copied_text(&SilentControl, &quick_policy()).await;
        assert!(matches!(result, Err(ScanError::NothingCopied)));
    }

    #[tokio::test]
    async fn test_stuck_click_respects_deadline() {
        let policy = PollPolicy { timeout: Duration::from_millis(100), ..quick_policy() };
        let result = timeout(Duration::from_secs(2), capture_copied_text(&StuckControl, &policy))
            .await
            .expect("capture should give up within its own deadline");
        assert!(matches!(result, Err(ScanError::NothingCopied)));
    }

    #[tokio::test]
    async fn test_file_locator_waits_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipboard.txt");
        let staging = dir.path().join("clipboard.tmp");
        let target = path.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            tokio::fs::write(&staging, "  4c1b7e2a-version \n").await.unwrap();
            tokio::fs::rename(&staging, &target).await.unwrap();
        });

        let text = capture_from_page(&FileCopyLocator::new(&path), &quick_policy()).await.unwrap();
        assert_eq!(text, "4c1b7e2a-version");
    }
}
