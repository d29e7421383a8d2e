pub mod ftp;
pub mod teams;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Time allowed to establish a connection to a delivery target.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for a webhook request, or for one FTP socket read or write.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends a captured image to remote storage.
pub trait Uploader: Send + Sync + 'static {
    fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Announces a capture to people.
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        message: &str,
        image_url: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("FTP transfer failed: {0}")]
    Ftp(String),
    #[error("failed to read {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("webhook request failed: {0}")]
    Http(String),
    #[error("webhook returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("delivery task failed: {0}")]
    Join(String),
}

/// Everything the collaborators need to know about one capture.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub local_path: PathBuf,
    pub file_name: String,
    /// Motion location in full-image-space.
    pub image_xy: (u32, u32),
}

impl Delivery {
    pub fn message(&self) -> String {
        format!(
            "Motion detected at ({}, {}) - {}",
            self.image_xy.0, self.image_xy.1, self.file_name
        )
    }
}

/// Fans a capture out to the configured upload and notification targets.
///
/// Failures are logged and never retried; a missed delivery is dropped.
pub struct Dispatcher<U, N> {
    uploader: Option<Arc<U>>,
    notifier: Option<Arc<N>>,
    image_base_url: String,
    in_flight: Arc<AtomicUsize>,
}

/// Counts one running delivery task until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<U: Uploader, N: Notifier> Dispatcher<U, N> {
    pub fn new(uploader: Option<U>, notifier: Option<N>, image_base_url: String) -> Self {
        Self {
            uploader: uploader.map(Arc::new),
            notifier: notifier.map(Arc::new),
            image_base_url,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uploader.is_none() && self.notifier.is_none()
    }

    /// Deliveries spawned but not yet finished.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run delivery in the background so scanning can resume immediately.
    pub fn spawn(&self, delivery: Delivery) -> JoinHandle<()> {
        let uploader = self.uploader.clone();
        let notifier = self.notifier.clone();
        let image_url = format!("{}{}", self.image_base_url, delivery.file_name);
        let guard = InFlight::enter(&self.in_flight);
        tokio::spawn(async move {
            let _guard = guard;
            deliver(uploader.as_deref(), notifier.as_deref(), &delivery, &image_url).await;
        })
    }
}

async fn deliver<U: Uploader, N: Notifier>(
    uploader: Option<&U>,
    notifier: Option<&N>,
    delivery: &Delivery,
    image_url: &str,
) {
    if let Some(uploader) = uploader {
        match uploader
            .upload(&delivery.local_path, &delivery.file_name)
            .await
        {
            Ok(()) => info!(file = delivery.file_name, "uploaded capture"),
            Err(e) => {
                error!(error = %e, file = delivery.file_name, "upload failed, skipping notification");
                return;
            }
        }
    }

    if let Some(notifier) = notifier {
        match notifier.notify(&delivery.message(), image_url).await {
            Ok(()) => info!(file = delivery.file_name, image_url, "notification sent"),
            Err(e) => warn!(error = %e, file = delivery.file_name, "notification failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::{mpsc, Semaphore};

    /// Records uploads on a channel; fails when `fail` is set.
    pub struct RecordingUploader {
        pub tx: mpsc::UnboundedSender<(PathBuf, String)>,
        pub fail: bool,
    }

    impl Uploader for RecordingUploader {
        async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Ftp("connection refused".into()));
            }
            let _ = self.tx.send((local_path.to_path_buf(), remote_name.to_string()));
            Ok(())
        }
    }

    pub struct RecordingNotifier {
        pub tx: mpsc::UnboundedSender<(String, String)>,
    }

    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str, image_url: &str) -> Result<(), DeliveryError> {
            let _ = self.tx.send((message.to_string(), image_url.to_string()));
            Ok(())
        }
    }

    /// Holds each upload until a permit is added to `release`.
    struct GatedUploader {
        release: Arc<Semaphore>,
    }

    impl Uploader for GatedUploader {
        async fn upload(&self, _: &Path, _: &str) -> Result<(), DeliveryError> {
            self.release
                .acquire()
                .await
                .map_err(|e| DeliveryError::Join(e.to_string()))?
                .forget();
            Ok(())
        }
    }

    fn delivery() -> Delivery {
        Delivery {
            local_path: PathBuf::from("images/mo-7.jpg"),
            file_name: "mo-7.jpg".into(),
            image_xy: (640, 360),
        }
    }

    #[tokio::test]
    async fn uploads_then_notifies() {
        let (up_tx, mut up_rx) = mpsc::unbounded_channel();
        let (note_tx, mut note_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Some(RecordingUploader { tx: up_tx, fail: false }),
            Some(RecordingNotifier { tx: note_tx }),
            "https://cam.example.com/img/".into(),
        );

        dispatcher.spawn(delivery()).await.unwrap();

        let (path, remote) = up_rx.recv().await.unwrap();
        assert_eq!(path, PathBuf::from("images/mo-7.jpg"));
        assert_eq!(remote, "mo-7.jpg");
        let (message, url) = note_rx.recv().await.unwrap();
        assert_eq!(message, "Motion detected at (640, 360) - mo-7.jpg");
        assert_eq!(url, "https://cam.example.com/img/mo-7.jpg");
    }

    #[tokio::test]
    async fn failed_upload_skips_notification() {
        let (up_tx, _up_rx) = mpsc::unbounded_channel();
        let (note_tx, mut note_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Some(RecordingUploader { tx: up_tx, fail: true }),
            Some(RecordingNotifier { tx: note_tx }),
            String::new(),
        );

        dispatcher.spawn(delivery()).await.unwrap();
        drop(dispatcher);
        assert!(note_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn notifier_alone_still_runs() {
        let (note_tx, mut note_rx) = mpsc::unbounded_channel();
        let dispatcher: Dispatcher<RecordingUploader, _> =
            Dispatcher::new(None, Some(RecordingNotifier { tx: note_tx }), String::new());
        assert!(!dispatcher.is_empty());

        dispatcher.spawn(delivery()).await.unwrap();
        let (_, url) = note_rx.recv().await.unwrap();
        assert_eq!(url, "mo-7.jpg");
    }

    #[tokio::test]
    async fn pending_counts_unfinished_deliveries() {
        let release = Arc::new(Semaphore::new(0));
        let dispatcher: Dispatcher<_, RecordingNotifier> = Dispatcher::new(
            Some(GatedUploader {
                release: Arc::clone(&release),
            }),
            None,
            String::new(),
        );
        assert_eq!(dispatcher.pending(), 0);

        let first = dispatcher.spawn(delivery());
        let second = dispatcher.spawn(delivery());
        assert_eq!(dispatcher.pending(), 2);

        release.add_permits(2);
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn aborted_delivery_is_no_longer_pending() {
        let dispatcher: Dispatcher<_, RecordingNotifier> = Dispatcher::new(
            Some(GatedUploader {
                release: Arc::new(Semaphore::new(0)),
            }),
            None,
            String::new(),
        );

        let handle = dispatcher.spawn(delivery());
        assert_eq!(dispatcher.pending(), 1);
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(dispatcher.pending(), 0);
    }
}
