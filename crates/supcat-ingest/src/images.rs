//! Image-fetch work queue.
//!
//! The runner hands each `(catalog product, image url)` pair to an
//! [`ImageDispatcher`] with a non-blocking `try_send`. A single
//! [`ImageFetchWorker`] drains the bounded queue, calls the downstream
//! image-fetch endpoint with its own retry budget, and records every task's
//! final state in the store. Nothing here reports back to the ingest run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use supcat_core::AppConfig;
use supcat_db::IngestStore;
use supcat_sources::{HttpFetcher, SourceError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub id: Uuid,
    pub catalog_product_id: Uuid,
    pub image_url: String,
}

/// Sending half of the image queue. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ImageDispatcher {
    sender: Option<mpsc::Sender<ImageTask>>,
}

impl ImageDispatcher {
    /// A dispatcher that drops every task.
    #[must_use]
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// A dispatcher plus the receiving end of a queue bounded at `capacity`.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ImageTask>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Enqueue a task without waiting. Returns `false` when it was dropped.
    pub fn dispatch(&self, catalog_product_id: Uuid, image_url: &str) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        let task = ImageTask {
            id: Uuid::new_v4(),
            catalog_product_id,
            image_url: image_url.to_string(),
        };
        match sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                tracing::warn!(
                    catalog_product_id = %task.catalog_product_id,
                    image_url = %task.image_url,
                    "image queue full, dropping task"
                );
                false
            }
            Err(TrySendError::Closed(task)) => {
                tracing::warn!(
                    catalog_product_id = %task.catalog_product_id,
                    "image worker stopped, dropping task"
                );
                false
            }
        }
    }
}

/// Performs one downstream image-fetch call.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, task: &ImageTask) -> Result<(), SourceError>;
}

/// POSTs `{catalog_product_id, image_url}` to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: HttpFetcher,
    endpoint: String,
}

impl HttpImageFetcher {
    #[must_use]
    pub fn new(http: HttpFetcher, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, task: &ImageTask) -> Result<(), SourceError> {
        let body = json!({
            "catalog_product_id": task.catalog_product_id,
            "image_url": task.image_url,
        });
        self.http.post_json(&self.endpoint, &body).await
    }
}

pub struct ImageFetchWorker {
    store: Arc<dyn IngestStore>,
    fetcher: Arc<dyn ImageFetcher>,
    /// Attempts after the first failure.
    max_retries: u32,
    backoff_base: Duration,
}

impl ImageFetchWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn IngestStore>,
        fetcher: Arc<dyn ImageFetcher>,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            max_retries,
            backoff_base,
        }
    }

    /// Drain the queue until every dispatcher has been dropped.
    pub async fn run(self, mut receiver: mpsc::Receiver<ImageTask>) {
        while let Some(task) = receiver.recv().await {
            self.process(&task).await;
        }
        tracing::debug!("image queue closed, worker exiting");
    }

    /// Run one task to completion. Returns whether the fetch succeeded.
    pub async fn process(&self, task: &ImageTask) -> bool {
        if let Err(e) = self
            .store
            .record_image_task(task.id, task.catalog_product_id, &task.image_url)
            .await
        {
            tracing::warn!(task_id = %task.id, error = %e, "failed to record image task");
        }

        let mut attempts: u32 = 0;
        let mut last_error: Option<String> = None;
        let succeeded = loop {
            attempts += 1;
            match self.fetcher.fetch(task).await {
                Ok(()) => break true,
                Err(e) => {
                    last_error = Some(e.to_string());
                    if attempts > self.max_retries {
                        break false;
                    }
                    let delay = self
                        .backoff_base
                        .saturating_mul(1u32 << (attempts - 1).min(16));
                    tracing::debug!(
                        task_id = %task.id,
                        attempts,
                        error = %e,
                        "image fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        if succeeded {
            last_error = None;
        } else {
            tracing::warn!(
                task_id = %task.id,
                image_url = %task.image_url,
                attempts,
                error = last_error.as_deref().unwrap_or(""),
                "image fetch gave up"
            );
        }

        let attempts = i32::try_from(attempts).unwrap_or(i32::MAX);
        if let Err(e) = self
            .store
            .finish_image_task(task.id, succeeded, attempts, last_error.as_deref())
            .await
        {
            tracing::warn!(task_id = %task.id, error = %e, "failed to record image task outcome");
        }
        succeeded
    }
}

/// Start the image queue described by the config.
///
/// Without `SUPCAT_IMAGE_FETCH_URL` the returned dispatcher is disabled and no
/// worker is spawned. Otherwise dropping every clone of the dispatcher lets
/// the worker drain the queue and exit; await the handle to wait for that.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the HTTP client cannot be built.
pub fn start_image_queue(
    store: Arc<dyn IngestStore>,
    config: &AppConfig,
) -> Result<(ImageDispatcher, Option<JoinHandle<()>>), SourceError> {
    let Some(endpoint) = config.image_fetch_url.as_deref() else {
        tracing::info!("SUPCAT_IMAGE_FETCH_URL not set, image dispatch disabled");
        return Ok((ImageDispatcher::disabled(), None));
    };

    // The worker owns retries; the transport makes single attempts.
    let http = HttpFetcher::new(config.http_timeout_secs, &config.http_user_agent, 0, 0)?;
    let worker = ImageFetchWorker::new(
        store,
        Arc::new(HttpImageFetcher::new(http, endpoint)),
        config.image_fetch_max_retries,
        Duration::from_secs(config.http_retry_backoff_base_secs),
    );

    let (dispatcher, receiver) = ImageDispatcher::channel(config.image_queue_capacity);
    let handle = tokio::spawn(worker.run(receiver));
    tracing::info!(
        endpoint,
        capacity = config.image_queue_capacity,
        "image fetch worker started"
    );
    Ok((dispatcher, Some(handle)))
}
