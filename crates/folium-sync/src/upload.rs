//! Serialized page image uploads.
//!
//! Files go up one at a time. Each takes the next order number only once the
//! previous upload succeeded, so two pages never share an order.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use folium_core::{AppEvent, EventBus, PartId, RemoteError, UploadEvent};
use folium_editor::PartCard;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp"];

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn is_image(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }
}

/// What the service returns for a stored page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub pk: PartId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail_uri: Option<String>,
    pub update_uri: String,
    pub delete_uri: String,
}

impl UploadReceipt {
    pub fn card(&self) -> PartCard {
        PartCard {
            pk: self.pk,
            title: self.title.clone(),
            thumbnail_uri: self.thumbnail_uri.clone(),
        }
    }
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn upload(&self, file: &UploadFile, order: u32) -> Result<UploadReceipt, RemoteError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub name: String,
    pub order: u32,
    pub result: Result<UploadReceipt, UploadError>,
}

pub struct UploadQueue<A: UploadApi> {
    api: Arc<A>,
    pending: VecDeque<UploadFile>,
    next_order: u32,
    max_size: u64,
    bus: Arc<EventBus>,
}

impl<A: UploadApi> UploadQueue<A> {
    /// `next_order` is the order the first uploaded page receives, usually
    /// the current page count.
    pub fn new(api: Arc<A>, next_order: u32, max_size: u64, bus: Arc<EventBus>) -> Self {
        Self {
            api,
            pending: VecDeque::new(),
            next_order,
            max_size,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_order(&self) -> u32 {
        self.next_order
    }

    /// Validates and queues a file. Rejected files never reach the service.
    pub fn enqueue(&mut self, file: UploadFile) -> Result<usize, UploadError> {
        if file.size() > self.max_size {
            return Err(UploadError::TooLarge {
                size: file.size(),
                name: file.name,
                max: self.max_size,
            });
        }
        if !file.is_image() {
            return Err(UploadError::UnsupportedType { name: file.name });
        }
        tracing::debug!("Queued {} ({} bytes)", file.name, file.size());
        self.pending.push_back(file);
        Ok(self.pending.len())
    }

    /// Uploads every queued file in order, waiting for each to finish
    /// before starting the next.
    pub async fn run(&mut self) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        while let Some(file) = self.pending.pop_front() {
            let order = self.next_order;
            self.publish(UploadEvent::Started {
                name: file.name.clone(),
                order,
            });
            let result = match self.api.upload(&file, order).await {
                Ok(receipt) => {
                    self.next_order += 1;
                    tracing::info!("Uploaded {} as part {}", file.name, receipt.pk);
                    self.publish(UploadEvent::Succeeded {
                        name: file.name.clone(),
                        remote_id: receipt.pk,
                    });
                    Ok(receipt)
                }
                Err(e) => {
                    tracing::warn!("Upload of {} failed: {}", file.name, e);
                    self.publish(UploadEvent::Failed {
                        name: file.name.clone(),
                        reason: e.to_string(),
                    });
                    Err(UploadError::from(e))
                }
            };
            outcomes.push(UploadOutcome {
                name: file.name,
                order,
                result,
            });
        }
        outcomes
    }

    fn publish(&self, event: UploadEvent) {
        self.bus.publish(AppEvent::Upload(event));
    }
}
