//! Out-of-band server notifications and the alerts shown for them.

use std::collections::HashSet;
use std::sync::Arc;

use folium_core::{Alert, AlertLevel, AppEvent, EventBus, PartId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NotificationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Ongoing,
    Done,
    Error,
    Canceled,
}

/// Message pushed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A background process on one part changed state.
    PartStatus {
        part: PartId,
        #[serde(default)]
        title: Option<String>,
        process: String,
        status: TaskStatus,
    },
    /// Progress of a document import.
    Import {
        document: u64,
        status: TaskStatus,
        #[serde(default)]
        progress: Option<u32>,
    },
    /// Free text from the service.
    Message { level: AlertLevel, text: String },
}

impl ServerMessage {
    pub fn parse(json: &str) -> Result<Self, NotificationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Alert to show, if the message warrants one. Progress updates don't.
    pub fn to_alert(&self) -> Option<Alert> {
        match self {
            ServerMessage::PartStatus {
                part,
                title,
                process,
                status,
            } => {
                let name = title.clone().unwrap_or_else(|| format!("part {part}"));
                let process = capitalize(process);
                match status {
                    TaskStatus::Done => Some(Alert::new(
                        AlertLevel::Success,
                        format!("{process} of {name} finished"),
                    )),
                    TaskStatus::Error => Some(Alert::error(format!("{process} of {name} failed"))),
                    TaskStatus::Canceled => Some(Alert::new(
                        AlertLevel::Warning,
                        format!("{process} of {name} was canceled"),
                    )),
                    TaskStatus::Queued | TaskStatus::Ongoing => None,
                }
            }
            ServerMessage::Import { status, .. } => match status {
                TaskStatus::Done => Some(Alert::new(AlertLevel::Success, "Import finished")),
                TaskStatus::Error => Some(Alert::error("Import failed")),
                _ => None,
            },
            ServerMessage::Message { level, text } => Some(Alert::new(*level, text.clone())),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Active alerts of a session.
pub struct AlertCenter {
    alerts: Vec<Alert>,
    seen: HashSet<Uuid>,
    bus: Arc<EventBus>,
}

impl AlertCenter {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            alerts: Vec::new(),
            seen: HashSet::new(),
            bus,
        }
    }

    pub fn active(&self) -> &[Alert] {
        &self.alerts
    }

    /// Shows an alert and announces it on the bus.
    pub fn push(&mut self, alert: Alert) -> Uuid {
        let id = alert.id;
        tracing::info!("Alert [{:?}] {}", alert.level, alert.message);
        self.seen.insert(id);
        self.bus.publish(AppEvent::Alert(alert.clone()));
        self.alerts.push(alert);
        id
    }

    /// Records an alert that was already published elsewhere. Alerts seen
    /// before, including dismissed ones, are ignored.
    pub fn track(&mut self, alert: Alert) {
        if self.seen.insert(alert.id) {
            self.alerts.push(alert);
        }
    }

    /// Parses a server message and shows its alert, if any.
    pub fn receive(&mut self, json: &str) -> Result<Option<Uuid>, NotificationError> {
        let message = ServerMessage::parse(json)?;
        tracing::debug!("Server message: {:?}", message);
        Ok(message.to_alert().map(|alert| self.push(alert)))
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        match self.alerts.iter().position(|a| a.id == id) {
            Some(index) if self.alerts[index].dismissible => {
                self.alerts.remove(index);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.alerts.retain(|a| !a.dismissible);
    }
}
