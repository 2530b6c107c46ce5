//! Change notifications.
//!
//! Every successful mutation emits a [`ChangeEvent`] on the bus; clients
//! listen on `GET /api/events` (Server-Sent Events) and re-fetch whatever the
//! channel names. Sending with no subscribers is not an error.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{Stream, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::AppState;

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    TopicsChanged,
    FoldersChanged { topic_id: String },
    PapersChanged { folder_id: String },
    HighlightsChanged { paper_id: String },
    WritingProjectsChanged,
    WritingDocumentsChanged { project_id: String },
    SettingsChanged,
    SmartGroupsChanged,
    AnalysisCompleted { paper_id: String },
}

impl ChangeEvent {
    /// SSE event name.
    pub fn channel(&self) -> &'static str {
        match self {
            ChangeEvent::TopicsChanged => "topics-changed",
            ChangeEvent::FoldersChanged { .. } => "folders-changed",
            ChangeEvent::PapersChanged { .. } => "papers-changed",
            ChangeEvent::HighlightsChanged { .. } => "highlights-changed",
            ChangeEvent::WritingProjectsChanged => "writing-projects-changed",
            ChangeEvent::WritingDocumentsChanged { .. } => "writing-documents-changed",
            ChangeEvent::SettingsChanged => "settings-changed",
            ChangeEvent::SmartGroupsChanged => "smart-groups-changed",
            ChangeEvent::AnalysisCompleted { .. } => "analysis-completed",
        }
    }

    /// Id of the scope that changed, if the channel is scoped.
    pub fn key(&self) -> Option<&str> {
        match self {
            ChangeEvent::FoldersChanged { topic_id } => Some(topic_id),
            ChangeEvent::PapersChanged { folder_id } => Some(folder_id),
            ChangeEvent::HighlightsChanged { paper_id }
            | ChangeEvent::AnalysisCompleted { paper_id } => Some(paper_id),
            ChangeEvent::WritingDocumentsChanged { project_id } => Some(project_id),
            ChangeEvent::TopicsChanged
            | ChangeEvent::WritingProjectsChanged
            | ChangeEvent::SettingsChanged
            | ChangeEvent::SmartGroupsChanged => None,
        }
    }

    pub fn to_json(&self) -> String {
        json!({ "channel": self.channel(), "key": self.key() }).to_string()
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: ChangeEvent) {
        tracing::debug!(channel = event.channel(), key = ?event.key(), "change event");
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

/// GET /api/events
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("SSE subscriber connected");
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|result| async move {
        match result {
            Ok(event) => Some(Ok(Event::default().event(event.channel()).data(event.to_json()))),
            Err(BroadcastStreamRecvError::Lagged(count)) => {
                tracing::warn!(count, "SSE subscriber lagged, events dropped");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("heartbeat"),
    )
}
