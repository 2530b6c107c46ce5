//! Debounced draft saving for writing documents.
//!
//! Each document has at most one pending save. A new draft replaces the
//! pending content and restarts the timer, so a burst of keystrokes becomes
//! one write of the last version.

use crate::error::Result;
use crate::events::{ChangeEvent, EventBus};
use crate::export::word_count;
use crate::models::{UpdateWritingDocumentInput, WritingDocument};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs a task after a quiet period. Scheduling again cancels the pending run.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    timer: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, timer: None }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Returns whether a run was still pending.
    pub fn cancel(&mut self) -> bool {
        match self.timer.take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInput {
    pub content: String,
    pub word_count: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftStatus {
    pub document_id: String,
    pub pending: bool,
    pub word_count: i32,
}

struct PendingDraft {
    generation: u64,
    content: String,
    word_count: i32,
    debouncer: Debouncer,
}

struct DraftState {
    next_generation: u64,
    pending: HashMap<String, PendingDraft>,
}

struct DraftInner {
    store: Store,
    events: EventBus,
    delay: Duration,
    state: Mutex<DraftState>,
}

#[derive(Clone)]
pub struct DraftSaver {
    inner: Arc<DraftInner>,
}

impl DraftSaver {
    pub fn new(store: Store, events: EventBus, delay: Duration) -> Self {
        Self {
            inner: Arc::new(DraftInner {
                store,
                events,
                delay,
                state: Mutex::new(DraftState {
                    next_generation: 0,
                    pending: HashMap::new(),
                }),
            }),
        }
    }

    /// Queue `draft` for `document_id`, replacing any pending draft.
    pub fn schedule(&self, document_id: &str, draft: DraftInput) -> Result<DraftStatus> {
        self.inner.store.get_document(document_id)?;
        let count = draft.word_count.unwrap_or_else(|| word_count(&draft.content));

        let mut state = self.inner.lock();
        state.next_generation += 1;
        let generation = state.next_generation;
        let delay = self.inner.delay;
        let entry = state
            .pending
            .entry(document_id.to_string())
            .or_insert_with(|| PendingDraft {
                generation,
                content: String::new(),
                word_count: 0,
                debouncer: Debouncer::new(delay),
            });
        entry.generation = generation;
        entry.content = draft.content;
        entry.word_count = count;

        let inner = Arc::clone(&self.inner);
        let id = document_id.to_string();
        entry.debouncer.schedule(async move {
            inner.fire(&id, generation);
        });

        tracing::debug!(document_id, generation, "draft scheduled");
        Ok(DraftStatus {
            document_id: document_id.to_string(),
            pending: true,
            word_count: count,
        })
    }

    /// Save the pending draft now. Returns `None` when nothing was pending.
    pub fn flush(&self, document_id: &str) -> Result<Option<WritingDocument>> {
        let pending = {
            let mut state = self.inner.lock();
            state.pending.remove(document_id)
        };
        match pending {
            Some(mut draft) => {
                draft.debouncer.cancel();
                self.inner.save(document_id, draft.content, draft.word_count).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Save every pending draft (shutdown).
    pub fn flush_all(&self) -> usize {
        let drained: Vec<(String, PendingDraft)> = {
            let mut state = self.inner.lock();
            state.pending.drain().collect()
        };
        let mut saved = 0;
        for (id, mut draft) in drained {
            draft.debouncer.cancel();
            match self.inner.save(&id, draft.content, draft.word_count) {
                Ok(_) => saved += 1,
                Err(e) => tracing::warn!(document_id = %id, error = %e, "failed to flush draft"),
            }
        }
        saved
    }

    pub fn is_pending(&self, document_id: &str) -> bool {
        self.inner.lock().pending.contains_key(document_id)
    }

    /// Forget a pending draft without saving it (document deleted).
    pub fn discard(&self, document_id: &str) {
        if let Some(mut draft) = self.inner.lock().pending.remove(document_id) {
            draft.debouncer.cancel();
        }
    }
}

impl DraftInner {
    fn lock(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Timer callback: save only if no newer draft replaced this one.
    fn fire(&self, document_id: &str, generation: u64) {
        let draft = {
            let mut state = self.lock();
            let current = state.pending.get(document_id).map(|p| p.generation) == Some(generation);
            if current {
                state.pending.remove(document_id)
            } else {
                None
            }
        };
        if let Some(draft) = draft {
            if let Err(e) = self.save(document_id, draft.content, draft.word_count) {
                tracing::warn!(document_id, error = %e, "autosave failed");
            }
        }
    }

    fn save(&self, document_id: &str, content: String, word_count: i32) -> Result<WritingDocument> {
        let doc = self.store.update_document(
            document_id,
            UpdateWritingDocumentInput {
                content: Some(content),
                word_count: Some(word_count),
                ..Default::default()
            },
        )?;
        tracing::debug!(document_id, word_count, "draft saved");
        self.events.emit(ChangeEvent::WritingDocumentsChanged {
            project_id: doc.project_id.clone(),
        });
        Ok(doc)
    }
}
