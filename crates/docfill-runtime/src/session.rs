//! Interactive session state.
//!
//! A session holds the selected schema and model, the extracted document
//! text, the form and the last cost. At most one processing run is in
//! flight; a run that finishes after the user switched schema, document or
//! model, or cleared the form, is discarded instead of overwriting the newer
//! state.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use docfill_core::{Cost, FieldValue, FormState, SchemaOption};

use crate::document::TextExtractor;
use crate::pipeline::{ExtractionPipeline, ProcessingOutcome};
use crate::RuntimeError;

/// What happened to a completed run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Values were written to the form
    Applied(ProcessingOutcome),

    /// The session moved on while the run was in flight; nothing was written
    Stale,
}

#[derive(Debug)]
struct SessionState {
    schema: SchemaOption,
    model_id: String,
    document_text: Option<String>,
    form: FormState,
    last_cost: Option<Cost>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Result<Self, RuntimeError> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RuntimeError::RunInProgress)?;
        Ok(Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

pub struct Session {
    pipeline: Arc<ExtractionPipeline>,
    extractor: Arc<dyn TextExtractor>,
    state: Mutex<SessionState>,
    running: AtomicBool,
    generation: AtomicU64,
}

impl Session {
    pub fn new(
        pipeline: Arc<ExtractionPipeline>,
        extractor: Arc<dyn TextExtractor>,
        schema: SchemaOption,
        model_id: impl Into<String>,
    ) -> Self {
        let form = FormState::new(schema.fields.clone());
        Self {
            pipeline,
            extractor,
            state: Mutex::new(SessionState {
                schema,
                model_id: model_id.into(),
                document_text: None,
                form,
                last_cost: None,
            }),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Switch schema: the form is rebuilt with defaults and the cost reset.
    pub fn select_schema(&self, schema: SchemaOption) {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        state.form = FormState::new(schema.fields.clone());
        state.schema = schema;
        state.last_cost = None;
    }

    /// Switch model. A run started with the previous model is discarded.
    pub fn select_model(&self, model_id: impl Into<String>) {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        state.model_id = model_id.into();
    }

    /// Extract and keep the text of a document. On failure the previously
    /// loaded text stays in place.
    pub async fn load_document(&self, bytes: Vec<u8>) -> Result<usize, RuntimeError> {
        let extractor = self.extractor.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| RuntimeError::DocumentRead(e.to_string()))??;

        let chars = text.chars().count();
        self.replace_document(Some(text));
        Ok(chars)
    }

    /// Use already-extracted text.
    pub fn set_document_text(&self, text: impl Into<String>) {
        self.replace_document(Some(text.into()));
    }

    pub fn remove_document(&self) {
        self.replace_document(None);
    }

    fn replace_document(&self, text: Option<String>) {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        state.document_text = text;
    }

    /// Reset the form to defaults and forget the last cost. The document
    /// stays loaded.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        state.form.clear();
        state.last_cost = None;
    }

    /// Record a user edit in the form.
    pub fn set_value(&self, name: &str, value: FieldValue) -> Result<(), RuntimeError> {
        self.state.lock().form.set_value(name, value)?;
        Ok(())
    }

    /// Run an extraction with the current document, schema and model.
    ///
    /// Fails with `RunInProgress` while another run is in flight and with
    /// `NoDocument` before a document is loaded. On failure the form and
    /// cost keep their previous values.
    pub async fn process(&self) -> Result<RunOutcome, RuntimeError> {
        let _guard = RunGuard::acquire(&self.running)?;

        let (text, fields, model_id, generation) = {
            let state = self.state.lock();
            let text = state.document_text.clone().ok_or(RuntimeError::NoDocument)?;
            (
                text,
                state.schema.fields.clone(),
                state.model_id.clone(),
                self.generation.load(Ordering::Acquire),
            )
        };

        let outcome = self.pipeline.run(&text, &fields, &model_id).await?;

        let mut state = self.state.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::warn!(model = %model_id, "session changed during run, discarding result");
            return Ok(RunOutcome::Stale);
        }

        state.form.apply(&outcome.validation);
        state.last_cost = Some(outcome.cost);
        Ok(RunOutcome::Applied(outcome))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn form(&self) -> FormState {
        self.state.lock().form.clone()
    }

    pub fn last_cost(&self) -> Option<Cost> {
        self.state.lock().last_cost
    }

    pub fn document_text(&self) -> Option<String> {
        self.state.lock().document_text.clone()
    }

    pub fn schema(&self) -> SchemaOption {
        self.state.lock().schema.clone()
    }

    pub fn model_id(&self) -> String {
        self.state.lock().model_id.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pipeline", &self.pipeline)
            .field("running", &self.is_running())
            .field("generation", &self.generation.load(Ordering::Acquire))
            .finish()
    }
}
