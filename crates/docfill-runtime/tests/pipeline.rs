//! End-to-end extraction tests against a scripted provider.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use docfill_core::{
    ComboOption, Field, FieldList, FieldType, FieldValidator, FieldValue, ModelDescriptor,
    SchemaOption, Usage,
};
use docfill_runtime::{
    ChatMessage, CompletionConfig, CompletionResponse, DocumentError, ExtractionPipeline,
    LlmProvider, ModelCatalog, ProviderError, RunOutcome, RuntimeError, Session, TextExtractor,
};

const MODEL: &str = "anthropic/claude-3-sonnet";

/// Replies with a fixed body, optionally waiting for a release signal first.
struct ScriptedProvider {
    reply: Mutex<Result<String, u16>>,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    fn replying(content: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(content.to_string())),
            gate: None,
            entered: Arc::new(Notify::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn gated(content: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(content)
        }
    }

    fn set_reply(&self, reply: Result<&str, u16>) {
        *self.reply.lock() = reply.map(str::to_string);
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.seen.lock().push(messages);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let reply = self.reply.lock().clone();
        match reply {
            Ok(content) => Ok(CompletionResponse {
                content,
                usage: Usage::new(1000, 500),
                model: config.model.clone(),
            }),
            Err(status) => Err(ProviderError::ApiError {
                status,
                message: "Insufficient credits".to_string(),
            }),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError> {
        Ok(vec![
            ModelDescriptor::new(MODEL).with_pricing("0.000003", "0.000015"),
            ModelDescriptor::new("free/unpriced"),
        ])
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        String::from_utf8(bytes.to_vec()).map_err(|e| DocumentError::Unreadable(e.to_string()))
    }
}

fn fields() -> FieldList {
    FieldList::new(vec![
        Field::new("city", FieldType::Text, "City"),
        Field::new("total", FieldType::Number, "Total"),
        Field::new("paid", FieldType::Checkbox, "Paid"),
        Field::new("kind", FieldType::Select, "Kind").with_select_options(["invoice", "receipt"]),
        Field::new("unit", FieldType::ComboBox, "Unit")
            .with_combo_options(vec![ComboOption::new("01", "Kilograms")]),
    ])
    .unwrap()
}

fn pipeline(provider: Arc<ScriptedProvider>) -> Arc<ExtractionPipeline> {
    let catalog = Arc::new(ModelCatalog::new(provider.clone(), Duration::from_secs(60)));
    Arc::new(ExtractionPipeline::new(
        provider,
        catalog,
        FieldValidator::default(),
        CompletionConfig::default(),
    ))
}

fn session(provider: Arc<ScriptedProvider>) -> Session {
    Session::new(
        pipeline(provider),
        Arc::new(PlainTextExtractor),
        SchemaOption::new("invoice", "Invoice", fields()),
        MODEL,
    )
}

const GOOD_REPLY: &str = r#"Sure! Here is the data:
```json
{"city": "Roma", "total": "42", "paid": "true", "kind": "Invoice", "unit": "01", "extra": 1}
```"#;

#[tokio::test]
async fn test_pipeline_run() {
    let provider = Arc::new(ScriptedProvider::replying(GOOD_REPLY));
    let outcome = pipeline(provider.clone())
        .run("Invoice from Roma, total 42", &fields(), MODEL)
        .await
        .unwrap();

    let values = &outcome.validation.values;
    assert_eq!(values.get("city"), Some(&FieldValue::Text("Roma".into())));
    assert_eq!(values.get("total"), Some(&FieldValue::Number(42.0)));
    assert_eq!(values.get("paid"), Some(&FieldValue::Bool(true)));
    assert_eq!(values.get("unit"), Some(&FieldValue::Text("01".into())));
    assert!(values.get("kind").is_none());
    assert!(values.get("extra").is_none());
    assert_eq!(outcome.validation.filled_count, 4);

    assert_eq!(outcome.usage, Usage::new(1000, 500));
    assert!((outcome.cost.total_cost - 0.0105).abs() < 1e-12);
    assert_eq!(outcome.model, MODEL);

    let seen = provider.seen.lock();
    assert_eq!(seen[0][0].role, "system");
    assert!(seen[0][1].content.contains("Invoice from Roma, total 42"));
    assert!(seen[0][1].content.contains("unit (combo box, options: [01:Kilograms])"));
}

#[tokio::test]
async fn test_pricing_checked_before_completion() {
    let provider = Arc::new(ScriptedProvider::replying(GOOD_REPLY));
    let err = pipeline(provider.clone())
        .run("text", &fields(), "free/unpriced")
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::PricingUnavailable { .. }));
    assert!(provider.seen.lock().is_empty());

    let err = pipeline(provider.clone())
        .run("text", &fields(), "vendor/unknown")
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::PricingUnavailable { .. }));
}

#[tokio::test]
async fn test_malformed_reply_aborts() {
    let provider = Arc::new(ScriptedProvider::replying("I could not find any data."));
    let err = pipeline(provider).run("text", &fields(), MODEL).await.unwrap_err();
    assert!(matches!(err, RuntimeError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_transport_error_keeps_status() {
    let provider = Arc::new(ScriptedProvider::replying("{}"));
    provider.set_reply(Err(402));

    let err = pipeline(provider).run("text", &fields(), MODEL).await.unwrap_err();
    assert_eq!(err.user_message(), "API Error: Insufficient credits (Status: 402)");
}

#[tokio::test]
async fn test_session_applies_results() {
    let session = session(Arc::new(ScriptedProvider::replying(GOOD_REPLY)));
    assert_eq!(session.load_document(b"Invoice from Roma".to_vec()).await.unwrap(), 17);

    let outcome = session.process().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Applied(_)));

    let form = session.form();
    assert_eq!(form.value("city"), Some(&FieldValue::Text("Roma".into())));
    assert_eq!(form.value("kind"), Some(&FieldValue::Text(String::new())));
    assert_eq!(form.filled_count(), 4);
    assert_eq!(form.total_fields(), 5);
    assert!(session.last_cost().is_some());
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_session_requires_document() {
    let session = session(Arc::new(ScriptedProvider::replying(GOOD_REPLY)));
    assert!(matches!(session.process().await, Err(RuntimeError::NoDocument)));
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_text() {
    let session = session(Arc::new(ScriptedProvider::replying(GOOD_REPLY)));
    session.set_document_text("first document");

    let err = session.load_document(Vec::new()).await.unwrap_err();
    assert_eq!(err.user_message(), "PDF Processing Error: PDF file is empty");
    assert_eq!(session.document_text().as_deref(), Some("first document"));
}

#[tokio::test]
async fn test_failed_run_keeps_previous_values() {
    let provider = Arc::new(ScriptedProvider::replying(GOOD_REPLY));
    let session = session(provider.clone());
    session.set_document_text("Invoice from Roma");
    session.process().await.unwrap();
    let before = session.form();
    let cost = session.last_cost();

    provider.set_reply(Ok("no json here"));
    assert!(session.process().await.is_err());

    assert_eq!(session.form(), before);
    assert_eq!(session.last_cost(), cost);
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_second_run_rejected_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(ScriptedProvider::gated(GOOD_REPLY, gate.clone()));
    let session = Arc::new(session(provider.clone()));
    session.set_document_text("Invoice from Roma");

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.process().await }
    });
    provider.entered.notified().await;

    assert!(session.is_running());
    assert!(matches!(session.process().await, Err(RuntimeError::RunInProgress)));

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Applied(_)));
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_schema_switch_discards_in_flight_result() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(ScriptedProvider::gated(GOOD_REPLY, gate.clone()));
    let session = Arc::new(session(provider.clone()));
    session.set_document_text("Invoice from Roma");

    let run = tokio::spawn({
        let session = session.clone();
        async move { session.process().await }
    });
    provider.entered.notified().await;

    let letter = FieldList::new(vec![Field::new("city", FieldType::Text, "City")]).unwrap();
    session.select_schema(SchemaOption::new("letter", "Letter", letter));

    gate.notify_one();
    let outcome = run.await.unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Stale));

    let form = session.form();
    assert_eq!(form.value("city"), Some(&FieldValue::Text(String::new())));
    assert_eq!(form.filled_count(), 0);
    assert!(session.last_cost().is_none());
}

#[tokio::test]
async fn test_document_swap_discards_in_flight_result() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(ScriptedProvider::gated(GOOD_REPLY, gate.clone()));
    let session = Arc::new(session(provider.clone()));
    session.set_document_text("Invoice from Roma");

    let run = tokio::spawn({
        let session = session.clone();
        async move { session.process().await }
    });
    provider.entered.notified().await;

    session.load_document(b"Receipt from Torino".to_vec()).await.unwrap();

    gate.notify_one();
    let outcome = run.await.unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Stale));

    assert_eq!(session.form().value("city"), Some(&FieldValue::Text(String::new())));
    assert_eq!(session.form().filled_count(), 0);
    assert!(session.last_cost().is_none());
    assert_eq!(session.document_text().as_deref(), Some("Receipt from Torino"));
}

#[tokio::test]
async fn test_model_switch_discards_in_flight_result() {
    let gate = Arc::new(Notify::new());
    let provider = Arc::new(ScriptedProvider::gated(GOOD_REPLY, gate.clone()));
    let session = Arc::new(session(provider.clone()));
    session.set_document_text("Invoice from Roma");

    let run = tokio::spawn({
        let session = session.clone();
        async move { session.process().await }
    });
    provider.entered.notified().await;

    session.select_model("openai/gpt-4o");

    gate.notify_one();
    let outcome = run.await.unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Stale));
    assert_eq!(session.form().filled_count(), 0);
    assert_eq!(session.model_id(), "openai/gpt-4o");
}

#[tokio::test]
async fn test_selected_model_used_for_next_run() {
    let provider = Arc::new(ScriptedProvider::replying(GOOD_REPLY));
    let session = session(provider.clone());
    session.set_document_text("Invoice from Roma");

    session.select_model("free/unpriced");
    assert!(matches!(
        session.process().await,
        Err(RuntimeError::PricingUnavailable { model, .. }) if model == "free/unpriced"
    ));
    assert!(provider.seen.lock().is_empty());

    session.select_model(MODEL);
    assert!(matches!(session.process().await.unwrap(), RunOutcome::Applied(_)));
}

#[tokio::test]
async fn test_removed_document_blocks_processing() {
    let session = session(Arc::new(ScriptedProvider::replying(GOOD_REPLY)));
    session.set_document_text("Invoice from Roma");
    session.process().await.unwrap();
    let filled = session.form();

    session.remove_document();
    assert!(session.document_text().is_none());
    assert!(matches!(session.process().await, Err(RuntimeError::NoDocument)));
    assert_eq!(session.form(), filled);
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_clear_resets_form_but_keeps_document() {
    let session = session(Arc::new(ScriptedProvider::replying(GOOD_REPLY)));
    session.set_document_text("Invoice from Roma");
    session.process().await.unwrap();

    session.clear();
    assert_eq!(session.form().filled_count(), 0);
    assert_eq!(session.form().value("paid"), Some(&FieldValue::Bool(false)));
    assert!(session.last_cost().is_none());
    assert!(session.document_text().is_some());

    session.set_value("city", FieldValue::Text("Milano".into())).unwrap();
    assert!(matches!(
        session.set_value("nope", FieldValue::Bool(true)),
        Err(RuntimeError::Form(_))
    ));
}
