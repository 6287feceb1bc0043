use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use super::{
    InvocationContext, OverrideFlag, PipelineError, PipelineSignal, PipelineStage,
    RequestContext, ResponseFinalizer,
};
use crate::config::FinalizerConfig;
use crate::response::{
    build_response, Attributes, Card, CardContent, CardImage, OutputSpeech, ResponseDirective,
    ResponseEnvelope,
};
use crate::store::{AttributesStore, InMemoryAttributesStore, StoreError};

const TABLE: &str = "skill-sessions";
const USER: &str = "amzn1.ask.account.TEST";

#[derive(Clone, Default)]
struct RecordingInvocation {
    succeeded: Arc<Mutex<Vec<ResponseEnvelope>>>,
    failed: Arc<Mutex<Vec<StoreError>>>,
}

impl RecordingInvocation {
    async fn succeeded(&self) -> Vec<ResponseEnvelope> {
        self.succeeded.lock().await.clone()
    }

    async fn failed(&self) -> Vec<StoreError> {
        self.failed.lock().await.clone()
    }
}

#[async_trait]
impl InvocationContext for RecordingInvocation {
    async fn succeed(&self, envelope: ResponseEnvelope) {
        self.succeeded.lock().await.push(envelope);
    }

    async fn fail(&self, error: StoreError) {
        self.failed.lock().await.push(error);
    }
}

#[derive(Clone)]
struct RecordingStore {
    writes: Arc<Mutex<Vec<(String, String, Attributes)>>>,
    result: Arc<Mutex<Result<(), StoreError>>>,
    override_on_write: Option<OverrideFlag>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            writes: Arc::new(Mutex::new(Vec::new())),
            result: Arc::new(Mutex::new(Ok(()))),
            override_on_write: None,
        }
    }

    fn failing(error: StoreError) -> Self {
        Self {
            result: Arc::new(Mutex::new(Err(error))),
            ..Self::new()
        }
    }

    fn overriding_on_write(mut self, flag: OverrideFlag) -> Self {
        self.override_on_write = Some(flag);
        self
    }

    async fn writes(&self) -> Vec<(String, String, Attributes)> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl AttributesStore for RecordingStore {
    async fn get(&self, _partition: &str, _user_id: &str) -> Result<Attributes, StoreError> {
        Ok(Attributes::new())
    }

    async fn set(
        &self,
        partition: &str,
        user_id: &str,
        attributes: &Attributes,
    ) -> Result<(), StoreError> {
        self.writes.lock().await.push((
            partition.to_string(),
            user_id.to_string(),
            attributes.clone(),
        ));
        if let Some(flag) = &self.override_on_write {
            flag.set();
        }
        self.result.lock().await.clone()
    }
}

fn attributes(value: serde_json::Value) -> Attributes {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other:?}"),
    }
}

fn setup(store: RecordingStore) -> (ResponseFinalizer, RecordingInvocation) {
    (
        ResponseFinalizer::new(Arc::new(store)),
        RecordingInvocation::default(),
    )
}

fn context(invocation: &RecordingInvocation) -> RequestContext {
    RequestContext::new(USER, Arc::new(invocation.clone()))
}

#[tokio::test]
async fn tell_without_target_completes_without_store_write() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation);

    let stage = finalizer.tell(&mut ctx, "Hello").await.unwrap();

    assert_eq!(stage, PipelineStage::Done);
    assert!(store.writes().await.is_empty());
    let delivered = invocation.succeeded().await;
    assert_eq!(delivered.len(), 1);
    let envelope = &delivered[0];
    assert!(envelope.should_end_session());
    assert!(envelope.response.reprompt.is_none());
    assert!(envelope.response.card.is_none());
    assert!(envelope.response.output_speech.is_ssml());
    assert_eq!(ctx.final_response(), Some(envelope));
    assert!(invocation.failed().await.is_empty());
}

#[tokio::test]
async fn ask_keeps_session_open_with_wrapped_reprompt() {
    let (finalizer, invocation) = setup(RecordingStore::new());
    let mut ctx = context(&invocation);

    finalizer.ask(&mut ctx, "Hello", "Try again").await.unwrap();

    let delivered = invocation.succeeded().await;
    let envelope = &delivered[0];
    assert!(!envelope.should_end_session());
    assert_eq!(
        envelope.response.reprompt.as_ref().unwrap().output_speech,
        OutputSpeech::Ssml {
            ssml: "<speak> Try again </speak>".into()
        }
    );
}

#[tokio::test]
async fn card_operations_select_card_variant() {
    let (finalizer, invocation) = setup(RecordingStore::new());

    let mut ctx = context(&invocation);
    finalizer
        .ask_with_card(
            &mut ctx,
            "Hello",
            "Again",
            CardContent::new("T", "C").with_image(CardImage::small("u")),
        )
        .await
        .unwrap();

    let mut ctx = context(&invocation);
    finalizer
        .tell_with_card(&mut ctx, "Hello", CardContent::new("T", "C"))
        .await
        .unwrap();

    let mut ctx = context(&invocation);
    finalizer
        .tell_with_link_account_card(&mut ctx, "Link please")
        .await
        .unwrap();

    let mut ctx = context(&invocation);
    finalizer
        .ask_with_link_account_card(&mut ctx, "Link please", "Still there?")
        .await
        .unwrap();

    let delivered = invocation.succeeded().await;
    assert_eq!(delivered.len(), 4);
    assert_eq!(
        delivered[0].response.card,
        Some(Card::Standard {
            title: "T".into(),
            text: "C".into(),
            image: CardImage::small("u"),
        })
    );
    assert_eq!(
        delivered[1].response.card,
        Some(Card::Simple {
            title: "T".into(),
            content: "C".into(),
        })
    );
    assert_eq!(delivered[2].response.card, Some(Card::LinkAccount));
    assert!(delivered[2].should_end_session());
    assert_eq!(delivered[3].response.card, Some(Card::LinkAccount));
    assert!(!delivered[3].should_end_session());
}

#[tokio::test]
async fn session_attributes_snapshot_current_attributes() {
    let (finalizer, invocation) = setup(RecordingStore::new());
    let mut ctx = context(&invocation).with_attributes(attributes(json!({"score": 4})));

    finalizer.ask(&mut ctx, "Next?", "Next?").await.unwrap();

    let delivered = invocation.succeeded().await;
    let envelope = &delivered[0];
    assert_eq!(
        envelope.session_attributes,
        Some(attributes(json!({"score": 4})))
    );
}

#[tokio::test]
async fn ending_session_with_target_writes_once_before_completing() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_attributes(attributes(json!({"score": 9})));

    let stage = finalizer.tell(&mut ctx, "Goodbye").await.unwrap();

    assert_eq!(stage, PipelineStage::Done);
    assert_eq!(
        store.writes().await,
        vec![(
            TABLE.to_string(),
            USER.to_string(),
            attributes(json!({"score": 9}))
        )]
    );
    assert_eq!(invocation.succeeded().await.len(), 1);
}

#[tokio::test]
async fn open_session_skips_write_unless_configured() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation).with_persistence_target(TABLE);

    finalizer.ask(&mut ctx, "Hello", "Hello?").await.unwrap();

    assert!(store.writes().await.is_empty());
    assert_eq!(invocation.succeeded().await.len(), 1);

    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .persist_before_completion(true);
    finalizer.ask(&mut ctx, "Hello", "Hello?").await.unwrap();

    assert_eq!(store.writes().await.len(), 1);
    assert_eq!(invocation.succeeded().await.len(), 2);
}

#[tokio::test]
async fn write_failure_reaches_failure_callback_only() {
    let original = StoreError::unavailable("provisioned throughput exceeded");
    let store = RecordingStore::failing(original.clone());
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation).with_persistence_target(TABLE);

    let stage = finalizer.tell(&mut ctx, "Goodbye").await.unwrap();

    assert_eq!(stage, PipelineStage::Failed);
    assert_eq!(store.writes().await.len(), 1);
    assert_eq!(invocation.failed().await, vec![original]);
    assert!(invocation.succeeded().await.is_empty());
}

#[tokio::test]
async fn override_before_entry_suppresses_everything() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let flag = OverrideFlag::new();
    flag.set();
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_gate(Arc::new(flag));

    let stage = finalizer.tell(&mut ctx, "Hello").await.unwrap();

    assert_eq!(stage, PipelineStage::Idle);
    assert!(ctx.final_response().is_none());
    assert!(store.writes().await.is_empty());
    assert!(invocation.succeeded().await.is_empty());
    assert!(invocation.failed().await.is_empty());
}

#[tokio::test]
async fn override_raised_during_write_suppresses_error_branch() {
    let flag = OverrideFlag::new();
    let store = RecordingStore::failing(StoreError::other("boom")).overriding_on_write(flag.clone());
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_gate(Arc::new(flag));

    let stage = finalizer.tell(&mut ctx, "Goodbye").await.unwrap();

    assert_eq!(stage, PipelineStage::Persisting);
    assert_eq!(store.writes().await.len(), 1);
    assert!(invocation.failed().await.is_empty());
    assert!(invocation.succeeded().await.is_empty());
}

#[tokio::test]
async fn gate_is_consulted_at_every_step() {
    let checks = Arc::new(AtomicUsize::new(0));
    let counter = checks.clone();
    let gate = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        false
    };
    let (finalizer, invocation) = setup(RecordingStore::new());
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_gate(Arc::new(gate));

    finalizer.tell(&mut ctx, "Goodbye").await.unwrap();

    // tell, response_ready, save_state
    assert_eq!(checks.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn pending_state_stamps_snapshot_but_not_attributes() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_pending_state("_QUIZ")
        .with_attributes(attributes(json!({"score": 1})));

    finalizer.tell(&mut ctx, "Bye").await.unwrap();

    let delivered = invocation.succeeded().await;
    let envelope = &delivered[0];
    assert_eq!(envelope.state(), Some("_QUIZ"));
    assert!(ctx.attributes().get("STATE").is_none());
    let writes = store.writes().await;
    assert_eq!(writes[0].2, attributes(json!({"score": 1})));
}

fn built_context(invocation: &RecordingInvocation, directive: ResponseDirective) -> RequestContext {
    let mut ctx = context(invocation);
    let envelope = build_response(directive.into_options(ctx.attributes()));
    ctx.store_response(envelope);
    ctx
}

#[tokio::test]
async fn forced_save_stamps_attributes_and_persists_open_session() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = built_context(&invocation, ResponseDirective::ask("Hi", "Hi?"))
        .with_persistence_target(TABLE)
        .with_pending_state("_PLAY");

    let stage = finalizer
        .dispatch(&mut ctx, PipelineSignal::SaveState { force: true })
        .await
        .unwrap();

    assert_eq!(stage, PipelineStage::Done);
    assert_eq!(ctx.attributes().get("STATE"), Some(&json!("_PLAY")));
    let writes = store.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].2, attributes(json!({"STATE": "_PLAY"})));
    assert_eq!(invocation.succeeded().await.len(), 1);
}

#[tokio::test]
async fn unforced_save_of_open_session_completes_without_write() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = built_context(&invocation, ResponseDirective::ask("Hi", "Hi?"))
        .with_persistence_target(TABLE)
        .with_pending_state("_PLAY");

    let stage = finalizer.save_state(&mut ctx, false).await.unwrap();

    assert_eq!(stage, PipelineStage::Done);
    assert!(store.writes().await.is_empty());
    assert!(ctx.attributes().get("STATE").is_none());
}

#[tokio::test]
async fn completion_fires_at_most_once() {
    let (finalizer, invocation) = setup(RecordingStore::new());
    let mut ctx = context(&invocation);

    finalizer.tell(&mut ctx, "First").await.unwrap();
    let err = finalizer.tell(&mut ctx, "Second").await.unwrap_err();

    assert_eq!(err, PipelineError::AlreadyCompleted { stage: "done" });
    assert_eq!(invocation.succeeded().await.len(), 1);
}

#[tokio::test]
async fn signals_before_build_are_rejected() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation).with_persistence_target(TABLE);

    let ready = finalizer
        .dispatch(&mut ctx, PipelineSignal::ResponseReady)
        .await
        .unwrap_err();
    let save = finalizer
        .dispatch(&mut ctx, PipelineSignal::SaveState { force: false })
        .await
        .unwrap_err();

    assert_eq!(ready, PipelineError::ResponseNotBuilt);
    assert_eq!(save, PipelineError::ResponseNotBuilt);
    assert_eq!(ctx.stage(), PipelineStage::Idle);
    assert!(ctx.attributes().is_empty());
    assert!(store.writes().await.is_empty());
}

#[tokio::test]
async fn forced_save_outside_a_turn_persists_without_delivering() {
    let store = RecordingStore::new();
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_pending_state("_PLAY")
        .with_attributes(attributes(json!({"score": 3})));

    let stage = finalizer
        .dispatch(&mut ctx, PipelineSignal::SaveState { force: true })
        .await
        .unwrap();

    assert_eq!(stage, PipelineStage::Done);
    assert!(ctx.final_response().is_none());
    assert_eq!(
        store.writes().await,
        vec![(
            TABLE.to_string(),
            USER.to_string(),
            attributes(json!({"score": 3, "STATE": "_PLAY"}))
        )]
    );
    assert!(invocation.succeeded().await.is_empty());
    assert!(invocation.failed().await.is_empty());

    let err = finalizer.tell(&mut ctx, "Too late").await.unwrap_err();
    assert_eq!(err, PipelineError::AlreadyCompleted { stage: "done" });
}

#[tokio::test]
async fn forced_save_outside_a_turn_reports_write_failure() {
    let original = StoreError::unavailable("table not found");
    let store = RecordingStore::failing(original.clone());
    let (finalizer, invocation) = setup(store.clone());
    let mut ctx = context(&invocation)
        .with_persistence_target(TABLE)
        .with_pending_state("_PLAY");

    let stage = finalizer.save_state(&mut ctx, true).await.unwrap();

    assert_eq!(stage, PipelineStage::Failed);
    assert_eq!(store.writes().await.len(), 1);
    assert_eq!(invocation.failed().await, vec![original]);
    assert!(invocation.succeeded().await.is_empty());
}

#[tokio::test]
async fn forced_save_without_target_is_rejected() {
    let (finalizer, invocation) = setup(RecordingStore::new());
    let mut ctx = built_context(&invocation, ResponseDirective::ask("Hi", "Hi?"))
        .with_pending_state("_X")
        .with_attributes(attributes(json!({"score": 5})));

    let err = finalizer.save_state(&mut ctx, true).await.unwrap_err();

    assert_eq!(err, PipelineError::PersistenceTargetMissing);
    assert_eq!(ctx.attributes(), &attributes(json!({"score": 5})));
    assert_eq!(ctx.stage(), PipelineStage::Built);
    assert!(invocation.succeeded().await.is_empty());
    assert!(invocation.failed().await.is_empty());
}

#[tokio::test]
async fn save_state_error_signal_fails_request() {
    let (finalizer, invocation) = setup(RecordingStore::new());
    let mut ctx = context(&invocation).with_persistence_target(TABLE);
    let err = StoreError::rejected(TABLE, USER, "conditional check failed");

    let stage = finalizer
        .dispatch(&mut ctx, PipelineSignal::SaveStateError(err.clone()))
        .await
        .unwrap();

    assert_eq!(stage, PipelineStage::Failed);
    assert_eq!(invocation.failed().await, vec![err]);
}

#[tokio::test]
async fn config_driven_context_persists_into_memory_store() {
    let store = InMemoryAttributesStore::new();
    let finalizer = ResponseFinalizer::new(Arc::new(store.clone()));
    let invocation = RecordingInvocation::default();
    let config = FinalizerConfig::default().with_attributes_table(TABLE);
    let mut ctx = RequestContext::from_config(
        USER,
        attributes(json!({"visits": 2})),
        &config,
        Arc::new(invocation.clone()),
    );

    finalizer.tell(&mut ctx, "See you").await.unwrap();

    let stored = store.get(TABLE, USER).await.unwrap();
    assert_eq!(stored, attributes(json!({"visits": 2})));
    assert_eq!(invocation.succeeded().await.len(), 1);
}
