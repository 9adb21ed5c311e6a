use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use murmur_application::{
    ConversationOrchestrator, CycleKind, DeliveryDispatcher, spawn_auto_chat,
};
use murmur_core::config::{GenerationMode, MurmurSettings};
use murmur_core::generation::{GenerationError, GenerationOutcome, GenerationService};
use murmur_core::history::{HistoryStore, InMemoryHistoryStore, Speaker};
use murmur_core::interest::InterestLevel;
use murmur_core::persona::{BigFive, ConversationPatterns, Persona, PersonaRegistry, Temperament};
use murmur_core::selection::ParticipationOdds;
use murmur_core::turn::{APOLOGY_TEXT, TurnKind};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

/// Answers every call with `reply <n>`, or `reply` when set, unless the model
/// is scripted to fail.
///
/// Records every (model, prompt) pair it sees. With a gate, each call waits
/// for a permit of its own.
#[derive(Default)]
struct FakeService {
    calls: Mutex<Vec<(String, String)>>,
    failing: HashMap<String, (i32, String)>,
    /// Fail only the first call, with this stderr
    first_call_fails: Option<String>,
    gate: Option<Arc<Semaphore>>,
    reply: Option<String>,
}

impl FakeService {
    fn failing(mut self, model: &str, code: i32, stderr: &str) -> Self {
        self.failing
            .insert(model.to_string(), (code, stderr.to_string()));
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn models(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        _timeout: Duration,
    ) -> Result<GenerationOutcome, GenerationError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((model.to_string(), prompt.to_string()));
            calls.len()
        };

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if n == 1 {
            if let Some(stderr) = &self.first_call_fails {
                return Ok(GenerationOutcome::failure(1, stderr.clone()));
            }
        }
        if let Some((code, stderr)) = self.failing.get(model) {
            return Ok(GenerationOutcome::failure(*code, stderr.clone()));
        }
        let text = self.reply.clone().unwrap_or_else(|| format!("  reply {n}  "));
        Ok(GenerationOutcome::success(text))
    }
}

fn persona(id: &str, name: &str, topics: &[&str], keywords: &[&str]) -> Persona {
    Persona {
        id: id.to_string(),
        name: name.to_string(),
        age: None,
        occupation: String::new(),
        personality: String::new(),
        backstory: String::new(),
        speaking_style: "Plain".to_string(),
        temperament: Temperament::new("ENFP"),
        big_five: BigFive::default(),
        interest_topics: topics.iter().map(|s| s.to_string()).collect(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        participation_probability: 0.5,
        hidden_traits: Vec::new(),
        color: None,
        conversation_patterns: ConversationPatterns::default(),
    }
}

fn roster() -> PersonaRegistry {
    PersonaRegistry::new(vec![
        persona("ann", "Ann", &["chess"], &["pasta"]),
        persona("boris", "Boris", &["chess", "history"], &["pasta"]),
        persona("cyril", "Cyril", &[], &[]),
    ])
    .unwrap()
}

/// Only mentioned personas join replies; spontaneous chatter drafts one.
fn quiet_settings() -> MurmurSettings {
    let never = ParticipationOdds {
        high: 0.0,
        medium: 0.0,
        low: 0.0,
    };
    let mut settings = MurmurSettings::default();
    settings.seed = Some(7);
    settings.selection.odds = never;
    settings.spontaneous.odds = never;
    settings.spontaneous.topics = vec!["chess".to_string()];
    settings.auto_chat.enabled = false;
    settings
}

struct Harness {
    orchestrator: Arc<ConversationOrchestrator>,
    service: Arc<FakeService>,
    history: Arc<InMemoryHistoryStore>,
}

fn harness(service: FakeService, settings: MurmurSettings) -> Harness {
    let service = Arc::new(service);
    let history = Arc::new(InMemoryHistoryStore::new());
    let orchestrator =
        ConversationOrchestrator::new(roster(), settings, service.clone(), history.clone())
            .unwrap();
    Harness {
        orchestrator: Arc::new(orchestrator),
        service,
        history,
    }
}

#[tokio::test]
async fn test_quota_on_primary_falls_back_to_flash() {
    let h = harness(
        FakeService::default().failing("gemini-2.5-pro", 1, "429 quota exceeded"),
        quiet_settings(),
    );

    let report = h
        .orchestrator
        .respond("Ann, how was the tournament?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.kind, CycleKind::Reply);
    assert_eq!(report.plan.len(), 1);
    let turn = &report.plan.items()[0].turn;
    assert_eq!(turn.kind, TurnKind::Spoken);
    assert_eq!(turn.persona_id, "ann");
    assert_eq!(turn.text, "reply 2");
    assert_eq!(turn.model.as_deref(), Some("gemini-2.5-flash"));

    assert_eq!(h.service.models(), vec!["gemini-2.5-pro", "gemini-2.5-flash"]);
    assert_eq!(report.model_after, "gemini-2.5-flash");
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.active, "gemini-2.5-flash");
    assert_eq!(snapshot.error_counts.get("gemini-2.5-pro"), Some(&1));
}

#[tokio::test]
async fn test_next_cycle_stays_on_fallback_model() {
    let h = harness(
        FakeService::default().failing("gemini-2.5-pro", 1, "429 quota exceeded"),
        quiet_settings(),
    );
    let cancel = CancellationToken::new();

    h.orchestrator.respond("Ann?", &cancel).await.unwrap();
    h.orchestrator.respond("Boris?", &cancel).await.unwrap();

    assert_eq!(
        h.service.models(),
        vec!["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.5-flash"]
    );
}

#[tokio::test]
async fn test_failed_persona_gets_apology_and_others_still_speak() {
    let service = FakeService {
        first_call_fails: Some("segmentation fault".to_string()),
        ..FakeService::default()
    };
    let h = harness(service, quiet_settings());

    let report = h
        .orchestrator
        .respond("Ann and Boris, lunch?", &CancellationToken::new())
        .await
        .unwrap();

    let turns: Vec<_> = report.plan.turns().collect();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].persona_id, "ann");
    assert_eq!(turns[0].kind, TurnKind::Apology);
    assert_eq!(turns[0].text, APOLOGY_TEXT);
    assert_eq!(turns[1].persona_id, "boris");
    assert_eq!(turns[1].kind, TurnKind::Spoken);

    // Terminal failures do not switch models.
    assert_eq!(h.orchestrator.active_model(), "gemini-2.5-pro");

    let history = h.history.load().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].speaker, Speaker::User);
    assert_eq!(history[1].speaker.persona_id(), Some("boris"));
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_exhausted_chain_yields_apology() {
    let service = FakeService::default()
        .failing("gemini-2.5-pro", 1, "429")
        .failing("gemini-2.5-flash", 1, "429")
        .failing("gemini-1.5-flash", 1, "429")
        .failing("gemini-1.5-pro", 1, "429");
    let h = harness(service, quiet_settings());

    let report = h
        .orchestrator
        .respond("Cyril?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.plan.items()[0].turn.kind, TurnKind::Apology);
    assert_eq!(
        h.service.models(),
        vec![
            "gemini-2.5-pro",
            "gemini-2.5-flash",
            "gemini-1.5-flash",
            "gemini-1.5-pro"
        ]
    );
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_overlapping_cycle_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let service = FakeService {
        gate: Some(gate.clone()),
        ..FakeService::default()
    };
    let h = harness(service, quiet_settings());

    let running = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .respond("Ann, still there?", &CancellationToken::new())
                .await
        })
    };
    while !h.orchestrator.is_busy() {
        tokio::task::yield_now().await;
    }

    let err = h
        .orchestrator
        .discuss("chess", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_busy());

    gate.add_permits(8);
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.plan.len(), 1);
    assert!(!h.orchestrator.is_busy());
    // The rejected discussion never reached the backend.
    assert_eq!(h.service.calls().len(), 1);
}

#[tokio::test]
async fn test_cancellation_ends_cycle_and_releases_flag() {
    let h = harness(FakeService::default(), quiet_settings());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = h
        .orchestrator
        .respond("Ann and Boris?", &cancel)
        .await
        .unwrap();

    assert_eq!(report.plan.len(), 1);
    assert_eq!(report.plan.items()[0].turn.kind, TurnKind::Cancelled);
    assert!(h.service.calls().is_empty());
    assert!(!h.orchestrator.is_busy());

    let history = h.history.load().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].speaker, Speaker::User);
}

async fn wait_for_calls(service: &FakeService, n: usize) {
    while service.calls().len() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_cancel_mid_cycle_skips_remaining_personas() {
    let gate = Arc::new(Semaphore::new(0));
    let service = FakeService {
        gate: Some(gate.clone()),
        ..FakeService::default()
    };
    let h = harness(service, quiet_settings());
    let cancel = CancellationToken::new();

    let running = {
        let orchestrator = h.orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .respond("Ann, Boris and Cyril, are you in?", &cancel)
                .await
        })
    };

    wait_for_calls(&h.service, 1).await;
    gate.add_permits(1);
    wait_for_calls(&h.service, 2).await;
    cancel.cancel();

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.participants.len(), 3);
    let kinds: Vec<_> = report.plan.turns().map(|t| t.kind).collect();
    assert_eq!(kinds.len(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == TurnKind::Spoken).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == TurnKind::Cancelled).count(), 1);
    // The third persona was never generated.
    assert_eq!(h.service.calls().len(), 2);
    assert!(!h.orchestrator.is_busy());

    let history = h.history.load().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].speaker, Speaker::User);

    gate.add_permits(8);
    let next = h
        .orchestrator
        .respond("Ann, one more?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(next.plan.len(), 1);
    assert_eq!(next.plan.items()[0].turn.kind, TurnKind::Spoken);
}

#[tokio::test]
async fn test_cancel_current_stops_a_cycle_started_elsewhere() {
    let gate = Arc::new(Semaphore::new(0));
    let service = FakeService {
        gate: Some(gate.clone()),
        ..FakeService::default()
    };
    let h = harness(service, quiet_settings());
    assert!(!h.orchestrator.cancel_current());

    let owner = CancellationToken::new();
    let running = {
        let orchestrator = h.orchestrator.clone();
        let owner = owner.clone();
        tokio::spawn(async move { orchestrator.spontaneous(&owner).await })
    };

    wait_for_calls(&h.service, 1).await;
    assert!(h.orchestrator.cancel_current());

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.plan.len(), 1);
    assert_eq!(report.plan.items()[0].turn.kind, TurnKind::Cancelled);
    // Only the cycle was cancelled, not the token it was started with.
    assert!(!owner.is_cancelled());
    assert!(!h.orchestrator.is_busy());
    assert!(!h.orchestrator.cancel_current());
}

#[tokio::test]
async fn test_discussion_includes_everyone_ordered_by_interest() {
    let h = harness(FakeService::default(), quiet_settings());

    let report = h
        .orchestrator
        .discuss("chess history", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.kind, CycleKind::Discussion);
    assert_eq!(report.topic.as_deref(), Some("chess history"));
    assert_eq!(report.participants.len(), 3);

    // Generated in roster order, delivered by interest.
    let generated: Vec<_> = h
        .service
        .calls()
        .iter()
        .map(|(_, prompt)| {
            ["Ann", "Boris", "Cyril"]
                .into_iter()
                .find(|name| prompt.contains(&format!("**Name**: {name}")))
                .unwrap()
        })
        .collect();
    assert_eq!(generated, vec!["Ann", "Boris", "Cyril"]);

    let delivered: Vec<_> = report
        .plan
        .turns()
        .map(|t| (t.persona_id.as_str(), t.interest))
        .collect();
    assert_eq!(
        delivered,
        vec![
            ("boris", InterestLevel::High),
            ("ann", InterestLevel::Medium),
            ("cyril", InterestLevel::Low),
        ]
    );

    let delays: Vec<_> = report.plan.items().iter().map(|s| s.delay).collect();
    assert!(delays.windows(2).all(|w| w[0] < w[1]));
    let stamps: Vec<_> = report.plan.turns().map(|t| t.timestamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));

    let history = h.history.load().await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].speaker, Speaker::System);
}

#[tokio::test]
async fn test_keyword_drill_feeds_question_to_responder() {
    let h = harness(FakeService::default(), quiet_settings());
    let cancel = CancellationToken::new();

    let empty = h.orchestrator.keyword_drill(&cancel).await.unwrap();
    assert!(empty.plan.is_empty());
    assert!(h.service.calls().is_empty());

    // Nobody is mentioned and every odd is zero, so only keywords are recorded.
    let reply = h
        .orchestrator
        .respond("I cooked pasta today, pasta again", &cancel)
        .await
        .unwrap();
    assert!(reply.plan.is_empty());
    assert!(h.orchestrator.has_keywords());

    let report = h.orchestrator.keyword_drill(&cancel).await.unwrap();
    assert_eq!(report.kind, CycleKind::KeywordDrill);
    assert_eq!(report.topic.as_deref(), Some("pasta"));
    assert!(
        report
            .participants
            .iter()
            .all(|p| p.interest == InterestLevel::High)
    );

    let turns: Vec<_> = report.plan.turns().collect();
    assert_eq!(turns.len(), 2);
    let mut speakers = vec![turns[0].persona_id.as_str(), turns[1].persona_id.as_str()];
    speakers.sort();
    assert_eq!(speakers, vec!["ann", "boris"]);
    assert_eq!(turns[0].text, "reply 1");

    let calls = h.service.calls();
    assert!(calls[0].1.contains("pasta"));
    assert!(calls[1].1.contains("reply 1"));

    let items = report.plan.items();
    assert_eq!(items[0].delay, Duration::from_secs(3));
    assert_eq!(items[1].delay, Duration::from_secs(6));
}

#[tokio::test]
async fn test_spontaneous_drafts_a_speaker() {
    let h = harness(FakeService::default(), quiet_settings());

    let report = h
        .orchestrator
        .spontaneous(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.kind, CycleKind::Spontaneous);
    assert_eq!(report.topic.as_deref(), Some("chess"));
    assert_eq!(report.participants.len(), 1);
    assert_eq!(report.participants[0].interest, InterestLevel::Medium);
    assert_eq!(report.plan.len(), 1);
}

#[tokio::test]
async fn test_seeded_selection_is_reproducible() {
    let mut settings = MurmurSettings::default();
    settings.seed = Some(42);
    settings.auto_chat.enabled = false;

    let run = |settings: MurmurSettings| async move {
        let h = harness(FakeService::default(), settings);
        h.orchestrator
            .respond("chess and history tonight?", &CancellationToken::new())
            .await
            .unwrap()
            .participants
    };

    let first = run(settings.clone()).await;
    let second = run(settings).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_model_switch_and_clear_history() {
    let h = harness(FakeService::default(), quiet_settings());

    h.orchestrator.set_model("gemini-1.5-flash").unwrap();
    assert_eq!(h.orchestrator.active_model(), "gemini-1.5-flash");
    assert!(h.orchestrator.set_model("gpt-9").unwrap_err().is_not_found());

    h.orchestrator
        .respond("Ann, hello", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(h.service.models(), vec!["gemini-1.5-flash"]);

    h.orchestrator.clear_history().await.unwrap();
    assert!(h.history.load().await.unwrap().is_empty());
    assert!(!h.orchestrator.has_keywords());
}

#[tokio::test]
async fn test_reset_and_recommended_model() {
    let h = harness(
        FakeService::default().failing("gemini-2.5-pro", 1, "429 quota exceeded"),
        quiet_settings(),
    );
    h.orchestrator
        .respond("Ann?", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(h.orchestrator.active_model(), "gemini-2.5-flash");

    assert_eq!(h.orchestrator.reset_model(), "gemini-2.5-pro");
    assert_eq!(h.orchestrator.active_model(), "gemini-2.5-pro");

    // The primary is cooling down, so the next best model is recommended.
    assert_eq!(
        h.orchestrator.use_recommended_model().unwrap(),
        "gemini-2.5-flash"
    );
    assert_eq!(h.orchestrator.active_model(), "gemini-2.5-flash");
}

fn batch_settings() -> MurmurSettings {
    let mut settings = quiet_settings();
    settings.generation.mode = GenerationMode::Batch;
    settings
}

#[tokio::test]
async fn test_batch_mode_makes_one_call_per_cycle() {
    let service = FakeService {
        reply: Some(
            "Here you go:\n【Boris】\nOnly if we play the Sicilian.\n\n【Mallory】\nI'm not here.\n【Ann】\nCount me in!\n【Boris】\nAgain?\n"
                .to_string(),
        ),
        ..FakeService::default()
    };
    let h = harness(service, batch_settings());

    let report = h
        .orchestrator
        .respond("Ann and Boris, chess tonight?", &CancellationToken::new())
        .await
        .unwrap();

    let calls = h.service.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].1.contains("【Ann】"));
    assert!(calls[0].1.contains("【Boris】"));
    assert!(!calls[0].1.contains("【Cyril】"));

    // Reply order, first block per persona, strangers dropped.
    let turns: Vec<_> = report
        .plan
        .turns()
        .map(|t| (t.persona_id.as_str(), t.text.as_str()))
        .collect();
    assert_eq!(
        turns,
        vec![
            ("boris", "Only if we play the Sicilian."),
            ("ann", "Count me in!")
        ]
    );
    assert!(
        report
            .plan
            .turns()
            .all(|t| t.model.as_deref() == Some("gemini-2.5-pro"))
    );

    let delays: Vec<_> = report.plan.items().iter().map(|s| s.delay).collect();
    assert_eq!(delays[0], Duration::from_secs(2));
    assert!(delays[1] >= Duration::from_millis(3500));
    assert!(delays[1] <= Duration::from_secs(5));

    let history = h.history.load().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].speaker.persona_id(), Some("boris"));
}

#[tokio::test]
async fn test_batch_mode_failure_yields_single_apology() {
    let h = harness(
        FakeService::default().failing("gemini-2.5-pro", 1, "segmentation fault"),
        batch_settings(),
    );

    let report = h
        .orchestrator
        .discuss("chess", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(h.service.calls().len(), 1);
    assert_eq!(report.plan.len(), 1);
    let turn = &report.plan.items()[0].turn;
    assert_eq!(turn.kind, TurnKind::Apology);
    assert_eq!(turn.persona_id, "ann");
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test]
async fn test_batch_mode_without_blocks_stays_silent() {
    let service = FakeService {
        reply: Some("I'd rather not write a chat.".to_string()),
        ..FakeService::default()
    };
    let h = harness(service, batch_settings());

    let report = h
        .orchestrator
        .respond("Ann?", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.plan.is_empty());
    assert_eq!(h.service.calls().len(), 1);
    assert_eq!(h.history.load().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_chat_delivers_turns_until_cancelled() {
    let mut settings = quiet_settings();
    settings.auto_chat.enabled = true;
    settings.auto_chat.min_interval_secs = 10;
    settings.auto_chat.max_interval_secs = 10;
    settings.auto_chat.drill_probability = 0.0;
    let h = harness(FakeService::default(), settings);

    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let start = tokio::time::Instant::now();
    let handle = spawn_auto_chat(
        h.orchestrator.clone(),
        DeliveryDispatcher::new(tx),
        cancel.clone(),
    );

    let turn = rx.recv().await.unwrap();
    assert_eq!(turn.kind, TurnKind::Spoken);
    // 10 s interval plus a 2-5 s spontaneous stagger.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(12), "{elapsed:?}");
    assert!(elapsed <= Duration::from_secs(16), "{elapsed:?}");

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_auto_chat_disabled_returns_immediately() {
    let h = harness(FakeService::default(), quiet_settings());
    let (tx, _rx) = mpsc::channel(1);

    spawn_auto_chat(
        h.orchestrator.clone(),
        DeliveryDispatcher::new(tx),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(h.service.calls().is_empty());
}
