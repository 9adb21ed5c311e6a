//! Conversation orchestration.
//!
//! `ConversationOrchestrator` drives one cycle at a time: it snapshots the
//! recent history, decides who speaks, generates the turns through the
//! fallback controller, and hands the batch to the scheduler. Turns come
//! either from one call per persona or, in [`GenerationMode::Batch`], from a
//! single joint call split into `【Name】` blocks. The returned [`DeliveryPlan`] carries delays only; releasing the
//! turns is the caller's job (see [`crate::dispatcher`]).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use murmur_core::config::{GenerationMode, MurmurSettings};
use murmur_core::error::{MurmurError, Result};
use murmur_core::generation::GenerationService;
use murmur_core::history::{ConversationContext, HistoryEntry, HistoryStore};
use murmur_core::interest::{InterestAnalyzer, InterestLevel};
use murmur_core::keywords::KeywordTracker;
use murmur_core::model::{FallbackError, ModelFallbackController, ModelSnapshot};
use murmur_core::persona::{Persona, PersonaRegistry};
use murmur_core::prompt::{BatchMember, Occasion, PromptComposer, parse_batch_reply};
use murmur_core::schedule::{DeliveryPlan, ResponseScheduler, ScheduleMode};
use murmur_core::selection::{Participant, PersonaSelector};
use murmur_core::turn::{Turn, TurnKind};
use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CycleKind {
    /// Replies to a user message
    Reply,
    /// Every persona weighs in on a topic
    Discussion,
    /// Unprompted chatter on a random topic
    Spontaneous,
    /// One persona questions another about a recurring keyword
    KeywordDrill,
}

/// Result of one finished cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub kind: CycleKind,
    /// Topic or keyword the cycle was about, when it was not a reply
    pub topic: Option<String>,
    pub plan: DeliveryPlan,
    pub participants: Vec<Participant>,
    /// Active model once the cycle ended
    pub model_after: String,
}

/// Holds the busy flag for the lifetime of a cycle.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A running cycle: the busy flag plus the token `cancel_current` fires.
struct CycleGuard<'a> {
    _busy: BusyGuard<'a>,
    slot: &'a Mutex<Option<CancellationToken>>,
    cancel: CancellationToken,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Runs conversation cycles against a fixed persona roster.
///
/// # Single flight
///
/// At most one cycle runs at a time. A call made while another cycle is in
/// flight fails with [`MurmurError::Busy`] instead of waiting; the flag is
/// released on every exit path, including errors and cancellation.
/// [`cancel_current`](Self::cancel_current) stops whichever cycle is running,
/// whoever started it.
///
/// # Failure isolation
///
/// A persona whose generation fails gets an apology turn and the cycle moves on
/// to the next persona. Cancellation ends the cycle with a cancelled turn.
/// Only spoken turns are written to history.
pub struct ConversationOrchestrator {
    registry: PersonaRegistry,
    analyzer: InterestAnalyzer,
    selector: PersonaSelector,
    composer: PromptComposer,
    controller: ModelFallbackController,
    scheduler: ResponseScheduler,
    service: Arc<dyn GenerationService>,
    history: Arc<dyn HistoryStore>,
    keywords: Mutex<KeywordTracker>,
    rng: Mutex<StdRng>,
    settings: MurmurSettings,
    busy: AtomicBool,
    current: Mutex<Option<CancellationToken>>,
}

impl ConversationOrchestrator {
    /// Creates an orchestrator from validated settings.
    ///
    /// A `seed` in the settings makes every random decision reproducible.
    pub fn new(
        registry: PersonaRegistry,
        settings: MurmurSettings,
        service: Arc<dyn GenerationService>,
        history: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        settings.validate()?;

        let controller =
            ModelFallbackController::new(settings.models.clone(), settings.generation.timeout())?;
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let analyzer = InterestAnalyzer::new();

        tracing::info!(
            "[Orchestrator] Ready with {} personas on {}",
            registry.len(),
            controller.active()
        );

        Ok(Self {
            registry,
            analyzer,
            selector: PersonaSelector::new(analyzer),
            composer: PromptComposer::new()?,
            controller,
            scheduler: ResponseScheduler::new(settings.scheduler),
            service,
            history,
            keywords: Mutex::new(KeywordTracker::default()),
            rng: Mutex::new(rng),
            settings,
            busy: AtomicBool::new(false),
            current: Mutex::new(None),
        })
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &MurmurSettings {
        &self.settings
    }

    /// The fallback controller, for model inspection and manual switching.
    pub fn models(&self) -> &ModelFallbackController {
        &self.controller
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn active_model(&self) -> String {
        self.controller.active()
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        self.controller.snapshot()
    }

    /// Switches the active model by hand.
    pub fn set_model(&self, model: &str) -> Result<()> {
        self.controller.set_active(model)?;
        tracing::info!("[Orchestrator] Model set to {}", model);
        Ok(())
    }

    /// Returns to the primary model.
    pub fn reset_model(&self) -> String {
        self.controller.reset();
        self.controller.active()
    }

    /// Switches to the model the controller currently recommends.
    pub fn use_recommended_model(&self) -> Result<String> {
        let model = self.controller.recommended_model();
        self.set_model(&model)?;
        Ok(model)
    }

    /// Cancels the cycle in flight, if any. Returns whether there was one.
    pub fn cancel_current(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(cancel) => {
                tracing::info!("[Orchestrator] Cancelling the running cycle");
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// True when user messages have left keywords to drill into.
    pub fn has_keywords(&self) -> bool {
        !self.keywords().is_empty()
    }

    /// Empties the history store and forgets recent keywords.
    pub async fn clear_history(&self) -> Result<()> {
        self.history.clear().await?;
        self.keywords().clear();
        tracing::info!("[Orchestrator] History cleared");
        Ok(())
    }

    /// Replies to a user message.
    ///
    /// The message is recorded in history and its keywords are remembered
    /// before anyone answers.
    pub async fn respond(&self, message: &str, cancel: &CancellationToken) -> Result<CycleReport> {
        let cycle = self.begin(CycleKind::Reply, cancel)?;
        let cancel = &cycle.cancel;

        let context = self.context().await?;
        self.history.append(&HistoryEntry::user(message)).await?;
        self.keywords().observe(message);

        let participants = {
            let mut rng = self.rng();
            self.selector.select(
                self.registry.all(),
                message,
                &self.settings.selection,
                &mut *rng,
            )
        };
        tracing::info!(
            "[Orchestrator] reply cycle started: {} participants",
            participants.len()
        );

        let (turns, mode) = self
            .generate_cycle(
                &participants,
                message,
                &context,
                &Occasion::Reply,
                ScheduleMode::InterestWeighted,
                cancel,
            )
            .await?;
        self.finish(CycleKind::Reply, None, turns, participants, &mode)
            .await
    }

    /// Has every persona weigh in on `topic`, in roster order.
    pub async fn discuss(&self, topic: &str, cancel: &CancellationToken) -> Result<CycleReport> {
        let cycle = self.begin(CycleKind::Discussion, cancel)?;
        let cancel = &cycle.cancel;

        let context = self.context().await?;
        self.history
            .append(&HistoryEntry::system(format!("Discussion topic: {topic}")))
            .await?;

        let participants: Vec<Participant> = self
            .registry
            .iter()
            .map(|persona| Participant {
                persona_id: persona.id.clone(),
                interest: self.analyzer.score(persona, topic),
                mentioned: false,
            })
            .collect();
        tracing::info!(
            "[Orchestrator] discussion cycle on '{}' started: {} participants",
            topic,
            participants.len()
        );

        let occasion = Occasion::Discussion {
            topic: topic.to_string(),
        };
        let (turns, mode) = self
            .generate_cycle(
                &participants,
                topic,
                &context,
                &occasion,
                self.scheduler.config().discussion_mode(),
                cancel,
            )
            .await?;
        self.finish(
            CycleKind::Discussion,
            Some(topic.to_string()),
            turns,
            participants,
            &mode,
        )
        .await
    }

    /// Lets a few personas chat about a randomly picked topic.
    pub async fn spontaneous(&self, cancel: &CancellationToken) -> Result<CycleReport> {
        let cycle = self.begin(CycleKind::Spontaneous, cancel)?;
        let cancel = &cycle.cancel;

        let (topic, participants) = {
            let mut rng = self.rng();
            let Some(topic) = self.settings.spontaneous.topics.choose(&mut *rng).cloned() else {
                return Err(MurmurError::config("no spontaneous topics configured"));
            };
            let participants = self.selector.select(
                self.registry.all(),
                &topic,
                &self.settings.spontaneous.policy(),
                &mut *rng,
            );
            (topic, participants)
        };
        tracing::info!(
            "[Orchestrator] spontaneous cycle on '{}' started: {} participants",
            topic,
            participants.len()
        );

        let context = self.context().await?;
        let occasion = Occasion::Spontaneous {
            topic: topic.clone(),
        };
        let (turns, mode) = self
            .generate_cycle(
                &participants,
                &topic,
                &context,
                &occasion,
                self.scheduler.config().spontaneous_mode(),
                cancel,
            )
            .await?;
        self.finish(
            CycleKind::Spontaneous,
            Some(topic),
            turns,
            participants,
            &mode,
        )
        .await
    }

    /// Has one persona ask another about the most frequent recent keyword.
    ///
    /// The asker's question is generated first and becomes the responder's
    /// message. Drills always use one call per persona. Returns an empty
    /// report when there is no keyword yet or the roster has a single persona.
    pub async fn keyword_drill(&self, cancel: &CancellationToken) -> Result<CycleReport> {
        let cycle = self.begin(CycleKind::KeywordDrill, cancel)?;
        let cancel = &cycle.cancel;

        let keyword = self.keywords().most_frequent().map(str::to_string);
        let Some(keyword) = keyword else {
            tracing::debug!("[Orchestrator] No recent keywords to drill into");
            return Ok(self.empty_report(CycleKind::KeywordDrill));
        };
        let Some((asker, responder)) = self.pick_drill_pair(&keyword) else {
            tracing::debug!("[Orchestrator] Keyword drill needs two personas");
            return Ok(self.empty_report(CycleKind::KeywordDrill));
        };
        tracing::info!(
            "[Orchestrator] keyword drill on '{}': {} asks {}",
            keyword,
            asker.name,
            responder.name
        );

        let context = self.context().await?;
        let participants = vec![
            Participant {
                persona_id: asker.id.clone(),
                interest: InterestLevel::High,
                mentioned: false,
            },
            Participant {
                persona_id: responder.id.clone(),
                interest: InterestLevel::High,
                mentioned: false,
            },
        ];

        let ask = Occasion::Question {
            keyword: keyword.clone(),
            responder: responder.name.clone(),
        };
        let question = self
            .generate_turn(
                asker,
                &format!("the recently popular topic \"{keyword}\""),
                &context,
                InterestLevel::High,
                &ask,
                cancel,
            )
            .await?;

        let answer = if question.is_spoken() {
            let reply = Occasion::Answer {
                asker: asker.name.clone(),
            };
            Some(
                self.generate_turn(
                    responder,
                    &question.text,
                    &context,
                    InterestLevel::High,
                    &reply,
                    cancel,
                )
                .await?,
            )
        } else {
            None
        };

        let turns: Vec<Turn> = std::iter::once(question).chain(answer).collect();
        let mode = self.scheduler.config().drill_mode();
        self.finish(
            CycleKind::KeywordDrill,
            Some(keyword),
            turns,
            participants,
            &mode,
        )
        .await
    }

    /// Seconds to wait before the next auto-chat tick.
    pub(crate) fn auto_chat_delay(&self) -> Duration {
        let auto = &self.settings.auto_chat;
        let secs = self
            .rng()
            .gen_range(auto.min_interval_secs..=auto.max_interval_secs);
        Duration::from_secs(secs)
    }

    /// Rolls whether the next auto-chat tick should be a keyword drill.
    pub(crate) fn wants_drill(&self) -> bool {
        if !self.has_keywords() {
            return false;
        }
        let roll: f64 = self.rng().r#gen();
        roll < self.settings.auto_chat.drill_probability
    }

    /// Claims the busy flag and publishes a child of `cancel` for the cycle.
    fn begin(&self, kind: CycleKind, cancel: &CancellationToken) -> Result<CycleGuard<'_>> {
        let busy = BusyGuard::try_acquire(&self.busy).ok_or_else(|| {
            tracing::warn!("[Orchestrator] {} rejected: another cycle is in flight", kind);
            MurmurError::Busy
        })?;
        let cancel = cancel.child_token();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());
        Ok(CycleGuard {
            _busy: busy,
            slot: &self.current,
            cancel,
        })
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn keywords(&self) -> MutexGuard<'_, KeywordTracker> {
        self.keywords.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn context(&self) -> Result<ConversationContext> {
        let entries = self.history.load().await?;
        Ok(ConversationContext::from_entries(
            entries,
            self.settings.history.context_window,
        ))
    }

    /// Picks an asker and a distinct responder for `keyword`.
    ///
    /// Personas listing the keyword are preferred; otherwise anyone will do.
    fn pick_drill_pair(&self, keyword: &str) -> Option<(&Persona, &Persona)> {
        let personas = self.registry.all();
        if personas.len() < 2 {
            return None;
        }

        let interested: Vec<&Persona> = personas
            .iter()
            .filter(|p| p.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)))
            .collect();
        let pool: Vec<&Persona> = if interested.is_empty() {
            personas.iter().collect()
        } else {
            interested
        };

        let mut rng = self.rng();
        let mut picked = pool.choose_multiple(&mut *rng, 2).copied();
        let asker = picked.next()?;
        let responder = match picked.next() {
            Some(responder) => responder,
            None => personas
                .iter()
                .filter(|p| p.id != asker.id)
                .choose(&mut *rng)?,
        };
        Some((asker, responder))
    }

    /// Generates the participants' turns in the configured mode.
    ///
    /// Joint replies are paced by the batch schedule instead of `mode`.
    async fn generate_cycle(
        &self,
        participants: &[Participant],
        message: &str,
        context: &ConversationContext,
        occasion: &Occasion,
        mode: ScheduleMode,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Turn>, ScheduleMode)> {
        match self.settings.generation.mode {
            GenerationMode::PerPersona => {
                let turns = self
                    .generate_each(participants, message, context, occasion, cancel)
                    .await?;
                Ok((turns, mode))
            }
            GenerationMode::Batch => {
                let turns = self
                    .generate_joint(participants, message, context, occasion, cancel)
                    .await?;
                Ok((turns, self.scheduler.config().batch_mode()))
            }
        }
    }

    /// Generates the participants' turns one after another.
    ///
    /// Stops after the first cancelled turn.
    async fn generate_each(
        &self,
        participants: &[Participant],
        message: &str,
        context: &ConversationContext,
        occasion: &Occasion,
        cancel: &CancellationToken,
    ) -> Result<Vec<Turn>> {
        let mut turns = Vec::with_capacity(participants.len());

        for participant in participants {
            let persona = self.registry.require(&participant.persona_id)?;
            let turn = self
                .generate_turn(
                    persona,
                    message,
                    context,
                    participant.interest,
                    occasion,
                    cancel,
                )
                .await?;

            let cancelled = turn.kind == TurnKind::Cancelled;
            turns.push(turn);
            if cancelled {
                tracing::info!(
                    "[Orchestrator] Cycle cancelled, {} personas skipped",
                    participants.len() - turns.len()
                );
                break;
            }
        }

        Ok(turns)
    }

    /// Generates every participant's turn with a single call.
    ///
    /// Blocks are matched to participants by name, first block wins; blocks
    /// from anyone else are dropped and participants without a block stay
    /// silent. A failed or cancelled call yields one apology or cancelled
    /// turn from the first participant.
    async fn generate_joint(
        &self,
        participants: &[Participant],
        message: &str,
        context: &ConversationContext,
        occasion: &Occasion,
        cancel: &CancellationToken,
    ) -> Result<Vec<Turn>> {
        let Some(lead) = participants.first() else {
            return Ok(Vec::new());
        };
        let mut members = Vec::with_capacity(participants.len());
        for participant in participants {
            members.push(BatchMember {
                persona: self.registry.require(&participant.persona_id)?,
                interest: participant.interest,
            });
        }
        let lead_persona = members[0].persona;

        let request = self
            .composer
            .compose_batch(&members, message, context, occasion)?;

        let generation = match self
            .controller
            .invoke(self.service.as_ref(), &request, cancel)
            .await
        {
            Ok(generation) => generation,
            Err(FallbackError::Cancelled) => {
                tracing::info!("[Orchestrator] Joint cycle cancelled");
                return Ok(vec![Turn::cancelled(
                    &lead_persona.id,
                    &lead_persona.name,
                    lead.interest,
                )]);
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Joint reply failed: {}", e);
                return Ok(vec![Turn::apology(
                    &lead_persona.id,
                    &lead_persona.name,
                    lead.interest,
                )]);
            }
        };

        let mut spoken = HashSet::new();
        let turns: Vec<Turn> = parse_batch_reply(&generation.text)
            .into_iter()
            .filter_map(|line| {
                let Some(member) = members
                    .iter()
                    .find(|m| m.persona.name.eq_ignore_ascii_case(&line.speaker))
                else {
                    tracing::debug!(
                        "[Orchestrator] Dropping block from non-participant '{}'",
                        line.speaker
                    );
                    return None;
                };
                if !spoken.insert(member.persona.id.as_str()) {
                    return None;
                }
                Some(Turn::spoken(
                    &member.persona.id,
                    &member.persona.name,
                    line.text,
                    member.interest,
                    generation.model.as_str(),
                ))
            })
            .collect();

        tracing::debug!(
            "[Orchestrator] Joint reply via {} gave {}/{} participants a turn",
            generation.model,
            turns.len(),
            participants.len()
        );
        Ok(turns)
    }

    /// Generates one persona's turn.
    ///
    /// Only a malformed persona is an error; generation failures become
    /// apology turns and cancellation a cancelled turn.
    async fn generate_turn(
        &self,
        persona: &Persona,
        message: &str,
        context: &ConversationContext,
        interest: InterestLevel,
        occasion: &Occasion,
        cancel: &CancellationToken,
    ) -> Result<Turn> {
        let request = self
            .composer
            .compose_for(persona, message, context, interest, occasion)?;

        let turn = match self
            .controller
            .invoke(self.service.as_ref(), &request, cancel)
            .await
        {
            Ok(generation) => {
                tracing::debug!(
                    "[Orchestrator] {} spoke via {} after {} attempt(s)",
                    persona.name,
                    generation.model,
                    generation.attempts
                );
                Turn::spoken(
                    &persona.id,
                    &persona.name,
                    generation.text,
                    interest,
                    generation.model,
                )
            }
            Err(FallbackError::Cancelled) => Turn::cancelled(&persona.id, &persona.name, interest),
            Err(e) => {
                tracing::warn!("[Orchestrator] {} could not respond: {}", persona.name, e);
                Turn::apology(&persona.id, &persona.name, interest)
            }
        };
        Ok(turn)
    }

    /// Schedules the batch, records the spoken turns and builds the report.
    ///
    /// History write failures are logged, not returned: the turns were already
    /// generated and the caller still gets to deliver them.
    async fn finish(
        &self,
        kind: CycleKind,
        topic: Option<String>,
        turns: Vec<Turn>,
        participants: Vec<Participant>,
        mode: &ScheduleMode,
    ) -> Result<CycleReport> {
        let mut plan = {
            let mut rng = self.rng();
            self.scheduler.schedule(turns, mode, &mut *rng)?
        };
        plan.stamp(Utc::now());

        for turn in plan.turns().filter(|t| t.is_spoken()) {
            if let Err(e) = self.history.append(&HistoryEntry::from(turn)).await {
                tracing::error!(
                    "[Orchestrator] Failed to record {}'s turn: {}",
                    turn.persona_name,
                    e
                );
            }
        }

        let spoken = plan.turns().filter(|t| t.is_spoken()).count();
        let report = CycleReport {
            kind,
            topic,
            plan,
            participants,
            model_after: self.controller.active(),
        };
        tracing::info!(
            "[Orchestrator] {} cycle finished: {}/{} turns spoken, model {}",
            kind,
            spoken,
            report.plan.len(),
            report.model_after
        );
        Ok(report)
    }

    fn empty_report(&self, kind: CycleKind) -> CycleReport {
        CycleReport {
            kind,
            topic: None,
            plan: DeliveryPlan::default(),
            participants: Vec::new(),
            model_after: self.controller.active(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = BusyGuard::try_acquire(&flag).unwrap();
            assert!(flag.load(Ordering::Acquire));
            assert!(BusyGuard::try_acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::Acquire));
        assert!(BusyGuard::try_acquire(&flag).is_some());
    }

    #[test]
    fn test_cycle_kind_display() {
        assert_eq!(CycleKind::KeywordDrill.to_string(), "keyword_drill");
        assert_eq!(CycleKind::Reply.to_string(), "reply");
    }
}
