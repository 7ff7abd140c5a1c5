//! Conversation engine: drives the questionnaire one answer at a time.
//!
//! Each accepted answer is echoed, sent to the step client, and the reply
//! decides what happens next:
//!
//! - `Error`: show it, re-offer the same input (no advance).
//! - `Blocked`: show the message as the bot, offer only a restart.
//! - `Ok`: render the step's follow-up messages (paced), advance, and
//!   present the next phase's input.

use std::sync::Arc;

use tracing::{info, warn};

use super::script::{self, Prompt};
use super::{Phase, Session};
use crate::chat::{Answer, ChatView, InputSurface, Message, NullView, Transcript};
use crate::client::{StepClient, StepResponse};
use crate::config::WizardConfig;

/// What handling an answer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The answer was not accepted (locked surface, wrong shape, terminal).
    Ignored,
    /// The processor rejected the answer; the same step is offered again.
    Retry,
    /// Moved on to the given phase.
    Advanced(Phase),
    Blocked,
    Completed,
}

pub struct Conversation {
    session: Session,
    transcript: Transcript,
    surface: InputSurface,
    client: StepClient,
    paced: bool,
}

impl Conversation {
    pub fn new(client: StepClient, config: &WizardConfig, view: Arc<dyn ChatView>) -> Self {
        Self {
            session: Session::new(),
            transcript: Transcript::new(Arc::clone(&view)),
            surface: InputSurface::new(view),
            client,
            paced: config.pacing,
        }
    }

    /// Engine with no display and no pacing.
    pub fn headless(client: StepClient) -> Self {
        let config = WizardConfig {
            pacing: false,
            ..WizardConfig::default()
        };
        Self::new(client, &config, Arc::new(NullView))
    }

    /// Begin at the first step with the welcome message.
    pub fn start(&mut self) {
        self.session.reset();
        info!(session = %self.session.id(), "Conversation started");
        self.transcript.append(Message::bot(script::WELCOME));
        self.present(self.session.phase());
    }

    /// Throw away the session and transcript, then start over.
    pub fn restart(&mut self) {
        info!(session = %self.session.id(), phase = %self.session.phase(), "Conversation restarted");
        self.surface.lock();
        self.transcript.clear();
        self.start();
    }

    /// Submit the text field.
    pub async fn submit_text(&mut self, raw: &str) -> Outcome {
        match self.surface.submit_text(raw) {
            Some(answer) => self.handle_answer(answer).await,
            None => Outcome::Ignored,
        }
    }

    /// Pick the option at 1-based `position`.
    pub async fn select_option(&mut self, position: usize) -> Outcome {
        match self.surface.select(position) {
            Some(answer) => self.handle_answer(answer).await,
            None => Outcome::Ignored,
        }
    }

    /// Press the terminal restart button. Returns whether it was live.
    pub fn press_restart(&mut self) -> bool {
        if self.surface.activate_restart() {
            self.restart();
            true
        } else {
            false
        }
    }

    /// Process one answer for the current phase.
    pub async fn handle_answer(&mut self, answer: Answer) -> Outcome {
        let phase = self.session.phase();
        let (Some(endpoint), Some(payload)) = (phase.endpoint(), script::payload(phase, &answer))
        else {
            warn!(%phase, ?answer, "Answer does not fit the current step");
            return Outcome::Ignored;
        };

        self.surface.lock();
        self.transcript.append(Message::user(answer.echo()));

        let response = self.client.submit(&mut self.session, endpoint, payload).await;
        let next = script::transition(phase, &response);

        match response {
            StepResponse::Error(message) => {
                self.transcript.append(Message::error(message));
                self.present(phase);
                Outcome::Retry
            }
            StepResponse::Blocked(message) => {
                self.transcript.append(Message::bot(message));
                self.move_to(next.unwrap_or(Phase::Blocked));
                info!(session = %self.session.id(), %phase, "Conversation blocked");
                self.surface.show_terminal();
                Outcome::Blocked
            }
            StepResponse::Ok(reply) => {
                let mut renders = script::follow_ups(phase, &reply, &self.session);
                renders.drain(&mut self.transcript, self.paced).await;

                let next = next.unwrap_or(Phase::Completed);
                self.move_to(next);
                self.present(next);

                if next == Phase::Completed {
                    info!(
                        session = %self.session.id(),
                        plan = ?self.session.selected_plan(),
                        "Questionnaire completed"
                    );
                    Outcome::Completed
                } else {
                    Outcome::Advanced(next)
                }
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn surface(&self) -> &InputSurface {
        &self.surface
    }

    fn move_to(&mut self, target: Phase) {
        let from = self.session.phase();
        match self.session.advance_to(target) {
            Ok(_) => info!(session = %self.session.id(), %from, to = %target, "Phase changed"),
            Err(e) => warn!(session = %self.session.id(), "Failed to advance: {}", e),
        }
    }

    fn present(&mut self, phase: Phase) {
        match script::prompt(phase) {
            Prompt::FreeText { placeholder } => self.surface.show_text_prompt(placeholder),
            Prompt::SingleChoice { options } => self.surface.show_options(options),
            Prompt::Restart => self.surface.show_terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use crate::chat::{Role, SurfaceConfig};
    use crate::client::{Endpoint, GENERIC_ERROR, StepProcessor};
    use crate::error::ClientError;

    /// Replies from a per-endpoint queue; falls back to a plain message.
    #[derive(Default)]
    struct ScriptedProcessor {
        replies: Mutex<HashMap<Endpoint, VecDeque<Value>>>,
        calls: Mutex<Vec<(Endpoint, Value)>>,
    }

    impl ScriptedProcessor {
        fn reply(&self, endpoint: Endpoint, body: Value) {
            self.replies
                .lock()
                .unwrap()
                .entry(endpoint)
                .or_default()
                .push_back(body);
        }

        fn calls(&self) -> Vec<(Endpoint, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepProcessor for ScriptedProcessor {
        async fn call(
            &self,
            _session_id: Uuid,
            endpoint: Endpoint,
            payload: Value,
        ) -> Result<Value, ClientError> {
            self.calls.lock().unwrap().push((endpoint, payload));
            let scripted = self
                .replies
                .lock()
                .unwrap()
                .get_mut(&endpoint)
                .and_then(|q| q.pop_front());
            match scripted {
                Some(Value::Null) => Err(ClientError::RequestFailed {
                    endpoint,
                    reason: "connection reset".to_string(),
                }),
                Some(body) => Ok(body),
                None if endpoint == Endpoint::SelectPreference => Ok(json!({
                    "plan": "Comprehensive", "premium": 250, "life": 100, "critical": 80, "medical": 70
                })),
                None => Ok(json!({ "message": format!("{endpoint} ok") })),
            }
        }
    }

    fn engine() -> (Conversation, Arc<ScriptedProcessor>) {
        let processor = Arc::new(ScriptedProcessor::default());
        let mut conversation = Conversation::headless(StepClient::new(processor.clone()));
        conversation.start();
        (conversation, processor)
    }

    async fn answer_all(conversation: &mut Conversation) {
        assert_eq!(conversation.submit_text("Aisyah").await, Outcome::Advanced(Phase::AwaitingDob));
        assert_eq!(
            conversation.submit_text("01/02/1990").await,
            Outcome::Advanced(Phase::AwaitingInsuranceLevel)
        );
        assert_eq!(conversation.select_option(2).await, Outcome::Advanced(Phase::AwaitingTiming));
        assert_eq!(conversation.select_option(1).await, Outcome::Advanced(Phase::AwaitingIncome));
        assert_eq!(conversation.select_option(4).await, Outcome::Advanced(Phase::AwaitingPhone));
        assert_eq!(
            conversation.submit_text("0123456789").await,
            Outcome::Advanced(Phase::AwaitingPreference)
        );
        assert_eq!(conversation.select_option(3).await, Outcome::Advanced(Phase::AwaitingEmail));
        assert_eq!(
            conversation.submit_text("aisyah@example.com").await,
            Outcome::Advanced(Phase::AwaitingSignup)
        );
        assert_eq!(conversation.select_option(1).await, Outcome::Completed);
    }

    #[tokio::test]
    async fn start_welcomes_and_asks_for_name() {
        let (conversation, _) = engine();
        assert_eq!(conversation.phase(), Phase::AwaitingName);
        assert_eq!(conversation.transcript().roles(), vec![Role::Bot]);
        assert_eq!(conversation.transcript().messages()[0].raw(), script::WELCOME);
        assert_eq!(
            conversation.surface().config(),
            Some(&SurfaceConfig::Text {
                placeholder: "Enter your name".into()
            })
        );
        assert!(conversation.surface().is_live());
    }

    #[tokio::test]
    async fn answer_is_echoed_before_the_reply() {
        let (mut conversation, processor) = engine();
        processor.reply(Endpoint::SubmitName, json!({"message": "Hello Aisyah!"}));

        conversation.submit_text("  Aisyah ").await;

        let messages = conversation.transcript().messages();
        assert_eq!(messages[1], Message::user("Aisyah"));
        assert_eq!(messages[2], Message::bot("Hello Aisyah!"));
        assert_eq!(processor.calls(), vec![(Endpoint::SubmitName, json!({"name": "Aisyah"}))]);
    }

    #[tokio::test]
    async fn blank_text_sends_nothing() {
        let (mut conversation, processor) = engine();
        assert_eq!(conversation.submit_text("   ").await, Outcome::Ignored);
        assert!(processor.calls().is_empty());
        assert_eq!(conversation.transcript().len(), 1);
    }

    #[tokio::test]
    async fn error_reply_keeps_the_same_step_open() {
        let (mut conversation, processor) = engine();
        conversation.submit_text("Aisyah").await;
        processor.reply(Endpoint::SubmitDob, json!({"error": "Please enter date in DD/MM/YYYY format."}));

        assert_eq!(conversation.submit_text("yesterday").await, Outcome::Retry);
        assert_eq!(conversation.phase(), Phase::AwaitingDob);
        assert_eq!(conversation.transcript().last().unwrap().role, Role::Error);
        assert_eq!(
            conversation.surface().config(),
            Some(&SurfaceConfig::Text {
                placeholder: "DD/MM/YYYY".into()
            })
        );
        assert!(conversation.surface().is_live());

        assert_eq!(
            conversation.submit_text("01/02/1990").await,
            Outcome::Advanced(Phase::AwaitingInsuranceLevel)
        );
    }

    #[tokio::test]
    async fn error_on_option_step_reoffers_same_options() {
        let (mut conversation, processor) = engine();
        conversation.submit_text("Aisyah").await;
        conversation.submit_text("01/02/1990").await;
        processor.reply(Endpoint::SelectInsurance, json!({"error": "Try again"}));

        assert_eq!(conversation.select_option(3).await, Outcome::Retry);
        assert_eq!(conversation.phase(), Phase::AwaitingInsuranceLevel);
        assert_eq!(
            conversation.surface().config(),
            Some(&SurfaceConfig::Options {
                labels: script::INSURANCE_OPTIONS.iter().map(|s| s.to_string()).collect()
            })
        );
        assert!(conversation.surface().is_live());
    }

    #[tokio::test]
    async fn transport_failure_shows_generic_error() {
        let (mut conversation, processor) = engine();
        processor.reply(Endpoint::SubmitName, Value::Null);

        assert_eq!(conversation.submit_text("Aisyah").await, Outcome::Retry);
        let last = conversation.transcript().last().unwrap();
        assert_eq!(last, &Message::error(GENERIC_ERROR));
        assert_eq!(conversation.phase(), Phase::AwaitingName);
    }

    #[tokio::test]
    async fn blocked_dob_ends_with_restart_only() {
        let (mut conversation, processor) = engine();
        conversation.submit_text("Aisyah").await;
        processor.reply(
            Endpoint::SubmitDob,
            json!({"blocked": true, "message": "Sorry, not eligible"}),
        );

        assert_eq!(conversation.submit_text("01/02/2015").await, Outcome::Blocked);
        assert_eq!(conversation.phase(), Phase::Blocked);
        assert_eq!(
            conversation.transcript().last().unwrap(),
            &Message::bot("Sorry, not eligible")
        );
        assert_eq!(conversation.surface().config(), Some(&SurfaceConfig::Terminal));

        // Nothing else reaches the processor.
        assert_eq!(conversation.submit_text("more").await, Outcome::Ignored);
        assert_eq!(conversation.select_option(1).await, Outcome::Ignored);
        assert_eq!(
            conversation.handle_answer(Answer::Text("direct".into())).await,
            Outcome::Ignored
        );
        assert_eq!(processor.calls().len(), 2);
    }

    #[tokio::test]
    async fn option_positions_become_levels() {
        let (mut conversation, processor) = engine();
        answer_all(&mut conversation).await;

        let sent: Vec<Value> = processor.calls().into_iter().map(|(_, p)| p).collect();
        assert_eq!(sent[2], json!({"insurance": 2}));
        assert_eq!(sent[3], json!({"timing": 1}));
        assert_eq!(sent[4], json!({"income": 4}));
        assert_eq!(sent[6], json!({"level": 3}));
        assert_eq!(sent[8], json!({"interested": true}));
    }

    #[tokio::test]
    async fn declining_signup_sends_not_interested() {
        let (mut conversation, processor) = engine();
        conversation.submit_text("Aisyah").await;
        conversation.submit_text("01/02/1990").await;
        conversation.select_option(1).await;
        conversation.select_option(1).await;
        conversation.select_option(1).await;
        conversation.submit_text("0123456789").await;
        conversation.select_option(1).await;
        conversation.submit_text("aisyah@example.com").await;

        assert_eq!(conversation.select_option(2).await, Outcome::Completed);
        let (endpoint, payload) = processor.calls().pop().unwrap();
        assert_eq!(endpoint, Endpoint::SelectSignup);
        assert_eq!(payload, json!({"interested": false}));
    }

    #[tokio::test]
    async fn full_run_ends_with_confirmation_then_backend_message() {
        let (mut conversation, processor) = engine();
        processor.reply(Endpoint::SelectSignup, json!({"message": "Thank you for contacting us."}));

        answer_all(&mut conversation).await;

        let messages = conversation.transcript().messages();
        let n = messages.len();
        assert_eq!(messages[n - 2], Message::bot(script::SIGNUP_CONFIRMATION));
        assert_eq!(messages[n - 1], Message::bot("Thank you for contacting us."));
        assert_eq!(conversation.phase(), Phase::Completed);
        assert_eq!(conversation.surface().config(), Some(&SurfaceConfig::Terminal));

        let endpoints: Vec<Endpoint> = processor.calls().into_iter().map(|(e, _)| e).collect();
        assert_eq!(endpoints, Endpoint::ALL.to_vec());
    }

    #[tokio::test]
    async fn preference_breakdown_and_plan_survive_in_session() {
        let (mut conversation, processor) = engine();
        answer_all(&mut conversation).await;

        let texts: Vec<String> = conversation
            .transcript()
            .messages()
            .iter()
            .map(|m| m.to_plain())
            .collect();
        let breakdown = texts
            .iter()
            .find(|t| t.contains("estimated monthly premium"))
            .expect("breakdown rendered");
        assert!(breakdown.contains("RM 250"));
        assert!(breakdown.contains("RM 100"));
        assert!(breakdown.contains("RM 80"));
        assert!(breakdown.contains("RM 70"));
        assert!(texts.iter().any(|t| t.contains("**Comprehensive**")));

        let preference_calls = processor
            .calls()
            .iter()
            .filter(|(e, _)| *e == Endpoint::SelectPreference)
            .count();
        assert_eq!(preference_calls, 1);
        assert_eq!(conversation.session().selected_plan(), Some("Comprehensive"));
    }

    #[tokio::test]
    async fn restart_from_terminal_is_total() {
        let (mut conversation, _) = engine();
        answer_all(&mut conversation).await;
        let old_session = conversation.session().id();

        assert!(conversation.press_restart());

        assert_eq!(conversation.phase(), Phase::AwaitingName);
        assert_eq!(conversation.session().selected_plan(), None);
        assert_ne!(conversation.session().id(), old_session);
        assert_eq!(conversation.transcript().roles(), vec![Role::Bot]);
        assert!(!conversation.press_restart(), "text prompt has no restart button");
    }

    #[tokio::test]
    async fn restart_mid_conversation_and_twice() {
        let (mut conversation, _) = engine();
        conversation.submit_text("Aisyah").await;
        conversation.restart();
        conversation.restart();
        assert_eq!(conversation.phase(), Phase::AwaitingName);
        assert_eq!(conversation.transcript().len(), 1);
    }

    #[tokio::test]
    async fn repeated_session_has_identical_structure() {
        let (mut conversation, _) = engine();
        answer_all(&mut conversation).await;
        let first: Vec<Message> = conversation.transcript().messages().to_vec();

        conversation.restart();
        answer_all(&mut conversation).await;

        assert_eq!(conversation.transcript().messages(), first.as_slice());
    }

    #[tokio::test]
    async fn reply_without_message_is_a_generic_error() {
        let (mut conversation, processor) = engine();
        processor.reply(Endpoint::SubmitName, json!({"detail": "boom"}));

        assert_eq!(conversation.submit_text("Aisyah").await, Outcome::Retry);
        assert_eq!(conversation.phase(), Phase::AwaitingName);
        assert_eq!(conversation.transcript().last().unwrap(), &Message::error(GENERIC_ERROR));
        assert!(conversation.surface().is_live());
    }

    /// Logs every display change in order.
    #[derive(Default)]
    struct RecordingView {
        events: Mutex<Vec<String>>,
    }

    impl ChatView for RecordingView {
        fn message_appended(&self, message: &Message) {
            self.events.lock().unwrap().push(format!("message {}", message.raw()));
        }

        fn cleared(&self) {
            self.events.lock().unwrap().push("cleared".to_string());
        }

        fn surface_changed(&self, surface: &InputSurface) {
            let kind = match surface.config() {
                Some(SurfaceConfig::Text { .. }) => "text",
                Some(SurfaceConfig::Options { .. }) => "options",
                Some(SurfaceConfig::Terminal) => "terminal",
                None => "none",
            };
            let state = if surface.is_live() { "live" } else { "locked" };
            self.events.lock().unwrap().push(format!("surface {kind} {state}"));
        }
    }

    #[tokio::test]
    async fn paced_renders_land_before_the_next_surface() {
        let processor = Arc::new(ScriptedProcessor::default());
        let view = Arc::new(RecordingView::default());
        let config = WizardConfig {
            pacing: true,
            ..WizardConfig::default()
        };
        let mut conversation = Conversation::new(StepClient::new(processor), &config, view.clone());
        conversation.start();
        conversation.submit_text("Aisyah").await;
        conversation.submit_text("01/02/1990").await;
        conversation.select_option(1).await;
        conversation.select_option(1).await;
        conversation.select_option(1).await;
        view.events.lock().unwrap().clear();

        let started = std::time::Instant::now();
        assert_eq!(
            conversation.submit_text("0123456789").await,
            Outcome::Advanced(Phase::AwaitingPreference)
        );
        assert!(started.elapsed() >= std::time::Duration::from_millis(600));

        let events = view.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "surface text locked".to_string(),
                "message 0123456789".to_string(),
                "message submit_phone ok".to_string(),
                format!("message {}", script::PLAN_QUESTION),
                "surface options live".to_string(),
            ]
        );
    }
}
