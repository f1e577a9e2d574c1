//! Turn orchestration.
//!
//! One turn moves through `Idle -> AwaitingResponse -> {Dispatching | Rendering} -> Idle`:
//! the user turn is appended, the completion API is called with the system
//! instruction plus a bounded window of recent turns, and the response is
//! either rendered as text or dispatched as a tool directive. Every turn ends
//! with exactly one appended assistant turn, whatever went wrong on the way.

use crate::directive::{self, ParsedResponse};
use crate::llm::{CompletionClient, CompletionRequest};
use crate::models::Turn;
use crate::session::Session;
use crate::storage::Store;
use crate::tools;
use serde::Serialize;
use std::time::Duration;

/// Default number of transcript turns sent with each request.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Default completion timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shown when the model answers with nothing.
pub const EMPTY_RESPONSE_FALLBACK: &str =
    "I got an empty response from the API. Try again, or switch the model.";

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingResponse,
    Dispatching,
    Rendering,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Plain-text answer from the model
    Reply,
    /// A tool ran (or was refused) and its result is the answer
    Tool,
    /// The model attempted a directive that did not parse
    DirectiveError,
    /// The completion call failed
    TransportError,
}

/// The assistant turn appended at the end of a turn, with how it came about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub kind: OutcomeKind,
    /// Tool name for `Tool` outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub text: String,
}

/// Per-request settings.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub model: String,
    /// Number of most recent transcript turns sent with each request
    pub history_window: usize,
    pub timeout: Duration,
}

impl TurnSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            history_window: DEFAULT_HISTORY_WINDOW,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Drives conversational turns against a completion client and the store.
pub struct Orchestrator<C> {
    client: C,
    store: Store,
    settings: TurnSettings,
    instruction: String,
    state: TurnState,
}

impl<C: CompletionClient> Orchestrator<C> {
    pub fn new(client: C, store: Store, settings: TurnSettings) -> Self {
        Self {
            client,
            store,
            settings,
            instruction: tools::system_instruction(),
            state: TurnState::Idle,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Process one user message to completion.
    pub fn run_turn(&mut self, session: &mut Session, input: &str) -> TurnOutcome {
        session.push(Turn::user(input.trim()));
        self.transition(TurnState::AwaitingResponse);

        let request = self.build_request(session);
        let outcome = match self.client.complete(&request) {
            Ok(text) => self.handle_response(&text),
            Err(e) => {
                tracing::error!(error = %e, "completion call failed");
                self.transition(TurnState::Rendering);
                TurnOutcome {
                    kind: OutcomeKind::TransportError,
                    tool: None,
                    text: format!("Completion API error: {}", e),
                }
            }
        };

        session.push(Turn::assistant(outcome.text.clone()));
        self.transition(TurnState::Idle);
        outcome
    }

    fn handle_response(&mut self, text: &str) -> TurnOutcome {
        match directive::parse(text) {
            ParsedResponse::Directive(directive) => {
                self.transition(TurnState::Dispatching);
                let result = tools::dispatch(&mut self.store, &directive);
                TurnOutcome {
                    kind: OutcomeKind::Tool,
                    tool: Some(directive.tool),
                    text: result,
                }
            }
            ParsedResponse::Malformed(e) => {
                self.transition(TurnState::Dispatching);
                tracing::warn!(error = %e, "model sent a malformed directive");
                TurnOutcome {
                    kind: OutcomeKind::DirectiveError,
                    tool: None,
                    text: e.to_string(),
                }
            }
            ParsedResponse::PlainText(text) => {
                self.transition(TurnState::Rendering);
                let text = if text.is_empty() {
                    EMPTY_RESPONSE_FALLBACK.to_string()
                } else {
                    text
                };
                TurnOutcome {
                    kind: OutcomeKind::Reply,
                    tool: None,
                    text,
                }
            }
        }
    }

    /// System instruction followed by the most recent turns.
    fn build_request(&self, session: &Session) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.settings.history_window + 1);
        messages.push(Turn::system(self.instruction.clone()));
        messages.extend_from_slice(session.recent(self.settings.history_window));

        CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            timeout: self.settings.timeout,
        }
    }

    fn transition(&mut self, next: TurnState) {
        tracing::debug!(from = ?self.state, to = ?next, "turn state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TransportError;
    use crate::models::{Role, TaskStatus};
    use crate::test_utils::TestEnv;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays scripted responses and records every request.
    #[derive(Default)]
    struct ScriptedClient {
        responses: RefCell<VecDeque<Result<String, TransportError>>>,
        requests: RefCell<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn replying(responses: Vec<Result<String, TransportError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for &ScriptedClient {
        fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn orchestrator(env: &TestEnv, client: &ScriptedClient) -> Orchestrator<&ScriptedClient> {
        Orchestrator::new(client, env.open_store(), TurnSettings::new("test-model"))
    }

    #[test]
    fn test_plain_text_reply_is_appended() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![Ok("Hello there".to_string())]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        let outcome = orch.run_turn(&mut session, "hi");

        assert_eq!(outcome.kind, OutcomeKind::Reply);
        assert_eq!(outcome.text, "Hello there");
        assert_eq!(
            session.turns(),
            &[Turn::user("hi"), Turn::assistant("Hello there")]
        );
        assert_eq!(orch.state(), TurnState::Idle);
    }

    #[test]
    fn test_empty_reply_uses_fallback() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![Ok("  \n ".to_string())]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        let outcome = orch.run_turn(&mut session, "hi");

        assert_eq!(outcome.kind, OutcomeKind::Reply);
        assert_eq!(outcome.text, EMPTY_RESPONSE_FALLBACK);
        assert_eq!(session.last().unwrap().content, EMPTY_RESPONSE_FALLBACK);
    }

    #[test]
    fn test_directive_runs_tool_and_appends_result() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![Ok(
            r#"{"tool":"add_note","args":{"text":"buy milk"}}"#.to_string(),
        )]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        let outcome = orch.run_turn(&mut session, "remember to buy milk");

        let note = &orch.store().list_notes(1).unwrap()[0];
        assert_eq!(note.content, "buy milk");
        assert_eq!(outcome.kind, OutcomeKind::Tool);
        assert_eq!(outcome.tool.as_deref(), Some("add_note"));
        assert_eq!(outcome.text, format!("Saved note #{}.", note.id));
        assert_eq!(session.last().unwrap(), &Turn::assistant(outcome.text.clone()));
    }

    #[test]
    fn test_unknown_tool_keeps_conversation_going() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![
            Ok(r#"{"tool":"nonexistent"}"#.to_string()),
            Ok("Sorry about that.".to_string()),
        ]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        let first = orch.run_turn(&mut session, "do something odd");
        assert_eq!(first.kind, OutcomeKind::Tool);
        assert_eq!(first.text, "Unknown tool: nonexistent");

        let second = orch.run_turn(&mut session, "never mind");
        assert_eq!(second.text, "Sorry about that.");
        assert_eq!(session.len(), 4);
    }

    #[test]
    fn test_malformed_directive_is_rendered_not_retried() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![Ok("{not json}".to_string())]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        let outcome = orch.run_turn(&mut session, "hi");

        assert_eq!(outcome.kind, OutcomeKind::DirectiveError);
        assert!(outcome.text.starts_with("Error:"));
        assert_eq!(client.requests.borrow().len(), 1);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_transport_failure_appends_one_error_turn() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![
            Ok("first answer".to_string()),
            Err(TransportError::Network("timed out".to_string())),
        ]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        orch.run_turn(&mut session, "first");
        let before = session.turns().to_vec();

        let outcome = orch.run_turn(&mut session, "second");

        assert_eq!(outcome.kind, OutcomeKind::TransportError);
        assert!(outcome.text.contains("timed out"));
        assert_eq!(session.len(), before.len() + 2);
        assert_eq!(&session.turns()[..before.len()], before.as_slice());
        assert_eq!(session.turns()[before.len()], Turn::user("second"));
        let last = session.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with("Completion API error:"));
        assert_eq!(orch.state(), TurnState::Idle);
    }

    #[test]
    fn test_request_starts_with_instruction_then_transcript() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![Ok("ok".to_string())]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::with_greeting("Hey!");

        orch.run_turn(&mut session, "hi");

        let requests = client.requests.borrow();
        let request = &requests[0];
        assert_eq!(request.model, "test-model");
        assert_eq!(request.timeout, DEFAULT_TIMEOUT);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("add_note"));
        assert_eq!(
            &request.messages[1..],
            &[Turn::assistant("Hey!"), Turn::user("hi")]
        );
    }

    #[test]
    fn test_request_window_is_bounded() {
        let env = TestEnv::new();
        let client = ScriptedClient::default();
        let settings = TurnSettings {
            history_window: 3,
            ..TurnSettings::new("test-model")
        };
        let mut orch = Orchestrator::new(&client, env.open_store(), settings);
        let mut session = Session::new();

        for i in 0..5 {
            orch.run_turn(&mut session, &format!("message {}", i));
        }

        let requests = client.requests.borrow();
        let last = requests.last().unwrap();
        assert_eq!(last.messages.len(), 4);
        assert_eq!(last.messages[0].role, Role::System);
        assert_eq!(last.messages[3], Turn::user("message 4"));
        assert_eq!(session.len(), 10);
    }

    #[test]
    fn test_tool_results_feed_later_requests() {
        let env = TestEnv::new();
        let client = ScriptedClient::replying(vec![
            Ok(r#"{"tool":"add_task","args":{"text":"file taxes"}}"#.to_string()),
            Ok("Done.".to_string()),
        ]);
        let mut orch = orchestrator(&env, &client);
        let mut session = Session::new();

        let added = orch.run_turn(&mut session, "add a task to file taxes");
        orch.run_turn(&mut session, "thanks");

        let requests = client.requests.borrow();
        assert!(requests[1]
            .messages
            .iter()
            .any(|m| m.role == Role::Assistant && m.content == added.text));
        assert_eq!(
            orch.store().list_tasks(TaskStatus::Open, 10).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_outcome_serializes_kind_snake_case() {
        let outcome = TurnOutcome {
            kind: OutcomeKind::TransportError,
            tool: None,
            text: "x".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "transport_error", "text": "x"})
        );
    }
}
