use super::*;
use crate::application::tooling::{ToolCatalog, ToolContent, ToolInvokeError, ToolServerInterface};
use crate::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use crate::types::{ChatMessage, MessageRole, ToolCallRequest, ToolDefinition};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct StubBridge {
    calls: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
}

impl StubBridge {
    async fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ToolServerInterface for StubBridge {
    fn endpoint(&self) -> &str {
        "stub"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolInvokeError> {
        Ok(vec![
            ToolDefinition {
                name: "list_directory".into(),
                description: "List the contents of a directory".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"directory_path": {"type": "string"}}
                }),
            },
            ToolDefinition {
                name: "read_file".into(),
                description: "Read the contents of a file".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"file_path": {"type": "string"}}
                }),
            },
        ])
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ToolContent>, ToolInvokeError> {
        self.calls
            .lock()
            .await
            .push((tool.to_string(), arguments.clone()));
        let text = match tool {
            "list_directory" => r#"[{"name": "a.txt", "type": "file", "size": 5}]"#.to_string(),
            other => format!("{other} ran with {}", Value::Object(arguments)),
        };
        Ok(vec![ToolContent::text(text)])
    }

    async fn close(&self) {}
}

#[derive(Clone)]
struct ScriptedProvider {
    responses: Arc<Mutex<Vec<ChatMessage>>>,
    recordings: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ChatMessage>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            recordings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn requests(&self) -> Vec<ModelRequest> {
        self.recordings.lock().await.clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.recordings.lock().await.push(request);
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(ModelError::invalid_response("scripted", "script exhausted"));
        }
        Ok(ModelResponse {
            message: responses.remove(0),
        })
    }
}

fn call(id: &str, tool: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest::new(id, tool, arguments.as_object().cloned().unwrap_or_default())
}

fn final_answer(text: &str) -> ChatMessage {
    ChatMessage::assistant(Some(text.to_string()), Vec::new())
}

async fn session_with(
    provider: ScriptedProvider,
    bridge: StubBridge,
    options: SessionOptions,
) -> Session<ScriptedProvider> {
    let catalog = ToolCatalog::discover(Arc::new(bridge))
        .await
        .expect("catalog");
    Session::new(provider, catalog, "system prompt", options)
}

#[tokio::test]
async fn session_returns_final_response_without_tools() {
    let provider = ScriptedProvider::new(vec![final_answer("hello there")]);
    let mut session = session_with(provider.clone(), StubBridge::default(), SessionOptions::default()).await;

    let outcome = session
        .submit("hello", &mut |_| {})
        .await
        .expect("turn succeeds");

    assert_eq!(outcome.response.as_deref(), Some("hello there"));
    assert!(outcome.steps.is_empty());
    assert_eq!(session.state(), LoopState::AwaitingUserInput);

    let records = provider.requests().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tools.len(), 2);
    assert!(records[0].tools.iter().all(|tool| tool.strict));
    let roles: Vec<_> = records[0].messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::System, MessageRole::User]);
}

#[tokio::test]
async fn list_files_scenario_reaches_done() {
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant(
            None,
            vec![call("call_1", "list_directory", json!({"directory_path": "."}))],
        ),
        final_answer("The directory contains a.txt."),
    ]);
    let bridge = StubBridge::default();
    let mut session = session_with(provider.clone(), bridge.clone(), SessionOptions::default()).await;

    let mut events = Vec::new();
    let outcome = session
        .submit("list files in .", &mut |event| match event {
            SessionEvent::ToolStarted(call) => events.push(format!("start {}", call.name)),
            SessionEvent::ToolFinished(result) => {
                events.push(format!("finish {}", result.tool_call_id))
            }
        })
        .await
        .expect("turn succeeds");

    assert_eq!(outcome.response.as_deref(), Some("The directory contains a.txt."));
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].tool, "list_directory");
    assert_eq!(events, vec!["start list_directory", "finish call_1"]);

    let calls = bridge.calls().await;
    assert_eq!(calls[0].0, "list_directory");
    assert_eq!(calls[0].1["directory_path"], ".");

    let records = provider.requests().await;
    assert_eq!(records.len(), 2);
    let second = &records[1].messages;
    let roles: Vec<_> = second.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool
        ]
    );
    assert_eq!(second[3].tool_call_id.as_deref(), Some("call_1"));
    assert!(second[3].content_or_empty().contains("a.txt"));
}

#[tokio::test]
async fn tool_messages_follow_request_order() {
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant(
            None,
            vec![
                call("c", "read_file", json!({"file_path": "3.txt"})),
                call("a", "read_file", json!({"file_path": "1.txt"})),
                call("b", "list_directory", json!({"directory_path": "."})),
            ],
        ),
        final_answer("done"),
    ]);
    let bridge = StubBridge::default();
    let mut session = session_with(provider.clone(), bridge.clone(), SessionOptions::default()).await;

    let outcome = session.submit("go", &mut |_| {}).await.expect("turn succeeds");

    let step_ids: Vec<_> = outcome.steps.iter().map(|s| s.call_id.as_str()).collect();
    assert_eq!(step_ids, vec!["c", "a", "b"]);

    let history = session.conversation().messages();
    let tool_ids: Vec<_> = history
        .iter()
        .filter(|m| m.role == MessageRole::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(tool_ids, vec!["c", "a", "b"]);

    let executed: Vec<_> = bridge
        .calls()
        .await
        .into_iter()
        .map(|(_, args)| args.values().next().cloned().unwrap_or(Value::Null))
        .collect();
    assert_eq!(executed, vec![json!("3.txt"), json!("1.txt"), json!(".")]);
}

#[tokio::test]
async fn endless_tool_requests_hit_round_limit() {
    let responses = (0..3)
        .map(|round| {
            ChatMessage::assistant(
                None,
                vec![call(&format!("call_{round}"), "list_directory", json!({"directory_path": "."}))],
            )
        })
        .collect();
    let provider = ScriptedProvider::new(responses);
    let options = SessionOptions {
        max_tool_rounds: 2,
        ..SessionOptions::default()
    };
    let mut session = session_with(provider, StubBridge::default(), options).await;

    let err = session.submit("loop", &mut |_| {}).await.expect_err("limit");
    assert!(matches!(err, AgentError::StepLimit { limit: 2 }));
    assert_eq!(session.conversation().pending_calls(), 0);
}

#[tokio::test]
async fn model_failure_aborts_turn() {
    let provider = ScriptedProvider::new(Vec::new());
    let mut session = session_with(provider, StubBridge::default(), SessionOptions::default()).await;
    let err = session.submit("hi", &mut |_| {}).await.expect_err("fails");
    assert!(matches!(err, AgentError::Model(ModelError::InvalidResponse { .. })));
}

#[tokio::test]
async fn second_turn_reuses_call_ids() {
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant(
            None,
            vec![call("call_0", "list_directory", json!({"directory_path": "."}))],
        ),
        final_answer("first"),
        ChatMessage::assistant(
            None,
            vec![call("call_0", "read_file", json!({"file_path": "a.txt"}))],
        ),
        final_answer("second"),
    ]);
    let bridge = StubBridge::default();
    let mut session = session_with(provider, bridge.clone(), SessionOptions::default()).await;

    let first = session.submit("list", &mut |_| {}).await.expect("first turn");
    let second = session.submit("read", &mut |_| {}).await.expect("second turn");

    assert_eq!(first.response.as_deref(), Some("first"));
    assert_eq!(second.response.as_deref(), Some("second"));
    assert_eq!(bridge.calls().await.len(), 2);
    assert_eq!(session.conversation().pending_calls(), 0);

    let history = session.conversation().messages();
    let roles: Vec<_> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant,
        ]
    );
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_0"));
    assert_eq!(history[7].tool_call_id.as_deref(), Some("call_0"));
    assert!(history[7].content_or_empty().contains("a.txt"));
}

#[tokio::test]
async fn null_final_answer_is_stored() {
    let provider = ScriptedProvider::new(vec![ChatMessage::assistant(None, Vec::new())]);
    let mut session = session_with(provider, StubBridge::default(), SessionOptions::default()).await;

    let outcome = session.submit("hi", &mut |_| {}).await.expect("turn succeeds");

    assert_eq!(outcome.response, None);
    assert_eq!(session.state(), LoopState::AwaitingUserInput);
    let history = session.conversation().messages();
    assert_eq!(history.len(), 3);
    let last = &history[2];
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.content, None);
    assert!(last.tool_calls.is_empty());
}

#[test]
fn input_classification() {
    assert_eq!(classify_input("   "), InputAction::Skip);
    assert_eq!(classify_input("QUIT"), InputAction::Quit);
    assert_eq!(classify_input(" Exit "), InputAction::Quit);
    assert_eq!(classify_input(" list files "), InputAction::Submit("list files"));
}

#[tokio::test]
async fn console_prints_tool_progress_and_answer() {
    let provider = ScriptedProvider::new(vec![
        ChatMessage::assistant(
            None,
            vec![call("call_1", "list_directory", json!({"directory_path": "."}))],
        ),
        final_answer("One file."),
    ]);
    let mut session = session_with(provider, StubBridge::default(), SessionOptions::default()).await;

    let input: &[u8] = b"\nlist files in .\nquit\n";
    let mut out = Vec::new();
    run_console(&mut session, input, &mut out)
        .await
        .expect("console runs");

    let printed = String::from_utf8(out).expect("utf8");
    assert!(printed.contains("Found 2 tools:"));
    assert!(printed.contains("  - list_directory"));
    assert!(printed.contains(r#"[Executing: list_directory({"directory_path":"."})]"#));
    assert!(printed.contains("Assistant: One file."));
    assert!(printed.trim_end().ends_with("Goodbye!"));
}

#[tokio::test]
async fn console_treats_end_of_input_as_quit() {
    let provider = ScriptedProvider::new(Vec::new());
    let mut session = session_with(provider.clone(), StubBridge::default(), SessionOptions::default()).await;

    let input: &[u8] = b"";
    let mut out = Vec::new();
    run_console(&mut session, input, &mut out)
        .await
        .expect("console runs");

    assert!(String::from_utf8_lossy(&out).contains("Goodbye!"));
    assert!(provider.requests().await.is_empty());
}
