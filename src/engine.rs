//! Conversation engine: a per-turn state machine over an append-only
//! message history.
//!
//! Each turn starts by appending the user message and runs
//! DECIDE -> [RETRIEVE -> GENERATE] to completion. DECIDE offers the
//! retrieval tool to the chat model; a response without tool calls ends the
//! turn directly. The history is owned by the engine, keyed by a thread id
//! generated once at construction, and only ever appended to.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::errors::ChatbotError;
use crate::llm::{ChatModel, Message, ToolCall};
use crate::retrieval::{retrieve_tool_spec, RetrieveTool};

const DECIDE_GUIDELINES: &str = "You are a chatbot for a private document collection. \
Your task is to answer questions about the provided documents. \
You can access the documents with the 'retrieve' tool. \
Always use the 'retrieve' tool unless the user is merely greeting you. \
Do not respond to anything unrelated to the provided documents.";

const GENERATE_GUIDELINES: &str = "Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use ten sentences maximum and keep the answer concise. \
If the user asks for a list of items, present it as a numbered or bulleted list, as appropriate.";

/// Buffer size for streamed answer fragments.
const STREAM_BUFFER: usize = 32;

enum TurnState {
    Decide,
    /// Assistant message carrying the pending tool calls. It is committed to
    /// history together with its tool results, so a failed retrieval leaves
    /// the history with only the user message appended.
    Retrieve { request: Message },
    Generate,
    Done(Message),
}

/// One conversational session over an indexed document collection.
///
/// Turns on a thread run strictly sequentially; the history lock is held for
/// the whole turn.
#[derive(Clone)]
pub struct ConversationEngine {
    thread_id: String,
    model: Arc<dyn ChatModel>,
    retriever: RetrieveTool,
    history: Arc<Mutex<Vec<Message>>>,
}

impl ConversationEngine {
    pub fn new(model: Arc<dyn ChatModel>, retriever: RetrieveTool) -> Self {
        let thread_id = Uuid::new_v4().to_string();
        tracing::info!(%thread_id, "created conversation thread");
        Self {
            thread_id,
            model,
            retriever,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Snapshot of the thread's message history.
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Run one full turn and return the final assistant message.
    pub async fn submit_turn(&self, text: &str) -> Result<Message, ChatbotError> {
        let mut history = self.history.lock().await;
        history.push(Message::user(text));

        let mut state = TurnState::Decide;
        loop {
            state = match state {
                TurnState::Decide => self.decide(&mut history).await?,
                TurnState::Retrieve { request } => {
                    self.retrieve(&mut history, request).await?
                }
                TurnState::Generate => {
                    let prompt = generation_prompt(&history);
                    let response = self.model.invoke(&prompt, &[]).await?;
                    let answer = Message::assistant(response.content());
                    history.push(answer.clone());
                    TurnState::Done(answer)
                }
                TurnState::Done(answer) => {
                    tracing::debug!(thread_id = %self.thread_id, turn_messages = history.len(), "turn complete");
                    return Ok(answer);
                }
            };
        }
    }

    /// Run one full turn, surfacing fragments of the final assistant message
    /// as they arrive.
    ///
    /// No fragments are emitted for the decide or retrieve steps. The full
    /// assistant message is committed to history only once the underlying
    /// model call completes, so the history stays consistent even if the
    /// consumer stops pulling mid-stream.
    pub async fn submit_turn_streaming(
        &self,
        text: &str,
    ) -> mpsc::Receiver<Result<String, ChatbotError>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let engine = self.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            if let Err(err) = engine.run_streaming_turn(&text, &tx).await {
                let _ = tx.send(Err(err)).await;
            }
        });
        rx
    }

    async fn run_streaming_turn(
        &self,
        text: &str,
        tx: &mpsc::Sender<Result<String, ChatbotError>>,
    ) -> Result<(), ChatbotError> {
        let mut history = self.history.lock().await;
        history.push(Message::user(text));

        let mut state = TurnState::Decide;
        let mut streamed = false;
        loop {
            state = match state {
                TurnState::Decide => self.decide(&mut history).await?,
                TurnState::Retrieve { request } => {
                    self.retrieve(&mut history, request).await?
                }
                TurnState::Generate => {
                    streamed = true;
                    let prompt = generation_prompt(&history);
                    let mut fragments = self.model.stream(&prompt, &[]).await?;
                    let mut full = String::new();
                    while let Some(fragment) = fragments.recv().await {
                        let fragment = fragment?;
                        full.push_str(&fragment);
                        // A closed receiver means the consumer went away;
                        // keep draining so the committed message is complete.
                        let _ = tx.send(Ok(fragment)).await;
                    }
                    let answer = Message::assistant(full);
                    history.push(answer.clone());
                    TurnState::Done(answer)
                }
                TurnState::Done(answer) => {
                    if !streamed {
                        let _ = tx.send(Ok(answer.content().to_string())).await;
                    }
                    tracing::debug!(thread_id = %self.thread_id, turn_messages = history.len(), "turn complete");
                    return Ok(());
                }
            };
        }
    }

    /// DECIDE: let the model either answer directly or request retrieval.
    async fn decide(&self, history: &mut Vec<Message>) -> Result<TurnState, ChatbotError> {
        let mut prompt = Vec::with_capacity(history.len() + 1);
        prompt.push(Message::system(DECIDE_GUIDELINES));
        prompt.extend(history.iter().cloned());

        let response = self.model.invoke(&prompt, &[retrieve_tool_spec()]).await?;
        if response.requests_tools() {
            tracing::debug!(thread_id = %self.thread_id, calls = response.tool_calls().len(), "model requested retrieval");
            Ok(TurnState::Retrieve { request: response })
        } else {
            history.push(response.clone());
            Ok(TurnState::Done(response))
        }
    }

    /// RETRIEVE: execute the requested queries, then commit the requesting
    /// assistant message and its tool results.
    async fn retrieve(
        &self,
        history: &mut Vec<Message>,
        request: Message,
    ) -> Result<TurnState, ChatbotError> {
        let mut tool_results = Vec::with_capacity(request.tool_calls().len());
        for call in request.tool_calls() {
            let query = tool_query(call);
            let retrieval = self.retriever.retrieve(&query).await?;
            tool_results.push(Message::tool(retrieval.serialized, &call.id));
        }
        history.push(request);
        history.extend(tool_results);
        Ok(TurnState::Generate)
    }
}

/// Query string of a retrieval call; tolerates bare-string arguments.
fn tool_query(call: &ToolCall) -> String {
    match &call.arguments {
        Value::String(query) => query.clone(),
        other => other
            .get("query")
            .and_then(Value::as_str)
            .map(|q| q.to_string())
            .unwrap_or_else(|| other.to_string()),
    }
}

/// GENERATE prompt: answer-composition guidelines plus the content of the
/// most recent contiguous run of tool results, followed by the conversation
/// without tool-call scaffolding.
fn generation_prompt(history: &[Message]) -> Vec<Message> {
    let mut recent_tools: Vec<&Message> = history
        .iter()
        .rev()
        .take_while(|message| message.is_tool_result())
        .collect();
    recent_tools.reverse();
    let docs_content = recent_tools
        .iter()
        .map(|message| message.content())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = vec![Message::system(format!(
        "{GENERATE_GUIDELINES}\n\n{docs_content}"
    ))];
    prompt.extend(
        history
            .iter()
            .filter(|message| match message {
                Message::User { .. } | Message::System { .. } => true,
                Message::Assistant { tool_calls, .. } => tool_calls.is_empty(),
                Message::Tool { .. } => false,
            })
            .cloned(),
    );
    prompt
}
