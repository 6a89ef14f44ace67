use std::sync::Arc;
use thiserror::Error;

use super::history::{ConversationHistory, Message, ToolCall};
use super::tools::{ToolRegistry, ToolSpec};
use crate::providers::CompletionProvider;

pub const SYSTEM_PROMPT: &str = "You are a Vanguard Financial Planner. You have access to tools to research \
funds and calculate returns. Use 'research_fund_reports' to find data first, then \
'calculate_investment_growth' if the user asks for projections.";

pub const DEFAULT_MAX_ITERATIONS: usize = 8;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent stopped after {0} model calls without a final answer")]
    IterationLimit(usize),
    #[error("Model returned neither text nor tool calls")]
    EmptyTurn,
    #[error("Provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    Deciding,
    Acting(Vec<ToolCall>),
    Done(String),
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub history: ConversationHistory,
    /// Number of model calls made.
    pub iterations: usize,
}

/// Tool-using planner: alternates between asking the model what to do and
/// running the tools it picks until it answers in plain text.
pub struct Agent {
    provider: Arc<dyn CompletionProvider>,
    tools: ToolRegistry,
    max_iterations: usize,
}

impl Agent {
    pub fn new(provider: Arc<dyn CompletionProvider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub async fn run(&self, question: &str) -> Result<AgentRun, AgentError> {
        let specs: Vec<ToolSpec> = self.tools.specs();
        let mut history = ConversationHistory::seeded(SYSTEM_PROMPT, question);
        let mut state = AgentState::Deciding;
        let mut iterations = 0;

        loop {
            state = match state {
                AgentState::Deciding => {
                    if iterations >= self.max_iterations {
                        log::warn!("Agent hit max iterations ({})", self.max_iterations);
                        return Err(AgentError::IterationLimit(iterations));
                    }
                    iterations += 1;
                    log::debug!("Agent iteration {}", iterations);

                    let turn = self.provider.chat(history.messages(), &specs).await?;
                    let next = if turn.wants_tools() {
                        AgentState::Acting(turn.tool_calls.clone())
                    } else {
                        match turn.content.clone() {
                            Some(text) => AgentState::Done(text),
                            None => return Err(AgentError::EmptyTurn),
                        }
                    };
                    history.push(Message::Ai {
                        content: turn.content,
                        tool_calls: turn.tool_calls,
                    });
                    next
                }
                AgentState::Acting(calls) => {
                    for call in &calls {
                        let output = self.tools.dispatch(call).await;
                        history.push(Message::tool_result(call, output));
                    }
                    AgentState::Deciding
                }
                AgentState::Done(answer) => {
                    log::info!("Agent finished after {} model calls", iterations);
                    return Ok(AgentRun {
                        answer,
                        history,
                        iterations,
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::calculator::{GrowthCalculatorTool, GROWTH_TOOL};
    use crate::providers::AssistantTurn;
    use crate::testing::{tool_call, ScriptedProvider};

    fn registry() -> ToolRegistry {
        ToolRegistry::new().register(Arc::new(GrowthCalculatorTool))
    }

    #[tokio::test]
    async fn tool_round_trip_appends_without_rewriting() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            AssistantTurn::calls(vec![tool_call(
                "call_1",
                GROWTH_TOOL,
                r#"{"principal": 10000, "rate_decimal": 0.07, "years": 10}"#,
            )]),
            AssistantTurn::answer("Your investment grows to $19,671.51."),
        ]));
        let agent = Agent::new(provider.clone(), registry());

        let run = agent.run("Project $10,000 at 7% for 10 years").await.unwrap();
        assert_eq!(run.answer, "Your investment grows to $19,671.51.");
        assert_eq!(run.iterations, 2);

        let messages = run.history.messages();
        assert_eq!(messages.len(), 5);
        assert!(matches!(messages[0], Message::System { .. }));
        assert!(matches!(messages[1], Message::Human { .. }));
        assert!(matches!(&messages[2], Message::Ai { tool_calls, .. } if tool_calls.len() == 1));
        assert_eq!(messages[3].text(), Some("$19,671.51"));
        assert_eq!(messages[4].text(), Some("Your investment grows to $19,671.51."));

        // every transcript the model saw is a prefix of the final history
        let transcripts = provider.transcripts.lock().unwrap();
        assert_eq!(transcripts.len(), 2);
        for seen in transcripts.iter() {
            assert_eq!(seen.as_slice(), &messages[..seen.len()]);
        }
        assert_eq!(transcripts[0].len(), 2);
        assert_eq!(transcripts[1].len(), 4);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_back_to_the_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            AssistantTurn::calls(vec![tool_call("call_1", "wire_money", "{}")]),
            AssistantTurn::answer("I cannot do that."),
        ]));
        let run = Agent::new(provider, registry()).run("Send money").await.unwrap();
        assert_eq!(run.history.messages()[3].text(), Some("Error: unknown tool 'wire_money'"));
        assert_eq!(run.answer, "I cannot do that.");
    }

    #[tokio::test]
    async fn stops_at_iteration_limit() {
        let provider = Arc::new(ScriptedProvider::repeating(AssistantTurn::calls(vec![tool_call(
            "loop",
            GROWTH_TOOL,
            r#"{"principal": 1, "rate_decimal": 0.0, "years": 1}"#,
        )])));
        let agent = Agent::new(provider.clone(), registry()).with_max_iterations(3);

        let err = agent.run("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimit(3)));
        assert_eq!(provider.transcripts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_turn_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![AssistantTurn::default()]));
        let err = Agent::new(provider, registry()).run("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyTurn));
    }
}
