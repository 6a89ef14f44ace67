pub mod calculator;
pub mod history;
pub mod runner;
pub mod tools;

use std::sync::Arc;

use crate::access::Role;
use crate::llm::RagChain;

pub use calculator::{calculate_investment_growth, format_currency, GrowthCalculatorTool, GROWTH_TOOL};
pub use history::{ConversationHistory, Message, ToolCall};
pub use runner::{Agent, AgentError, AgentRun, AgentState, DEFAULT_MAX_ITERATIONS, SYSTEM_PROMPT};
pub use tools::{AgentTool, ResearchTool, ToolRegistry, ToolSpec, RESEARCH_TOOL};

/// The standard tool set: fund research with the caller's visibility, then
/// the growth calculator.
pub fn fund_advisor_tools(chain: Arc<RagChain>, role: Role) -> ToolRegistry {
    ToolRegistry::new()
        .register(Arc::new(ResearchTool::new(chain, role)))
        .register(Arc::new(GrowthCalculatorTool))
}
