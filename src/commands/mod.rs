use colored::Colorize;

use crate::access::Role;
use crate::agent::Message;
use crate::services::Services;

mod document;

pub use document::handle_ingest;

/// Answers one question through the retrieval chain only, without the
/// planner agent.
pub async fn handle_ask(services: &Services, role: &str, question: &str) -> Result<(), String> {
    let role = Role::parse(role);
    println!("🔎 Asking as {}: {}", role.to_string().bright_cyan(), question);

    let result = services
        .chain
        .answer(question, &role)
        .await
        .map_err(|e| format!("Failed to answer: {}", e))?;

    println!("\n{}", result.answer);
    if !result.chunks.is_empty() {
        println!("\n{}", "Sources:".dimmed());
        for chunk in &result.chunks {
            println!(
                "  • {} ({}) p.{} [score {:.2}]",
                chunk.source.as_deref().unwrap_or("Unknown"),
                chunk.year.map(|y| y.to_string()).unwrap_or_else(|| "N/A".to_string()),
                chunk.page.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                chunk.score
            );
        }
    }
    Ok(())
}

/// Runs the planner agent and prints each tool step before the final answer.
pub async fn handle_agent(services: &Services, role: &str, question: &str) -> Result<(), String> {
    let role = Role::parse(role);
    println!("🤖 Agent working as {}: {}", role.to_string().bright_cyan(), question);

    let run = services
        .agent_for(role)
        .run(question)
        .await
        .map_err(|e| format!("Agent failed: {}", e))?;

    for message in run.history.messages() {
        match message {
            Message::Ai { tool_calls, .. } if !tool_calls.is_empty() => {
                for call in tool_calls {
                    println!("  {} {}({})", "→".blue(), call.name.bright_blue(), call.arguments);
                }
            }
            Message::Tool { name, content, .. } => {
                println!("  {} {}: {}", "←".blue(), name, content.dimmed());
            }
            _ => {}
        }
    }

    println!("\n{}", run.answer);
    println!("{}", format!("({} model calls)", run.iterations).dimmed());
    Ok(())
}
