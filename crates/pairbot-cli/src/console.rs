//! Terminal rendering — colored event sink and stdin confirmation gate.

use std::collections::HashMap;
use std::io::Write;

use async_trait::async_trait;
use colored::Colorize;
use serde_json::Value;

use pairbot_agent::gate::{describe_action, is_affirmative, ConfirmationGate};
use pairbot_agent::sink::EventSink;
use pairbot_core::utils::truncate_string;

// ─────────────────────────────────────────────
// ConsoleSink
// ─────────────────────────────────────────────

/// Renders loop progress to the terminal with colors.
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn goal(&self, goal: &str) {
        println!();
        println!("{} {}", "Goal:".bold(), goal);
    }

    fn thought(&self, iteration: usize, thought: &str) {
        println!(
            "{} {}",
            format!("[{iteration}] Thought:").yellow().bold(),
            thought.dimmed()
        );
    }

    fn action(&self, iteration: usize, tool: &str, args: &HashMap<String, Value>) {
        let rendered = serde_json::to_string(args).unwrap_or_else(|_| "{}".to_string());
        println!(
            "{} {} {}",
            format!("[{iteration}] Action:").cyan().bold(),
            tool.cyan(),
            truncate_string(&rendered, 200).dimmed()
        );
    }

    fn observation(&self, iteration: usize, text: &str) {
        println!(
            "{} {}",
            format!("[{iteration}] ").green().bold(),
            truncate_string(text, 500)
        );
    }
}

// ─────────────────────────────────────────────
// StdinGate
// ─────────────────────────────────────────────

/// Asks the operator on the terminal before a dangerous capability runs.
/// Anything but an explicit "y"/"yes" denies; so do closed stdin and read
/// errors.
pub struct StdinGate;

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn approve(&self, tool: &str, args: &HashMap<String, Value>) -> bool {
        let prompt = describe_action(tool, args);
        // Stdin reads are blocking; keep them off the async executor.
        let answer = tokio::task::spawn_blocking(move || {
            println!();
            println!("{}", "Confirmation required".yellow().bold());
            println!("{prompt}");
            print!("{} ", "Execute this action? [y/N]".yellow());
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            }
        })
        .await;

        match answer {
            Ok(Some(line)) => is_affirmative(&line),
            _ => false,
        }
    }
}

/// Print the final result of a run.
pub fn print_answer(answer: &str) {
    println!();
    println!("{}", "Final Answer:".green().bold());
    println!("{answer}");
    println!();
}

/// Print the exhaustion notice.
pub fn print_exhausted(iterations: usize) {
    println!();
    println!(
        "{}",
        format!("Task did not complete within {iterations} iterations.")
            .red()
            .bold()
    );
    println!();
}
