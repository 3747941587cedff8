//! Ticket Planner - turns product requirements into Jira epics and stories
//!
//! A chat on stdin/stdout: the user names a Jira project, pastes
//! requirements, and confirms each epic and story before it is created.

mod config;
mod decompose;
mod driver;
mod llm;
mod state_machine;
mod tracker;
mod transcript;

use config::AppConfig;
use decompose::LlmDecomposer;
use driver::ConversationDriver;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracker::JiraService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcript::{Message, Role};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_planner=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        jira = %config.jira.base_url,
        model = config.llm.model.model_id(),
        gateway = config.llm.gateway.is_some(),
        "Configuration loaded"
    );

    let tickets = JiraService::new(config.jira)?;
    let decomposer = LlmDecomposer::new(config.llm.build_service()?);
    let mut driver = ConversationDriver::new(tickets, decomposer);

    let mut stdout = tokio::io::stdout();
    let greeting = driver.start().await;
    print_messages(&mut stdout, greeting).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout
            .write_all(format!("[{}] > ", driver.input_hint()).as_bytes())
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        // Empty lines are not sent, as in a chat box
        if line.trim().is_empty() {
            continue;
        }

        let replies = driver.submit(&line).await;
        print_messages(&mut stdout, replies).await?;
    }

    tracing::info!(
        messages = driver.transcript().len(),
        mode = driver.session().mode.as_str(),
        "Session ended"
    );
    stdout.write_all(b"\n").await?;
    Ok(())
}

/// Echo assistant messages; the user already sees what they typed
async fn print_messages(
    out: &mut tokio::io::Stdout,
    messages: &[Message],
) -> std::io::Result<()> {
    for message in messages.iter().filter(|m| m.role == Role::Assistant) {
        out.write_all(format!("\n{}\n\n", message.content).as_bytes())
            .await?;
    }
    out.flush().await
}
