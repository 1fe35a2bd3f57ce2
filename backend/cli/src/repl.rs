//! Interactive chat loop over stdin.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use parley_agent::ChatService;
use parley_core::ChatRequest;

use crate::terminal_output::{
    note_error, note_info, note_success, paint, render_entry, tool_label, BOLD, CYAN, GREEN,
};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Message(&'a str),
    History,
    Reset,
    Help,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/history" => Input::History,
        "/reset" => Input::Reset,
        "/help" | "/?" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        text => Input::Message(text),
    }
}

const HELP: &str = "Commands: /history, /reset, /help, /quit. Anything else is sent as a message.";

/// Run the REPL until EOF or `/quit`.
pub async fn run(service: Arc<ChatService>, session_id: String) -> Result<()> {
    note_info(&format!("Chatting in session {}. {}", paint(BOLD, &session_id), HELP));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(paint(CYAN, "you> ").as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => note_info(HELP),
            Input::History => match service.history(&session_id).await {
                Ok(history) if history.history.is_empty() => note_info("No history yet."),
                Ok(history) => {
                    for entry in &history.history {
                        print!("{}", render_entry(entry));
                    }
                }
                Err(e) => note_error(&format!("Could not load history: {e}")),
            },
            Input::Reset => match service.reset(&session_id).await {
                Ok(reset) => note_success(&reset.status),
                Err(e) => note_error(&format!("Could not reset history: {e}")),
            },
            Input::Message(text) => {
                let reply = service
                    .chat(ChatRequest {
                        session_id: session_id.clone(),
                        message: text.to_string(),
                    })
                    .await;
                println!("{} {}", paint(GREEN, "bot>"), reply.response);
                println!("     {}", tool_label(&reply.route_selected));
            }
        }
    }

    Ok(())
}
