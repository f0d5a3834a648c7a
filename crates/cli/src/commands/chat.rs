//! `stepwise chat` — Interactive client for a running gateway.
//!
//! Keeps the conversation history locally and sends it with every turn,
//! so the gateway itself stays stateless.

use futures::StreamExt;
use serde_json::json;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use stepwise_agent::{AgentStep, StreamFrame, decode_line};
use stepwise_core::message::Message;
use stepwise_gateway::api_v1::ChatResponse;

use super::render::render_step;

pub async fn run(
    url: String,
    model: Option<String>,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = format!("{}/v1/agent/chat", url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let mut history: Vec<Message> = Vec::new();

    println!();
    println!("  Stepwise Chat");
    println!("  Gateway:  {url}");
    println!("  Model:    {}", model.as_deref().unwrap_or("(gateway default)"));
    println!("  Mode:     {}", if stream { "streaming" } else { "collected" });
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }

        let mut body = json!({
            "message": message,
            "conversation_history": history,
            "stream": stream,
        });
        if let Some(ref model) = model {
            body["model"] = json!(model);
        }

        let response = match client.post(&endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                eprintln!("  [Error] Gateway unreachable: {e}");
                continue;
            }
        };
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            eprintln!("  [Error] HTTP {status}: {text}");
            continue;
        }

        if stream {
            let answer = print_stream(response).await?;
            if let Some(answer) = answer {
                history.push(Message::user(message));
                history.push(Message::assistant(answer));
            }
        } else {
            let chat: ChatResponse = response.json().await?;
            for step in &chat.steps {
                println!("{}", render_step(step));
            }
            if chat.answer.is_some() {
                history = chat.history;
            }
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Print steps as they arrive; returns the final answer, if any.
async fn print_stream(
    response: reqwest::Response,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let mut answer = None;
    let mut buffer = LineBuffer::default();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        for line in buffer.push(&chunk?) {
            match decode_line(&line)? {
                Some(StreamFrame::Done) => return Ok(answer),
                Some(StreamFrame::Step(step)) => {
                    println!("{}", render_step(&step));
                    if let AgentStep::Answer { content, .. } = step {
                        answer = Some(content);
                    }
                }
                None => {}
            }
        }
    }
    Ok(answer)
}

/// Splits a byte stream into complete lines.
///
/// Chunks may end mid-line or mid-character; the tail is held until the
/// next newline arrives.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }
}
