//! Terminal rendering of agent steps.

use stepwise_agent::AgentStep;

/// One printable block per step.
pub fn render_step(step: &AgentStep) -> String {
    match step {
        AgentStep::Thinking { iteration } => format!("  [{}] thinking...", iteration + 1),
        AgentStep::ToolCall {
            iteration,
            tool_name,
            tool_args,
            content,
        } => {
            let mut out = format!("  [{}] -> {tool_name} {tool_args}", iteration + 1);
            if let Some(reasoning) = content {
                out.push_str(&format!("\n        ({reasoning})"));
            }
            out
        }
        AgentStep::ToolResult {
            iteration,
            tool_name,
            result,
        } => format!(
            "  [{}] <- {tool_name}: {}",
            iteration + 1,
            truncate(&result.to_string(), 300)
        ),
        AgentStep::Answer { content, .. } => {
            let mut out = String::from("\n");
            for line in content.lines() {
                out.push_str(&format!("  Assistant > {line}\n"));
            }
            out
        }
        AgentStep::Error {
            iteration,
            tool_name,
            error,
        } => match tool_name {
            Some(tool) => format!("  [{}] [Error] {tool}: {error}", iteration + 1),
            None => format!("  [{}] [Error] {error}", iteration + 1),
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn iterations_are_shown_one_based() {
        assert_eq!(
            render_step(&AgentStep::Thinking { iteration: 0 }),
            "  [1] thinking..."
        );
    }

    #[test]
    fn tool_call_includes_reasoning() {
        let rendered = render_step(&AgentStep::ToolCall {
            iteration: 1,
            tool_name: "search_files".into(),
            tool_args: json!({"query": "x"}),
            content: Some("look it up".into()),
        });
        assert!(rendered.contains("-> search_files {\"query\":\"x\"}"));
        assert!(rendered.contains("(look it up)"));
    }

    #[test]
    fn tool_errors_name_the_tool() {
        let rendered = render_step(&AgentStep::Error {
            iteration: 0,
            tool_name: Some("send_email".into()),
            error: "Tool execution failed: boom".into(),
        });
        assert_eq!(rendered, "  [1] [Error] send_email: Tool execution failed: boom");
    }

    #[test]
    fn long_results_are_truncated() {
        let rendered = render_step(&AgentStep::ToolResult {
            iteration: 0,
            tool_name: "dump".into(),
            result: json!("a".repeat(1000)),
        });
        assert!(rendered.ends_with("..."));
        assert!(rendered.len() < 400);
    }

    #[test]
    fn multiline_answers_are_prefixed() {
        let rendered = render_step(&AgentStep::Answer {
            iteration: 0,
            content: "one\ntwo".into(),
        });
        assert!(rendered.contains("  Assistant > one\n  Assistant > two\n"));
    }
}
