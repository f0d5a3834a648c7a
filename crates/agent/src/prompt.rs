//! System prompt construction.

use stepwise_core::provider::ToolDefinition;

/// Base instructions: how to reason and how to ask for a tool.
pub const AGENT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that can use tools to act on the user's behalf.

## Working with Tools

Work through a request step by step: decide what you need, pick a tool if one helps, call it, read the result, then either call another tool or answer.

To call a tool, reply with ONLY a JSON object in exactly this shape:

```json
{
  "tool": "tool_name",
  "args": {
    "parameter": "value"
  },
  "reasoning": "One sentence on why this tool is needed"
}
```

After each call you will receive the tool's output as a message starting with `Tool '<name>' returned:`.

## Guidelines

- Only call a tool when it is needed; answer directly otherwise.
- Use the exact parameter names from the tool's schema.
- If a tool reports an error, explain it or try another approach.
- If a tool says setup is required, pass its instructions on to the user.
- When you have the answer, reply in plain text without any JSON.
"#;

/// The base prompt followed by an `## Available Tools` section.
pub fn system_prompt_with_tools(tools: &[ToolDefinition]) -> String {
    if tools.is_empty() {
        return AGENT_SYSTEM_PROMPT.to_string();
    }

    let mut prompt = String::from(AGENT_SYSTEM_PROMPT);
    prompt.push_str("\n## Available Tools\n\n");
    for tool in tools {
        let parameters =
            serde_json::to_string_pretty(&tool.parameters).unwrap_or_else(|_| "{}".into());
        prompt.push_str(&format!(
            "### {}\n{}\n\n**Parameters:**\n```json\n{}\n```\n\n",
            tool.name, tool.description, parameters
        ));
    }
    prompt
}
