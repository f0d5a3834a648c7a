//! The reasoning loop: Think → (Tool → Observe)* → Answer.
//!
//! Each iteration makes exactly one model call. If the reply contains a
//! tool call the tool runs and its result goes back into the transcript;
//! otherwise the reply is the final answer. The loop ends on an answer,
//! a model failure, an empty answer, a dropped step receiver, or after
//! `max_iterations` model calls.
//!
//! Nothing escapes the loop as an error: every failure is reported as an
//! `error` step and reflected in [`RunOutcome::termination`].

use std::sync::Arc;

use serde::Serialize;
use stepwise_core::message::{Message, Transcript, new_correlation_id};
use stepwise_core::provider::{CompletionConfig, Provider};
use stepwise_core::tool::ToolService;
use stepwise_tools::fetch_catalog_or_empty;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::parser::{clean_answer, parse_tool_call};
use crate::prompt::system_prompt_with_tools;
use crate::step::AgentStep;

/// Error text for a reply that is empty after cleanup.
pub const EMPTY_RESPONSE_ERROR: &str = "Model returned an empty response";

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on model calls (1–20)
    pub max_iterations: u32,
    /// Sampling parameters, with the backend-native model name
    pub completion: CompletionConfig,
    /// Replaces the generated system prompt entirely
    pub system_prompt: Option<String>,
    /// Log every iteration at info level
    pub verbose: bool,
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            max_iterations: 5,
            completion: CompletionConfig::new(model),
            system_prompt: None,
            verbose: false,
        }
    }

    /// Build from the `[agent]` config section.
    pub fn from_settings(settings: &stepwise_config::AgentSettings, model: impl Into<String>) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            completion: settings.completion_for(model),
            system_prompt: settings.system_prompt_override.clone(),
            verbose: settings.verbose,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn validate(&self) -> stepwise_core::Result<()> {
        let invalid = |message: &str| {
            Err(stepwise_core::Error::Config {
                message: message.into(),
            })
        };
        if !(1..=20).contains(&self.max_iterations) {
            return invalid("max_iterations must be between 1 and 20");
        }
        if self.completion.model.trim().is_empty() {
            return invalid("model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return invalid("temperature must be between 0.0 and 2.0");
        }
        if self.completion.max_tokens == 0 {
            return invalid("max_tokens must be > 0");
        }
        if !(0.0..=1.0).contains(&self.completion.top_p) {
            return invalid("top_p must be between 0.0 and 1.0");
        }
        Ok(())
    }
}

/// What a run was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub message: String,
    /// Prior conversation, already validated
    pub history: Transcript,
}

impl RunInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Transcript::new(),
        }
    }

    pub fn with_history(mut self, history: Transcript) -> Self {
        self.history = history;
        self
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Answered,
    ModelFailed,
    EmptyAnswer,
    Exhausted,
    Cancelled,
}

/// The result of one run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Updated conversation history, system prompt first
    pub history: Vec<Message>,
    /// Iterations started
    pub iterations: u32,
    pub termination: Termination,
}

/// Drives one conversation turn against a model backend and the tool
/// service.
///
/// Cheap to clone; share one per backend across concurrent runs.
#[derive(Clone)]
pub struct AgentOrchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<dyn ToolService>,
    config: AgentConfig,
}

impl AgentOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolService>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the loop, pushing each step into `sink` as it happens.
    ///
    /// Dropping the receiving end cancels the run before the next
    /// iteration.
    pub async fn run(&self, input: RunInput, sink: &mpsc::Sender<AgentStep>) -> RunOutcome {
        let model = &self.config.completion.model;
        let max_iterations = self.config.max_iterations;

        let catalog = fetch_catalog_or_empty(self.tools.as_ref()).await;
        let system_prompt = match self.config.system_prompt {
            Some(ref prompt) => prompt.clone(),
            None => system_prompt_with_tools(&catalog),
        };

        let mut transcript = input.history;
        transcript.ensure_system_prompt(&system_prompt);
        transcript.append_user(input.message);

        info!(
            provider = self.provider.name(),
            model = %model,
            max_iterations,
            tools = catalog.len(),
            history = transcript.len(),
            "Agent run starting"
        );

        let finish = |transcript: Transcript, iterations: u32, termination: Termination| {
            info!(iterations, ?termination, "Agent run finished");
            RunOutcome {
                history: transcript.into_messages(),
                iterations,
                termination,
            }
        };

        let mut iterations = 0;
        for iteration in 0..max_iterations {
            if sink.is_closed() {
                debug!(iteration, "Step receiver dropped, cancelling run");
                return finish(transcript, iterations, Termination::Cancelled);
            }
            iterations = iteration + 1;

            if self.config.verbose {
                info!(iteration = iteration + 1, max_iterations, "Agent iteration");
            } else {
                debug!(iteration, "Agent iteration");
            }

            if !emit(sink, AgentStep::Thinking { iteration }).await {
                return finish(transcript, iterations, Termination::Cancelled);
            }

            let response = match self
                .provider
                .complete(transcript.messages(), &self.config.completion, &catalog)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    error!(model = %model, iteration, error = %e, "Model call failed");
                    emit(
                        sink,
                        AgentStep::Error {
                            iteration,
                            tool_name: None,
                            error: format!("Model call failed: {e}"),
                        },
                    )
                    .await;
                    return finish(transcript, iterations, Termination::ModelFailed);
                }
            };

            debug!(
                iteration,
                response = %response.chars().take(200).collect::<String>(),
                "Model responded"
            );

            let Some(call) = parse_tool_call(&response) else {
                let answer = clean_answer(&response);
                if answer.is_empty() {
                    warn!(iteration, "Model returned no usable content");
                    emit(
                        sink,
                        AgentStep::Error {
                            iteration,
                            tool_name: None,
                            error: EMPTY_RESPONSE_ERROR.into(),
                        },
                    )
                    .await;
                    return finish(transcript, iterations, Termination::EmptyAnswer);
                }

                transcript.append_assistant(answer.clone(), None, None);
                emit(
                    sink,
                    AgentStep::Answer {
                        iteration,
                        content: answer,
                    },
                )
                .await;
                return finish(transcript, iterations, Termination::Answered);
            };

            let delivered = emit(
                sink,
                AgentStep::ToolCall {
                    iteration,
                    tool_name: call.tool.clone(),
                    tool_args: call.args.clone(),
                    content: call.reasoning.clone(),
                },
            )
            .await;
            if !delivered {
                return finish(transcript, iterations, Termination::Cancelled);
            }

            let correlation_id = new_correlation_id();
            let executed = self.tools.execute(&call.tool, &call.args).await;
            match executed {
                Ok(result) => {
                    debug!(tool = %call.tool, iteration, "Tool succeeded");
                    let tool_name = call.tool.clone();
                    transcript.append_assistant(response, Some(call), Some(correlation_id.clone()));
                    transcript.append_tool_result(&tool_name, result.clone(), correlation_id);
                    emit(
                        sink,
                        AgentStep::ToolResult {
                            iteration,
                            tool_name,
                            result,
                        },
                    )
                    .await;
                }
                Err(e) => {
                    let message = format!("Tool execution failed: {e}");
                    warn!(tool = %call.tool, iteration, error = %e, "Tool execution failed");
                    transcript.append_tool_error(&call.tool, &message, correlation_id);
                    emit(
                        sink,
                        AgentStep::Error {
                            iteration,
                            tool_name: Some(call.tool),
                            error: message,
                        },
                    )
                    .await;
                }
            }
        }

        warn!(max_iterations, "Iteration limit reached without a final answer");
        finish(transcript, iterations, Termination::Exhausted)
    }

    /// Run on a spawned task and stream steps through a channel.
    pub fn run_stream(&self, input: RunInput) -> (mpsc::Receiver<AgentStep>, JoinHandle<RunOutcome>) {
        let (tx, rx) = mpsc::channel::<AgentStep>(128);
        let this = self.clone();
        let handle = tokio::spawn(async move { this.run(input, &tx).await });
        (rx, handle)
    }

    /// Run to completion and collect every step.
    pub async fn run_collect(&self, input: RunInput) -> (Vec<AgentStep>, RunOutcome) {
        let (tx, mut rx) = mpsc::channel::<AgentStep>(128);

        let run = async move {
            let outcome = self.run(input, &tx).await;
            drop(tx);
            outcome
        };
        let collect = async {
            let mut steps = Vec::new();
            while let Some(step) = rx.recv().await {
                steps.push(step);
            }
            steps
        };

        let (outcome, steps) = tokio::join!(run, collect);
        (steps, outcome)
    }
}

/// Send a step; `false` once the receiver is gone.
async fn emit(sink: &mpsc::Sender<AgentStep>, step: AgentStep) -> bool {
    sink.send(step).await.is_ok()
}
