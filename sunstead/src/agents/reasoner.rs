//! Bounded reasoner loop.
//!
//! A reasoner drives its tool subset through a JSON action protocol: each
//! LLM turn yields either a tool call or a final answer. The loop is capped;
//! on cap-hit the agent returns a best-effort partial answer marked capped.

use serde_json::Value;

use crate::error::{Result, SunsteadError};
use crate::llm::{prompts, CompletionOptions, LlmProvider};
use crate::tools::ToolRegistry;

use super::roles::AgentRole;

#[derive(Debug, Clone)]
pub struct ReasonerOutput {
    pub answer: String,
    pub role: AgentRole,
    pub iterations: u32,
    pub capped: bool,
}

pub struct Reasoner {
    llm: LlmProvider,
}

impl Reasoner {
    pub fn new(llm: LlmProvider) -> Self {
        Self { llm }
    }

    /// Run a tool-carrying role against the assembled context.
    pub async fn run(
        &self,
        role: AgentRole,
        tools: &ToolRegistry,
        context: &str,
        query: &str,
        max_iterations: u32,
    ) -> Result<ReasonerOutput> {
        if tools.is_empty() {
            let answer = self.direct_answer(role, context, query).await?;
            return Ok(ReasonerOutput {
                answer,
                role,
                iterations: 1,
                capped: false,
            });
        }

        let system_prompt = format!(
            "{}\n\n{}",
            role.backstory(),
            prompts::action_protocol(&tools.describe())
        );

        let mut transcript = prompts::reasoner_turn(context, query);
        let mut last_observation: Option<String> = None;

        for iteration in 1..=max_iterations {
            let decision = self
                .llm
                .complete_json(&transcript, Some(&system_prompt), None)
                .await;

            let decision = match decision {
                Ok(value) => value,
                // A model that refuses to speak the protocol still gets one
                // plain-text chance to answer before we give up.
                Err(SunsteadError::Llm(_)) => {
                    tracing::warn!(
                        role = role.display_name(),
                        iteration,
                        "Reasoner broke protocol; falling back to direct completion"
                    );
                    let answer = self.direct_answer(role, context, query).await?;
                    return Ok(ReasonerOutput {
                        answer,
                        role,
                        iterations: iteration,
                        capped: false,
                    });
                }
                Err(e) => return Err(e),
            };

            match decision.get("action").and_then(Value::as_str) {
                Some("final") => {
                    let answer = decision
                        .get("answer")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string();
                    if answer.is_empty() {
                        return Err(SunsteadError::Llm(
                            "Reasoner produced a final action without an answer".to_string(),
                        ));
                    }
                    return Ok(ReasonerOutput {
                        answer,
                        role,
                        iterations: iteration,
                        capped: false,
                    });
                }
                Some("tool") => {
                    let tool_name = decision
                        .get("tool")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let args = decision.get("args").cloned().unwrap_or(Value::Null);

                    let outcome = tools.call(&tool_name, &args).await;
                    let rendered = outcome.render();

                    tracing::debug!(
                        role = role.display_name(),
                        tool = %tool_name,
                        ok = outcome.is_ok(),
                        iteration,
                        "Tool call"
                    );

                    transcript.push_str("\n\n");
                    transcript.push_str(&prompts::observation_turn(&tool_name, &rendered));
                    last_observation = Some(rendered);
                }
                _ => {
                    transcript.push_str(
                        "\n\nYour last response was not a valid protocol action. Respond with \
                         a single JSON object using \"action\": \"tool\" or \"final\".",
                    );
                }
            }
        }

        // Cap hit: report what we have rather than nothing.
        let answer = match last_observation {
            Some(observation) => format!(
                "I ran out of reasoning steps before finishing. Best available data: {observation}"
            ),
            None => "I ran out of reasoning steps before reaching an answer.".to_string(),
        };

        Ok(ReasonerOutput {
            answer,
            role,
            iterations: max_iterations,
            capped: true,
        })
    }

    /// Single-shot answer with no tools (Manager direct path).
    pub async fn direct_answer(
        &self,
        role: AgentRole,
        context: &str,
        query: &str,
    ) -> Result<String> {
        let options = CompletionOptions {
            max_tokens: Some(600),
            ..Default::default()
        };
        self.llm
            .complete(
                &prompts::reasoner_turn(context, query),
                Some(role.backstory()),
                Some(&options),
            )
            .await
    }
}
