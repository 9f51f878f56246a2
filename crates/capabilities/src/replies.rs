//! Smart-reply capability: candidate responses for the agent.

use std::sync::Arc;

use assistline_core::assist::SmartReply;
use assistline_core::backend::{GenerationRequest, TextGenerator};
use assistline_core::capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
    transcript, within_deadline,
};
use assistline_core::message::Role;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::prompt;

/// Replies returned per call, at most.
pub const MAX_REPLIES: usize = 3;

/// Confidence lost per rank below the first reply.
const RANK_DECAY: f32 = 0.05;

pub struct SmartReplyAdapter {
    generator: Arc<dyn TextGenerator>,
}

impl SmartReplyAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(context: &CapabilityContext) -> Option<String> {
        let last_message = context.focus_text()?;

        // Context excludes the message being answered.
        let mut history = context.messages.clone();
        if let Some(pos) = history.iter().rposition(|m| m.role == Role::Customer) {
            history.remove(pos);
        } else {
            history.pop();
        }
        let start = history.len().saturating_sub(prompt::REPLY_CONTEXT_MESSAGES);

        Some(prompt::smart_replies(
            &transcript(&history[start..]),
            last_message,
            MAX_REPLIES,
        ))
    }
}

/// Parse generator output as a JSON array of strings, falling back to list
/// lines with their `1.` / `-` / `*` / `•` markers stripped.
pub fn parse_replies(raw: &str, max: usize) -> Vec<String> {
    let body = strip_code_fence(raw.trim());

    let replies: Vec<String> = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.trim().to_string())
            .collect(),
        Ok(serde_json::Value::String(single)) => vec![single.trim().to_string()],
        _ => body.lines().map(strip_list_marker).map(str::to_string).collect(),
    };

    replies.into_iter().filter(|r| !r.is_empty()).take(max).collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    let rest = if digits > 0 {
        match line[digits..].chars().next() {
            Some('.' | ')' | ':') => &line[digits + 1..],
            _ => line,
        }
    } else if let Some(rest) = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .or_else(|| line.strip_prefix('•'))
    {
        rest
    } else {
        line
    };
    rest.trim().trim_matches('"').trim()
}

/// Confidence for the reply at `rank` (0-based).
pub fn ranked_confidence(score: f32, rank: usize) -> f32 {
    (score * (1.0 - RANK_DECAY * rank as f32)).clamp(0.0, 1.0)
}

#[async_trait]
impl CapabilityAdapter for SmartReplyAdapter {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::SmartReplies
    }

    fn provider(&self) -> &str {
        self.generator.name()
    }

    async fn invoke(
        &self,
        context: Arc<CapabilityContext>,
        deadline: Instant,
    ) -> Result<CapabilityOutput, CapabilityFailure> {
        let prompt = Self::build_prompt(&context)
            .ok_or_else(|| CapabilityFailure::InvalidResponse("no message to reply to".into()))?;

        let request = GenerationRequest::new(prompt).with_max_tokens(256);
        let generation = within_deadline(deadline, self.generator.generate(request)).await?;

        let replies: Vec<SmartReply> = parse_replies(&generation.text, MAX_REPLIES)
            .into_iter()
            .enumerate()
            .map(|(rank, text)| SmartReply {
                text,
                confidence: ranked_confidence(generation.score, rank),
            })
            .collect();

        if replies.is_empty() {
            return Err(CapabilityFailure::InvalidResponse("no replies in output".into()));
        }
        Ok(CapabilityOutput::SmartReplies(replies))
    }

    async fn health_check(&self) -> bool {
        self.generator.health_check().await.unwrap_or(false)
    }
}
