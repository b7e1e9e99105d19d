//! Prompt templates for the two summary variants and the pairwise judge.
//!
//! Rendering is pure: the same inputs always produce byte-identical messages,
//! which keeps runs reproducible and makes template hashes meaningful.

use std::collections::BTreeMap;

use crate::gateway::Message;

// =============================================================================
// Prompt templates
// =============================================================================

/// Rendered prompt ready for LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInstance {
    pub template_slug: &'static str,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// A prompt template with `{name}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    pub fn render(&self, vars: &[(&str, &str)]) -> PromptInstance {
        PromptInstance {
            template_slug: self.slug,
            system: fill(self.system, vars),
            user: fill(self.user, vars),
        }
    }

    /// blake3 of the raw template text.
    pub fn hash(&self) -> String {
        blake3::hash(format!("{}\n{}", self.system, self.user).as_bytes())
            .to_hex()
            .to_string()
    }
}

/// Substitute placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so a dialogue or summary that
/// happens to contain `{summary_b}` is passed through verbatim. Unknown
/// placeholders are left as-is.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match hit {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// =============================================================================
// Standard prompts
// =============================================================================

pub const BASELINE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "baseline_v1",
    system: "You are a helpful research assistant who writes faithful, fluent summaries. \
Keep the summary concise but cover key actions and decisions.",
    user: "Dialogue:\n{dialogue}\n\nTask: Summarize the dialogue for a busy reader. \
Aim for under 150 words; no bullet formatting required.",
};

pub const CONCISE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "concise_v1",
    system: "You write research handoff briefs that maximize clarity and trust with minimal words. \
Follow the requested structure exactly.",
    user: "Dialogue:\n{dialogue}\n\nWrite a concise brief with at most {word_budget} words:\n\
- Three bullet takeaways (facts/decisions only)\n\
- TL;DR: one short sentence\n\
- Uncertainties: call out missing info or risks in one bullet; use 'None noted' if clear\n\
Avoid filler, keep factual, prefer readable phrasing a human can skim in 20 seconds.",
};

pub const JUDGE_PROMPT: PromptTemplate = PromptTemplate {
    slug: "judge_v1",
    system: "You are evaluating which summary is better for a human who wants a quick, trustworthy brief. \
Prefer the option that is clearer, more concise, preserves key facts, and flags uncertainties. \
Respond with 'A' or 'B' plus one short reason.",
    user: "Dialogue:\n{dialogue}\n\nSummary A:\n{summary_a}\n\nSummary B:\n{summary_b}\n\n\
Which summary better balances conciseness with clarity and trust? \
Answer with 'A' or 'B' and a 1-line reason.",
};

pub const PROMPTS: &[PromptTemplate] = &[BASELINE_PROMPT, CONCISE_PROMPT, JUDGE_PROMPT];

/// Default word cap for the concise brief.
pub const DEFAULT_WORD_BUDGET: u32 = 100;

pub fn prompt_by_slug(slug: &str) -> Option<PromptTemplate> {
    PROMPTS.iter().find(|t| t.slug == slug).copied()
}

/// Template slug -> hash, recorded in metrics snapshots.
pub fn template_hashes() -> BTreeMap<String, String> {
    PROMPTS
        .iter()
        .map(|t| (t.slug.to_string(), t.hash()))
        .collect()
}

// =============================================================================
// Builders
// =============================================================================

/// Unconstrained fluent summary.
pub fn baseline(dialogue: &str) -> PromptInstance {
    BASELINE_PROMPT.render(&[("dialogue", dialogue)])
}

/// Structured brief: three takeaways, a TL;DR and an uncertainty bullet.
pub fn concise(dialogue: &str, word_budget: u32) -> PromptInstance {
    let budget = word_budget.to_string();
    CONCISE_PROMPT.render(&[("dialogue", dialogue), ("word_budget", &budget)])
}

/// Pairwise judge; "A" always names `first`, "B" always names `second`.
pub fn judge(dialogue: &str, first: &str, second: &str) -> PromptInstance {
    JUDGE_PROMPT.render(&[
        ("dialogue", dialogue),
        ("summary_a", first),
        ("summary_b", second),
    ])
}

// =============================================================================
// TESTS
// =============================================================================
