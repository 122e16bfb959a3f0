//! Offline check that a replacement renders like the template it replaces.
//!
//! The original is rendered with [`EngineProfile::Reference`] and the
//! replacement with [`EngineProfile::Constrained`] for every conversation of
//! a [`Corpus`]; any difference in output is reported. This is a curation
//! aid and never runs on the lookup path.

use std::borrow::Cow;

use anyhow::Context;

pub mod corpus;
pub mod engine;

pub use corpus::{Conversation, Corpus};
pub use engine::EngineProfile;

const EXCERPT_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Match,
    /// Both templates refused the conversation with the same message.
    BothRaised(String),
    Mismatch {
        offset: usize,
        expected: String,
        actual: String,
    },
    ReferenceFailed(String),
    TargetFailed(String),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Match | Outcome::BothRaised(_))
    }
}

#[derive(Debug, Clone)]
pub struct ConversationReport {
    pub conversation: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct EntryReport {
    pub name: String,
    pub results: Vec<ConversationReport>,
}

impl EntryReport {
    pub fn is_equivalent(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversationReport> {
        self.results.iter().filter(|r| !r.outcome.is_ok())
    }
}

fn decode<'a>(what: &str, bytes: &'a [u8]) -> anyhow::Result<Cow<'a, str>> {
    encoding_rs::UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .with_context(|| format!("{what} is not valid UTF-8"))
}

pub fn verify_entry(
    name: &str,
    original: &[u8],
    replacement: &[u8],
    corpus: &Corpus,
) -> anyhow::Result<EntryReport> {
    let original = decode(&format!("original of `{name}`"), original)?;
    let replacement = decode(&format!("replacement of `{name}`"), replacement)?;

    let reference = engine::environment(EngineProfile::Reference, corpus.today());
    let constrained = engine::environment(EngineProfile::Constrained, corpus.today());

    let mut results = Vec::with_capacity(corpus.conversations.len());
    for conversation in &corpus.conversations {
        let expected = engine::render(&reference, &original, corpus, conversation);
        let actual = engine::render(&constrained, &replacement, corpus, conversation);

        let outcome = match (expected, actual) {
            (Ok(expected), Ok(actual)) => compare(&expected, &actual),
            (Err(r), Err(t)) if r.detail().is_some() && r.detail() == t.detail() => {
                Outcome::BothRaised(r.detail().unwrap_or_default().to_string())
            }
            (Err(r), _) => Outcome::ReferenceFailed(r.to_string()),
            (Ok(_), Err(t)) => Outcome::TargetFailed(t.to_string()),
        };

        if !outcome.is_ok() {
            log::debug!("`{name}` differs on `{}`: {outcome:?}", conversation.name);
        }
        results.push(ConversationReport {
            conversation: conversation.name.clone(),
            outcome,
        });
    }

    Ok(EntryReport {
        name: name.to_string(),
        results,
    })
}

fn compare(expected: &str, actual: &str) -> Outcome {
    if expected == actual {
        return Outcome::Match;
    }

    let offset = expected
        .char_indices()
        .zip(actual.chars())
        .find(|((_, a), b)| a != b)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| expected.len().min(actual.len()));

    let excerpt = |s: &str| s[offset..].chars().take(EXCERPT_CHARS).collect::<String>();
    Outcome::Mismatch {
        offset,
        expected: excerpt(expected),
        actual: excerpt(actual),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::chat::{Message, Role};

    fn corpus() -> Corpus {
        Corpus {
            bos_token: "<s>".to_string(),
            eos_token: "</s>".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, 26),
            conversations: vec![
                Conversation {
                    name: "user".to_string(),
                    add_generation_prompt: true,
                    messages: vec![Message::new(Role::User, "hi")],
                },
                Conversation {
                    name: "system".to_string(),
                    add_generation_prompt: false,
                    messages: vec![
                        Message::new(Role::System, "be nice"),
                        Message::new(Role::User, "hi"),
                    ],
                },
            ],
        }
    }

    const ORIGINAL: &str = "{% for message in messages %}{{ message['role'] + ': ' + message['content'] + '\\n' }}{% endfor %}{% if add_generation_prompt %}{{ 'assistant: ' }}{% endif %}";

    #[test]
    fn reformatted_template_matches() {
        let replacement = r#"{%- for message in messages %}
    {{- message['role'] + ': ' + message['content'] + '\n' }}
{%- endfor %}
{%- if add_generation_prompt %}
    {{- 'assistant: ' }}
{%- endif %}"#;

        let report =
            verify_entry("fixture", ORIGINAL.as_bytes(), replacement.as_bytes(), &corpus()).unwrap();
        assert!(report.is_equivalent(), "{report:?}");
        assert_eq!(report.results.len(), 2);
    }

    #[test]
    fn dropped_text_is_a_mismatch() {
        let replacement = "{%- for message in messages %}{{- message['role'] + ': ' + message['content'] }}{%- endfor %}{%- if add_generation_prompt %}{{- 'assistant: ' }}{%- endif %}";

        let report =
            verify_entry("fixture", ORIGINAL.as_bytes(), replacement.as_bytes(), &corpus()).unwrap();
        assert!(!report.is_equivalent());
        match &report.results[0].outcome {
            Outcome::Mismatch {
                offset,
                expected,
                actual,
            } => {
                assert_eq!(*offset, "user: hi".len());
                assert!(expected.starts_with('\n'));
                assert!(actual.starts_with("assistant"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn python_method_in_replacement_fails_target() {
        let original = "{{ messages[0]['content'].upper() }}";
        let report =
            verify_entry("fixture", original.as_bytes(), original.as_bytes(), &corpus()).unwrap();
        assert!(matches!(report.results[0].outcome, Outcome::TargetFailed(_)));
    }

    #[test]
    fn shared_exception_counts_as_equivalent() {
        let original = "{% if messages[0]['role'] == 'system' %}{{ raise_exception('System role not supported') }}{% endif %}{{ messages[0]['content'] }}";
        let replacement = "{%- if messages[0]['role'] == 'system' %}\n    {{- raise_exception('System role not supported') }}\n{%- endif %}\n{{- messages[0]['content'] }}";

        let report =
            verify_entry("fixture", original.as_bytes(), replacement.as_bytes(), &corpus()).unwrap();
        assert_eq!(report.results[0].outcome, Outcome::Match);
        assert_eq!(
            report.results[1].outcome,
            Outcome::BothRaised("System role not supported".to_string())
        );
        assert!(report.is_equivalent());
    }

    #[test]
    fn inlined_date_matches_strftime_now() {
        let original = "Today Date: {{ strftime_now('%d %b %Y') }}";
        let replacement = "Today Date: 26 Jul 2024";
        let report =
            verify_entry("fixture", original.as_bytes(), replacement.as_bytes(), &corpus()).unwrap();
        assert!(report.is_equivalent(), "{report:?}");
    }

    #[test]
    fn undecodable_template_is_an_error() {
        assert!(verify_entry("fixture", &[0xff, 0x00], b"ok", &corpus()).is_err());
    }
}
