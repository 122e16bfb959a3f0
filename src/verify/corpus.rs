use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use crate::chat::Message;

const DEFAULT_CORPUS: &str = include_str!("../../corpus/default.toml");

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conversation {
    pub name: String,
    #[serde(default = "default_true")]
    pub add_generation_prompt: bool,
    pub messages: Vec<Message>,
}

/// Conversations every catalogue pair is rendered against.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Corpus {
    #[serde(default)]
    pub bos_token: String,
    #[serde(default)]
    pub eos_token: String,
    /// What `strftime_now` reports; today when unset.
    pub date: Option<NaiveDate>,
    #[serde(rename = "conversation", default)]
    pub conversations: Vec<Conversation>,
}

impl Corpus {
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        let corpus: Corpus = toml::from_str(s)?;
        if corpus.conversations.is_empty() {
            anyhow::bail!("corpus has no conversations");
        }
        Ok(corpus)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading corpus {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("parsing corpus {}", path.display()))
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml(DEFAULT_CORPUS).context("embedded default corpus")
    }

    pub fn today(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
