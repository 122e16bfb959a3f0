//! Curated template pairs, as files on disk and as the copy embedded at build time.
//!
//! An entry is a directory `<catalogue>/<name>/` holding
//!
//! - `original.jinja`: the template exactly as found in model metadata,
//! - `replacement.jinja`: the hand-written equivalent for the constrained engine,
//! - `entry.toml`: which models ship the original and where it was reported.
//!
//! Template files are read and written as raw bytes.

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};

use crate::{
    registry::{Registry, TemplateEntry},
    verify::{self, ConversationReport, Corpus, EntryReport, Outcome},
};

pub mod builtin;

pub const ORIGINAL_FILE: &str = "original.jinja";
pub const REPLACEMENT_FILE: &str = "replacement.jinja";
pub const MANIFEST_FILE: &str = "entry.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Model files or repositories whose metadata carries the original template.
    pub models: Vec<String>,
    /// Issues or reporters that brought the template to our attention.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reported: Vec<String>,
    /// Set when the replacement knowingly renders differently from the original.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Divergence {
    pub reason: String,
    /// Corpus conversations the difference shows up in; empty means all of them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversations: Vec<String>,
}

impl Divergence {
    pub fn covers(&self, conversation: &str) -> bool {
        self.conversations.is_empty() || self.conversations.iter().any(|c| c == conversation)
    }

    /// A blanket declaration only excuses different output. A template that
    /// fails to render is excused only where its conversation is named.
    pub fn excuses(&self, result: &ConversationReport) -> bool {
        if !self.covers(&result.conversation) {
            return false;
        }
        !self.conversations.is_empty() || matches!(result.outcome, Outcome::Mismatch { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub name: String,
    pub manifest: Manifest,
    pub original: Cow<'static, [u8]>,
    pub replacement: Cow<'static, [u8]>,
}

impl CatalogueEntry {
    pub fn provenance(&self) -> String {
        let mut s = self.manifest.models.join(", ");
        if !self.manifest.reported.is_empty() {
            s.push_str(&format!(" ({})", self.manifest.reported.join(", ")));
        }
        s
    }

    pub fn expects_divergence(&self, conversation: &str) -> bool {
        self.manifest
            .divergence
            .as_ref()
            .is_some_and(|d| d.covers(conversation))
    }

    pub fn verify(&self, corpus: &Corpus) -> anyhow::Result<EntryReport> {
        verify::verify_entry(&self.name, &self.original, &self.replacement, corpus)
    }

    /// Failures in `report` that the manifest does not declare.
    pub fn unexpected_failures<'r>(&self, report: &'r EntryReport) -> Vec<&'r ConversationReport> {
        report
            .failures()
            .filter(|f| !self.manifest.divergence.as_ref().is_some_and(|d| d.excuses(f)))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    pub entries: Vec<CatalogueEntry>,
}

impl Catalogue {
    /// The embedded catalogue, with its manifests parsed.
    pub fn builtin() -> anyhow::Result<Self> {
        let mut entries = Vec::with_capacity(builtin::BUILTIN.len());
        for e in builtin::BUILTIN {
            let manifest: Manifest = toml::from_str(e.manifest)
                .with_context(|| format!("embedded manifest of `{}`", e.name))?;
            entries.push(CatalogueEntry {
                name: e.name.to_string(),
                manifest,
                original: Cow::Borrowed(e.original),
                replacement: Cow::Borrowed(e.replacement),
            });
        }
        Ok(Self { entries })
    }

    /// Loads every entry directory under `dir`, sorted by name.
    pub fn load_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("reading catalogue directory {}", dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            entries.push(load_entry(&path)?);
        }
        log::debug!("loaded {} entries from {}", entries.len(), dir.display());
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&CatalogueEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn registry(&self) -> anyhow::Result<Registry> {
        let registry = Registry::new(self.entries.iter().map(|e| TemplateEntry {
            name: Cow::Owned(e.name.clone()),
            original: e.original.clone(),
            replacement: e.replacement.clone(),
        }))?;
        Ok(registry)
    }

    /// Writes a new entry directory under `dir`.
    ///
    /// Refuses a name that is already taken, an original that the catalogue
    /// in `dir` already covers, and any pair that would form a chain with an
    /// existing entry or with itself.
    pub fn add_entry(
        dir: impl AsRef<Path>,
        name: &str,
        manifest: &Manifest,
        original: &[u8],
        replacement: &[u8],
    ) -> anyhow::Result<PathBuf> {
        let dir = dir.as_ref();
        if !is_valid_name(name) {
            bail!("entry name `{name}` must be lowercase ascii letters, digits, `.`, `-` or `_`");
        }
        if manifest.models.is_empty() {
            bail!("entry `{name}` needs at least one model in its manifest");
        }
        if std::str::from_utf8(replacement).is_err() {
            bail!("replacement of `{name}` is not valid UTF-8");
        }
        if original == replacement {
            bail!("replacement of `{name}` is identical to its original");
        }

        let existing = if dir.exists() {
            Catalogue::load_dir(dir)?
        } else {
            Catalogue::default()
        };
        if existing.get(name).is_some() {
            bail!("catalogue entry `{name}` already exists");
        }
        let registry = existing.registry()?;
        if let Some(hit) = registry.lookup_entry(original) {
            bail!("original template is already covered by `{}`", hit.name);
        }
        if let Some((other, ..)) = registry
            .entries()
            .find(|(_, _, r)| r.as_bytes() == original)
        {
            bail!("original of `{name}` is the replacement of `{other}`");
        }
        if registry.contains(replacement) {
            bail!("replacement of `{name}` is itself a catalogue original");
        }

        let entry_dir = dir.join(name);
        if entry_dir.exists() {
            bail!("{} is in the way", entry_dir.display());
        }
        std::fs::create_dir_all(&entry_dir)
            .with_context(|| format!("creating {}", entry_dir.display()))?;
        write_or_remove(&entry_dir, |d| {
            std::fs::write(d.join(ORIGINAL_FILE), original)?;
            std::fs::write(d.join(REPLACEMENT_FILE), replacement)?;
            std::fs::write(d.join(MANIFEST_FILE), toml::to_string(manifest)?)?;
            Ok(())
        })?;

        log::info!("added catalogue entry `{name}` at {}", entry_dir.display());
        Ok(entry_dir)
    }
}

/// Runs `write` on a freshly created `entry_dir`, removing it again if any
/// write fails so no half-written entry is left for `load_dir` to trip on.
fn write_or_remove(
    entry_dir: &Path,
    write: impl FnOnce(&Path) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let Err(e) = write(entry_dir) else {
        return Ok(());
    };
    if let Err(cleanup) = std::fs::remove_dir_all(entry_dir) {
        log::warn!("could not remove {}: {cleanup}", entry_dir.display());
    }
    Err(e.context(format!("writing {}", entry_dir.display())))
}

fn load_entry(path: &Path) -> anyhow::Result<CatalogueEntry> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("entry directory {} has no usable name", path.display()))?
        .to_string();

    let read = |file: &str| {
        let p = path.join(file);
        std::fs::read(&p).with_context(|| format!("reading {}", p.display()))
    };

    let manifest = read(MANIFEST_FILE)?;
    let manifest = std::str::from_utf8(&manifest)
        .with_context(|| format!("manifest of `{name}` is not UTF-8"))?;
    let manifest: Manifest =
        toml::from_str(manifest).with_context(|| format!("parsing manifest of `{name}`"))?;

    Ok(CatalogueEntry {
        manifest,
        original: Cow::Owned(read(ORIGINAL_FILE)?),
        replacement: Cow::Owned(read(REPLACEMENT_FILE)?),
        name,
    })
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"-._".contains(&b))
}
