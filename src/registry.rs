//! Exact-match table of known chat templates and their engine-safe rewrites.
//!
//! Keys are compared byte for byte. Nothing is trimmed, re-encoded or
//! case-folded before lookup, so a template that differs from a catalogue
//! original by a single newline is simply not covered.

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
};

use once_cell::sync::OnceCell;

use crate::catalogue::builtin::BUILTIN;

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue entries `{first}` and `{second}` share the same original template")]
    DuplicateOriginal { first: String, second: String },
    #[error("catalogue entry name `{0}` is used more than once")]
    DuplicateName(String),
    #[error("replacement of catalogue entry `{0}` is not valid UTF-8")]
    NonUtf8Replacement(String),
}

/// One curated (original, replacement) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub name: Cow<'static, str>,
    pub original: Cow<'static, [u8]>,
    pub replacement: Cow<'static, [u8]>,
}

impl TemplateEntry {
    pub const fn from_static(
        name: &'static str,
        original: &'static [u8],
        replacement: &'static [u8],
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            original: Cow::Borrowed(original),
            replacement: Cow::Borrowed(replacement),
        }
    }

    pub fn owned(name: impl Into<String>, original: Vec<u8>, replacement: Vec<u8>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            original: Cow::Owned(original),
            replacement: Cow::Owned(replacement),
        }
    }
}

#[derive(Debug)]
struct Stored {
    name: Cow<'static, str>,
    original: Cow<'static, [u8]>,
    replacement: Cow<'static, str>,
}

/// Read-only after construction; share it by reference or behind an `Arc`.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<Stored>,
    index: HashMap<Cow<'static, [u8]>, usize>,
}

/// A matched entry: its catalogue name and the replacement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<'a> {
    pub name: &'a str,
    pub replacement: &'a str,
}

static BUILTIN_REGISTRY: OnceCell<Registry> = OnceCell::new();

impl Registry {
    pub fn new<I>(entries: I) -> Result<Self, CatalogueError>
    where
        I: IntoIterator<Item = TemplateEntry>,
    {
        let mut stored: Vec<Stored> = Vec::new();
        let mut index: HashMap<Cow<'static, [u8]>, usize> = HashMap::new();
        let mut names: HashSet<Cow<'static, str>> = HashSet::new();

        for entry in entries {
            if !names.insert(entry.name.clone()) {
                return Err(CatalogueError::DuplicateName(entry.name.into_owned()));
            }
            if let Some(&i) = index.get(&*entry.original) {
                let first: &Stored = &stored[i];
                return Err(CatalogueError::DuplicateOriginal {
                    first: first.name.to_string(),
                    second: entry.name.into_owned(),
                });
            }

            let replacement = match entry.replacement {
                Cow::Borrowed(bytes) => match std::str::from_utf8(bytes) {
                    Ok(s) => Cow::Borrowed(s),
                    Err(_) => return Err(CatalogueError::NonUtf8Replacement(entry.name.into_owned())),
                },
                Cow::Owned(bytes) => match String::from_utf8(bytes) {
                    Ok(s) => Cow::Owned(s),
                    Err(_) => return Err(CatalogueError::NonUtf8Replacement(entry.name.into_owned())),
                },
            };

            index.insert(entry.original.clone(), stored.len());
            stored.push(Stored {
                name: entry.name,
                original: entry.original,
                replacement,
            });
        }

        log::debug!("template registry built with {} entries", stored.len());
        Ok(Self {
            entries: stored,
            index,
        })
    }

    /// The registry over the catalogue embedded in this binary, built on first use.
    pub fn builtin() -> Result<&'static Registry, CatalogueError> {
        BUILTIN_REGISTRY.get_or_try_init(|| {
            Registry::new(BUILTIN.iter().map(|e| {
                TemplateEntry::from_static(e.name, e.original, e.replacement)
            }))
        })
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    pub fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        self.lookup_entry(key).map(|hit| hit.replacement.as_bytes())
    }

    pub fn lookup_entry(&self, key: &[u8]) -> Option<Hit<'_>> {
        let stored = &self.entries[*self.index.get(key)?];
        Some(Hit {
            name: &stored.name,
            replacement: &stored.replacement,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, original, replacement)` in the order the catalogue listed them.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[u8], &str)> + '_ {
        self.entries
            .iter()
            .map(|s| (&*s.name, &*s.original, &*s.replacement))
    }
}
