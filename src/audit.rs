//! Consistency checks over a built registry, beyond what construction rejects.

use std::fmt::Display;

use crate::{catalogue::Catalogue, registry::Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// The replacement would itself be rewritten by a second lookup.
    ReplacementIsOriginal { of: String },
    EmptyOriginal,
    /// Replacement and original are the same bytes, the entry does nothing.
    NoOp,
    /// The original contains `\r`; a converter that rewrites line endings defeats it.
    CarriageReturn,
    MissingOnDisk,
    MissingFromBuild,
    /// The embedded bytes or manifest differ from the directory.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub entry: String,
    pub kind: FindingKind,
}

impl Finding {
    fn new(severity: Severity, entry: &str, kind: FindingKind) -> Self {
        Self {
            severity,
            entry: entry.to_string(),
            kind,
        }
    }
}

impl Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingKind::ReplacementIsOriginal { of } => {
                write!(f, "replacement is the original of `{of}`")
            }
            FindingKind::EmptyOriginal => write!(f, "original template is empty"),
            FindingKind::NoOp => write!(f, "replacement is identical to the original"),
            FindingKind::CarriageReturn => write!(f, "original contains carriage returns"),
            FindingKind::MissingOnDisk => write!(f, "embedded but missing from the catalogue directory"),
            FindingKind::MissingFromBuild => write!(f, "in the catalogue directory but not embedded"),
            FindingKind::Stale => write!(f, "embedded copy differs from the catalogue directory"),
        }
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}: {}", self.entry, self.kind)
    }
}

pub fn audit(registry: &Registry) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (name, original, replacement) in registry.entries() {
        if original.is_empty() {
            findings.push(Finding::new(Severity::Error, name, FindingKind::EmptyOriginal));
        }
        if original == replacement.as_bytes() {
            findings.push(Finding::new(Severity::Warning, name, FindingKind::NoOp));
        } else if let Some(hit) = registry.lookup_entry(replacement.as_bytes()) {
            findings.push(Finding::new(
                Severity::Error,
                name,
                FindingKind::ReplacementIsOriginal {
                    of: hit.name.to_string(),
                },
            ));
        }
        if original.contains(&b'\r') {
            findings.push(Finding::new(Severity::Warning, name, FindingKind::CarriageReturn));
        }
    }

    findings
}

/// Differences between the embedded catalogue and a catalogue directory.
pub fn drift(embedded: &Catalogue, on_disk: &Catalogue) -> Vec<Finding> {
    let mut findings = Vec::new();

    for entry in &embedded.entries {
        match on_disk.get(&entry.name) {
            None => findings.push(Finding::new(Severity::Error, &entry.name, FindingKind::MissingOnDisk)),
            Some(disk) if disk != entry => {
                findings.push(Finding::new(Severity::Error, &entry.name, FindingKind::Stale))
            }
            Some(_) => {}
        }
    }
    for entry in &on_disk.entries {
        if embedded.get(&entry.name).is_none() {
            findings.push(Finding::new(
                Severity::Error,
                &entry.name,
                FindingKind::MissingFromBuild,
            ));
        }
    }

    findings
}

pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}
