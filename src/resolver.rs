use crate::registry::Registry;

/// Outcome of looking a raw template up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Substituted { entry: &'a str, template: &'a [u8] },
    Unchanged(&'a [u8]),
}

impl<'a> Resolution<'a> {
    pub fn template(&self) -> &'a [u8] {
        match *self {
            Resolution::Substituted { template, .. } => template,
            Resolution::Unchanged(template) => template,
        }
    }

    pub fn is_substituted(&self) -> bool {
        matches!(self, Resolution::Substituted { .. })
    }
}

/// Maps a template taken from model metadata to the one handed to the engine.
///
/// Every input is valid. Unknown templates, including the empty one, come
/// back untouched; the result borrows either the registry or the input.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r Registry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn resolve<'a>(&self, raw: &'a [u8]) -> Resolution<'a>
    where
        'r: 'a,
    {
        match self.registry.lookup_entry(raw) {
            Some(hit) => Resolution::Substituted {
                entry: hit.name,
                template: hit.replacement.as_bytes(),
            },
            None => Resolution::Unchanged(raw),
        }
    }

    pub fn normalize<'a>(&self, raw: &'a [u8]) -> &'a [u8]
    where
        'r: 'a,
    {
        self.resolve(raw).template()
    }

    pub fn normalize_str<'a>(&self, raw: &'a str) -> &'a str
    where
        'r: 'a,
    {
        match self.registry.lookup_entry(raw.as_bytes()) {
            Some(hit) => hit.replacement,
            None => raw,
        }
    }
}
