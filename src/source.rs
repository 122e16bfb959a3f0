//! Where raw chat templates come from before they are normalized.

use std::path::PathBuf;

use anyhow::Context;

use crate::resolver::Resolver;

pub trait TemplateSource {
    /// The template exactly as the model ships it, `None` if it has none.
    fn chat_template(&self) -> anyhow::Result<Option<String>>;
}

/// A template kept in a plain file, e.g. dumped from a model's tokenizer config.
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemplateSource for FileSource {
    fn chat_template(&self) -> anyhow::Result<Option<String>> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("reading template {}", self.path.display()))?;
        let template = String::from_utf8(bytes)
            .with_context(|| format!("template {} is not UTF-8", self.path.display()))?;
        Ok(Some(template))
    }
}

#[cfg(feature = "llama")]
pub use gguf::GgufSource;

#[cfg(feature = "llama")]
mod gguf {
    use std::path::PathBuf;

    use anyhow::Context;
    use llama_cpp_2::{
        llama_backend::LlamaBackend,
        model::{params::LlamaModelParams, LlamaModel},
    };

    // large enough for the longest templates seen in the wild
    const TEMPLATE_BUF_SIZE: usize = 64 * 1024;

    /// Reads `tokenizer.chat_template` out of a GGUF model.
    pub struct GgufSource {
        pub model_path: PathBuf,
    }

    impl GgufSource {
        pub fn new(model_path: impl Into<PathBuf>) -> Self {
            Self {
                model_path: model_path.into(),
            }
        }
    }

    impl super::TemplateSource for GgufSource {
        fn chat_template(&self) -> anyhow::Result<Option<String>> {
            let backend = LlamaBackend::init()?;
            let model_params = LlamaModelParams::default().with_n_gpu_layers(0);
            let model = LlamaModel::load_from_file(&backend, &self.model_path, &model_params)
                .with_context(|| format!("loading {}", self.model_path.display()))?;

            match model.get_chat_template(TEMPLATE_BUF_SIZE) {
                Ok(template) => Ok(Some(template)),
                Err(e) => {
                    log::warn!(
                        "no chat template in {}: {e}",
                        self.model_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }
}

/// Pulls the template from `source` and runs it through `resolver`.
pub fn effective_template(
    source: &dyn TemplateSource,
    resolver: &Resolver<'_>,
) -> anyhow::Result<Option<String>> {
    let Some(raw) = source.chat_template()? else {
        return Ok(None);
    };

    match resolver.registry().lookup_entry(raw.as_bytes()) {
        Some(hit) => {
            log::info!("chat template replaced by catalogue entry `{}`", hit.name);
            Ok(Some(hit.replacement.to_string()))
        }
        None => {
            log::debug!("chat template not in catalogue, using it as is");
            Ok(Some(raw))
        }
    }
}
