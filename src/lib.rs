//! Known-template substitution for GGUF chat templates.
//!
//! Model authors often write chat templates against a full Jinja2 runtime.
//! A constrained engine trips over some of them, so templates we have seen
//! misbehave are recognised verbatim and swapped for hand-written
//! equivalents. Anything else is passed through untouched.
//!
//! ```
//! use chat_template_fixup::{Registry, Resolver};
//!
//! let registry = Registry::builtin()?;
//! let resolver = Resolver::new(registry);
//! assert_eq!(resolver.normalize_str("{{ messages }}"), "{{ messages }}");
//! # Ok::<(), chat_template_fixup::CatalogueError>(())
//! ```

pub mod audit;
pub mod catalogue;
pub mod chat;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod verify;

pub use registry::{CatalogueError, Registry, TemplateEntry};
pub use resolver::{Resolution, Resolver};
