use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Parser, Subcommand};

use chat_template_fixup::{
    audit,
    catalogue::{Catalogue, Manifest},
    source::{self, FileSource, TemplateSource},
    verify::{Corpus, Outcome},
    Registry, Resolver,
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Catalogue directory used by the maintenance commands
    #[arg(long, global = true, env = "CHAT_TEMPLATE_CATALOGUE", default_value = "catalogue")]
    catalogue: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the template a model should actually be rendered with
    Normalize {
        /// Path to a raw template file
        #[arg(required_unless_present = "gguf")]
        template: Option<PathBuf>,

        /// Read the template from a GGUF model instead
        #[arg(long, conflicts_with = "template")]
        gguf: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the catalogue compiled into this binary
    List,

    /// Check the catalogue directory for duplicates, chains and drift
    Check,

    /// Render every pair over a corpus and report differences
    Verify {
        /// Corpus of conversations (TOML), the embedded one by default
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Only verify this entry
        #[arg(long)]
        entry: Option<String>,
    },

    /// Add a new pair to the catalogue directory
    Add {
        /// Directory name of the new entry
        #[arg(long)]
        name: String,

        /// File holding the template exactly as the model ships it
        #[arg(long)]
        original: PathBuf,

        /// File holding the rewritten template
        #[arg(long)]
        replacement: PathBuf,

        /// Model file or repository carrying the original (repeatable)
        #[arg(short, long = "model", required = true)]
        models: Vec<String>,

        /// Issue or reporter that motivated the entry (repeatable)
        #[arg(short, long)]
        reported: Vec<String>,
    },
}

fn normalize(
    template: Option<PathBuf>,
    gguf: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let registry = Registry::builtin()?;
    let resolver = Resolver::new(registry);

    let template_source: Box<dyn TemplateSource> = match (template, gguf) {
        (Some(path), _) => Box::new(FileSource::new(path)),
        (None, Some(model)) => gguf_source(model)?,
        (None, None) => anyhow::bail!("either a template file or --gguf is required"),
    };

    let Some(template) = source::effective_template(template_source.as_ref(), &resolver)? else {
        log::error!("model has no chat template");
        return Ok(ExitCode::FAILURE);
    };

    match output {
        Some(path) => std::fs::write(&path, template.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(template.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "llama")]
fn gguf_source(model: PathBuf) -> anyhow::Result<Box<dyn TemplateSource>> {
    Ok(Box::new(source::GgufSource::new(model)))
}

#[cfg(not(feature = "llama"))]
fn gguf_source(_model: PathBuf) -> anyhow::Result<Box<dyn TemplateSource>> {
    anyhow::bail!("reading GGUF files needs the `llama` feature")
}

fn list() -> anyhow::Result<ExitCode> {
    let catalogue = Catalogue::builtin()?;
    for entry in &catalogue.entries {
        println!(
            "{:<28} {:>6} -> {:<6} {}",
            entry.name,
            entry.original.len(),
            entry.replacement.len(),
            entry.provenance()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn check(dir: PathBuf) -> anyhow::Result<ExitCode> {
    let on_disk = Catalogue::load_dir(&dir)?;
    let registry = on_disk.registry()?;

    let mut findings = audit::audit(&registry);
    findings.extend(audit::drift(&Catalogue::builtin()?, &on_disk));

    for finding in &findings {
        match finding.severity {
            audit::Severity::Error => log::error!("{finding}"),
            audit::Severity::Warning => log::warn!("{finding}"),
        }
    }

    if audit::has_errors(&findings) {
        return Ok(ExitCode::FAILURE);
    }
    log::info!("{} entries in {} are consistent", registry.len(), dir.display());
    Ok(ExitCode::SUCCESS)
}

fn verify_catalogue(
    dir: PathBuf,
    corpus: Option<PathBuf>,
    only: Option<String>,
) -> anyhow::Result<ExitCode> {
    let corpus = match corpus {
        Some(path) => Corpus::load(path)?,
        None => Corpus::builtin()?,
    };
    let catalogue = Catalogue::load_dir(&dir)?;

    let entries: Vec<_> = match &only {
        Some(name) => vec![catalogue
            .get(name)
            .with_context(|| format!("no catalogue entry named `{name}`"))?],
        None => catalogue.entries.iter().collect(),
    };

    let mut failed = 0;
    for entry in entries {
        let report = entry.verify(&corpus)?;
        let unexpected = entry.unexpected_failures(&report);
        if unexpected.is_empty() {
            match &entry.manifest.divergence {
                Some(d) if !report.is_equivalent() => {
                    println!("known    {}: {}", report.name, d.reason)
                }
                Some(_) => {
                    println!("ok       {}", report.name);
                    log::warn!("`{}` declares a divergence the corpus does not show", report.name);
                }
                None => println!("ok       {}", report.name),
            }
            continue;
        }

        failed += 1;
        println!("FAILED   {}", report.name);
        for failure in unexpected {
            match &failure.outcome {
                Outcome::Mismatch {
                    offset,
                    expected,
                    actual,
                } => println!(
                    "    {}: differs at byte {offset}\n      expected {expected:?}\n      actual   {actual:?}",
                    failure.conversation
                ),
                Outcome::ReferenceFailed(e) => {
                    println!("    {}: original failed to render: {e}", failure.conversation)
                }
                Outcome::TargetFailed(e) => {
                    println!("    {}: replacement failed to render: {e}", failure.conversation)
                }
                Outcome::Match | Outcome::BothRaised(_) => {}
            }
        }
    }

    if failed > 0 {
        log::error!("{failed} entries are not equivalent over the corpus");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn add(
    dir: PathBuf,
    name: String,
    original: PathBuf,
    replacement: PathBuf,
    manifest: Manifest,
) -> anyhow::Result<ExitCode> {
    let original = std::fs::read(&original)
        .with_context(|| format!("reading {}", original.display()))?;
    let replacement = std::fs::read(&replacement)
        .with_context(|| format!("reading {}", replacement.display()))?;

    let path = Catalogue::add_entry(&dir, &name, &manifest, &original, &replacement)?;
    println!("{}", path.display());
    log::info!("add `entry!(\"{name}\")` to src/catalogue/builtin.rs to ship it");
    Ok(ExitCode::SUCCESS)
}

fn run(cli: Args) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Normalize {
            template,
            gguf,
            output,
        } => normalize(template, gguf, output),
        Command::List => list(),
        Command::Check => check(cli.catalogue),
        Command::Verify { corpus, entry } => verify_catalogue(cli.catalogue, corpus, entry),
        Command::Add {
            name,
            original,
            replacement,
            models,
            reported,
        } => add(
            cli.catalogue,
            name,
            original,
            replacement,
            Manifest {
                models,
                reported,
                ..Manifest::default()
            },
        ),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Args::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
