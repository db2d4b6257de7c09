//! model-intake: pick a 3D model and every file it depends on
//!
//! Usage:
//!   model-intake load bundled            # choose from the bundled models
//!   model-intake load filesystem --probe # native file dialog, then read everything
//!   model-intake load external --out request.ron
//!   model-intake inspect bundled://demo/cube.obj
//!   model-intake bundled

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use model_intake::identifier::{ScopedIdentifier, LOCAL_SCHEME};
use model_intake::model::{DependencyInspector, ModelFormat, WavefrontInspector};
use model_intake::resolver::{self, open_async, PendingOpen, ResolverRegistry, Sources};
use model_intake::workflow::{
    AuxiliaryRole, CorrelationTag, LoadWorkflow, Outcome, ResolvedLoadRequest, RootSelection,
    SourceKind, Supply, Suspension, SuspensionKind,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often `--probe` checks for finished reads
const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[command(name = "model-intake", version)]
#[command(about = "Resolve a 3D model and the material and texture files it references")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a model and answer the questions about its dependencies
    Load {
        /// Where the root model comes from
        #[arg(value_enum)]
        source: SourceArg,
        /// Write the resolved request here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Read every resolved file and report its size
        #[arg(long)]
        probe: bool,
    },
    /// Show the format and declared references of a model
    Inspect {
        /// A scoped identifier, e.g. bundled://demo/cube.obj
        identifier: ScopedIdentifier,
    },
    /// List bundled models
    Bundled,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Bundled,
    Filesystem,
    External,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Bundled => SourceKind::Bundled,
            SourceArg::Filesystem => SourceKind::Filesystem,
            SourceArg::External => SourceKind::ExternalProvider,
        }
    }
}

fn main() -> Result<()> {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load { source, out, probe } => load(source.into(), out, probe),
        Commands::Inspect { identifier } => inspect(&identifier),
        Commands::Bundled => list_bundled(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn load(source: SourceKind, out: Option<PathBuf>, probe: bool) -> Result<()> {
    let sources = resolver::global();
    let registry = sources.registry();
    let mut workflow = LoadWorkflow::new(WavefrontInspector::new(registry.clone()));

    match source {
        SourceKind::Filesystem => ensure_storage_grant(sources)?,
        SourceKind::ExternalProvider => sources.documents().clear(),
        SourceKind::Bundled => {}
    }

    let mut outcome = Outcome::Suspended(workflow.start_load(source)?);
    let request = loop {
        show_notifications(&mut workflow);
        outcome = match outcome {
            Outcome::Suspended(question) => answer(&mut workflow, sources, source, question)?,
            Outcome::Resolved(request) => break request,
            Outcome::Abandoned => {
                println!("Load abandoned");
                return Ok(());
            }
            Outcome::Ignored => bail!("answer did not match the pending question"),
        };
    };
    show_notifications(&mut workflow);

    let text = request.to_ron().context("Failed to serialize request")?;
    match out {
        Some(path) => {
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Request written to {}", path.display());
        }
        None => println!("{}", text),
    }

    if probe {
        probe_request(registry, &request);
    }
    Ok(())
}

fn inspect(identifier: &ScopedIdentifier) -> Result<()> {
    let sources = resolver::global();
    if identifier.scheme() == LOCAL_SCHEME {
        ensure_storage_grant(sources)?;
    }

    let format = ModelFormat::from_name(identifier.file_name());
    println!("{}: {}", identifier, format.label());
    if !format.has_dependencies() {
        return Ok(());
    }

    let inspector = WavefrontInspector::new(sources.registry());
    let Some(material) = inspector
        .material_reference(identifier)
        .with_context(|| format!("Failed to read {}", identifier))?
    else {
        println!("  material: none");
        return Ok(());
    };
    println!("  material: {}", material);

    // Materials are usually stored next to the model
    let neighbour = sibling(identifier, &material)?;
    match inspector.texture_reference(&neighbour) {
        Ok(Some(texture)) => println!("  texture:  {}", texture),
        Ok(None) => println!("  texture:  none"),
        Err(e) => println!("  texture:  unknown ({})", e),
    }
    Ok(())
}

fn list_bundled() -> Result<()> {
    let sources = resolver::global();
    let models = bundled_models(sources)?;
    if models.is_empty() {
        println!("No bundled models in {}", sources.bundled().base_dir().display());
    }
    for path in models {
        println!("{:<40} {}", path, ModelFormat::from_name(&path).label());
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Answering suspensions
// ─────────────────────────────────────────────────────────────────────────────

fn answer(
    workflow: &mut LoadWorkflow,
    sources: &Sources,
    source: SourceKind,
    question: Suspension,
) -> Result<Outcome> {
    let Suspension { tag, kind } = question;
    log::debug!("Answering {} ({:?})", tag, kind);

    let outcome = match kind {
        SuspensionKind::RootSelection { source } => {
            let selection = match pick_root(sources, source)? {
                Some(root) => RootSelection::Picked(root),
                None => RootSelection::Abandoned,
            };
            workflow.respond_root_selection(tag, selection)
        }
        SuspensionKind::FormatChoice => {
            let format = choose_format(workflow)?;
            answer_format(workflow, tag, format)
        }
        SuspensionKind::MaterialChoice { name } => {
            let supply = pick_dependency(sources, source, AuxiliaryRole::Material, &name)?;
            workflow.respond_material_choice(tag, supply)
        }
        SuspensionKind::TextureChoice { name } => {
            let supply = pick_dependency(sources, source, AuxiliaryRole::Texture, &name)?;
            workflow.respond_texture_choice(tag, supply)
        }
    };
    Ok(outcome)
}

fn pick_root(sources: &Sources, source: SourceKind) -> Result<Option<ScopedIdentifier>> {
    let picked = match source {
        SourceKind::Bundled => {
            let models = bundled_models(sources)?;
            choose_from_list("Bundled models", &models)?.map(ScopedIdentifier::bundled)
        }
        SourceKind::Filesystem => {
            pick_file("Open model", Some(("Models", ModelFormat::SUPPORTED_EXTENSIONS)))
                .map(|path| ScopedIdentifier::local(path.to_string_lossy()))
        }
        SourceKind::ExternalProvider => {
            pick_file("Open model", None).map(|path| sources.documents().provide_file(path))
        }
    };
    Ok(picked)
}

/// Ask which format an unrecognized root is in; `None` when cancelled
fn choose_format(workflow: &LoadWorkflow) -> Result<Option<ModelFormat>> {
    let name = workflow
        .session()
        .and_then(|s| s.root())
        .map(|root| root.to_string())
        .unwrap_or_default();
    println!("Cannot tell the format of {}.", name);

    let labels: Vec<&str> = ModelFormat::CHOICES.iter().map(|f| f.label()).collect();
    let choice = choose_from_list("Load it as", &labels)?;
    Ok(choice.and_then(|label| ModelFormat::CHOICES.into_iter().find(|f| f.label() == label)))
}

/// A cancelled format question ends the load
fn answer_format(
    workflow: &mut LoadWorkflow,
    tag: CorrelationTag,
    format: Option<ModelFormat>,
) -> Outcome {
    match format {
        Some(format) => workflow.respond_format_choice(tag, format),
        None => workflow.abandon(),
    }
}

fn pick_dependency(
    sources: &Sources,
    source: SourceKind,
    role: AuxiliaryRole,
    name: &str,
) -> Result<Supply> {
    let question = format!("The model references the {} '{}'. Supply it?", role.label(), name);
    if !confirm(&question)? {
        return Ok(Supply::Declined);
    }

    let extensions = dependency_extensions(role);
    let picked = match source {
        SourceKind::Bundled => {
            let candidates: Vec<String> = sources
                .bundled()
                .list()?
                .into_iter()
                .filter(|path| has_extension(path, &extensions))
                .collect();
            choose_from_list(name, &candidates)?.map(ScopedIdentifier::bundled)
        }
        SourceKind::Filesystem => pick_file(name, Some((role.label(), extensions.as_slice())))
            .map(|path| ScopedIdentifier::local(path.to_string_lossy())),
        SourceKind::ExternalProvider => {
            pick_file(name, None).map(|path| sources.documents().provide_file(path))
        }
    };

    Ok(picked.map(Supply::Supplied).unwrap_or(Supply::Declined))
}

fn probe_request(registry: Arc<ResolverRegistry>, request: &ResolvedLoadRequest) {
    let mut pending: Vec<PendingOpen> = request
        .identifiers()
        .map(|id| open_async(registry.clone(), id.clone()))
        .collect();

    // Report each file as soon as its read finishes
    while !pending.is_empty() {
        let mut running = Vec::with_capacity(pending.len());
        for mut open in pending {
            if !open.poll() {
                running.push(open);
                continue;
            }
            if let Some((identifier, result)) = open.finish() {
                match result {
                    Ok(bytes) => println!("  {} ({} bytes)", identifier, bytes.len()),
                    Err(e) => println!("  {} failed: {}", identifier, e),
                }
            }
        }
        pending = running;
        if !pending.is_empty() {
            thread::sleep(PROBE_POLL_INTERVAL);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn show_notifications(workflow: &mut LoadWorkflow) {
    for note in workflow.notifications() {
        eprintln!("! {}", note);
    }
}

fn ensure_storage_grant(sources: &Sources) -> Result<()> {
    let grant = sources.storage_grant();
    if !grant.is_granted() && confirm("Allow reading from local storage?")? {
        grant.grant();
    }
    Ok(())
}

fn bundled_models(sources: &Sources) -> Result<Vec<String>> {
    let models = sources
        .bundled()
        .list()
        .context("Failed to list bundled models")?
        .into_iter()
        .filter(|path| ModelFormat::is_supported_file(path))
        .collect();
    Ok(models)
}

/// File extensions offered when picking a dependency
fn dependency_extensions(role: AuxiliaryRole) -> Vec<&'static str> {
    match role {
        AuxiliaryRole::Material => vec!["mtl"],
        AuxiliaryRole::Texture => image::ImageFormat::all()
            .filter(|format| format.reading_enabled())
            .flat_map(|format| format.extensions_str().iter().copied())
            .collect(),
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// `name` in the same directory as `identifier`
fn sibling(identifier: &ScopedIdentifier, name: &str) -> Result<ScopedIdentifier> {
    let path = match identifier.path().rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, name),
        None => name.to_string(),
    };
    Ok(ScopedIdentifier::new(identifier.scheme(), path)?)
}

fn read_answer() -> Result<String> {
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read answer")?;
    Ok(line.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    let answer = read_answer()?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Numbered pick; an empty answer or 0 picks nothing
fn choose_from_list<T: AsRef<str> + Clone>(title: &str, items: &[T]) -> Result<Option<T>> {
    if items.is_empty() {
        println!("{}: nothing to choose from", title);
        return Ok(None);
    }

    println!("{}:", title);
    for (i, item) in items.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, item.as_ref());
    }

    loop {
        print!("Choice (1-{}, empty to cancel): ", items.len());
        let answer = read_answer()?;
        if answer.is_empty() || answer == "0" {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=items.len()).contains(&n) => return Ok(Some(items[n - 1].clone())),
            _ => println!("Not a valid choice: {}", answer),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn pick_file(title: &str, filter: Option<(&str, &[&str])>) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new().set_title(title);
    if let Some((name, extensions)) = filter {
        dialog = dialog.add_filter(name, extensions);
    }
    dialog.pick_file()
}

#[cfg(target_arch = "wasm32")]
fn pick_file(title: &str, _filter: Option<(&str, &[&str])>) -> Option<PathBuf> {
    print!("{} (path): ", title);
    read_answer()
        .ok()
        .filter(|answer| !answer.is_empty())
        .map(PathBuf::from)
}
