//! missing-refs: Detect missing references in serialized scene graphs.
//!
//! Reads an editor state snapshot, scans every open document for missing
//! scripts, dangling object references and broken event calls, and proposes
//! replacement types for scripts whose type vanished.

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Args, Commands, ScanSwitches};
use colored::Colorize;
use missing_refs::candidates::{CandidateSearch, SearchCache};
use missing_refs::config::SearchConfig;
use missing_refs::graph::{Scanner, objects_with_missing_scripts};
use missing_refs::host::{ObjectGraphSource, ObjectId, PropertyStore};
use missing_refs::identifier::{CLASS_IDENTIFIER_PATH, stamp_class_identifier};
use missing_refs::project::ProjectIndex;
use missing_refs::report;
use missing_refs::salvage::{self, SalvageRequest};
use missing_refs::snapshot::Snapshot;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Scan {
            snapshot,
            switches,
            log,
            json,
        } => cmd_scan(&snapshot, switches, log, json),
        Commands::Candidates {
            descriptor,
            snapshot,
            project,
            config,
            exclude_assembly,
            json,
        } => cmd_candidates(
            &descriptor,
            &snapshot,
            &project,
            config.as_deref(),
            exclude_assembly,
            json,
        ),
        Commands::Salvage {
            snapshot,
            object,
            json,
        } => cmd_salvage(&snapshot, ObjectId(object), json),
        Commands::MissingScripts { snapshot } => cmd_missing_scripts(&snapshot),
        Commands::Stamp { snapshot, object } => cmd_stamp(&snapshot, ObjectId(object)),
        Commands::Index {
            project,
            exclude,
            no_default_excludes,
            extension,
        } => cmd_index(&project, &exclude, !no_default_excludes, &extension),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn cmd_scan(snapshot_path: &Path, switches: ScanSwitches, log: bool, json: bool) -> Result<()> {
    let snapshot = Snapshot::load(snapshot_path)?;
    let session = Scanner::new(&snapshot, switches.into()).run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }

    if log {
        print!("{}", report::format_log(&session));
        return Ok(());
    }

    if session.is_empty() {
        println!("{} No missing references found", "ok:".green().bold());
        return Ok(());
    }

    println!(
        "\n{} {} missing reference(s) in {} document(s):\n",
        "Found".red().bold(),
        session.total_count(),
        session.documents.len()
    );
    print!("{}", report::render_tree(&session));
    Ok(())
}

fn cmd_candidates(
    descriptor: &str,
    snapshot_path: &Path,
    project: &Path,
    config_path: Option<&Path>,
    exclude_assembly: Vec<String>,
    json: bool,
) -> Result<()> {
    let snapshot = Snapshot::load(snapshot_path)?;
    let mut config = match config_path {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };
    config.excluded_assembly_patterns.extend(exclude_assembly);

    let index = ProjectIndex::build(project, &[], true, &config.source_extension)?;
    let search = CandidateSearch::new(&snapshot, &index, &config)?;
    let matches = search.search(&mut SearchCache::new(), descriptor);

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        println!("{} No candidates for {}", "info:".blue().bold(), descriptor);
        return Ok(());
    }

    println!(
        "\n{} {} candidate(s) for {}:\n",
        "Found".green().bold(),
        matches.len(),
        descriptor.bold()
    );
    print!("{}", report::render_candidates(&matches));
    Ok(())
}

fn cmd_salvage(snapshot_path: &Path, component: ObjectId, json: bool) -> Result<()> {
    let snapshot = Snapshot::load(snapshot_path)?;
    if snapshot.object(component).is_none() {
        bail!("unknown object {}", component);
    }
    if snapshot.is_type_resolved(component) {
        bail!("object {} has a resolved type; nothing to salvage", component);
    }

    let identifier = snapshot
        .find_property(component, CLASS_IDENTIFIER_PATH)
        .and_then(|p| p.as_str().map(str::to_string))
        .unwrap_or_default();
    let members = salvage::read_members(
        &snapshot,
        &snapshot,
        &snapshot,
        &SalvageRequest {
            owner: snapshot.owner_of(component),
            identifier: &identifier,
            subject: component,
        },
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&members)?);
        return Ok(());
    }

    let Some(members) = members else {
        println!(
            "{} Nothing to salvage for object {}",
            "info:".blue().bold(),
            component
        );
        return Ok(());
    };

    println!(
        "{} {} ({} member(s))",
        "Salvaged".green().bold(),
        identifier,
        members.len()
    );
    for member in &members {
        let known = if member.property.is_some() {
            "live".green()
        } else {
            "gone".dimmed()
        };
        println!("  {}: {} [{}]", member.name, member.value, known);
    }
    Ok(())
}

fn cmd_missing_scripts(snapshot_path: &Path) -> Result<()> {
    let snapshot = Snapshot::load(snapshot_path)?;
    let objects = objects_with_missing_scripts(&snapshot);

    if objects.is_empty() {
        println!("{} No objects with missing scripts", "ok:".green().bold());
        return Ok(());
    }

    println!(
        "{} {} object(s) with missing scripts:",
        "Found".red().bold(),
        objects.len()
    );
    for object in objects {
        let hidden = snapshot.object(object).is_some_and(|o| o.hidden);
        println!(
            "  {} {}{}",
            object.to_string().dimmed(),
            snapshot.object_name(object),
            if hidden { " (hidden)".dimmed() } else { "".normal() }
        );
    }
    Ok(())
}

fn cmd_stamp(snapshot_path: &Path, object: ObjectId) -> Result<()> {
    let mut snapshot = Snapshot::load(snapshot_path)?;
    if snapshot.object(object).is_none() {
        bail!("unknown object {}", object);
    }

    match stamp_class_identifier(&mut snapshot, object)
        .with_context(|| format!("Failed to stamp object {}", object))?
    {
        Some(identifier) => println!(
            "{} {} = {}",
            "would write".cyan().bold(),
            CLASS_IDENTIFIER_PATH,
            identifier
        ),
        None => println!(
            "{} Object {} needs no class identifier update",
            "info:".blue().bold(),
            object
        ),
    }
    Ok(())
}

fn cmd_index(project: &Path, exclude: &[String], default_excludes: bool, extension: &str) -> Result<()> {
    let index = ProjectIndex::build(project, exclude, default_excludes, extension)?;
    let paths = index.paths();

    println!("Would index {} files:", paths.len());
    for path in paths {
        println!("  {}", project.join(path).display());
    }
    Ok(())
}
