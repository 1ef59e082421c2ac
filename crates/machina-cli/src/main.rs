//! Machina CLI
//!
//! TigerStyle: Command-line tools for machina worlds with explicit error handling.

mod session;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use machina_core::{init_telemetry, MachinaConfig, TelemetryConfig};
use machina_registry::{
    take_ownership, Category, DefaultHooks, DropPayload, DropResolver, LiveEntity, RegRef,
    Registry,
};
use session::Session;
use std::path::PathBuf;
use std::sync::Arc;

/// Machina CLI
#[derive(Parser, Debug)]
#[command(name = "machina")]
#[command(about = "Inspect and edit machina entity registries")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// World snapshot (JSON)
    #[arg(short, long, global = true)]
    world: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize the world and configuration
    Doctor,

    /// List the entities of one category in a registry
    List {
        /// Registry name (e.g. "world|world", "world_inv:<actor>|world")
        registry: String,

        /// Category (e.g. mech_weapon, pilot)
        category: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a reference and show its links
    Resolve {
        /// Reference as JSON
        reference: String,

        /// Registry to resolve from
        #[arg(long, default_value = "world|world")]
        from: String,
    },

    /// Copy an entity into another registry
    Insinuate {
        /// Reference as JSON
        reference: String,

        /// Destination registry name
        destination: String,

        /// Delete the source after copying
        #[arg(long = "move")]
        move_source: bool,

        /// Write the world back to the snapshot file
        #[arg(long)]
        save: bool,
    },

    /// Resolve a drag-and-drop payload
    Drop {
        /// Payload as JSON
        payload: String,

        /// Categories the drop target accepts (all when omitted)
        #[arg(short, long)]
        accept: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _telemetry = init_telemetry(
        TelemetryConfig::new("machina-cli")
            .with_log_level(level)
            .without_target(),
    )?;

    let config = match &cli.config {
        Some(path) => MachinaConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MachinaConfig::default(),
    };
    let session = Session::open(cli.world.as_deref(), config)?;

    match cli.command {
        Commands::Doctor => cmd_doctor(&session).await,
        Commands::List {
            registry,
            category,
            json,
        } => cmd_list(&session, &registry, &category, json).await,
        Commands::Resolve { reference, from } => cmd_resolve(&session, &reference, &from).await,
        Commands::Insinuate {
            reference,
            destination,
            move_source,
            save,
        } => cmd_insinuate(&session, &reference, &destination, move_source, save).await,
        Commands::Drop { payload, accept } => cmd_drop(&session, &payload, &accept).await,
    }
}

async fn open_registry(session: &Session, name: &str) -> Result<Registry> {
    match session.env().switch_reg(name).await {
        Some(registry) => Ok(registry),
        None => bail!("Registry '{}' is not valid or its owner no longer exists", name),
    }
}

fn parse_ref(text: &str) -> Result<RegRef> {
    serde_json::from_str(text).context("Reference must be JSON: {\"id\", \"category\", \"registry_name\", \"fallback_key\"}")
}

fn print_entity_line(id: &str, name: &str, lid: &str) {
    if lid.is_empty() {
        println!("  {}  {}", id.cyan(), name);
    } else {
        println!("  {}  {} {}", id.cyan(), name, format!("({})", lid).dimmed());
    }
}

/// Summarize the world
async fn cmd_doctor(session: &Session) -> Result<()> {
    let env = session.env();
    let config = env.config();

    println!();
    println!("{}", "Configuration".bold());
    println!(
        "  {} {}",
        "Registry cache:".bold(),
        if config.cache.registry_cache_enabled {
            "enabled".green()
        } else {
            "disabled".yellow()
        }
    );
    println!("  {} {}ms", "Drop cache timeout:".bold(), config.cache.fetch_timeout_ms);

    for registry in [env.world(), env.library()] {
        println!();
        println!("{} {}", "Registry".bold(), registry.name().cyan());
        for category in Category::ALL {
            let count = registry.get_cat(category).raw_map().await?.len();
            if count > 0 {
                println!("  {:<14} {}", category.as_str(), count);
            }
        }
    }
    println!();
    Ok(())
}

/// List one category of a registry
async fn cmd_list(session: &Session, registry: &str, category: &str, json: bool) -> Result<()> {
    let registry = open_registry(session, registry).await?;
    let category: Category = category.parse()?;
    let records = registry.get_cat(category).raw_map().await?;

    if json {
        let mut out = serde_json::Map::new();
        for (id, raw) in &records {
            out.insert(id.clone(), raw.to_value()?);
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", format!("No {} in {}", category, registry.name()).dimmed());
        return Ok(());
    }
    println!();
    println!("{} {} in {}", records.len().to_string().bold(), category, registry.name().cyan());
    for (id, raw) in &records {
        print_entity_line(id, raw.name(), raw.lid());
    }
    println!();
    Ok(())
}

async fn print_live(entity: &Arc<LiveEntity>) {
    let doc = entity.doc().await;
    println!();
    println!("{} {}", "Name:".bold(), entity.name().await);
    if doc.name != entity.name().await {
        println!("{} {}", "Shown as:".bold(), doc.name);
    }
    println!("{} {}", "ID:".bold(), entity.id().cyan());
    println!("{} {}", "Category:".bold(), entity.category());
    println!("{} {}", "Registry:".bold(), entity.registry().name());
    if !entity.lid().is_empty() {
        println!("{} {}", "LID:".bold(), entity.lid());
    }

    let links = entity.links();
    if !links.is_empty() {
        println!("{}", "Links:".bold());
        for (path, link) in links {
            match link.target() {
                Some(target) => println!(
                    "  {:<18} {} {}",
                    path,
                    target.name().await,
                    format!("@ {}", target.registry().name()).dimmed()
                ),
                None => println!("  {:<18} {} {}", path, "unresolved".red(), link.reference()),
            }
        }
    }
    println!();
}

/// Resolve a reference
async fn cmd_resolve(session: &Session, reference: &str, from: &str) -> Result<()> {
    let reference = parse_ref(reference)?;
    let registry = open_registry(session, from).await?;
    let ctx = session.env().new_ctx();

    let Some(entity) = registry.resolve(&ctx, &reference).await else {
        bail!("Reference {} did not resolve", reference);
    };
    print_live(&entity).await;
    Ok(())
}

/// Copy (or move) an entity into a destination registry
async fn cmd_insinuate(
    session: &Session,
    reference: &str,
    destination: &str,
    move_source: bool,
    save: bool,
) -> Result<()> {
    let reference = parse_ref(reference)?;
    let destination = open_registry(session, destination).await?;
    let ctx = session.env().new_ctx();

    let Some(entity) = destination.resolve(&ctx, &reference).await else {
        bail!("Reference {} did not resolve", reference);
    };
    let result = take_ownership(entity, &destination, &ctx, &DefaultHooks, move_source).await?;

    if result.is_new {
        println!(
            "{} {} into {}",
            (if move_source { "Moved" } else { "Copied" }).green().bold(),
            result.entity.name().await,
            destination.name().cyan()
        );
        println!("  {} {}", "New ID:".bold(), result.entity.id());
        println!("  {} {}", "Reference:".bold(), serde_json::to_string(&result.entity.reg_ref())?);
    } else {
        println!(
            "{}",
            format!("{} already lives in {}", result.entity.name().await, destination.name()).dimmed()
        );
    }

    if save {
        let path = session.save().await?;
        println!("{} {}", "Saved".green(), path.display());
    }
    Ok(())
}

/// Resolve a drop payload
async fn cmd_drop(session: &Session, payload: &str, accept: &[String]) -> Result<()> {
    let payload: DropPayload =
        serde_json::from_str(payload).context("Payload must be a JSON drop payload")?;
    let allowed = accept
        .iter()
        .map(|c| c.parse::<Category>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let resolver = DropResolver::new(session.env().clone());
    let Some(summary) = resolver.resolve(&payload).await else {
        bail!("Payload does not resolve to a document");
    };

    let accepted = allowed.is_empty() || allowed.contains(&summary.category);
    println!();
    println!("{} {}", "Name:".bold(), summary.name);
    println!("{} {}", "Category:".bold(), summary.category);
    println!("{} {}", "Reference:".bold(), serde_json::to_string(&summary.reference)?);
    println!(
        "{} {}",
        "Accepted:".bold(),
        if accepted { "yes".green() } else { "no".red() }
    );
    println!();
    Ok(())
}
