use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::{ColoredString, Colorize};
use dstat_classify::{resolve_selection, tracked_targets};
use dstat_model::Snapshot;
use dstat_publish::{Decoration, DecorationBroadcaster, ResourceGroup, SourceControlState};
use dstat_refresh::{RefreshConfig, RefreshOrchestrator, WorkspaceRepositories};
use dstat_types::{normalize_relative, PathItem};
use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Command, OutputFormat, StatusArgs, TargetsArgs, TreeArgs};
use crate::fixtures::FixtureQueries;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RefreshConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RefreshConfig::default(),
    };
    let root = std::path::absolute(cli.root.as_ref().unwrap_or(&cli.fixtures))
        .context("resolving repository root")?;
    debug!(root = %root.display(), fixtures = %cli.fixtures.display(), "starting");

    let queries = Arc::new(FixtureQueries::new(&cli.fixtures));
    let workspace = WorkspaceRepositories::new(queries.clone(), queries, config);
    let orchestrator = workspace.add_root(root);
    let snapshot = orchestrator
        .reset_state()
        .await
        .context("refreshing repository state")?;

    match cli.command {
        Command::Status(args) => cmd_status(&orchestrator, &snapshot, args, cli.format),
        Command::Tree(args) => cmd_tree(&orchestrator, &snapshot, args, cli.format),
        Command::Decorations => cmd_decorations(&orchestrator, &snapshot, cli.format),
        Command::Targets(args) => cmd_targets(&snapshot, args, cli.format),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => ".".to_string(),
    }
}

fn paint(text: &str, decoration: Option<Decoration>) -> ColoredString {
    match decoration {
        Some(Decoration::Added) => text.green(),
        Some(Decoration::Deleted) => text.red(),
        Some(Decoration::Modified) => text.yellow(),
        Some(Decoration::NotInCache) => text.dimmed(),
        Some(Decoration::Renamed) => text.cyan(),
        Some(Decoration::GitModified) => text.blue(),
        Some(Decoration::Tracked) | None => text.normal(),
    }
}

fn cmd_status(
    orchestrator: &RefreshOrchestrator,
    snapshot: &Snapshot,
    args: StatusArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if args.sets {
        return match format {
            OutputFormat::Json => print_json(&snapshot.status),
            OutputFormat::Text => {
                for kind in dstat_types::StatusKind::ALL {
                    let set = snapshot.status.get(kind);
                    println!("{} ({})", kind.as_str().bold(), set.len());
                    for path in set {
                        println!("  {}", display_path(&snapshot.root, path));
                    }
                }
                Ok(())
            }
        };
    }

    let groups: Arc<SourceControlState> = orchestrator.grouper().groups();
    if format == OutputFormat::Json {
        return print_json(&*groups);
    }

    if groups.is_empty() {
        println!("{} Nothing to report.", "✓".green());
        return Ok(());
    }
    for group in ResourceGroup::ALL {
        let states = groups.group(group);
        if states.is_empty() {
            continue;
        }
        println!("{} ({})", group.label().bold(), states.len());
        for state in states {
            let decoration = Decoration::resolve(&snapshot.status, &state.path);
            let badge = decoration.and_then(|d| d.badge()).unwrap_or(" ");
            let suffix = if state.is_directory { "/" } else { "" };
            println!(
                "  {:<2} {}{}",
                paint(badge, decoration),
                display_path(&snapshot.root, &state.path),
                suffix,
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeLine {
    path: PathBuf,
    depth: usize,
    is_directory: bool,
    is_tracked: bool,
    decoration: Option<Decoration>,
}

fn walk(snapshot: &Snapshot, decorations: &DecorationBroadcaster, parent: &Path, depth: usize, out: &mut Vec<TreeLine>) {
    for child in snapshot.children(parent) {
        out.push(TreeLine {
            path: child.path.clone(),
            depth,
            is_directory: child.is_directory,
            is_tracked: child.is_tracked,
            decoration: decorations.resolve(&child.path),
        });
        if child.is_directory {
            walk(snapshot, decorations, &child.path, depth + 1, out);
        }
    }
}

fn cmd_tree(
    orchestrator: &RefreshOrchestrator,
    snapshot: &Snapshot,
    args: TreeArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let start = match &args.path {
        Some(rel) => snapshot.root.join(normalize_relative(rel)),
        None => snapshot.root.clone(),
    };
    if start != snapshot.root && !snapshot.is_directory(&start) {
        bail!("{} is not a directory in the tracked tree", display_path(&snapshot.root, &start));
    }

    let mut lines = Vec::new();
    walk(snapshot, orchestrator.decorations(), &start, 0, &mut lines);

    if format == OutputFormat::Json {
        return print_json(&lines);
    }
    println!("{}", display_path(&snapshot.root, &start).bold());
    for line in &lines {
        let name = line
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = if line.is_directory { format!("{name}/") } else { name };
        let badge = line.decoration.and_then(|d| d.badge()).unwrap_or("");
        println!(
            "{}{} {}",
            "  ".repeat(line.depth + 1),
            paint(&name, line.decoration),
            paint(badge, line.decoration).bold(),
        );
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecorationLine {
    path: PathBuf,
    decoration: Decoration,
    badge: Option<&'static str>,
    color: Option<&'static str>,
    tooltip: &'static str,
}

fn cmd_decorations(
    orchestrator: &RefreshOrchestrator,
    snapshot: &Snapshot,
    format: OutputFormat,
) -> anyhow::Result<()> {
    // Every decorated path is tracked.
    let lines: Vec<DecorationLine> = snapshot
        .status
        .tracked
        .iter()
        .filter_map(|path| {
            orchestrator.decorations().resolve(path).map(|decoration| DecorationLine {
                path: path.clone(),
                decoration,
                badge: decoration.badge(),
                color: decoration.color(),
                tooltip: decoration.tooltip(),
            })
        })
        .collect();

    if format == OutputFormat::Json {
        return print_json(&lines);
    }
    for line in &lines {
        println!(
            "{:<3} {} {}",
            paint(line.badge.unwrap_or("-"), Some(line.decoration)),
            display_path(&snapshot.root, &line.path),
            format!("({})", line.tooltip).dimmed(),
        );
    }
    Ok(())
}

/// Find the tree node for a root-relative path; "." is the root itself.
fn item_for(snapshot: &Snapshot, relative: &str) -> anyhow::Result<PathItem> {
    let relative = normalize_relative(relative);
    if relative.as_os_str().is_empty() {
        return Ok(PathItem::root(snapshot.root.clone()));
    }
    let path = snapshot.root.join(&relative);
    let parent = path.parent().unwrap_or(&snapshot.root);
    snapshot
        .children(parent)
        .iter()
        .find(|item| item.path == path)
        .cloned()
        .with_context(|| format!("{} is not in the tracked tree", relative.display()))
}

fn cmd_targets(snapshot: &Snapshot, args: TargetsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let invoked = item_for(snapshot, &args.invoked)?;
    let selected = args
        .selected
        .iter()
        .map(|rel| item_for(snapshot, rel))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let groups = resolve_selection(&invoked, &selected);
    let targets: Vec<String> = groups
        .values()
        .flat_map(|items| tracked_targets(items, &snapshot.tree))
        .collect();

    if format == OutputFormat::Json {
        return print_json(&targets);
    }
    if targets.is_empty() {
        println!("No tracked targets.");
    }
    for target in &targets {
        println!("{}", target.cyan());
    }
    Ok(())
}
