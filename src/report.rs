//! Human-readable output for scan sessions and candidate lists.

use crate::candidates::CandidateMatch;
use crate::graph::{ComponentReport, GraphNode, ScanSession};
use colored::Colorize;
use std::fmt::Write;

const INDENT: &str = "    ";
const MISSING_SCRIPT_LABEL: &str = "Missing script";

/// Renders a session as a plain-text log, one document after another.
///
/// Documents open with `Scene: <name>`. Each retained object is a
/// `- <name>:` line indented four spaces per depth, followed by its reports
/// at the same depth and its flagged properties one level deeper.
pub fn format_log(session: &ScanSession) -> String {
    let mut out = String::new();
    for document in &session.documents {
        let _ = writeln!(out, "Scene: {}", document.name);
        write_components(&mut out, &document.root.components, 0);
        for child in &document.root.children {
            write_node(&mut out, child, 1);
        }
    }
    out
}

fn write_node(out: &mut String, node: &GraphNode, depth: usize) {
    let indent = INDENT.repeat(depth);
    if node.is_missing_prefab_instance {
        let _ = writeln!(out, "{indent}- {}: missing prefab", node.name);
    } else {
        let _ = writeln!(out, "{indent}- {}:", node.name);
    }
    write_components(out, &node.components, depth);
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
}

fn write_components(out: &mut String, components: &[ComponentReport], depth: usize) {
    let indent = INDENT.repeat(depth);
    for report in components {
        let _ = writeln!(out, "{indent}- {}:", label(report));
        for property in &report.missing {
            let _ = writeln!(
                out,
                "{indent}{INDENT}- {} ({})",
                property.path, property.type_name
            );
        }
    }
}

fn label(report: &ComponentReport) -> &str {
    match &report.name_override {
        Some(name) => name.as_str(),
        None if report.is_missing_script => MISSING_SCRIPT_LABEL,
        None => report.name.as_str(),
    }
}

/// Renders a session as a colored tree with per-node counts.
pub fn render_tree(session: &ScanSession) -> String {
    let mut out = String::new();
    for document in &session.documents {
        let _ = writeln!(
            out,
            "{} {}",
            document.name.bold(),
            format!("({})", document.root.total_count()).dimmed()
        );
        render_components(&mut out, &document.root.components, 1);
        for child in &document.root.children {
            render_node(&mut out, child, 1);
        }
    }
    out
}

fn render_node(out: &mut String, node: &GraphNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let count = format!("({})", node.total_count()).dimmed();
    if node.is_missing_prefab_instance {
        let _ = writeln!(
            out,
            "{indent}{} {count}",
            format!("{} - Missing Prefab", node.name).red()
        );
    } else {
        let _ = writeln!(out, "{indent}{} {count}", node.name);
    }
    render_components(out, &node.components, depth + 1);
    for child in &node.children {
        render_node(out, child, depth + 1);
    }
}

fn render_components(out: &mut String, components: &[ComponentReport], depth: usize) {
    let indent = "  ".repeat(depth);
    for report in components {
        if report.is_missing_script {
            let _ = writeln!(out, "{indent}{}", MISSING_SCRIPT_LABEL.red().bold());
            for member in report.salvage.iter().flatten() {
                let _ = writeln!(
                    out,
                    "{indent}  {} {}",
                    format!("{}:", member.name).dimmed(),
                    member.value
                );
            }
            continue;
        }

        let _ = writeln!(out, "{indent}{}", label(report).cyan());
        for property in &report.missing {
            let _ = writeln!(
                out,
                "{indent}  {} {}",
                property.path.yellow(),
                format!("({})", property.type_name).dimmed()
            );
        }
    }
}

/// One line per candidate: distance, assembly-qualified type and asset path.
pub fn render_candidates(matches: &[CandidateMatch]) -> String {
    let mut out = String::new();
    for candidate in matches {
        let asset = candidate.asset_path.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {:>3}  {}, {}  {}",
            candidate.distance,
            candidate.type_info.full_name.green(),
            candidate.assembly,
            asset.dimmed()
        );
    }
    out
}
