//! Inspect command implementation.

use osmsync_codec::{document_from_tree, osc_from_tree, parse};
use osmsync_core::{is_placeholder, Document, PrimitiveKind};
use osmsync_protocol::Osc;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// File inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File path.
    pub path: String,
    /// Root element: `osm` or `osmChange`.
    pub format: String,
    /// Number of nodes.
    pub nodes: usize,
    /// Number of ways.
    pub ways: usize,
    /// Number of relations.
    pub relations: usize,
    /// Primitives with a placeholder id.
    pub placeholders: usize,
    /// Primitives whose history holds more than one version.
    pub multi_version: usize,
    /// Per-section counts, for osmChange files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionStats>>,
}

/// Statistics for one osmChange section.
#[derive(Debug, Serialize)]
pub struct SectionStats {
    /// `create`, `modify` or `delete`.
    pub action: String,
    /// Number of primitives in the section.
    pub count: usize,
}

/// Reads and summarizes a file.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    let root = parse(&bytes)?;

    let mut result = InspectResult {
        path: path.display().to_string(),
        format: root.name.clone(),
        nodes: 0,
        ways: 0,
        relations: 0,
        placeholders: 0,
        multi_version: 0,
        sections: None,
    };

    match root.name.as_str() {
        "osm" => {
            let doc = document_from_tree(&root)?;
            tally_document(&mut result, &doc);
        }
        "osmChange" => {
            let osc = osc_from_tree(&root)?;
            tally_osc(&mut result, &osc);
        }
        other => return Err(format!("Unsupported root element <{other}>").into()),
    }

    Ok(result)
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }
    Ok(())
}

fn tally_document(result: &mut InspectResult, doc: &Document) {
    result.nodes += doc.count(PrimitiveKind::Node);
    result.ways += doc.count(PrimitiveKind::Way);
    result.relations += doc.count(PrimitiveKind::Relation);
    for primitive in doc.iter() {
        if is_placeholder(primitive.id()) {
            result.placeholders += 1;
        }
        if primitive.history_len() > 1 {
            result.multi_version += 1;
        }
    }
}

fn tally_osc(result: &mut InspectResult, osc: &Osc) {
    let mut sections = Vec::new();
    for section in osc.sections() {
        tally_document(result, &section.document);
        sections.push(SectionStats {
            action: section.action.to_string(),
            count: section.document.len(),
        });
    }
    result.sections = Some(sections);
}

fn print_text_output(result: &InspectResult) {
    println!("osmsync File Inspection");
    println!("=======================");
    println!();
    println!("Path:   {}", result.path);
    println!("Format: {}", result.format);
    println!();
    println!("Primitives:");
    println!("  Nodes:     {}", result.nodes);
    println!("  Ways:      {}", result.ways);
    println!("  Relations: {}", result.relations);
    println!();
    println!("  Placeholders:       {}", result.placeholders);
    println!("  With history (>1v): {}", result.multi_version);

    if let Some(sections) = &result.sections {
        println!();
        println!("Sections:");
        for section in sections {
            println!("  {:<7} {}", section.action, section.count);
        }
    }
}
