use std::fmt::Write as FmtWrite;
use std::path::Path;

use crate::config::DotConfig;
use crate::net::document::Document;
use crate::net::error::NetError;
use crate::net::ids::ObjectId;
use crate::net::object::Object;
use crate::net::page::Page;
use crate::net::structure::{Arc, ArcKind};

use super::escape_label;

/// Renders a net or a page (with its nested pages as clusters) as Graphviz DOT.
pub fn to_dot(doc: &Document, scope: &str, config: &DotConfig) -> Result<String, NetError> {
    let (title, pages): (String, Vec<&ObjectId>) = match doc.object(scope) {
        Some(Object::Net(net)) => (
            net.name().unwrap_or(net.id().as_str()).to_owned(),
            net.pages().collect(),
        ),
        Some(Object::Page(page)) => (
            page.name().unwrap_or(page.id().as_str()).to_owned(),
            vec![page.id()],
        ),
        Some(other) => return Err(NetError::NotAContainer(other.id().clone())),
        None => return Err(NetError::UnknownObject(ObjectId::from(scope))),
    };

    let mut dot = String::new();
    let _ = writeln!(&mut dot, "digraph \"{}\" {{", escape_label(&title));
    let _ = writeln!(&mut dot, "    rankdir={};", config.rankdir);
    let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");
    for page in pages {
        write_page(&mut dot, doc, page, config, 1);
    }
    let _ = writeln!(&mut dot, "}}");
    Ok(dot)
}

pub fn write_dot<P: AsRef<Path>>(
    doc: &Document,
    scope: &str,
    config: &DotConfig,
    path: P,
) -> Result<(), super::IoError> {
    let dot = to_dot(doc, scope, config)?;
    super::write_text(path, &dot)?;
    Ok(())
}

fn write_page(dot: &mut String, doc: &Document, page_id: &ObjectId, config: &DotConfig, depth: usize) {
    let Some(page) = doc.get::<Page>(page_id) else {
        return;
    };
    let pad = "    ".repeat(depth);
    let _ = writeln!(dot, "{pad}subgraph \"cluster_{}\" {{", escape_label(page.id()));
    let _ = writeln!(
        dot,
        "{pad}    label=\"{}\";",
        escape_label(page.name().unwrap_or(page.id().as_str()))
    );

    for node in page.nodes() {
        match doc.object(node) {
            Some(Object::Place(place)) => {
                let mut label = display_name(place.name(), place.id(), config);
                if place.tokens > 0 {
                    label.push_str(&format!("\n{}", place.tokens));
                }
                let _ = writeln!(
                    dot,
                    "{pad}    \"{}\" [label=\"{}\", shape=circle, style=filled, fillcolor=\"#e3f2fd\"];",
                    escape_label(place.id()),
                    escape_label(&label)
                );
            }
            Some(Object::Transition(transition)) => {
                let label = display_name(transition.name(), transition.id(), config);
                let _ = writeln!(
                    dot,
                    "{pad}    \"{}\" [label=\"{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                    escape_label(transition.id()),
                    escape_label(&label)
                );
            }
            _ => {}
        }
    }

    for arc in page.arcs() {
        let Some(arc) = doc.get::<Arc>(arc) else {
            continue;
        };
        let source = escape_label(arc.source());
        let target = escape_label(arc.target());
        match arc.kind {
            ArcKind::Normal => {
                let _ = writeln!(dot, "{pad}    \"{source}\" -> \"{target}\";");
            }
            ArcKind::Read => {
                let _ = writeln!(dot, "{pad}    \"{source}\" -> \"{target}\" [dir=both];");
            }
        }
    }

    for sub in page.pages() {
        write_page(dot, doc, sub, config, depth + 1);
    }
    let _ = writeln!(dot, "{pad}}}");
}

fn display_name(name: Option<&str>, id: &ObjectId, config: &DotConfig) -> String {
    match name.filter(|name| !name.is_empty()) {
        Some(name) if config.show_ids => format!("{name} ({id})"),
        Some(name) => name.to_owned(),
        None => id.to_string(),
    }
}
