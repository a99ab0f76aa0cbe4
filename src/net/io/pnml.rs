//! PNML exchange format.
//!
//! Writing walks net → page → {places, transitions, arcs} → nested pages depth
//! first. Reading goes through [`Document::add`] for every element, so the same
//! invariants apply to parsed and hand-built nets. A failed read leaves the
//! objects admitted before the failure in the document.
use std::borrow::Cow;
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use roxmltree::Node;
use thiserror::Error;

use crate::net::document::Document;
use crate::net::error::NetError;
use crate::net::ids::ObjectId;
use crate::net::object::Object;
use crate::net::page::Page;
use crate::net::petri_net::{NetFormat, PetriNet, UnknownNetFormat};
use crate::net::structure::{Arc, ArcKind, NodeData, Place, Point, Transition};

pub const PNML_NAMESPACE: &str = "http://www.pnml.org/version-2009/grammar/pnml";

#[derive(Debug, Error)]
pub enum PnmlError {
    #[error("xml syntax error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error(transparent)]
    UnknownNetType(#[from] UnknownNetFormat),
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("invalid number '{value}' in {context}")]
    InvalidNumber { context: String, value: String },
    #[error("document contains no <net> element")]
    NoNet,
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn read_file<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<Vec<ObjectId>, PnmlError> {
    let content = fs::read_to_string(path)?;
    read_str(doc, &content)
}

pub fn write_file<P: AsRef<Path>>(doc: &Document, path: P) -> Result<(), PnmlError> {
    super::write_text(path, &to_pnml_string(doc))?;
    Ok(())
}

/// Parses every `<net>` in `xml` into `doc`, returning the admitted net ids.
pub fn read_str(doc: &mut Document, xml: &str) -> Result<Vec<ObjectId>, PnmlError> {
    let tree = roxmltree::Document::parse(xml)?;
    let root = tree.root_element();
    let nets: Vec<Node> = if root.has_tag_name("net") {
        vec![root]
    } else {
        children(root, "net").collect()
    };
    if nets.is_empty() {
        return Err(PnmlError::NoNet);
    }

    let mut admitted = Vec::with_capacity(nets.len());
    for element in nets {
        admitted.push(read_net(doc, element)?);
    }
    Ok(admitted)
}

fn read_net(doc: &mut Document, element: Node) -> Result<ObjectId, PnmlError> {
    let id = required(element, "id")?;
    let format: NetFormat = required(element, "type")?.parse()?;
    let mut net = PetriNet::new(id, format);
    if let Some(name) = read_name(element) {
        net = net.with_name(name);
    }
    let net_id = doc.add_net(net)?;

    let mut references = Vec::new();
    for page in children(element, "page") {
        read_page(doc, &net_id, page, &mut references)?;
    }
    // 引用可能指向文件中更靠后的节点，因此在全部节点加入之后再建立。
    for (node, original) in references {
        doc.set_reference(&node, Some(original))?;
    }
    log::debug!("read net {net_id} ({format:?})");
    Ok(net_id)
}

fn read_page(
    doc: &mut Document,
    parent: &ObjectId,
    element: Node,
    references: &mut Vec<(ObjectId, ObjectId)>,
) -> Result<(), PnmlError> {
    let mut page = Page::new(required(element, "id")?);
    if let Some(name) = read_name(element) {
        page = page.with_name(name);
    }
    let page_id = doc.add_page(parent, page)?;

    for child in element.children().filter(Node::is_element) {
        let object: Object = match child.tag_name().name() {
            "place" | "referencePlace" => read_place(child)?.into(),
            "transition" | "referenceTransition" => read_transition(child)?.into(),
            _ => continue,
        };
        if child.tag_name().name().starts_with("reference") {
            let original = required(child, "ref")?;
            references.push((object.id().clone(), ObjectId::from(original)));
        }
        doc.add(&page_id, object)?;
    }
    for child in children(element, "arc") {
        doc.add_arc(&page_id, read_arc(child)?)?;
    }
    for child in children(element, "page") {
        read_page(doc, &page_id, child, references)?;
    }
    Ok(())
}

fn read_place(element: Node) -> Result<Place, PnmlError> {
    let mut place = Place::new(required(element, "id")?);
    place.name = read_name(element);
    read_node_graphics(element, &mut place.node)?;

    if let Some(marking) = child(element, "initialMarking") {
        if let Some(text) = child(marking, "text").and_then(|text| text.text()) {
            let trimmed = text.trim();
            place.tokens = trimmed.parse().map_err(|_| PnmlError::InvalidNumber {
                context: format!("initial marking of {}", place.id),
                value: trimmed.to_owned(),
            })?;
        }
        if let Some(offset) = child(marking, "graphics").and_then(|g| child(g, "offset")) {
            place.marking_offset = read_point(offset)?;
        }
    }
    Ok(place)
}

fn read_transition(element: Node) -> Result<Transition, PnmlError> {
    let mut transition = Transition::new(required(element, "id")?);
    transition.name = read_name(element);
    read_node_graphics(element, &mut transition.node)?;
    Ok(transition)
}

fn read_arc(element: Node) -> Result<Arc, PnmlError> {
    let mut arc = Arc::new(
        required(element, "id")?,
        required(element, "source")?,
        required(element, "target")?,
    );
    arc.name = read_name(element);
    if let Some(graphics) = child(element, "graphics") {
        arc.curve = children(graphics, "position")
            .map(read_point)
            .collect::<Result<_, _>>()?;
    }
    if let Some(kind) = child(element, "type") {
        let value = kind
            .attribute("value")
            .or_else(|| child(kind, "text").and_then(|text| text.text()))
            .unwrap_or_default();
        if value.trim().eq_ignore_ascii_case("read") {
            arc.kind = ArcKind::Read;
        }
    }
    Ok(arc)
}

fn read_node_graphics(element: Node, node: &mut NodeData) -> Result<(), PnmlError> {
    let Some(graphics) = child(element, "graphics") else {
        return Ok(());
    };
    if let Some(position) = child(graphics, "position") {
        node.position = read_point(position)?;
    }
    if let Some(dimension) = child(graphics, "dimension") {
        node.size = read_point(dimension)?;
    }
    Ok(())
}

fn read_point(element: Node) -> Result<Point, PnmlError> {
    let coordinate = |axis: &'static str| -> Result<f64, PnmlError> {
        let Some(raw) = element.attribute(axis) else {
            return Ok(0.0);
        };
        raw.trim().parse().map_err(|_| PnmlError::InvalidNumber {
            context: format!("<{}> attribute {axis}", element.tag_name().name()),
            value: raw.to_owned(),
        })
    };
    Ok(Point::new(coordinate("x")?, coordinate("y")?))
}

fn read_name(element: Node) -> Option<String> {
    child(element, "name")
        .and_then(|name| child(name, "text"))
        .map(|text| text.text().unwrap_or_default().to_owned())
}

fn required<'a>(element: Node<'a, '_>, attribute: &'static str) -> Result<&'a str, PnmlError> {
    element
        .attribute(attribute)
        .ok_or_else(|| PnmlError::MissingAttribute {
            element: element.tag_name().name().to_owned(),
            attribute,
        })
}

fn child<'a, 'input>(element: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    element.children().find(|node| node.has_tag_name(tag))
}

fn children<'a, 'input>(
    element: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    element.children().filter(move |node| node.has_tag_name(tag))
}

/// Serializes every net of `doc` into one PNML document.
pub fn to_pnml_string(doc: &Document) -> String {
    let mut out = String::new();
    // 写入 String 不会失败。
    let _ = write_document(&mut out, doc);
    out
}

fn write_document(out: &mut String, doc: &Document) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<pnml xmlns="{PNML_NAMESPACE}">"#)?;
    for net in doc.nets() {
        writeln!(
            out,
            r#"  <net id="{}" type="{}">"#,
            escape_xml(net.id()),
            net.format.uri()
        )?;
        write_name(out, 2, net.name())?;
        for page in net.pages() {
            write_page(out, doc, page, 2)?;
        }
        writeln!(out, "  </net>")?;
    }
    writeln!(out, "</pnml>")
}

fn write_page(out: &mut String, doc: &Document, page_id: &ObjectId, depth: usize) -> fmt::Result {
    let Some(page) = doc.get::<Page>(page_id) else {
        return Ok(());
    };
    let pad = indent(depth);
    writeln!(out, r#"{pad}<page id="{}">"#, escape_xml(page.id()))?;
    write_name(out, depth + 1, page.name())?;

    for node in page.nodes() {
        match doc.object(node) {
            Some(Object::Place(place)) => write_place(out, place, depth + 1)?,
            Some(Object::Transition(transition)) => write_transition(out, transition, depth + 1)?,
            _ => {}
        }
    }
    for arc in page.arcs() {
        if let Some(arc) = doc.get::<Arc>(arc) {
            write_arc(out, arc, depth + 1)?;
        }
    }
    for sub in page.pages() {
        write_page(out, doc, sub, depth + 1)?;
    }
    writeln!(out, "{pad}</page>")
}

fn write_place(out: &mut String, place: &Place, depth: usize) -> fmt::Result {
    let pad = indent(depth);
    let tag = open_node(out, "place", "referencePlace", place.id(), &place.node, depth)?;
    write_name(out, depth + 1, place.name())?;
    write_node_graphics(out, &place.node, depth + 1)?;
    if place.tokens != 0 {
        let inner = indent(depth + 1);
        writeln!(out, "{inner}<initialMarking>")?;
        writeln!(out, "{inner}  <text>{}</text>", place.tokens)?;
        writeln!(
            out,
            r#"{inner}  <graphics><offset x="{}" y="{}"/></graphics>"#,
            place.marking_offset.x, place.marking_offset.y
        )?;
        writeln!(out, "{inner}</initialMarking>")?;
    }
    writeln!(out, "{pad}</{tag}>")
}

fn write_transition(out: &mut String, transition: &Transition, depth: usize) -> fmt::Result {
    let pad = indent(depth);
    let tag = open_node(
        out,
        "transition",
        "referenceTransition",
        transition.id(),
        &transition.node,
        depth,
    )?;
    write_name(out, depth + 1, transition.name())?;
    write_node_graphics(out, &transition.node, depth + 1)?;
    writeln!(out, "{pad}</{tag}>")
}

/// Opens a node element, switching to the reference form when the node aliases another.
fn open_node(
    out: &mut String,
    plain: &'static str,
    reference: &'static str,
    id: &ObjectId,
    node: &NodeData,
    depth: usize,
) -> Result<&'static str, fmt::Error> {
    let pad = indent(depth);
    match node.reference() {
        Some(original) => {
            writeln!(
                out,
                r#"{pad}<{reference} id="{}" ref="{}">"#,
                escape_xml(id),
                escape_xml(original)
            )?;
            Ok(reference)
        }
        None => {
            writeln!(out, r#"{pad}<{plain} id="{}">"#, escape_xml(id))?;
            Ok(plain)
        }
    }
}

fn write_node_graphics(out: &mut String, node: &NodeData, depth: usize) -> fmt::Result {
    let pad = indent(depth);
    writeln!(out, "{pad}<graphics>")?;
    writeln!(
        out,
        r#"{pad}  <position x="{}" y="{}"/>"#,
        node.position.x, node.position.y
    )?;
    writeln!(
        out,
        r#"{pad}  <dimension x="{}" y="{}"/>"#,
        node.size.x, node.size.y
    )?;
    writeln!(out, "{pad}</graphics>")
}

fn write_arc(out: &mut String, arc: &Arc, depth: usize) -> fmt::Result {
    let pad = indent(depth);
    writeln!(
        out,
        r#"{pad}<arc id="{}" source="{}" target="{}">"#,
        escape_xml(arc.id()),
        escape_xml(arc.source()),
        escape_xml(arc.target())
    )?;
    write_name(out, depth + 1, arc.name())?;
    if !arc.curve.is_empty() {
        writeln!(out, "{pad}  <graphics>")?;
        for point in &arc.curve {
            writeln!(out, r#"{pad}    <position x="{}" y="{}"/>"#, point.x, point.y)?;
        }
        writeln!(out, "{pad}  </graphics>")?;
    }
    if arc.kind == ArcKind::Read {
        writeln!(out, r#"{pad}  <type value="read"/>"#)?;
    }
    writeln!(out, "{pad}</arc>")
}

fn write_name(out: &mut String, depth: usize, name: Option<&str>) -> fmt::Result {
    match name.filter(|name| !name.is_empty()) {
        Some(name) => writeln!(
            out,
            "{}<name><text>{}</text></name>",
            indent(depth),
            escape_xml(name)
        ),
        None => Ok(()),
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'', '\n', '\t', '\r']) {
        return Cow::Borrowed(input);
    }
    let mut escaped = String::with_capacity(input.len() + 8);
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // 属性值中的空白会被 XML 解析器规范化，必须写成字符引用。
            '\n' => escaped.push_str("&#10;"),
            '\t' => escaped.push_str("&#9;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<pnml xmlns="http://www.pnml.org/version-2009/grammar/pnml">
  <net id="n" type="http://www.pnml.org/version-2009/grammar/PTNET">
    <name><text>mutex</text></name>
    <page id="pg">
      <arc id="a0" source="p0" target="t0">
        <graphics><position x="5" y="6"/><position x="7.5" y="8"/></graphics>
      </arc>
      <arc id="a1" source="lock" target="t0"><type value="read"/></arc>
      <place id="p0">
        <name><text>idle</text></name>
        <graphics><position x="10" y="20"/></graphics>
        <initialMarking><text> 2 </text><graphics><offset x="1" y="-1"/></graphics></initialMarking>
      </place>
      <referencePlace id="lock" ref="p0"/>
      <transition id="t0"><name><text>acquire</text></name></transition>
    </page>
  </net>
</pnml>"#;

    #[test]
    fn reads_nodes_before_arcs_and_resolves_references() {
        let mut doc = Document::new();
        let nets = read_str(&mut doc, SAMPLE).unwrap();
        assert_eq!(nets, vec![ObjectId::from("n")]);

        let net = doc.get::<PetriNet>("n").unwrap();
        assert_eq!(net.format, NetFormat::PlaceTransition);
        assert_eq!(net.name(), Some("mutex"));

        let place = doc.get::<Place>("p0").unwrap();
        assert_eq!(place.tokens, 2);
        assert_eq!(place.name(), Some("idle"));
        assert_eq!(place.node.position, Point::new(10.0, 20.0));
        assert_eq!(place.marking_offset, Point::new(1.0, -1.0));
        assert!(place.node.referenced_by().contains("lock"));

        let arc = doc.get::<Arc>("a0").unwrap();
        assert_eq!(arc.curve, vec![Point::new(5.0, 6.0), Point::new(7.5, 8.0)]);
        assert_eq!(doc.get::<Arc>("a1").unwrap().kind, ArcKind::Read);
    }

    #[test]
    fn unknown_net_type_is_a_hard_error() {
        let mut doc = Document::new();
        let xml = r#"<pnml><net id="n" type="urn:coloured"/></pnml>"#;
        assert!(matches!(
            read_str(&mut doc, xml),
            Err(PnmlError::UnknownNetType(_))
        ));
        assert!(doc.is_empty());
    }

    #[test]
    fn missing_id_names_the_element() {
        let mut doc = Document::new();
        let xml = r#"<pnml><net id="n" type="http://www.pnml.org/version-2009/grammar/ptnet">
            <page id="pg"><place/></page></net></pnml>"#;
        let err = read_str(&mut doc, xml).unwrap_err();
        assert!(matches!(
            err,
            PnmlError::MissingAttribute { ref element, attribute: "id" } if element == "place"
        ));
        // 失败前已加入的对象保留。
        assert!(doc.contains("n"));
        assert!(doc.contains("pg"));
    }

    #[test]
    fn unresolved_arc_target_aborts_the_read() {
        let mut doc = Document::new();
        let xml = r#"<pnml><net id="n" type="http://www.pnml.org/version-2009/grammar/ptnet">
            <page id="pg"><place id="p"/><arc id="a" source="p" target="ghost"/></page>
            </net></pnml>"#;
        let err = read_str(&mut doc, xml).unwrap_err();
        assert!(matches!(
            err,
            PnmlError::Net(NetError::UnresolvedEndpoint { .. })
        ));
        assert!(doc.contains("p"));
        assert!(!doc.contains("a"));
    }

    #[test]
    fn bad_marking_is_reported() {
        let mut doc = Document::new();
        let xml = r#"<pnml><net id="n" type="http://www.pnml.org/version-2009/grammar/ptnet">
            <page id="pg"><place id="p"><initialMarking><text>many</text></initialMarking></place></page>
            </net></pnml>"#;
        assert!(matches!(
            read_str(&mut doc, xml),
            Err(PnmlError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn writer_escapes_and_emits_reference_nodes() {
        let mut doc = Document::new();
        read_str(&mut doc, SAMPLE).unwrap();
        doc.set_name("t0", Some("a<b & \"c\"".into())).unwrap();
        let xml = to_pnml_string(&doc);
        assert!(xml.contains(r#"<referencePlace id="lock" ref="p0">"#));
        assert!(xml.contains("a&lt;b &amp; &quot;c&quot;"));
        assert!(xml.contains(r#"<type value="read"/>"#));
        assert!(xml.contains(NetFormat::PlaceTransition.uri()));
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }

    #[test]
    fn whitespace_in_names_and_ids_survives_a_round_trip() {
        let mut doc = Document::new();
        doc.add_net(PetriNet::new("n", NetFormat::PlaceTransition))
            .unwrap();
        doc.add_page("n", Page::new("pg")).unwrap();
        doc.add_place("pg", Place::new("p").with_name("a")).unwrap();
        doc.add_place("pg", Place::new("q").with_name("a ")).unwrap();
        doc.add_place("pg", Place::new("line\nbreak\ttab\r").with_name("\tx\r\n"))
            .unwrap();

        let xml = to_pnml_string(&doc);
        assert!(xml.contains(r#"id="line&#10;break&#9;tab&#13;""#));

        let mut reread = Document::new();
        read_str(&mut reread, &xml).unwrap();
        assert_eq!(reread.get::<Place>("p").unwrap().name(), Some("a"));
        assert_eq!(reread.get::<Place>("q").unwrap().name(), Some("a "));
        assert_eq!(
            reread.get::<Place>("line\nbreak\ttab\r").unwrap().name(),
            Some("\tx\r\n")
        );
    }
}
