//! GraphML reader.
//!
//! Only the parts of the format a weighted partition needs are read:
//! `<key>` declarations (with `<default>`), `<node>`, `<edge>` and their
//! `<data>` children. The edge weight is taken from the key named `weight`;
//! a node key named `id` overrides the XML identifier of the node.

use crate::error::{Error, Result};
use crate::graph::Graph;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::LocalName;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

pub const WEIGHT_ATTRIBUTE: &str = "weight";
pub const ID_ATTRIBUTE: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Node,
    Edge,
    All,
    Other,
}

#[derive(Debug)]
struct KeyDecl {
    domain: Domain,
    name: String,
    default: Option<String>,
}

#[derive(Debug)]
struct PendingNode {
    xml_id: String,
    data: HashMap<String, String>,
}

#[derive(Debug)]
struct PendingEdge {
    source: String,
    target: String,
    data: HashMap<String, String>,
}

/// Where `<data>` and `<default>` text currently goes.
#[derive(Debug)]
enum Scope {
    Document,
    Key(usize),
    Node(usize),
    Edge(usize),
}

/// Reads the GraphML file at `path`.
pub fn read_graphml(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = parse_graphml(BufReader::new(file))?;
    info!(
        path = %path.display(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "loaded GraphML"
    );
    Ok(graph)
}

pub fn parse_graphml_str(doc: &str) -> Result<Graph> {
    parse_graphml(doc.as_bytes())
}

pub fn parse_graphml<R: BufRead>(input: R) -> Result<Graph> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut keys: Vec<(String, KeyDecl)> = Vec::new();
    let mut nodes: Vec<PendingNode> = Vec::new();
    let mut edges: Vec<PendingEdge> = Vec::new();
    let mut scope = Scope::Document;
    let mut in_default = false;
    let mut data_key: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = e.local_name();
                match local_name_as_str(&name) {
                    "key" => {
                        keys.push(key_decl(e)?);
                        scope = Scope::Key(keys.len() - 1);
                    }
                    "default" => in_default = true,
                    "graph" => check_edge_default(e)?,
                    "node" => {
                        nodes.push(node(e)?);
                        scope = Scope::Node(nodes.len() - 1);
                    }
                    "edge" => {
                        edges.push(edge(e)?);
                        scope = Scope::Edge(edges.len() - 1);
                    }
                    "data" => {
                        data_key = Some(required_attribute(e, "data", "key")?);
                    }
                    _ => {}
                }
            }
            Event::Empty(ref e) => {
                let name = e.local_name();
                match local_name_as_str(&name) {
                    "key" => keys.push(key_decl(e)?),
                    "graph" => check_edge_default(e)?,
                    "node" => nodes.push(node(e)?),
                    "edge" => edges.push(edge(e)?),
                    _ => {}
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                if in_default {
                    if let Scope::Key(i) = scope {
                        keys[i].1.default = Some(text.into_owned());
                    }
                } else if let Some(key) = &data_key {
                    let data = match scope {
                        Scope::Node(i) => Some(&mut nodes[i].data),
                        Scope::Edge(i) => Some(&mut edges[i].data),
                        _ => None,
                    };
                    if let Some(data) = data {
                        data.entry(key.clone()).or_default().push_str(&text);
                    }
                }
            }
            Event::End(ref e) => {
                let name = e.local_name();
                match local_name_as_str(&name) {
                    "default" => in_default = false,
                    "data" => data_key = None,
                    "key" | "node" | "edge" => scope = Scope::Document,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    build(&keys, nodes, edges)
}

/// Keys are in document order. A key declared for `domain` wins over one
/// declared for all domains; otherwise the first declaration wins.
fn build(keys: &[(String, KeyDecl)], nodes: Vec<PendingNode>, edges: Vec<PendingEdge>) -> Result<Graph> {
    let find_key = |domain: Domain, name: &str| {
        let named = || keys.iter().filter(move |(_, decl)| decl.name == name);
        named()
            .find(|(_, decl)| decl.domain == domain)
            .or_else(|| named().find(|(_, decl)| decl.domain == Domain::All))
            .map(|(id, decl)| (id.as_str(), decl))
    };

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.xml_id.as_str(), i))
        .collect();

    let mut weighted = Vec::with_capacity(edges.len());
    if !edges.is_empty() {
        let (weight_key, weight_decl) = find_key(Domain::Edge, WEIGHT_ATTRIBUTE)
            .ok_or_else(|| Error::MissingEdgeKey(WEIGHT_ATTRIBUTE.to_string()))?;
        for edge in &edges {
            let u = *index
                .get(edge.source.as_str())
                .ok_or_else(|| Error::UnknownNode(edge.source.clone()))?;
            let v = *index
                .get(edge.target.as_str())
                .ok_or_else(|| Error::UnknownNode(edge.target.clone()))?;
            let raw = edge
                .data
                .get(weight_key)
                .or(weight_decl.default.as_ref())
                .ok_or_else(|| Error::MissingEdgeValue {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                    key: WEIGHT_ATTRIBUTE.to_string(),
                })?;
            weighted.push((u, v, parse_number(raw)?));
        }
    }

    let id_key = find_key(Domain::Node, ID_ATTRIBUTE);
    let ids = nodes
        .into_iter()
        .map(|mut node| {
            id_key
                .and_then(|(key, decl)| node.data.remove(key).or_else(|| decl.default.clone()))
                .unwrap_or(node.xml_id)
        })
        .collect();

    Ok(Graph::from_edges(ids, &weighted))
}

fn key_decl(e: &BytesStart) -> Result<(String, KeyDecl)> {
    let id = required_attribute(e, "key", "id")?;
    let name = attribute_value(e, "attr.name")?.unwrap_or_else(|| id.clone());
    let domain = match attribute_value(e, "for")?.as_deref() {
        Some("node") => Domain::Node,
        Some("edge") => Domain::Edge,
        Some("all") | None => Domain::All,
        _ => Domain::Other,
    };
    Ok((
        id,
        KeyDecl {
            domain,
            name,
            default: None,
        },
    ))
}

fn node(e: &BytesStart) -> Result<PendingNode> {
    Ok(PendingNode {
        xml_id: required_attribute(e, "node", "id")?,
        data: HashMap::new(),
    })
}

fn edge(e: &BytesStart) -> Result<PendingEdge> {
    Ok(PendingEdge {
        source: required_attribute(e, "edge", "source")?,
        target: required_attribute(e, "edge", "target")?,
        data: HashMap::new(),
    })
}

fn check_edge_default(e: &BytesStart) -> Result<()> {
    if attribute_value(e, "edgedefault")?.as_deref() == Some("directed") {
        warn!("directed GraphML input; edges are treated as undirected");
    }
    Ok(())
}

fn parse_number(raw: &str) -> Result<f64> {
    raw.trim().parse().map_err(|_| Error::BadNumber {
        value: raw.to_string(),
    })
}

fn required_attribute(e: &BytesStart, element: &'static str, attribute: &'static str) -> Result<String> {
    attribute_value(e, attribute)?.ok_or(Error::MissingAttribute { element, attribute })
}

fn attribute_value(event: &BytesStart, key: &str) -> Result<Option<String>> {
    for attr in event.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn local_name_as_str<'a>(name: &'a LocalName<'a>) -> &'a str {
    std::str::from_utf8(name.as_ref()).unwrap_or_default()
}
