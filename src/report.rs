use crate::graph::{Graph, Site};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, NodeIndex};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const HEADERS: [&str; 2] = ["site", "group"];

/// Minimum gap between a header and its column edge.
const MIN_PADDING: usize = 2;
const COLUMN_SEPARATOR: &str = "  ";

/// One output row: a site identifier and its 1-indexed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub site: String,
    pub group: usize,
}

/// Rows for every vertex of `graph`, with groups shifted to start at 1.
pub fn rows(graph: &Graph, membership: &[usize]) -> Vec<Row> {
    graph
        .ids()
        .zip(membership)
        .map(|(site, &c)| Row {
            site: site.to_string(),
            group: c + 1,
        })
        .collect()
}

/// Renders rows as a borderless table.
///
/// Every column is at least its header plus two characters wide. Columns
/// whose cells are all numbers are right-aligned, the rest left-aligned.
pub fn format_table(rows: &[Row]) -> String {
    let columns: [Vec<String>; 2] = [
        rows.iter().map(|r| r.site.clone()).collect(),
        rows.iter().map(|r| r.group.to_string()).collect(),
    ];

    let layout: Vec<(usize, bool)> = columns
        .iter()
        .zip(HEADERS)
        .map(|(cells, header)| {
            let width = cells
                .iter()
                .map(|c| c.chars().count())
                .chain([header.len() + MIN_PADDING])
                .max()
                .unwrap_or(0);
            let numeric = !cells.is_empty() && cells.iter().all(|c| c.trim().parse::<f64>().is_ok());
            (width, numeric)
        })
        .collect();

    let mut out = String::new();
    let mut push_line = |cells: [&str; 2]| {
        let line: Vec<String> = cells
            .iter()
            .zip(&layout)
            .map(|(cell, &(width, numeric))| {
                if numeric {
                    format!("{cell:>width$}")
                } else {
                    format!("{cell:<width$}")
                }
            })
            .collect();
        out.push_str(line.join(COLUMN_SEPARATOR).trim_end());
        out.push('\n');
    };

    push_line(HEADERS);
    for (site, group) in columns[0].iter().zip(&columns[1]) {
        push_line([site, group]);
    }
    out
}

/// Writes rows as `site,group` CSV.
pub fn write_csv(path: impl AsRef<Path>, rows: &[Row]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record([row.site.as_str(), &row.group.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `graph` in Graphviz DOT with each vertex filled by its group colour.
pub fn save_dot(graph: &Graph, membership: &[usize], path: impl AsRef<Path>) -> io::Result<()> {
    let edge_attrs = |_, edge: EdgeReference<'_, f64>| format!("label=\"{}\"", edge.weight());
    let node_attrs = |_, (index, site): (NodeIndex, &Site)| {
        let hue = ((membership[index.index()] + 1) * 60) % 360;
        format!(
            "label=\"{}\", style=filled, fillcolor=\"{:.3} 0.5 0.7\"",
            site.id,
            hue as f32 / 360.0
        )
    };
    let dot = Dot::with_attr_getters(
        graph.petgraph(),
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &edge_attrs,
        &node_attrs,
    );

    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "{:?}", dot)?;
    writer.flush()
}
