use std::path::PathBuf;

/// Result alias for `louvain_partition`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned while loading graphs and optimising partitions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed GraphML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed GraphML attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// No `<key>` declares an edge attribute of this name.
    #[error("GraphML has no edge attribute named '{0}'")]
    MissingEdgeKey(String),

    /// The edge has no value for the weight and the key declares no default.
    #[error("edge {source_id} -> {target_id} has no '{key}' value and no default is declared")]
    MissingEdgeValue {
        source_id: String,
        target_id: String,
        key: String,
    },

    #[error("edge refers to undeclared node '{0}'")]
    UnknownNode(String),

    #[error("element <{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("cannot parse '{value}' as a number")]
    BadNumber { value: String },

    /// Layers of a multiplex partition must share one vertex set.
    #[error("layer {layer} has {found} vertices, expected {expected}")]
    LayerMismatch {
        layer: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },
}
