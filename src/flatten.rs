//! Record tree to flat key-path mapping.

use crate::value::{FieldMap, Node, Record};

/// Separator between path segments.
pub const SEP: char = '.';

/// Flatten a record: nested records join with `.`, list elements are keyed
/// by index (`items.0.name`).
pub fn flatten(record: &Record) -> FieldMap {
    let mut out = FieldMap::new();
    for (key, node) in record {
        flatten_node(key, node, &mut out);
    }
    out
}

fn flatten_node(path: &str, node: &Node, out: &mut FieldMap) {
    match node {
        Node::Scalar(v) => {
            out.insert(path.to_string(), v.clone());
        }
        Node::Record(r) => {
            for (key, child) in r {
                flatten_node(&format!("{path}{SEP}{key}"), child, out);
            }
        }
        Node::List(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_node(&format!("{path}{SEP}{i}"), child, out);
            }
        }
    }
}
