//! Cumulative usage statistics embedded in the display upload.
//!
//! The device reports a list of `{statisticsObject, statisticsContent}`
//! pairs. Each pair becomes a top-level key named after the object enum
//! with its `STATISTICS_OBJECT_` prefix stripped and lower-cased, e.g.
//! `STATISTICS_OBJECT_AC_OUT_ENERGY = 123` becomes `ac_out_energy = 123`.

use log::debug;

use crate::schema::{EnumDef, Kind, Schema, field, repeated};
use crate::value::{FieldMap, Node, Record, Value};

pub const OBJECT_PREFIX: &str = "STATISTICS_OBJECT_";

pub static STATISTICS_OBJECT: EnumDef = EnumDef {
    name: "StatisticsObject",
    values: &[
        (0, "STATISTICS_OBJECT_START"),
        (1, "STATISTICS_OBJECT_AC_OUT_DURATION"),
        (2, "STATISTICS_OBJECT_DC12V_OUT_DURATION"),
        (3, "STATISTICS_OBJECT_TYPEC_OUT_DURATION"),
        (4, "STATISTICS_OBJECT_USBA_OUT_DURATION"),
        (5, "STATISTICS_OBJECT_AC_IN_DURATION"),
        (6, "STATISTICS_OBJECT_PV_IN_DURATION"),
        (7, "STATISTICS_OBJECT_AC_OUT_ENERGY"),
        (8, "STATISTICS_OBJECT_DC12V_OUT_ENERGY"),
        (9, "STATISTICS_OBJECT_TYPEC_OUT_ENERGY"),
        (10, "STATISTICS_OBJECT_USBA_OUT_ENERGY"),
        (11, "STATISTICS_OBJECT_AC_IN_ENERGY"),
        (12, "STATISTICS_OBJECT_PV_IN_ENERGY"),
        (13, "STATISTICS_OBJECT_DSG_ENERGY"),
        (14, "STATISTICS_OBJECT_CHG_ENERGY"),
    ],
};

pub static STATISTICS_RECORD: Schema = Schema {
    name: "StatisticsRecord",
    fields: &[
        field(1, "statisticsObject", Kind::Enum(&STATISTICS_OBJECT)),
        field(2, "statisticsContent", Kind::UInt32),
    ],
};

pub static STATISTICS_SUM: Schema = Schema {
    name: "DisplayStatisticsSum",
    fields: &[repeated(1, "listInfo", Kind::Message(&STATISTICS_RECORD))],
};

/// Where a statistics list sits inside a decoded record.
#[derive(Debug, Clone, Copy)]
pub struct StatsLocation {
    /// Top-level field holding the container message.
    pub container: &'static str,
    /// Repeated field inside the container.
    pub list: &'static str,
    pub object: &'static str,
    pub content: &'static str,
}

/// The display upload's statistics list.
pub const DISPLAY_STATS: StatsLocation = StatsLocation {
    container: "displayStatisticsSum",
    list: "listInfo",
    object: "statisticsObject",
    content: "statisticsContent",
};

/// Key for an object name: prefix stripped, lower-cased.
pub fn object_key(object: &str) -> String {
    object.strip_prefix(OBJECT_PREFIX).unwrap_or(object).to_ascii_lowercase()
}

/// Expand the statistics list at `loc` into synthetic keys.
///
/// Entries whose object is missing or not a known enum name are skipped.
pub fn expand(record: &Record, loc: &StatsLocation) -> FieldMap {
    let mut out = FieldMap::new();
    let Some(Node::Record(container)) = record.get(loc.container) else {
        return out;
    };
    let Some(Node::List(entries)) = container.get(loc.list) else {
        return out;
    };

    for entry in entries {
        let Node::Record(entry) = entry else { continue };
        match entry.get(loc.object) {
            Some(Node::Scalar(Value::Str(object))) => {
                // proto3 leaves a zero content off the wire.
                let content = match entry.get(loc.content) {
                    Some(Node::Scalar(v)) => v.clone(),
                    _ => Value::Int(0),
                };
                out.insert(object_key(object), content);
            }
            Some(Node::Scalar(Value::Int(raw))) => {
                debug!("statistics object {raw} has no known name, skipped");
            }
            _ => {}
        }
    }
    out
}
