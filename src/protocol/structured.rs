//! Codec for payloads with a known schema.

use log::trace;

use super::statistics::{self, StatsLocation};
use super::{CommandId, PayloadCodec, PayloadOutput};
use crate::error::Result;
use crate::flatten;
use crate::schema::Schema;
use crate::value::{FieldMap, Record};

/// Decodes with a static schema, flattens, and expands an optional
/// statistics list into synthetic top-level keys.
#[derive(Debug)]
pub struct StructuredCodec {
    pub name: &'static str,
    pub schema: &'static Schema,
    pub stats: Option<StatsLocation>,
}

impl StructuredCodec {
    /// Decode into the record tree and its un-namespaced flat fields.
    ///
    /// Statistics entries appear as top-level keys (`ac_out_energy`); the
    /// statistics container itself is left out of the flat view.
    pub fn decode_fields(&self, payload: &[u8]) -> Result<(Record, FieldMap)> {
        let record = self.schema.decode(payload)?;

        let flat = match &self.stats {
            Some(loc) => {
                let mut view = record.clone();
                view.remove(loc.container);
                let mut flat = flatten::flatten(&view);
                let stats = statistics::expand(&record, loc);
                trace!("{}: {} statistics entries", self.name, stats.len());
                flat.extend(stats);
                flat
            }
            None => flatten::flatten(&record),
        };

        Ok((record, flat))
    }
}

impl PayloadCodec for StructuredCodec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, id: CommandId, payload: &[u8]) -> Result<PayloadOutput> {
        let (record, flat) = self.decode_fields(payload)?;
        let prefix = id.prefix();
        let params = flat.into_iter().map(|(k, v)| (format!("{prefix}{k}"), v)).collect();
        Ok(PayloadOutput { params, record: Some(record) })
    }
}
