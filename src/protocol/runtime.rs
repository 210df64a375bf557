//! Runtime-property upload (`254_22`): electrical readings and BMS detail.

use super::structured::StructuredCodec;
use crate::schema::{Kind, Schema, field};

pub static RUNTIME_PROPERTY_UPLOAD: Schema = Schema {
    name: "RuntimePropertyUpload",
    fields: &[
        field(1, "tempPcsDc", Kind::Float),
        field(2, "tempPcsAc", Kind::Float),
        field(3, "plugInInfoPvVol", Kind::Float),
        field(4, "plugInInfoPvAmp", Kind::Float),
        field(5, "plugInInfoAcInVol", Kind::Float),
        field(6, "plugInInfoAcInAmp", Kind::Float),
        field(7, "plugInInfoAcOutVol", Kind::Float),
        field(8, "plugInInfoAcOutAmp", Kind::Float),
        field(20, "bmsBattVol", Kind::UInt32),
        field(21, "bmsBattAmp", Kind::Float),
        field(22, "bmsMinCellVol", Kind::UInt32),
        field(23, "bmsMaxCellVol", Kind::UInt32),
        field(24, "bmsFullCap", Kind::UInt32),
        field(25, "bmsRemainCap", Kind::UInt32),
        field(26, "bmsCycles", Kind::UInt32),
        field(40, "pdErrCode", Kind::UInt32),
        field(41, "mpptErrCode", Kind::UInt32),
        field(50, "bmsSn", Kind::Str),
    ],
};

pub static CODEC: StructuredCodec = StructuredCodec {
    name: "runtime",
    schema: &RUNTIME_PROPERTY_UPLOAD,
    stats: None,
};
