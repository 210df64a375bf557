//! Display-property upload (`254_21`).
//!
//! Periodic state push: battery levels, port powers, user settings, and the
//! cumulative statistics list. Settable fields share their names with the
//! registry's camelCase aliases so settings echoes land on the same keys.

use super::statistics::{DISPLAY_STATS, STATISTICS_SUM};
use super::structured::StructuredCodec;
use crate::schema::{Kind, Schema, field};

pub static DISPLAY_PROPERTY_UPLOAD: Schema = Schema {
    name: "DisplayPropertyUpload",
    fields: &[
        field(1, "errcode", Kind::UInt32),
        field(2, "sysStatus", Kind::UInt32),
        field(3, "powInSumW", Kind::Float),
        field(4, "powOutSumW", Kind::Float),
        field(5, "lcdLight", Kind::UInt32),
        field(9, "enBeep", Kind::UInt32),
        field(13, "devStandbyTime", Kind::UInt32),
        field(14, "screenOffTime", Kind::UInt32),
        field(15, "powGetQcusb1", Kind::Float),
        field(16, "powGetQcusb2", Kind::Float),
        field(17, "powGetTypec1", Kind::Float),
        field(19, "acStandbyTime", Kind::UInt32),
        field(25, "xboostEn", Kind::UInt32),
        field(33, "cmsMaxChgSoc", Kind::UInt32),
        field(34, "cmsMinDsgSoc", Kind::UInt32),
        field(35, "powGet_12v", Kind::Float),
        field(36, "powGetPv", Kind::Float),
        field(37, "powGetAcIn", Kind::Float),
        field(38, "powGetAcOut", Kind::Float),
        field(41, "energyBackupEn", Kind::UInt32),
        field(42, "energyBackupStartSoc", Kind::UInt32),
        field(54, "plugInInfoAcInChgPowMax", Kind::UInt32),
        field(74, "dcOutOpen", Kind::UInt32),
        field(76, "cfgAcOutOpen", Kind::UInt32),
        field(87, "plugInInfoPvDcAmpMax", Kind::UInt32),
        field(90, "pvChgType", Kind::UInt32),
        field(141, "outputPowerOffMemory", Kind::UInt32),
        field(242, "bmsBattSoc", Kind::UInt32),
        field(243, "bmsBattSoh", Kind::UInt32),
        field(248, "bmsDesignCap", Kind::UInt32),
        field(254, "bmsDsgRemTime", Kind::UInt32),
        field(255, "bmsChgRemTime", Kind::UInt32),
        field(258, "bmsMinCellTemp", Kind::Int32),
        field(259, "bmsMaxCellTemp", Kind::Int32),
        field(262, "cmsBattSoc", Kind::Float),
        field(268, "cmsChgRemTime", Kind::UInt32),
        field(269, "cmsDsgRemTime", Kind::UInt32),
        field(270, "displayStatisticsSum", Kind::Message(&STATISTICS_SUM)),
        field(281, "bmsChgDsgState", Kind::UInt32),
    ],
};

pub static CODEC: StructuredCodec = StructuredCodec {
    name: "display",
    schema: &DISPLAY_PROPERTY_UPLOAD,
    stats: Some(DISPLAY_STATS),
};
