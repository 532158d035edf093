//! Fixed table and column names of the mold-master → asset projection.
//!
//! The target slot labels do not line up with the source column semantics
//! (`scrap_qty` lands in a slot labelled `scrap_shot`, `scrap_shot` in one
//! labelled `shot_qty`). They are the production column names and must be
//! written exactly as listed here.

/// Source table in the manufacturing database.
pub const SOURCE_TABLE: &str = "T_IOT_MOLD_MASTER";

pub const SOURCE_MOLD_SERIAL: &str = "mold_serial";
pub const SOURCE_MAINTENANCE_SHOT: &str = "maintenance_shot";
pub const SOURCE_SCRAP_QTY: &str = "scrap_qty";
pub const SOURCE_SCRAP_SHOT: &str = "scrap_shot";
pub const SOURCE_MACHINE_CD: &str = "machine_cd";

/// Target table in the asset-tracking database.
pub const TARGET_TABLE: &str = "assets";

pub const TARGET_SERIAL: &str = "serial";
pub const TARGET_DELETED_AT: &str = "deleted_at";

pub const TARGET_MAINTENANCE_SHOT: &str = "_snipeit_maintenance_shot_24";
pub const TARGET_SCRAP_SHOT: &str = "_snipeit_scrap_shot_26";
pub const TARGET_SHOT_QTY: &str = "_snipeit_shot_qty_25";

/// `(source column, target column)` pairs, in the order they are written.
pub const FIELD_MAPPING: [(&str, &str); 3] = [
    (SOURCE_MAINTENANCE_SHOT, TARGET_MAINTENANCE_SHOT),
    (SOURCE_SCRAP_QTY, TARGET_SCRAP_SHOT),
    (SOURCE_SCRAP_SHOT, TARGET_SHOT_QTY),
];

/// All source columns read by a sync pass.
pub const SOURCE_COLUMNS: [&str; 5] = [
    SOURCE_MOLD_SERIAL,
    SOURCE_MAINTENANCE_SHOT,
    SOURCE_SCRAP_QTY,
    SOURCE_SCRAP_SHOT,
    SOURCE_MACHINE_CD,
];
