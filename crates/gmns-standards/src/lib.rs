//! GMNS field catalogs.
//!
//! Static per-file field lists (type, required flag, description) for the
//! node, link, demand, mode_type and settings tables. The structural and
//! configuration checks in `gmns-validate` are driven entirely by these.
//!
//! ```
//! use gmns_standards::{DatasetKind, FieldType, field, required_fields};
//!
//! let required: Vec<&str> = required_fields(DatasetKind::Demand).map(|f| f.name).collect();
//! assert_eq!(required, ["o_zone_id", "d_zone_id", "volume"]);
//! assert_eq!(field(DatasetKind::Link, "capacity").map(|f| f.field_type), Some(FieldType::Float));
//! ```

mod catalog;
mod types;

pub use catalog::{field, required_fields, schema};
pub use types::{DatasetKind, FieldSpec, FieldType};

/// Columns a demand file must have, in this exact order.
pub const DEMAND_COLUMNS: [&str; 3] = ["o_zone_id", "d_zone_id", "volume"];
