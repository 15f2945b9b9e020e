//! Static field catalogs per dataset kind.

use crate::types::{DatasetKind, FieldSpec, FieldType};

use FieldType::{Float, Int, Str};

const NODE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("node_id", Int, "Unique node identifier"),
    FieldSpec::required("zone_id", Int, "Zone the node belongs to; equals node_id for centroids"),
    FieldSpec::required("x_coord", Float, "Longitude or projected x coordinate"),
    FieldSpec::required("y_coord", Float, "Latitude or projected y coordinate"),
    FieldSpec::optional("district_id", Float, "Aggregate district"),
    FieldSpec::optional("elevation", Float, "Elevation"),
    FieldSpec::optional("ctrl_type", Int, "Intersection control type"),
    FieldSpec::optional("name", Str, "Node name"),
    FieldSpec::optional("modes", Str, "Modes served"),
];

const LINK_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("link_id", Int, "Unique link identifier"),
    FieldSpec::required("from_node_id", Int, "Upstream node"),
    FieldSpec::required("to_node_id", Int, "Downstream node"),
    FieldSpec::required("length", Float, "Length in meters"),
    FieldSpec::required("lanes", Int, "Number of lanes"),
    FieldSpec::required("capacity", Float, "Hourly capacity"),
    FieldSpec::required("free_speed", Float, "Free-flow speed in km/h"),
    FieldSpec::required("link_type", Int, "Facility class"),
    FieldSpec::required("dir_flag", Int, "Direction flag"),
    FieldSpec::required("vdf_alpha", Float, "BPR alpha"),
    FieldSpec::required("vdf_beta", Float, "BPR beta"),
    FieldSpec::required("vdf_plf", Float, "Peak load factor"),
    FieldSpec::optional("vdf_length_mi", Float, "Length in miles"),
    FieldSpec::optional("vdf_free_speed_mph", Float, "Free-flow speed in mph"),
    FieldSpec::optional("vdf_fftt", Float, "Free-flow travel time in minutes"),
    FieldSpec::optional("ref_volume", Float, "Reference volume"),
    FieldSpec::optional("obs_volume", Float, "Observed count"),
    FieldSpec::optional("obs_volume_sov", Float, "Observed single-occupancy count"),
    FieldSpec::optional("obs_volume_truck", Float, "Observed truck count"),
    FieldSpec::optional("base_volume", Float, "Base volume"),
    FieldSpec::optional("base_vol_auto", Float, "Base auto volume"),
    FieldSpec::optional("background_volume", Float, "Background volume"),
    FieldSpec::optional("vdf_toll", Float, "Toll"),
    FieldSpec::optional("vdf_toll_sov", Float, "Single-occupancy toll"),
    FieldSpec::optional("vdf_toll_truck", Float, "Truck toll"),
    FieldSpec::optional("geometry", Str, "WKT line string"),
];

const DEMAND_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("o_zone_id", Int, "Origin zone"),
    FieldSpec::required("d_zone_id", Int, "Destination zone"),
    FieldSpec::required("volume", Float, "Trips"),
    FieldSpec::optional("time_period", Str, "Demand period"),
    FieldSpec::optional("mode", Str, "Mode"),
];

const MODE_TYPE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("mode_type", Str, "Mode code"),
    FieldSpec::required("name", Str, "Display name"),
    FieldSpec::required("vot", Int, "Value of time"),
    FieldSpec::required("pce", Int, "Passenger car equivalent"),
    FieldSpec::required("occ", Int, "Occupancy"),
    FieldSpec::required("demand_file", Str, "Demand file for this mode"),
    FieldSpec::required("dedicated_shortest_path", Int, "Dedicated shortest-path flag"),
];

const SETTINGS_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("number_of_iterations", Int, "Assignment iterations"),
    FieldSpec::required("number_of_processors", Int, "Worker threads"),
    FieldSpec::required("demand_period_starting_hours", Int, "Period start hour"),
    FieldSpec::required("demand_period_ending_hours", Int, "Period end hour"),
    FieldSpec::required("base_demand_mode", Int, "Base demand mode; 0 for none"),
    FieldSpec::required("route_output", Int, "Write route_assignment.csv when 1"),
    FieldSpec::required("log_file", Int, "Engine log verbosity"),
    FieldSpec::required("odme_mode", Int, "Run ODME when 1"),
    FieldSpec::required("odme_vmt", Int, "ODME VMT weighting"),
];

/// Field catalog for a dataset kind, in canonical column order.
pub fn schema(kind: DatasetKind) -> &'static [FieldSpec] {
    match kind {
        DatasetKind::Node => NODE_FIELDS,
        DatasetKind::Link => LINK_FIELDS,
        DatasetKind::Demand => DEMAND_FIELDS,
        DatasetKind::ModeType => MODE_TYPE_FIELDS,
        DatasetKind::Settings => SETTINGS_FIELDS,
    }
}

/// Required fields of a dataset kind.
pub fn required_fields(kind: DatasetKind) -> impl Iterator<Item = &'static FieldSpec> {
    schema(kind).iter().filter(|spec| spec.required)
}

/// Look up a field by (lower-case) name.
pub fn field(kind: DatasetKind, name: &str) -> Option<&'static FieldSpec> {
    schema(kind).iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_have_unique_lowercase_names() {
        for kind in DatasetKind::ALL {
            let mut names: Vec<&str> = schema(kind).iter().map(|spec| spec.name).collect();
            assert!(names.iter().all(|name| *name == name.to_ascii_lowercase()));
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), schema(kind).len(), "{kind}");
        }
    }

    #[test]
    fn id_fields_are_required_integers() {
        for kind in [DatasetKind::Node, DatasetKind::Link] {
            let id = kind.id_field().and_then(|name| field(kind, name));
            let id = id.expect("id field in catalog");
            assert!(id.required);
            assert_eq!(id.field_type, FieldType::Int);
        }
    }
}
