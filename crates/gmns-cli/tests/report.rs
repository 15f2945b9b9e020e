//! Integration tests for input resolution and the report file.

use std::fs;

use gmns_cli::report::{FileOverrides, default_report_path, exit_code, resolve_network_paths, write_report};
use gmns_model::{ReadinessLevel, ValidationReport};
use gmns_validate::{ExecutionConfig, NetworkValidator};
use tempfile::TempDir;

fn write_network(dir: &TempDir) {
    fs::write(
        dir.path().join("tempe_node.csv"),
        "node_id,zone_id,x_coord,y_coord\n1,1,0.0,0.0\n101,,0.5,0.0\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("tempe_link.csv"),
        "link_id,from_node_id,to_node_id,length,lanes,capacity,free_speed,link_type,dir_flag,vdf_alpha,vdf_beta,vdf_plf\n\
         1,1,101,450,1,1800,60,1,1,0.15,4,1\n\
         2,101,1,450,1,1800,60,1,1,0.15,4,1\n",
    )
    .unwrap();
    fs::write(dir.path().join("link_performance.csv"), "link_id,volume\n1,10\n").unwrap();
}

#[test]
fn discovery_fills_missing_overrides() {
    let dir = TempDir::new().unwrap();
    write_network(&dir);
    let custom_demand = dir.path().join("od.csv");

    let paths = resolve_network_paths(
        dir.path(),
        FileOverrides {
            demand: Some(custom_demand.clone()),
            ..FileOverrides::default()
        },
    )
    .unwrap();
    assert_eq!(paths.node, Some(dir.path().join("tempe_node.csv")));
    assert_eq!(paths.link, dir.path().join("tempe_link.csv"));
    assert_eq!(paths.demand, Some(custom_demand));
}

#[test]
fn missing_working_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nowhere");
    let err = resolve_network_paths(&missing, FileOverrides::default()).unwrap_err();
    assert!(format!("{err:#}").starts_with("read working directory"));
}

#[test]
fn report_round_trips_through_json() {
    let dir = TempDir::new().unwrap();
    write_network(&dir);
    let paths = resolve_network_paths(dir.path(), FileOverrides::default()).unwrap();
    let report = NetworkValidator::new(paths, ExecutionConfig::default()).validate(ReadinessLevel::Structural);

    let path = default_report_path(dir.path());
    write_report(&report, &path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let parsed: ValidationReport = serde_json::from_str(&text).unwrap();

    assert_eq!(parsed.summary, report.summary);
    assert_eq!(parsed.metadata.level, 1);
    assert_eq!(parsed.metadata.link_count, 2);
    assert!(text.contains("\"field_statistics\""));
    assert_eq!(exit_code(&parsed), i32::from(parsed.summary.errors > 0));
}

#[test]
fn header_only_link_file_fails_the_run() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("node.csv"), "node_id,zone_id,x_coord,y_coord\n1,1,0,0\n").unwrap();
    fs::write(dir.path().join("link.csv"), "link_id,from_node_id,to_node_id\n").unwrap();
    let paths = resolve_network_paths(dir.path(), FileOverrides::default()).unwrap();
    let report = NetworkValidator::new(paths, ExecutionConfig::default()).validate(ReadinessLevel::AssignmentFit);

    assert_eq!(exit_code(&report), 1);
    insta::assert_json_snapshot!(report.summary, @r#"
    {
      "total": 1,
      "errors": 1,
      "warnings": 0,
      "success": 0,
      "info": 0
    }
    "#);
}
