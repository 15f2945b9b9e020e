use gmns_standards::{DatasetKind, FieldType, required_fields, schema};

#[test]
fn link_catalog_marks_vdf_derivatives_optional() {
    let link = schema(DatasetKind::Link);
    for name in ["vdf_length_mi", "vdf_free_speed_mph", "vdf_fftt", "obs_volume"] {
        let spec = link.iter().find(|spec| spec.name == name).unwrap();
        assert!(!spec.required, "{name}");
        assert_eq!(spec.field_type, FieldType::Float);
    }
    assert_eq!(required_fields(DatasetKind::Link).count(), 12);
}

#[test]
fn settings_fields_are_all_required_integers() {
    let settings = schema(DatasetKind::Settings);
    assert_eq!(settings.len(), 9);
    assert!(settings.iter().all(|spec| spec.required && spec.field_type == FieldType::Int));
}

#[test]
fn kinds_serialize_as_message_names() {
    let json = serde_json::to_string(&DatasetKind::ModeType).unwrap();
    assert_eq!(json, "\"mode_type\"");
    assert_eq!(DatasetKind::ModeType.as_str(), "mode_type");
    assert_eq!(DatasetKind::Settings.file_name(), "settings.csv");
}
