use super::*;

#[test]
fn empty_object_yields_defaults() {
    let cfg: RunConfig = serde_json::from_str("{}").unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.samples_per_pixel, 2);
    assert_eq!(cfg.reference.samples_per_pixel, 4096);
    assert_eq!(cfg.reference.ready_set, vec!["current", "envLight", "emissive"]);
    assert_eq!(cfg.ref_count, 8192);
    assert_eq!(cfg.ref_count_interactive, 65536);
    assert_eq!(cfg.second_input_seed_offset, 1_000_000);
    assert_eq!(cfg.workers, PoolConfig { reserved: 4, max: 60 });
    assert_eq!(cfg.retry.max_attempts, None);
    assert_eq!(cfg.dataset_root, PathBuf::from("dataset"));
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let cfg: RunConfig = serde_json::from_str(
        r#"{
            "samples_per_pixel": 8,
            "reference": { "samples_per_pixel": 16 },
            "retry": { "max_attempts": 5 },
            "renderer": { "executable": "/opt/renderer", "params_format": "env" }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.samples_per_pixel, 8);
    assert_eq!(cfg.reference.samples_per_pixel, 16);
    assert_eq!(cfg.reference.trailing_frames, 1);
    assert_eq!(cfg.retry.max_attempts, Some(5));
    assert_eq!(cfg.retry.backoff_ms, 0);
    assert_eq!(cfg.renderer.executable, PathBuf::from("/opt/renderer"));
    assert_eq!(
        cfg.renderer.params_format,
        crate::render::params::ParamsFormat::Env
    );
}

#[test]
fn validation_rejects_bad_ranges() {
    let mut cfg = RunConfig::default();
    cfg.samples_per_pixel = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = RunConfig::default();
    cfg.reference.start_sample_index = 10;
    cfg.reference.samples_per_pixel = 10;
    assert!(cfg.validate().is_err());

    let mut cfg = RunConfig::default();
    cfg.reference.ready_set.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn load_reports_path_on_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("framefold.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = RunConfig::load(&path).unwrap_err().to_string();
    assert!(err.contains("framefold.json"), "{err}");
}

#[test]
fn missing_default_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = RunConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
    assert_eq!(cfg.samples_per_pixel, 2);
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let mut cfg = RunConfig::default();
    cfg.bulk_storage_root = Some(PathBuf::from("nas"));
    cfg.resolve_paths(Path::new("/work/falcor"));
    assert_eq!(cfg.output_dir, PathBuf::from("/work/falcor/output"));
    assert_eq!(cfg.dataset_root, PathBuf::from("/work/falcor/dataset"));
    assert_eq!(cfg.bulk_storage_root, Some(PathBuf::from("/work/falcor/nas")));
    assert_eq!(cfg.scenes, PathBuf::from("/work/falcor/scenes.json"));
    assert_eq!(cfg.scene_base(), PathBuf::from("/work"));
    assert_eq!(cfg.params_path(), PathBuf::from("/work/falcor/framefold_params.json"));
}

#[test]
fn absolute_roots_are_left_alone() {
    let mut cfg = RunConfig {
        dataset_root: PathBuf::from("/mnt/datasets"),
        bulk_storage_root: Some(PathBuf::from("/mnt/nas")),
        ..RunConfig::default()
    };
    cfg.resolve_paths(Path::new("/work/falcor"));
    assert_eq!(cfg.dataset_root, PathBuf::from("/mnt/datasets"));
    assert_eq!(cfg.bulk_storage_root, Some(PathBuf::from("/mnt/nas")));
}
