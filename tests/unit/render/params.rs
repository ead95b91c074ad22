use super::*;

fn params() -> RenderParams {
    RenderParams {
        name: "Staircase".into(),
        file: PathBuf::from("scenes/staircase/scene.pyscene"),
        anim: [0, 2],
        method: "input".into(),
        out_dir: Some(PathBuf::from("/data/output")),
        interactive: false,
        ref_count: 8192,
        seed_offset: 3,
        sample_index: 3,
        multigbuf_count: 4,
    }
}

#[test]
fn last_assignment_wins_regardless_of_type() {
    let mut s = params().surface();
    assert_eq!(s.get("SEED_OFFSET"), Some(&Value::from(3u64)));
    s.set("SEED_OFFSET", "seven");
    s.set("SEED_OFFSET", 7);
    assert_eq!(s.get("SEED_OFFSET"), Some(&Value::from(7)));
    s.set("NAME", 1.5);
    s.set("NAME", "Bistro");
    assert_eq!(s.get("NAME"), Some(&Value::from("Bistro")));
}

#[test]
fn env_pairs_are_prefixed() {
    let pairs = params().surface().env_pairs();
    assert!(pairs.contains(&("FRAMEFOLD_NAME".into(), "Staircase".into())));
    assert!(pairs.contains(&("FRAMEFOLD_ANIM".into(), "[0,2]".into())));
    assert!(pairs.contains(&("FRAMEFOLD_INTERACTIVE".into(), "false".into())));
}

#[test]
fn json_file_is_replaced_whole() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("params.json");
    params().surface().write_json(&path).unwrap();

    let mut p = params();
    p.sample_index = 4;
    p.surface().write_json(&path).unwrap();

    let v: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(v["SAMPLE_INDEX"], Value::from(4));
    assert_eq!(v["OUT_DIR"], Value::from("/data/output"));
    assert!(!dir.path().join("nested").join("params.json.partial").exists());
}

#[test]
fn interactive_surface_has_no_out_dir() {
    let mut p = params();
    p.interactive = true;
    p.out_dir = None;
    let s = p.surface();
    assert!(s.get("OUT_DIR").is_none());
    assert!(!s.env_pairs().iter().any(|(k, _)| k == "FRAMEFOLD_OUT_DIR"));
    assert_eq!(s.get("INTERACTIVE"), Some(&Value::from(true)));
}
