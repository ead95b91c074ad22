use super::*;

const REGISTRY: &str = r#"[
    { "name": "Staircase", "file": "scenes/staircase.pyscene", "anim": [0, 99] },
    { "name": "Dining-room-dynamic", "file": "/abs/dining.pyscene", "anim": [10, 12],
      "keep_trailing_frames": true }
]"#;

#[test]
fn keeps_order_and_resolves_relative_files() {
    let reg = SceneRegistry::from_json(REGISTRY, Path::new("/home/data")).unwrap();
    let names: Vec<&str> = reg.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Staircase", "Dining-room-dynamic"]);

    let mut scenes = reg.iter();
    let stairs = scenes.next().unwrap();
    assert_eq!(stairs.file, PathBuf::from("/home/data/scenes/staircase.pyscene"));
    assert_eq!(stairs.frame_count(), 100);
    assert!(!stairs.keep_trailing_frames);

    let dining = scenes.next().unwrap();
    assert_eq!(dining.file, PathBuf::from("/abs/dining.pyscene"));
    assert!(dining.keep_trailing_frames);
    assert_eq!(dining.range().unwrap().len_frames(), 3);
}

#[test]
fn rejects_empty_reversed_and_duplicate() {
    let base = Path::new(".");
    assert!(SceneRegistry::from_json("[]", base).is_err());
    assert!(
        SceneRegistry::from_json(r#"[{"name":"a","file":"a","anim":[5,2]}]"#, base).is_err()
    );
    assert!(
        SceneRegistry::from_json(
            r#"[{"name":"a","file":"a","anim":[0,1]},{"name":"a","file":"b","anim":[0,1]}]"#,
            base
        )
        .is_err()
    );
}

#[test]
fn load_names_the_file_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenes.json");
    std::fs::write(&path, "[]").unwrap();
    let err = SceneRegistry::load(&path, dir.path()).unwrap_err().to_string();
    assert!(err.contains("scenes.json"), "{err}");
}
