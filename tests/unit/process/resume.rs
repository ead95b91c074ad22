use super::*;
use crate::foundation::core::FrameIndex;
use crate::store::raster::Raster;

fn ready(frame_count: usize) -> ReadySet {
    ReadySet {
        channels: vec!["current".into(), "envLight".into(), "emissive".into()],
        frame_count,
        start: SampleIndex(0),
        target: SampleIndex(64),
    }
}

fn put_ref(store: &RasterStore, channel: &str, frame: u32, sample: u32) {
    let name = naming::ref_file_name(channel, FrameIndex(frame), SampleIndex(sample));
    store
        .write(&name, &Raster::filled(1, 1, 3, sample as f32).unwrap())
        .unwrap();
}

#[test]
fn missing_directory_is_created_and_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path().join("tmp"));
    let point = detect_resume(&staging, &ready(1)).unwrap();
    assert_eq!(point.next, SampleIndex(0));
    assert_eq!(point.decision, ResumeDecision::Fresh);
    assert!(staging.root().is_dir());
}

#[test]
fn staging_path_that_is_a_file_is_a_resume_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tmp");
    std::fs::write(&path, b"not a directory").unwrap();
    let staging = RasterStore::new(&path);
    let err = detect_resume(&staging, &ready(1)).unwrap_err();
    assert!(matches!(err, FoldError::Resume(_)));
    assert!(path.is_file());
}

#[test]
fn aligned_state_resumes_after_it() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    for ch in ["current", "envLight", "emissive"] {
        put_ref(&staging, ch, 0, 5);
    }
    let point = detect_resume(&staging, &ready(1)).unwrap();
    assert_eq!(point.next, SampleIndex(6));
    assert_eq!(
        point.decision,
        ResumeDecision::Aligned {
            at: SampleIndex(5),
            renamed: 0
        }
    );
}

#[test]
fn disagreeing_indices_are_pulled_back_to_the_minimum() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    put_ref(&staging, "current", 0, 5);
    put_ref(&staging, "envLight", 0, 6);
    put_ref(&staging, "emissive", 0, 5);

    let point = detect_resume(&staging, &ready(1)).unwrap();
    assert_eq!(point.next, SampleIndex(6));
    assert_eq!(
        staging.list().unwrap(),
        vec![
            "ref_current_0000_0005.exr",
            "ref_emissive_0000_0005.exr",
            "ref_envLight_0000_0005.exr",
        ]
    );
}

#[test]
fn detection_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    for frame in 0..2 {
        put_ref(&staging, "current", frame, 9);
        put_ref(&staging, "envLight", frame, 8 + frame);
        put_ref(&staging, "emissive", frame, 9);
    }
    let first = detect_resume(&staging, &ready(2)).unwrap();
    let second = detect_resume(&staging, &ready(2)).unwrap();
    assert_eq!(first.next, SampleIndex(9));
    assert_eq!(second.next, first.next);
}

#[test]
fn incomplete_state_restarts_and_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    put_ref(&staging, "current", 0, 5);
    put_ref(&staging, "envLight", 0, 5);

    let point = detect_resume(&staging, &ready(1)).unwrap();
    assert_eq!(point.next, SampleIndex(0));
    assert_eq!(
        point.decision,
        ResumeDecision::Restarted {
            found: 2,
            expected: 3
        }
    );
    assert!(staging.list().unwrap().is_empty());
    assert_eq!(detect_resume(&staging, &ready(1)).unwrap().next, SampleIndex(0));
}

#[test]
fn duplicated_pairs_do_not_count_as_complete() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    put_ref(&staging, "current", 0, 5);
    put_ref(&staging, "current", 0, 6);
    put_ref(&staging, "emissive", 0, 5);
    let point = detect_resume(&staging, &ready(1)).unwrap();
    assert_eq!(point.next, SampleIndex(0));
}

#[test]
fn leftover_staged_samples_are_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    for ch in ["current", "envLight", "emissive"] {
        put_ref(&staging, ch, 0, 3);
    }
    let staged = naming::staged_file_name("current", FrameIndex(0), SampleIndex(4));
    staging
        .write(&staged, &Raster::filled(1, 1, 3, 0.0).unwrap())
        .unwrap();
    let point = detect_resume(&staging, &ready(1)).unwrap();
    assert_eq!(point.next, SampleIndex(4));
    assert!(!staging.exists(&staged));
}

#[test]
fn completion_is_reported_against_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let staging = RasterStore::new(dir.path());
    for ch in ["current", "envLight", "emissive"] {
        put_ref(&staging, ch, 0, 63);
    }
    let r = ready(1);
    assert!(detect_resume(&staging, &r).unwrap().is_complete(&r));
}
