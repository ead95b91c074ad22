use std::path::PathBuf;

use super::*;
use crate::store::raster::Raster;

fn put(store: &RasterStore, name: &str, value: f32, components: usize) {
    let r = Raster::filled(2, 2, components, value).unwrap();
    store.write(name, &r).unwrap();
}

fn value(store: &RasterStore, name: &str) -> f32 {
    store.read(name).unwrap().data[0]
}

fn scene(anim: [u32; 2]) -> SceneDef {
    SceneDef {
        name: "Staircase".into(),
        file: PathBuf::from("staircase.pyscene"),
        anim,
        keep_trailing_frames: false,
    }
}

fn reference() -> ReferenceConfig {
    ReferenceConfig {
        ready_set: vec!["current".into(), "envLight".into()],
        ..ReferenceConfig::default()
    }
}

#[test]
fn input_splits_accumulates_and_purges_after_last_sample() {
    let dir = tempfile::tempdir().unwrap();
    let out = RasterStore::new(dir.path());
    let pool = WorkerPool::new(2).unwrap();
    let scene = scene([0, 1]);
    let reference = reference();
    let ctx = PostContext {
        out: &out,
        pool: &pool,
        scene: &scene,
        reference: &reference,
        samples_per_pixel: 2,
    };

    for (i, v) in [1.0f32, 3.0].into_iter().enumerate() {
        for f in 0..3 {
            put(&out, &format!("color_{f:04}.exr"), v, 3);
            put(&out, &format!("specRough_{f:04}.exr"), v, 4);
        }
        let report = postprocess(&ctx, Method::Input, SampleIndex(i as u32)).unwrap();
        assert!(report.batch.is_clean());
        if i == 0 {
            assert_eq!(report.purged, 0);
        } else {
            assert!(report.purged > 0);
        }
    }

    assert!((value(&out, "0001_color_0000.exr") - 2.0).abs() < 1e-6);
    assert!((value(&out, "0001_roughness_0001.exr") - 2.0).abs() < 1e-6);
    assert!(out.exists("0001_specularAlbedo_0000.exr"));
    assert!(!out.exists("specRough_0000.exr"));
    assert!(!out.exists("0001_color_0002.exr"));
}

#[test]
fn second_input_tags_channels() {
    let dir = tempfile::tempdir().unwrap();
    let out = RasterStore::new(dir.path());
    put(&out, "color_0005.exr", 1.0, 3);
    process_input_frame(&out, FrameIndex(5), SampleIndex(0), Some("2")).unwrap();
    assert_eq!(out.list().unwrap(), vec!["0000_color2_0005.exr"]);
}

#[test]
fn failing_frame_does_not_block_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let out = RasterStore::new(dir.path());
    let pool = WorkerPool::new(2).unwrap();
    let scene = scene([0, 2]);
    let reference = reference();
    let ctx = PostContext {
        out: &out,
        pool: &pool,
        scene: &scene,
        reference: &reference,
        samples_per_pixel: 4,
    };
    put(&out, "color_0000.exr", 1.0, 3);
    put(&out, "specRough_0000.exr", 1.0, 4);
    put(&out, "color_0001.exr", 1.0, 3);
    // Too few components to split.
    put(&out, "specRough_0001.exr", 1.0, 2);

    let report = postprocess(&ctx, Method::Input, SampleIndex(0)).unwrap();
    assert_eq!(report.batch.completed, 1);
    assert_eq!(report.batch.failures.len(), 1);
    assert_eq!(report.batch.failures[0].task, "frame 1");
    assert!(out.exists("0000_color_0000.exr"));
}

#[test]
fn reference_samples_are_staged_and_folded() {
    let dir = tempfile::tempdir().unwrap();
    let out = RasterStore::new(dir.path());
    let pool = WorkerPool::new(2).unwrap();
    let scene = scene([0, 0]);
    let reference = reference();
    let ctx = PostContext {
        out: &out,
        pool: &pool,
        scene: &scene,
        reference: &reference,
        samples_per_pixel: 2,
    };

    for (i, v) in [2.0f32, 4.0, 6.0].into_iter().enumerate() {
        for f in 0..2 {
            put(&out, &format!("current_{f:04}.exr"), v, 3);
            put(&out, &format!("envLight_{f:04}.exr"), v * 2.0, 3);
        }
        postprocess(&ctx, Method::RefRestir, SampleIndex(i as u32)).unwrap();
    }

    let staging = out.child(STAGING_DIR);
    assert_eq!(
        staging.list().unwrap(),
        vec![
            "ref_current_0000_0002.exr",
            "ref_current_0001_0002.exr",
            "ref_envLight_0000_0002.exr",
            "ref_envLight_0001_0002.exr",
        ]
    );
    assert!((value(&staging, "ref_current_0001_0002.exr") - 4.0).abs() < 1e-6);
    assert!((value(&staging, "ref_envLight_0000_0002.exr") - 8.0).abs() < 1e-6);
}

#[test]
fn multigbuf_extracts_depth_and_normalizes() {
    let dir = tempfile::tempdir().unwrap();
    let out = RasterStore::new(dir.path());
    let pool = WorkerPool::new(1).unwrap();
    let scene = scene([0, 0]);
    let reference = reference();
    let ctx = PostContext {
        out: &out,
        pool: &pool,
        scene: &scene,
        reference: &reference,
        samples_per_pixel: 1,
    };
    put(&out, "linearZ_multi_0000.exr", 7.0, 4);
    put(&out, "normal_multi_0000.exr", 2.0, 3);

    postprocess(&ctx, Method::MultiGbuf, SampleIndex(0)).unwrap();
    assert!(!out.exists("linearZ_multi_0000.exr"));
    let depth = out.read("depth_multi_0000.exr").unwrap();
    assert_eq!(depth.components, 1);
    assert!((depth.data[0] - 7.0).abs() < 1e-6);
    let n = out.read("normal_multi_0000.exr").unwrap();
    let len: f32 = n.pixel(0, 0).iter().map(|c| c * c).sum::<f32>().sqrt();
    assert!((len - 1.0).abs() < 1e-5);
}

#[test]
fn flatten_moves_final_reference_out_of_staging() {
    let dir = tempfile::tempdir().unwrap();
    let out = RasterStore::new(dir.path());
    let staging = out.child(STAGING_DIR);
    std::fs::create_dir_all(staging.root()).unwrap();
    put(&staging, "ref_current_0000_0009.exr", 1.0, 3);
    put(&staging, "ref_envLight_0000_0009.exr", 1.0, 3);
    put(&staging, "ref_current_0001_0009.exr", 1.0, 3);

    let channels = vec!["current".to_string(), "envLight".to_string()];
    let moved = flatten_reference(&out, &channels, SampleIndex(9)).unwrap();
    assert_eq!(moved, 3);
    assert!(out.exists("ref_current_0000.exr"));
    assert!(out.exists("ref_envLight_0000.exr"));
    assert!(out.exists("ref_current_0001.exr"));
    assert!(!staging.root().exists());
}
