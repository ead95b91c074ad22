//! framefold drives an external offline renderer one sample at a time and folds every new
//! sample into a running per-pixel mean on disk.
//!
//! # Pipeline overview
//!
//! 1. **Render**: launch the renderer with a fresh parameter surface ([`RenderParams`]) and retry
//!    the same sample until it succeeds ([`render_with_retry`]).
//! 2. **Post-process**: split packed channels and accumulate the new sample, one frame per task
//!    on a bounded [`WorkerPool`].
//! 3. **Resume**: after an interruption, recover the next sample index from file names alone
//!    ([`detect_resume`]).
//! 4. **Finalize**: move the working directory into the dataset and optionally queue a move to
//!    bulk storage ([`TransferQueue`]).
//!
//! All progress lives in the file names of the rasters, so killing the process at any point and
//! starting again is safe.
#![forbid(unsafe_code)]

pub mod foundation {
    pub mod core;
    pub mod error;
}

pub mod store {
    pub mod exr_io;
    pub mod naming;
    pub mod raster;
}

pub mod process {
    pub mod accumulate;
    pub mod frames;
    pub mod resume;
    pub mod split;
}

pub mod render {
    pub mod invoker;
    pub mod params;
}

pub mod schedule {
    pub mod pool;
}

pub mod transfer {
    pub mod mover;
    pub mod queue;
}

pub mod run {
    pub mod build;
    pub mod config;
    pub mod controller;
    pub mod method;
    pub mod postprocess;
    pub mod scenes;
}

pub use foundation::core::{FrameIndex, FrameRange, SampleIndex};
pub use foundation::error::{FoldError, FoldResult};
pub use process::accumulate::{ChannelRole, FoldOutcome, fold_frame, fold_sample};
pub use process::resume::{ReadySet, ResumeDecision, ResumePoint, detect_resume};
pub use process::split::{SplitRule, split_frame};
pub use render::invoker::{
    ProcessRenderer, RenderOutcome, Renderer, RendererConfig, RetryPolicy, render_with_retry,
};
pub use render::params::{ParamSurface, ParamsFormat, RenderParams};
pub use run::build::{BuildOutcome, run_build};
pub use run::config::{BuildConfig, DEFAULT_CONFIG_FILE, ReferenceConfig, RunConfig};
pub use run::controller::{MethodReport, Phase, RunController, RunOptions, RunSummary, SeedLedger};
pub use run::method::{Method, SampleLoop};
pub use run::scenes::{SceneDef, SceneRegistry};
pub use schedule::pool::{BatchReport, PoolConfig, WorkerPool};
pub use store::exr_io::{RasterCompression, RasterStore};
pub use store::raster::Raster;
pub use transfer::queue::{DirectoryMover, FsMover, TransferJob, TransferQueue, TransferStats};
