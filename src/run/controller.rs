//! Sequences scenes, methods and samples, and owns the renderer working directory.
//!
//! Per (scene, method) the controller walks
//! `Configuring -> Rendering(i) -> PostProcessing(i) -> Rendering(i + 1) ...`; once every method
//! of a scene is done it finalizes the working directory into the dataset and optionally queues a
//! transfer to bulk storage.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context as _;

use crate::foundation::core::SampleIndex;
use crate::foundation::error::{FoldError, FoldResult};
use crate::process::resume::{ReadySet, ResumePoint, detect_resume};
use crate::render::invoker::{Renderer, render_with_retry};
use crate::render::params::RenderParams;
use crate::run::config::RunConfig;
use crate::run::method::{Method, SampleLoop};
use crate::run::postprocess::{PostContext, STAGING_DIR, flatten_reference, postprocess};
use crate::run::scenes::{SceneDef, SceneRegistry};
use crate::schedule::pool::WorkerPool;
use crate::store::exr_io::RasterStore;
use crate::transfer::mover::move_dir_contents;
use crate::transfer::queue::{TransferJob, TransferQueue};

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub methods: Vec<Method>,
    /// Run per-sample post-processing. Reference accumulation always stages its samples.
    pub postprocess: bool,
    /// Live preview: no post-processing, stop after the first method of the first scene.
    pub interactive: bool,
    /// Queue finished datasets for transfer to bulk storage.
    pub bulk: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Configuring,
    Rendering(SampleIndex),
    PostProcessing(SampleIndex),
    Finalizing,
    Transferring,
}

/// Seeds handed out for one (scene, method). A seed may only ever belong to one sample.
#[derive(Clone, Debug, Default)]
pub struct SeedLedger {
    seeds: HashMap<u64, SampleIndex>,
}

impl SeedLedger {
    pub fn record(&mut self, seed: u64, sample: SampleIndex) -> FoldResult<()> {
        match self.seeds.get(&seed) {
            Some(&owner) if owner != sample => Err(FoldError::validation(format!(
                "seed {seed} already used by sample {}, refusing to reuse it for sample {}",
                owner.0, sample.0
            ))),
            Some(_) => Ok(()),
            None => {
                self.seeds.insert(seed, sample);
                Ok(())
            }
        }
    }

    pub fn clear(&mut self) {
        self.seeds.clear();
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodReport {
    pub scene: String,
    pub method: Method,
    /// Reference accumulation only.
    pub resume: Option<ResumePoint>,
    /// Samples rendered successfully, in order.
    pub rendered: Vec<SampleIndex>,
    /// Renderer invocations including retries.
    pub attempts: u32,
    /// Post-processing passes that ran.
    pub postprocessed: Vec<SampleIndex>,
    pub failed_frames: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub methods: Vec<MethodReport>,
    /// Dataset directories written.
    pub finalized: Vec<PathBuf>,
    pub transfers_queued: usize,
    /// Interactive runs stop after their first method.
    pub stopped_early: bool,
}

pub struct RunController<R: Renderer> {
    cfg: RunConfig,
    scenes: SceneRegistry,
    opts: RunOptions,
    renderer: R,
    pool: WorkerPool,
    out: RasterStore,
    transfers: Option<TransferQueue>,
    ledger: SeedLedger,
    phase: Phase,
}

impl<R: Renderer> RunController<R> {
    pub fn new(
        cfg: RunConfig,
        scenes: SceneRegistry,
        mut opts: RunOptions,
        renderer: R,
    ) -> FoldResult<Self> {
        cfg.validate()?;
        if opts.interactive {
            opts.postprocess = false;
        }
        if opts.bulk && cfg.bulk_storage_root.is_none() {
            return Err(FoldError::validation(
                "bulk transfer requested but bulk_storage_root is not configured",
            ));
        }

        let out = RasterStore::new(cfg.output_dir.clone()).with_compression(cfg.compression);
        ensure_dir(&cfg.output_dir)?;
        let pool = WorkerPool::from_config(cfg.workers)?;
        let transfers = if opts.bulk {
            Some(TransferQueue::spawn()?)
        } else {
            None
        };

        Ok(Self {
            cfg,
            scenes,
            opts,
            renderer,
            pool,
            out,
            transfers,
            ledger: SeedLedger::default(),
            phase: Phase::Idle,
        })
    }

    /// Replace the post-processing pool.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn transfers(&self) -> Option<&TransferQueue> {
        self.transfers.as_ref()
    }

    pub fn run(&mut self) -> FoldResult<RunSummary> {
        let mut summary = RunSummary::default();
        let scenes: Vec<SceneDef> = self.scenes.iter().cloned().collect();
        tracing::info!(
            scenes = scenes.len(),
            dataset = %self.cfg.dataset_root.display(),
            "starting run"
        );

        for scene in &scenes {
            for &method in &self.opts.methods.clone() {
                let report = self.run_method(scene, method)?;
                summary.methods.push(report);
                if self.opts.interactive {
                    summary.stopped_early = true;
                    self.enter(Phase::Idle);
                    return Ok(summary);
                }
            }

            if let Some(dest) = self.finalize(scene)? {
                if self.queue_transfer(scene, &dest)? {
                    summary.transfers_queued += 1;
                }
                summary.finalized.push(dest);
            }
            self.enter(Phase::Idle);
        }
        Ok(summary)
    }

    #[tracing::instrument(skip(self, scene), fields(scene = %scene.name))]
    fn run_method(&mut self, scene: &SceneDef, method: Method) -> FoldResult<MethodReport> {
        self.enter(Phase::Configuring);
        ensure_dir(&self.cfg.output_dir)?;
        self.ledger.clear();

        let mut report = MethodReport {
            scene: scene.name.clone(),
            method,
            resume: None,
            rendered: Vec::new(),
            attempts: 0,
            postprocessed: Vec::new(),
            failed_frames: 0,
        };

        match method.sample_loop() {
            SampleLoop::Standard => {
                for i in 0..self.cfg.samples_per_pixel {
                    let sample = SampleIndex(i);
                    self.render_sample(scene, method, sample, &mut report)?;
                    if self.opts.postprocess {
                        self.postprocess_sample(scene, method, sample, &mut report);
                    }
                }
            }
            SampleLoop::Reference => self.run_reference(scene, method, &mut report)?,
            SampleLoop::Single => {
                let sample = SampleIndex(0);
                self.render_sample(scene, method, sample, &mut report)?;
                if self.opts.postprocess {
                    self.postprocess_sample(scene, method, sample, &mut report);
                }
            }
        }
        Ok(report)
    }

    fn run_reference(
        &mut self,
        scene: &SceneDef,
        method: Method,
        report: &mut MethodReport,
    ) -> FoldResult<()> {
        let reference = &self.cfg.reference;
        let ready = ReadySet {
            channels: reference.ready_set.clone(),
            frame_count: scene.frame_count().saturating_add(reference.trailing_frames) as usize,
            start: reference.start(),
            target: reference.target(),
        };
        let flatten = reference.flatten_on_finish;
        let staging = self.out.child(STAGING_DIR);

        let resume = detect_resume(&staging, &ready)?;
        tracing::info!(next = resume.next.0, decision = ?resume.decision, "reference resume point");
        let mut sample = resume.next;
        report.resume = Some(resume);

        while sample < ready.target {
            self.render_sample(scene, method, sample, report)?;
            self.postprocess_sample(scene, method, sample, report);
            sample = sample.next();
        }

        if flatten
            && staging.root().is_dir()
            && let Some(last) = sample.prev()
        {
            let moved = flatten_reference(&self.out, &ready.channels, last)?;
            tracing::info!(moved, "reference rasters flattened");
        }
        Ok(())
    }

    fn render_sample(
        &mut self,
        scene: &SceneDef,
        method: Method,
        sample: SampleIndex,
        report: &mut MethodReport,
    ) -> FoldResult<()> {
        self.enter(Phase::Rendering(sample));
        let seed = method.seed(sample, self.cfg.second_input_seed_offset);
        self.ledger.record(seed, sample)?;
        let params = self.params(scene, method, sample, seed);

        tracing::info!("rendering sample {}", sample.0);
        let attempts = render_with_retry(&mut self.renderer, &params, &self.cfg.retry)?;
        report.attempts = report.attempts.saturating_add(attempts);
        report.rendered.push(sample);
        Ok(())
    }

    fn postprocess_sample(
        &mut self,
        scene: &SceneDef,
        method: Method,
        sample: SampleIndex,
        report: &mut MethodReport,
    ) {
        self.enter(Phase::PostProcessing(sample));
        let ctx = PostContext {
            out: &self.out,
            pool: &self.pool,
            scene,
            reference: &self.cfg.reference,
            samples_per_pixel: self.cfg.samples_per_pixel,
        };
        match postprocess(&ctx, method, sample) {
            Ok(post) => report.failed_frames += post.batch.failures.len(),
            Err(e) => {
                tracing::error!("post-processing sample {} failed: {e}", sample.0);
                report.failed_frames += 1;
            }
        }
        report.postprocessed.push(sample);
        tracing::info!("sample {} done", sample.0);
    }

    fn params(
        &self,
        scene: &SceneDef,
        method: Method,
        sample: SampleIndex,
        seed: u64,
    ) -> RenderParams {
        let interactive = self.opts.interactive;
        RenderParams {
            name: scene.name.clone(),
            file: scene.file.clone(),
            anim: scene.anim,
            method: method.name().to_string(),
            out_dir: (!interactive).then(|| self.out.root().to_path_buf()),
            interactive,
            ref_count: if interactive {
                self.cfg.ref_count_interactive
            } else {
                self.cfg.ref_count
            },
            seed_offset: seed,
            sample_index: sample.0,
            multigbuf_count: self.cfg.multigbuf_count,
        }
    }

    /// Move the working directory's contents into `<dataset_root>/<scene>`.
    fn finalize(&mut self, scene: &SceneDef) -> FoldResult<Option<PathBuf>> {
        if !self.out.root().is_dir() {
            return Ok(None);
        }
        self.enter(Phase::Finalizing);
        let dest = self.cfg.dataset_root.join(&scene.name);
        tracing::info!("moving to {}", dest.display());
        let moved = move_dir_contents(self.out.root(), &dest)?;
        tracing::debug!(moved, "finalized");
        Ok(Some(dest))
    }

    fn queue_transfer(&mut self, scene: &SceneDef, dest: &std::path::Path) -> FoldResult<bool> {
        let (Some(queue), Some(root)) = (&self.transfers, &self.cfg.bulk_storage_root) else {
            return Ok(false);
        };
        let dataset = self
            .cfg
            .dataset_root
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.cfg.dataset_root.clone());
        let job = TransferJob {
            source: dest.to_path_buf(),
            destination: root.join(dataset).join(&scene.name),
        };
        tracing::info!("queueing transfer to {}", job.destination.display());
        queue.enqueue(job)?;
        self.enter(Phase::Transferring);
        Ok(true)
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "phase");
        self.phase = phase;
    }
}

fn ensure_dir(path: &std::path::Path) -> FoldResult<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("create output dir '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/run/controller.rs"]
mod tests;
