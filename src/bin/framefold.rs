use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use framefold::{
    BuildOutcome, DEFAULT_CONFIG_FILE, Method, ProcessRenderer, RunConfig, RunController,
    RunOptions, SceneRegistry, run_build,
};

#[derive(Parser, Debug)]
#[command(
    name = "framefold",
    version,
    about = "Render scenes sample by sample and fold the samples into converged datasets"
)]
struct Cli {
    /// Run configuration JSON. Defaults to `framefold.json` when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip building the renderer.
    #[arg(long)]
    nobuild: bool,

    /// Build the renderer, print the build output and exit.
    #[arg(long)]
    buildonly: bool,

    /// Render without post-processing the samples.
    #[arg(long)]
    nopostprocessing: bool,

    /// Methods to run for every scene, in order.
    #[arg(long, num_args = 1.., value_parser = parse_method)]
    methods: Vec<Method>,

    /// Dataset directory finished scenes are moved into.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Queue finished datasets for transfer to bulk storage.
    #[arg(long)]
    bulk: bool,

    /// Live preview: no capture, no post-processing, stop after the first method.
    #[arg(long)]
    interactive: bool,

    /// Launch the renderer once without a script and exit.
    #[arg(long)]
    launch_only: bool,

    /// Wait for queued bulk transfers before exiting.
    #[arg(long)]
    wait_transfers: bool,

    /// Debug-level logging unless `RUST_LOG` is set.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_method(s: &str) -> Result<Method, String> {
    s.parse::<Method>().map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = load_config(&cli)?;

    if cli.launch_only {
        let renderer = ProcessRenderer::new(cfg.renderer.clone(), cfg.params_path());
        let status = renderer.launch_interactive()?;
        tracing::info!(%status, "renderer exited");
        return Ok(());
    }

    if !cli.nobuild || cli.buildonly {
        match run_build(&cfg.build)? {
            BuildOutcome::Skipped => tracing::info!("no build command configured"),
            BuildOutcome::Succeeded { output } => {
                tracing::info!("build done");
                if cli.buildonly {
                    print!("{output}");
                    return Ok(());
                }
            }
            BuildOutcome::Failed { code, output } => {
                print!("{output}");
                tracing::error!(?code, "build failed");
                std::process::exit(1);
            }
        }
        if cli.buildonly {
            return Ok(());
        }
    } else {
        tracing::info!("build skipped");
    }

    let scenes = SceneRegistry::load(&cfg.scenes, &cfg.scene_base())?;
    let names: Vec<&str> = scenes.iter().map(|s| s.name.as_str()).collect();
    tracing::info!(
        "generating at {} for scenes {:?}",
        cfg.dataset_root.display(),
        names
    );

    let opts = RunOptions {
        methods: cli.methods.clone(),
        postprocess: !cli.nopostprocessing,
        interactive: cli.interactive,
        bulk: cli.bulk,
    };
    let renderer = ProcessRenderer::new(cfg.renderer.clone(), cfg.params_path());
    let mut controller = RunController::new(cfg, scenes, opts, renderer)?;
    let summary = controller.run()?;

    for m in &summary.methods {
        tracing::info!(
            scene = %m.scene,
            method = %m.method,
            samples = m.rendered.len(),
            attempts = m.attempts,
            failed_frames = m.failed_frames,
            "method finished"
        );
    }
    if cli.wait_transfers
        && let Some(queue) = controller.transfers()
    {
        tracing::info!("waiting for bulk transfers");
        let stats = queue.wait_idle();
        tracing::info!(completed = stats.completed, failed = stats.failed, "transfers drained");
    }
    tracing::info!("done");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<RunConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut cfg = if cli.config.is_some() {
        RunConfig::load(&path)?
    } else {
        RunConfig::load_or_default(&path)?
    };

    let abs = std::path::absolute(&path)
        .with_context(|| format!("resolve config path '{}'", path.display()))?;
    let config_dir = abs.parent().unwrap_or_else(|| Path::new("."));
    cfg.resolve_paths(config_dir);
    // `--dir` is relative to the working directory, not the config file.
    if let Some(dir) = &cli.dir {
        cfg.dataset_root = std::path::absolute(dir)
            .with_context(|| format!("resolve dataset dir '{}'", dir.display()))?;
    }
    Ok(cfg)
}
