use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cutline::captions::{extract_window, render};
use cutline::chunking::{reconcile, CommandJudge, Judge};
use cutline::cli::{
    load_candidates, load_cues, load_job_input, CaptionArgs, Cli, Command, PlanArgs,
    ReconcileArgs, RunArgs,
};
use cutline::jobs::DirectoryJobRepository;
use cutline::pipeline::{Pipeline, ProcessingMode};
use cutline::planning::plan_cut_points;
use cutline::signals::SignalIndex;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Plan(args) => handle_plan(&args),
        Command::Captions(args) => handle_captions(&args),
        Command::Reconcile(args) => handle_reconcile(&args),
        Command::Run(args) => handle_run(&args).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_plan(args: &PlanArgs) -> Result<()> {
    let config = args.config.resolve()?;
    let input = load_job_input(&args.input)?;
    let duration = input.total_duration();
    ensure!(
        duration.is_finite() && duration > 0.0,
        "Timeline duration must be positive, got {}",
        duration
    );

    println!("Input:    {:?}", args.input);
    println!("Duration: {:.3} seconds", duration);
    println!(
        "Clip length: {}-{}s (ideal {}s)",
        config.planner.min_duration, config.planner.max_duration, config.planner.ideal_duration
    );

    let signals = SignalIndex::from_input(&input);
    let points = plan_cut_points(&signals, &config.planner, &config.weights, duration);
    for (i, span) in points.spans().iter().enumerate() {
        println!(
            "   Clip {:03}: {:.3}s → {:.3}s ({:.1}s)",
            i + 1,
            span.start,
            span.end,
            span.duration()
        );
    }

    if let Some(path) = &args.output {
        write_json(path, &points)?;
        println!("Wrote {} cut points to {:?}", points.points.len(), path);
    }
    Ok(())
}

fn handle_captions(args: &CaptionArgs) -> Result<()> {
    let (start, end) = args.clip_range()?;
    let cues = load_cues(&args.cues, args.cue_format)?;
    let clip = extract_window(&cues, start, end);
    let document = render(&clip, args.format.into(), args.words_per_line);

    match &args.output {
        Some(path) => {
            fs::write(path, &document.body)
                .with_context(|| format!("Failed to write captions to {:?}", path))?;
            println!(
                "Wrote {} cues ({:.3}s → {:.3}s) to {:?}",
                document.cue_count, start, end, path
            );
        }
        None => print!("{}", document.body),
    }
    Ok(())
}

fn handle_reconcile(args: &ReconcileArgs) -> Result<()> {
    ensure!(args.proximity >= 0.0, "Proximity must be non-negative");
    ensure!(args.max_clips > 0, "max-clips must be at least 1");
    let pooled = load_candidates(&args.candidates)?;
    let total = pooled.len();
    let kept = reconcile(pooled, args.proximity, args.max_clips);
    println!("Kept {} of {} candidates", kept.len(), total);
    for candidate in &kept {
        println!(
            "   {:.3}s → {:.3}s  score {:.2}",
            candidate.span.start, candidate.span.end, candidate.score
        );
    }
    if let Some(path) = &args.output {
        write_json(path, &kept)?;
    }
    Ok(())
}

async fn handle_run(args: &RunArgs) -> Result<()> {
    let mut config = args.config.resolve()?;
    if let Some(max) = args.max_clips {
        ensure!(max > 0, "max-clips must be at least 1");
        config.chunking.max_clips = max;
    }
    let mode = ProcessingMode::from(args.mode);

    let mut input = load_job_input(&args.input)?;
    if let (Some(path), Some(format)) = (&args.cues, args.cue_format) {
        input.cues = load_cues(path, format)?;
    }

    let judge = match (&args.judge_cmd, mode.needs_judge()) {
        (Some(command), _) => Some(
            CommandJudge::from_command_line(command)
                .with_context(|| format!("Judge command '{}' is empty", command))?,
        ),
        (None, true) => bail!("Mode {:?} needs a judge; pass --judge-cmd", mode),
        (None, false) => None,
    };

    if args.output_dir.exists() && !args.output_dir.is_dir() {
        bail!("Output path must be a directory: {:?}", args.output_dir);
    }
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", args.output_dir))?;

    let jobs = Arc::new(DirectoryJobRepository::new(args.output_dir.join("jobs")));
    let job_id = args.job_id(|id| jobs.record_path(id).exists());
    println!("cutline v0.1.0");
    println!("Input:  {:?}", args.input);
    println!("Output dir: {:?}", args.output_dir);
    println!("Job: {} ({:?} mode)", job_id, mode);

    let pipeline = Pipeline::new(config, jobs).context("Invalid pipeline configuration")?;
    let output = pipeline
        .run(&job_id, &input, mode, judge.as_ref().map(|j| j as &dyn Judge))
        .await?;

    for warning in &output.warnings {
        eprintln!("   Warning: {}", warning);
    }
    let extension = pipeline.config().captions.format.extension();
    for clip in &output.clips {
        let path = args
            .output_dir
            .join(format!("clip_{:03}.{}", clip.number, extension));
        fs::write(&path, &clip.captions.body)
            .with_context(|| format!("Failed to write captions for clip {}", clip.number))?;
        println!(
            "   Clip {:03}: {:.3}s → {:.3}s, {} cues → {:?}",
            clip.number, clip.clip_span.start, clip.clip_span.end, clip.captions.cue_count, path
        );
    }

    let plan_path = args.output_dir.join("plan.json");
    write_json(&plan_path, &output)?;
    println!("\n✓ Wrote {} clips and {:?}", output.clips.len(), plan_path);
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    fs::write(path, body).with_context(|| format!("Failed to write {:?}", path))
}
