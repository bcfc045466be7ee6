use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use pixelwipe::{
    BufferSurface, IntersectionEntry, ScrollGeometry, ScrollKey, StepOutcome, WipeConfig,
    WipeSession,
};

#[derive(Parser, Debug)]
#[command(name = "pixelwipe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the converged wipe at one progress value as a PNG.
    Frame(FrameArgs),
    /// Render a scripted 0 → 1 scroll sweep as numbered PNG frames.
    Sweep(SweepArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Source image (any format the image crate decodes).
    #[arg(long)]
    image: PathBuf,

    /// Scroll position as a fraction of the scrollable length, in [0,1].
    #[arg(long)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Wipe configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SweepArgs {
    /// Source image (any format the image crate decodes).
    #[arg(long)]
    image: PathBuf,

    /// Output directory for frame_0000.png, frame_0001.png, ...
    #[arg(long)]
    out_dir: PathBuf,

    /// Number of progress steps from 0 to 1.
    #[arg(long, default_value_t = 60)]
    steps: u32,

    /// Wipe configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Sweep(args) => cmd_sweep(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<WipeConfig> {
    let Some(path) = path else {
        return Ok(WipeConfig::default());
    };
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let config: WipeConfig =
        serde_json::from_reader(BufReader::new(f)).context("parse config JSON")?;
    Ok(config)
}

fn open_session(
    image_path: &Path,
    config: WipeConfig,
) -> anyhow::Result<(WipeSession<BufferSurface>, f64)> {
    let image = image::open(image_path)
        .with_context(|| format!("decode image '{}'", image_path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let frame_interval = 1000.0 / f64::from(config.options.frames_per_second);

    let mut session = WipeSession::new(config).context("invalid wipe configuration")?;
    session.measure(width, height).context("measure container")?;
    session
        .attach_surfaces(&image, BufferSurface::new(width, height))
        .context("attach surfaces")?;
    Ok((session, frame_interval))
}

/// Step until the engine converges, advancing a synthetic wall clock one
/// frame interval at a time.
fn settle(
    session: &mut WipeSession<BufferSurface>,
    clock_ms: &mut f64,
    frame_interval: f64,
) -> anyhow::Result<StepOutcome> {
    loop {
        let outcome = session.tick(*clock_ms)?;
        *clock_ms += frame_interval;
        match outcome {
            StepOutcome::Running | StepOutcome::Throttled => continue,
            _ => return Ok(outcome),
        }
    }
}

fn save_frame(session: &WipeSession<BufferSurface>, path: &Path) -> anyhow::Result<()> {
    let frame = session
        .display()
        .context("session has no attached display")?
        .frame();
    let buffer = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame buffer has the wrong length")?;
    buffer
        .save(path)
        .with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.progress),
        "--progress must be within [0,1]"
    );
    let config = read_config(args.config.as_deref())?;
    let (mut session, frame_interval) = open_session(&args.image, config)?;

    let geometry = session.geometry().context("session is not measured")?;
    let mut clock_ms = 0.0;
    session.observe(&scroll_batch(geometry, args.progress))?;
    settle(&mut session, &mut clock_ms, frame_interval)?;
    save_frame(&session, &args.out)?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_sweep(args: SweepArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.steps > 0, "--steps must be > 0");
    let config = read_config(args.config.as_deref())?;
    let (mut session, frame_interval) = open_session(&args.image, config)?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create '{}'", args.out_dir.display()))?;

    let geometry = session.geometry().context("session is not measured")?;
    let mut clock_ms = 0.0;
    for step in 0..=args.steps {
        let fraction = f64::from(step) / f64::from(args.steps);
        session.observe(&scroll_batch(geometry, fraction))?;
        settle(&mut session, &mut clock_ms, frame_interval)?;
        let path = args.out_dir.join(format!("frame_{step:04}.png"));
        save_frame(&session, &path)?;
    }
    println!(
        "wrote {} frames to {}",
        args.steps + 1,
        args.out_dir.display()
    );
    Ok(())
}

/// Synthesize the intersection batch a real viewport would report at one
/// scroll position. The scrollable content is a container-height top
/// sentinel, `box_count` boxes, and a container-height bottom sentinel;
/// `fraction` sweeps the viewport across the whole scrollable length.
fn scroll_batch(geometry: ScrollGeometry, fraction: f64) -> Vec<IntersectionEntry> {
    let ch = geometry.container_height;
    let bh = geometry.box_height;
    let boxes_span = bh * geometry.box_count as f64;
    let y = fraction.clamp(0.0, 1.0) * (ch + boxes_span);
    let viewport = (y, y + ch);

    let overlap = |a: f64, b: f64| -> f64 { (b.min(viewport.1) - a.max(viewport.0)).max(0.0) };

    let mut entries = vec![
        IntersectionEntry {
            key: ScrollKey::Top,
            is_intersecting: overlap(0.0, ch) > 0.0,
            intersection_ratio: overlap(0.0, ch) / ch,
        },
        IntersectionEntry {
            key: ScrollKey::Bottom,
            is_intersecting: overlap(ch + boxes_span, 2.0 * ch + boxes_span) > 0.0,
            intersection_ratio: overlap(ch + boxes_span, 2.0 * ch + boxes_span) / ch,
        },
    ];
    for index in 0..geometry.box_count {
        let a = ch + index as f64 * bh;
        let o = overlap(a, a + bh);
        entries.push(IntersectionEntry {
            key: ScrollKey::Box(index),
            is_intersecting: o > 0.0,
            intersection_ratio: o / bh,
        });
    }
    entries
}
