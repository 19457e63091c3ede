use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use rand::{Rng as _, SeedableRng as _};

use annostack::{
    AnnotationMeta, BoundingBox, ComposeStrategy, ComposeThreading, Compositor, CompositorOpts,
    Layer, LayerStack, Mask, PixelBuffer, Shape, StackOpts, mask_to_layer,
};

#[derive(Parser, Debug)]
#[command(name = "annostack", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push random filled circles and time a composite after every push.
    Bench(BenchArgs),
    /// Flatten mask annotations over a base image and write a PNG.
    Flatten(FlattenArgs),
}

#[derive(Parser, Debug)]
struct BenchArgs {
    /// Image width in pixels.
    #[arg(long, default_value_t = 2000)]
    width: usize,

    /// Image height in pixels.
    #[arg(long, default_value_t = 1500)]
    height: usize,

    /// Overlay layers to push.
    #[arg(long, default_value_t = 200)]
    layers: usize,

    /// Composite routine run after each push.
    #[arg(long, value_enum, default_value_t = StrategyChoice::Cached)]
    strategy: StrategyChoice,

    /// Disable the worker pool.
    #[arg(long)]
    serial: bool,

    /// Explicit worker thread count.
    #[arg(long)]
    threads: Option<usize>,

    /// RNG seed for circle placement.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print a timing line every N pushes (0 = only the summary).
    #[arg(long, default_value_t = 25)]
    report_every: usize,
}

#[derive(Parser, Debug)]
struct FlattenArgs {
    /// Base image (any format the `image` crate decodes).
    #[arg(long)]
    base: PathBuf,

    /// JSON list of annotations, bottom to top.
    #[arg(long)]
    layers: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Stroke every annotation's bounding box on the output.
    #[arg(long)]
    boxes: bool,

    /// Stroke thickness used with `--boxes`.
    #[arg(long, default_value_t = 2)]
    thickness: usize,

    /// Write annotation metadata records here as a JSON list.
    #[arg(long)]
    meta: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyChoice {
    Full,
    Cached,
    Regions,
}

impl From<StrategyChoice> for ComposeStrategy {
    fn from(choice: StrategyChoice) -> Self {
        match choice {
            StrategyChoice::Full => ComposeStrategy::Full,
            StrategyChoice::Cached => ComposeStrategy::Cached,
            StrategyChoice::Regions => ComposeStrategy::Regions,
        }
    }
}

/// One entry of the `--layers` file. Mask paths are relative to the file.
#[derive(Debug, serde::Deserialize)]
struct AnnotationSpec {
    mask: PathBuf,
    name: String,
    class_name: String,
    #[serde(default)]
    color: Option<[u8; 3]>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Bench(args) => cmd_bench(args),
        Command::Flatten(args) => cmd_flatten(args),
    }
}

fn threading(serial: bool, threads: Option<usize>) -> ComposeThreading {
    ComposeThreading {
        parallel: !serial,
        threads,
        ..ComposeThreading::default()
    }
}

fn cmd_bench(args: BenchArgs) -> anyhow::Result<()> {
    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width/--height must be > 0");
    }

    let shape = Shape::new(args.height, args.width, 3)?;
    let base = PixelBuffer::filled(shape, &[0, 0, 255])?;
    let mut stack = LayerStack::new(base, StackOpts::default())?;
    let mut compositor = Compositor::for_stack(
        &stack,
        CompositorOpts {
            threading: threading(args.serial, args.threads),
        },
    )?;
    let strategy = ComposeStrategy::from(args.strategy);
    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);

    eprintln!(
        "bench: {}x{} layers={} strategy={:?} mode={}",
        args.width,
        args.height,
        args.layers,
        args.strategy,
        if args.serial { "serial" } else { "parallel" }
    );

    let mut times = Vec::with_capacity(args.layers);
    for i in 1..=args.layers {
        let layer = random_circle(&mut rng, shape)?;
        stack.push(layer)?;

        let t = Instant::now();
        let out = compositor.compose(&stack, strategy)?;
        let elapsed = t.elapsed();
        std::hint::black_box(out);
        times.push(elapsed);

        if args.report_every > 0 && i % args.report_every == 0 {
            let stats = compositor.last_cached_stats();
            eprintln!(
                "layer {i:04}: compose={:.3}ms capacity={} reallocations={} changed_hits={} rescans={}",
                elapsed.as_secs_f64() * 1000.0,
                stack.capacity(),
                stack.reallocations(),
                stats.changed_hits,
                stats.rescans,
            );
        }
    }

    report_percentiles(&times);
    Ok(())
}

// Filled circle with a random non-zero colour, clipped to the buffer.
fn random_circle(rng: &mut rand::rngs::StdRng, shape: Shape) -> anyhow::Result<Layer> {
    let cy = rng.gen_range(0..shape.height) as i64;
    let cx = rng.gen_range(0..shape.width) as i64;
    let radius: i64 = rng.gen_range(5..=50);
    let color = [
        rng.gen_range(1..=255u8),
        rng.gen_range(1..=255u8),
        rng.gen_range(1..=255u8),
    ];

    let h = shape.height as i64;
    let w = shape.width as i64;
    let bbox = BoundingBox::from_signed(
        (cy - radius).max(0),
        (cx - radius).max(0),
        (cy + radius + 1).min(h),
        (cx + radius + 1).min(w),
    )?;

    let mut pixels = PixelBuffer::new(shape)?;
    for r in bbox.rows() {
        for c in bbox.cols() {
            let (dy, dx) = (r as i64 - cy, c as i64 - cx);
            if dy * dy + dx * dx <= radius * radius {
                pixels.set_pixel(r, c, &color)?;
            }
        }
    }
    Ok(Layer::new(pixels, bbox))
}

fn report_percentiles(times: &[Duration]) {
    fn p(v: &[Duration], p: f64) -> Duration {
        if v.is_empty() {
            return Duration::ZERO;
        }
        let n = v.len();
        let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
        v[rank - 1]
    }

    let mut v = times.to_vec();
    v.sort_by_key(|d| d.as_nanos());
    let total: Duration = v.iter().sum();
    eprintln!(
        "\ncompose across {} pushes: total={:.3}s p50={:.3}ms p90={:.3}ms p99={:.3}ms",
        v.len(),
        total.as_secs_f64(),
        p(&v, 0.50).as_secs_f64() * 1000.0,
        p(&v, 0.90).as_secs_f64() * 1000.0,
        p(&v, 0.99).as_secs_f64() * 1000.0,
    );
}

fn read_annotations(path: &Path) -> anyhow::Result<Vec<AnnotationSpec>> {
    let f = File::open(path).with_context(|| format!("open layers '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| "parse layers JSON")
}

fn load_mask(path: &Path, shape: Shape) -> anyhow::Result<Mask> {
    let img = image::open(path)
        .with_context(|| format!("decode mask '{}'", path.display()))?
        .into_luma8();
    if img.width() as usize != shape.width || img.height() as usize != shape.height {
        anyhow::bail!(
            "mask '{}' is {}x{}, base image is {}x{}",
            path.display(),
            img.height(),
            img.width(),
            shape.height,
            shape.width
        );
    }
    Ok(Mask::from_bytes(shape.height, shape.width, img.as_raw())?)
}

fn cmd_flatten(args: FlattenArgs) -> anyhow::Result<()> {
    let base = image::open(&args.base)
        .with_context(|| format!("decode base image '{}'", args.base.display()))?;
    let base = PixelBuffer::from_dynamic(base);
    let shape = base.shape();

    let annotations = read_annotations(&args.layers)?;
    let mask_root = args.layers.parent().unwrap_or_else(|| Path::new("."));

    let mut stack = LayerStack::new(base, StackOpts::default())?;
    let mut metas = Vec::with_capacity(annotations.len());
    for a in &annotations {
        let mask = load_mask(&mask_root.join(&a.mask), shape)?;
        let layer = mask_to_layer(&mask, shape.channels, a.color.as_ref().map(|c| &c[..]))
            .with_context(|| format!("annotation '{}'", a.name))?;
        let index = stack.push(layer)?;
        metas.push(AnnotationMeta::for_layer(
            &a.name,
            &a.class_name,
            &stack.layer_at(index)?,
            shape,
        ));
    }

    let mut compositor = Compositor::for_stack(&stack, CompositorOpts::default())?;
    let mut out = compositor.compose(&stack, ComposeStrategy::Regions)?;
    if args.boxes {
        compositor.draw_boxes(&mut out, stack.overlay_bounds(), &[255, 255, 0], args.thickness)?;
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    out.to_rgb8()?
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());

    if let Some(meta_path) = &args.meta {
        let json = serde_json::to_string_pretty(&metas).with_context(|| "serialize metadata")?;
        std::fs::write(meta_path, json)
            .with_context(|| format!("write metadata '{}'", meta_path.display()))?;
        eprintln!("wrote {}", meta_path.display());
    }
    Ok(())
}
