// ── spritecut command line ───────────────────────────────────────────────────

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spritecut::config::Config;
use spritecut::explorer::{ExplorerSession, SheetLayout};
use spritecut::grid::{GridSpec, TileSize};
use spritecut::matte::{Background, Matte, Reference};
use spritecut::remover::{BackgroundRemover, CommandRemover, KeyColorRemover};
use spritecut::slicer::{SliceJob, TileNaming};
use spritecut::{inputs, manifest, preview};

/// Sprite sheet asset tools.
#[derive(Parser)]
#[command(name = "spritecut", version, about)]
struct Cli {
    /// Path to a TOML file with tool defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Slice sheets, remove a white/black background per tile, and write a
    /// labels manifest plus an HTML labeling preview.
    Slice(SliceArgs),
    /// Remove the background of whole sheets, then slice them into frames.
    Cutout(CutoutArgs),
    /// Make the background of a single image transparent.
    Matte(MatteArgs),
    /// Rename sliced tiles after the labels in a manifest.
    ApplyLabels {
        /// Manifest written by `slice` (and edited in the preview).
        labels: PathBuf,
    },
    /// Set or remove the label of one tile in an image's sidecar.
    Label(LabelArgs),
    /// Export tiles of an image (or a directory of images) by index.
    Export(ExportArgs),
    /// Write the effective configuration to a TOML file.
    InitConfig {
        /// Destination file.
        #[arg(default_value = "spritecut.toml")]
        path: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BgArg {
    White,
    Black,
}

impl From<BgArg> for Background {
    fn from(bg: BgArg) -> Self {
        match bg {
            BgArg::White => Background::White,
            BgArg::Black => Background::Black,
        }
    }
}

#[derive(Args)]
struct SliceArgs {
    /// Glob pattern(s) for input sheets.
    #[arg(long, num_args = 1..)]
    input: Vec<String>,
    /// Output directory for sliced tiles.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Grid size (NxM).
    #[arg(long)]
    grid: Option<GridSpec>,
    /// Background to remove.
    #[arg(long, value_enum)]
    bg: Option<BgArg>,
    /// RGB threshold for white background removal.
    #[arg(long)]
    white_threshold: Option<u8>,
    /// RGB threshold for black background removal.
    #[arg(long)]
    black_threshold: Option<u8>,
    /// Max RGB spread treated as neutral.
    #[arg(long)]
    chroma_threshold: Option<u8>,
    /// Keep tiles as cropped, without background removal.
    #[arg(long)]
    no_matte: bool,
    /// Open each tile for preview as it is written.
    #[arg(long)]
    open: bool,
    /// Where to write the labels manifest. Default: <out-dir>/labels.json
    #[arg(long)]
    labels_json: Option<PathBuf>,
    /// Where to write the HTML preview. Default: <out-dir>/index.html
    #[arg(long)]
    html: Option<PathBuf>,
}

#[derive(Args)]
struct CutoutArgs {
    /// Glob pattern(s) for input sheets.
    #[arg(long, num_args = 1..)]
    input: Vec<String>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Grid size (NxM).
    #[arg(long)]
    grid: Option<GridSpec>,
    /// Fixed tile size (WxH or single int), centered in each cell.
    #[arg(long)]
    tile_size: Option<TileSize>,
    /// External remover reading the image on stdin and writing it to stdout.
    /// Without it, a key-colour matte is used.
    #[arg(long)]
    remover_cmd: Option<String>,
    /// Channel-sum distance threshold for the built-in remover.
    #[arg(long)]
    threshold: Option<u32>,
    /// Background sample point `X,Y` for the built-in remover.
    #[arg(long, value_parser = parse_point)]
    sample: Option<(u32, u32)>,
}

#[derive(Args)]
struct MatteArgs {
    input: PathBuf,
    output: PathBuf,
    /// Channel-sum distance threshold.
    #[arg(long)]
    threshold: Option<u32>,
    /// Background sample point `X,Y`.
    #[arg(long, value_parser = parse_point)]
    sample: Option<(u32, u32)>,
    /// Keep the RGB of removed pixels instead of resetting it to white.
    #[arg(long)]
    keep_rgb: bool,
}

#[derive(Args)]
struct LayoutArgs {
    /// Tile width in pixels.
    #[arg(long)]
    tile_w: Option<u32>,
    /// Tile height in pixels.
    #[arg(long)]
    tile_h: Option<u32>,
    /// Outer margin in pixels.
    #[arg(long)]
    margin: Option<u32>,
    /// Spacing between tiles in pixels.
    #[arg(long)]
    spacing: Option<u32>,
}

impl LayoutArgs {
    fn resolve(&self, cfg: &Config) -> SheetLayout {
        let e = &cfg.explorer;
        SheetLayout {
            tile_w: self.tile_w.unwrap_or(e.tile_w),
            tile_h: self.tile_h.unwrap_or(e.tile_h),
            margin: self.margin.unwrap_or(e.margin),
            spacing: self.spacing.unwrap_or(e.spacing),
        }
    }
}

#[derive(Args)]
struct LabelArgs {
    image: PathBuf,
    index: u32,
    /// New label; omit with `--remove`.
    text: Option<String>,
    /// Remove the tile's label instead of setting it.
    #[arg(long, conflicts_with = "text")]
    remove: bool,
    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Args)]
struct ExportArgs {
    /// Image file or directory of images.
    path: PathBuf,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Export only tiles that have a label.
    #[arg(long)]
    only_labeled: bool,
    /// Export just these tile indices.
    #[arg(long = "index", num_args = 1..)]
    indexes: Vec<u32>,
    #[command(flatten)]
    layout: LayoutArgs,
}

fn parse_point(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let x = x.trim().parse::<u32>().map_err(|_| format!("bad X in '{s}'"))?;
    let y = y.trim().parse::<u32>().map_err(|_| format!("bad Y in '{s}'"))?;
    Ok((x, y))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spritecut=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("spritecut: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Slice(args) => slice(args, &config),
        Command::Cutout(args) => cutout(args, &config),
        Command::Matte(args) => matte_one(args, &config),
        Command::ApplyLabels { labels } => {
            let report = manifest::apply_labels(&labels)?;
            info!(
                "{} renamed, {} missing, {} failed",
                report.renamed,
                report.missing.len(),
                report.failed.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Label(args) => label(args, &config),
        Command::Export(args) => export(args, &config),
        Command::InitConfig { path } => {
            config.save_to_file(&path)?;
            info!("wrote config: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn input_patterns(given: Vec<String>, cfg: &Config) -> Vec<String> {
    if given.is_empty() { cfg.slice.inputs.clone() } else { given }
}

fn config_grid(cfg: &Config) -> anyhow::Result<GridSpec> {
    cfg.slice
        .grid
        .parse::<GridSpec>()
        .with_context(|| format!("grid '{}' in config", cfg.slice.grid))
}

fn slice(args: SliceArgs, cfg: &Config) -> anyhow::Result<ExitCode> {
    let grid = match args.grid {
        Some(g) => g,
        None => config_grid(cfg)?,
    };
    let out_dir = args.out_dir.unwrap_or_else(|| cfg.slice.out_dir.clone());
    let labels_json = args
        .labels_json
        .unwrap_or_else(|| out_dir.join(spritecut::DEFAULT_MANIFEST_NAME));
    let html_path = args
        .html
        .unwrap_or_else(|| out_dir.join(spritecut::DEFAULT_PREVIEW_NAME));

    let patterns = input_patterns(args.input, cfg);
    let Some(paths) = discover(&patterns)? else {
        return Ok(ExitCode::FAILURE);
    };

    let mut job = SliceJob::new(&out_dir, grid).with_naming(TileNaming::Labeled);
    if !args.no_matte {
        let background: Background = args.bg.map(Into::into).unwrap_or(cfg.matte.background);
        let threshold = match background {
            Background::White => args.white_threshold.unwrap_or(cfg.matte.white_threshold),
            Background::Black => args.black_threshold.unwrap_or(cfg.matte.black_threshold),
        };
        let chroma = args.chroma_threshold.unwrap_or(cfg.matte.chroma_threshold);
        job = job.with_tile_matte(Matte::neutral(background, threshold, chroma));
    }
    job.open_tiles = args.open;

    let report = job.run_batch(&paths)?;
    manifest::write_manifest(&labels_json, &report.records)?;
    preview::write_html(&report.records, &out_dir, &html_path)?;
    info!(
        "{} sheets sliced, {} skipped, {} tiles",
        report.processed,
        report.skipped.len(),
        report.records.len()
    );
    info!("wrote labels: {}", labels_json.display());
    info!("wrote preview: {}", html_path.display());
    Ok(ExitCode::SUCCESS)
}

fn cutout(args: CutoutArgs, cfg: &Config) -> anyhow::Result<ExitCode> {
    let mut grid = match args.grid {
        Some(g) => g,
        None => config_grid(cfg)?,
    };
    if let Some(tile) = args.tile_size {
        grid = grid.with_tile(tile);
    }
    let out_dir = args.out_dir.unwrap_or_else(|| cfg.slice.out_dir.clone());

    let patterns = input_patterns(args.input, cfg);
    let Some(paths) = discover(&patterns)? else {
        return Ok(ExitCode::FAILURE);
    };

    let remover: Box<dyn BackgroundRemover> = match args.remover_cmd {
        Some(cmd) => Box::new(CommandRemover::parse(&cmd)?),
        None => Box::new(KeyColorRemover {
            matte: distance_matte(args.threshold, args.sample, cfg),
        }),
    };
    let job = SliceJob::new(&out_dir, grid)
        .with_naming(TileNaming::Frame)
        .with_remover(remover);

    let report = job.run_batch(&paths)?;
    info!(
        "{} sheets sliced, {} skipped, {} frames written to {}",
        report.processed,
        report.skipped.len(),
        report.records.len(),
        out_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn distance_matte(threshold: Option<u32>, sample: Option<(u32, u32)>, cfg: &Config) -> Matte {
    let [sx, sy] = cfg.matte.sample;
    let (x, y) = sample.unwrap_or((sx, sy));
    Matte::distance(threshold.unwrap_or(cfg.matte.distance_threshold))
        .with_reference(Reference::Sample { x, y })
}

fn matte_one(args: MatteArgs, cfg: &Config) -> anyhow::Result<ExitCode> {
    info!("processing {}", args.input.display());
    let mut matte = distance_matte(args.threshold, args.sample, cfg);
    matte.clear_rgb = !args.keep_rgb;

    let img = image::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let out = matte.apply_to_dynamic(img)?;
    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    out.save_with_format(&args.output, image::ImageFormat::Png)?;
    info!("saved to {}", args.output.display());
    Ok(ExitCode::SUCCESS)
}

/// Expand patterns; `None` (after logging) when nothing matched.
fn discover(patterns: &[String]) -> anyhow::Result<Option<Vec<PathBuf>>> {
    match inputs::discover_inputs(patterns) {
        Ok(paths) => Ok(Some(paths)),
        Err(spritecut::Error::NoInputs(_)) => {
            eprintln!("No input sheets found.");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn open_session(
    path: &Path,
    layout: SheetLayout,
    out_dir: PathBuf,
    cfg: &Config,
) -> anyhow::Result<Option<ExplorerSession>> {
    let images = inputs::list_images(path)?;
    if images.is_empty() {
        eprintln!("No images found at {}", path.display());
        return Ok(None);
    }
    Ok(Some(ExplorerSession::open(images, layout, cfg.explorer.scale, out_dir)?))
}

fn label(args: LabelArgs, cfg: &Config) -> anyhow::Result<ExitCode> {
    let layout = args.layout.resolve(cfg);
    let out_dir = cfg.explorer.out_dir.clone();
    let Some(mut session) = open_session(&args.image, layout, out_dir, cfg)? else {
        return Ok(ExitCode::FAILURE);
    };
    session.select(args.index)?;
    if args.remove {
        if !session.remove_label()? {
            info!("no label to remove");
        }
    } else {
        let text = args.text.as_deref().unwrap_or_default();
        session.set_label(text)?;
        let (row, col) = session.position_of(args.index);
        info!("labeled index {} (r{row}, c{col})", args.index);
    }
    session.save_labels(None)?;
    Ok(ExitCode::SUCCESS)
}

fn export(args: ExportArgs, cfg: &Config) -> anyhow::Result<ExitCode> {
    let layout = args.layout.resolve(cfg);
    let out_dir = args.out_dir.unwrap_or_else(|| cfg.explorer.out_dir.clone());
    let images = inputs::list_images(&args.path)?;
    if images.is_empty() {
        eprintln!("No images found at {}", args.path.display());
        return Ok(ExitCode::FAILURE);
    }

    // One session per image so an unreadable sheet only skips itself.
    for image in images {
        let session = ExplorerSession::open(vec![image.clone()], layout, cfg.explorer.scale, &out_dir);
        let exported = session.and_then(|mut session| {
            let report = if args.indexes.is_empty() {
                session.export_all(args.only_labeled)?
            } else {
                session.export_indexes(&args.indexes)?
            };
            Ok((session.grid(), report))
        });
        match exported {
            Ok(((cols, rows), report)) => info!(
                "{}: grid {cols}x{rows}, {} tiles exported",
                image.display(),
                report.written.len()
            ),
            Err(e) => warn!("skipping {}: {e}", image.display()),
        }
    }
    Ok(ExitCode::SUCCESS)
}
