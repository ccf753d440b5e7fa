use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use label_volume::{
    AnnotationEngine, DicomStore, EngineConfig, FloodFillLabeler, SortBy, ViewPlane, VolumeKind,
    Voxel,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "label-volume", about = "Inspect and render annotated volumes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the three plane slices and their label overlays as PNG files.
    Render {
        #[command(flatten)]
        input: Input,
        /// Focus point as `x,y,z`; defaults to the volume center.
        #[arg(long, value_parser = parse_triple)]
        focus: Option<(i64, i64, i64)>,
        /// Intensity window as `bottom,top`.
        #[arg(long, value_parser = parse_pair)]
        window: Option<(i32, i32)>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the connected targets of an annotation as JSON lines.
    Targets {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Debug, Args)]
struct Input {
    /// DICOM directory or file holding the raw volume.
    #[arg(long)]
    raw: PathBuf,
    /// Label stack directory.
    #[arg(long)]
    annotation: Option<PathBuf>,
    /// JSON engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sort DICOM slices by instance number instead of patient position.
    #[arg(long)]
    by_instance_number: bool,
}

fn parse_triple(value: &str) -> Result<(i64, i64, i64), String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<i64>().map_err(|err| err.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok((*x, *y, *z)),
        _ => Err(format!("expected x,y,z but got {value:?}")),
    }
}

fn parse_pair(value: &str) -> Result<(i32, i32), String> {
    let (bottom, top) = value
        .split_once(',')
        .ok_or_else(|| format!("expected bottom,top but got {value:?}"))?;
    let parse = |part: &str| part.trim().parse::<i32>().map_err(|err| err.to_string());
    Ok((parse(bottom)?, parse(top)?))
}

fn open(input: &Input) -> Result<AnnotationEngine, Box<dyn std::error::Error>> {
    let config = match &input.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let sort_by = if input.by_instance_number {
        SortBy::InstanceNumber
    } else {
        SortBy::ImagePositionPatient
    };
    let mut engine =
        AnnotationEngine::with_services(DicomStore::new(sort_by), FloodFillLabeler, config);
    engine.load(&input.raw, VolumeKind::Raw)?;
    if let Some(annotation) = &input.annotation {
        engine.load(annotation, VolumeKind::Annotation)?;
    }
    Ok(engine)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Render {
            input,
            focus,
            window,
            out,
        } => {
            let mut engine = open(&input)?;
            if let Some((x, y, z)) = focus {
                engine.set_focus(Voxel::new(x, y, z));
            }
            if let Some((bottom, top)) = window {
                // widen first so the new bottom never crosses the old top
                engine.set_window_top(i32::MAX)?;
                engine.set_window_bottom(bottom)?;
                engine.set_window_top(top)?;
            }
            std::fs::create_dir_all(&out)?;
            for plane in ViewPlane::ALL {
                if let Some(image) = engine.intensity_raster(plane) {
                    image.save(out.join(format!("{}.png", plane.name())))?;
                }
                if let Some(overlay) = engine.overlay_raster(plane) {
                    overlay.save(out.join(format!("{}_labels.png", plane.name())))?;
                }
            }
            info!(out = %out.display(), focus = ?engine.focus(), "rendered planes");
        }
        Command::Targets { input } => {
            let mut engine = open(&input)?;
            for target in engine.recompute_targets()? {
                println!("{}", serde_json::to_string(target)?);
            }
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
