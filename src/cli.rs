use crate::config::{Config, load_config};
use crate::ir::Orientation;
use crate::layout::{Layout, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::parser::parse_document;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "archroute", version, about = "Lays out nested architecture boxes and routes their connectors")]
pub struct Args {
    /// Input document (.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Draw the road rectangles under the diagram
    #[arg(long = "roads")]
    pub roads: bool,

    /// Packing orientation of the root (lr or td)
    #[arg(long = "orientation", value_parser = parse_orientation)]
    pub orientation: Option<Orientation>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

fn parse_orientation(token: &str) -> std::result::Result<Orientation, String> {
    Orientation::from_token(token).ok_or_else(|| format!("unknown orientation `{token}`"))
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
        .ok();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let diagram = parse_document(&input)?;
    let layout = compute_layout(&diagram, &config.layout);
    info!(
        boxes = layout.boxes.len(),
        connections = layout.connections.len(),
        warnings = layout.warnings.len(),
        "layout computed"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&layout, &config.theme, &config.render);
            write_png(&svg, &output, &config)?;
        }
        OutputFormat::Json => write_json(&layout, args.output.as_deref())?,
    }
    Ok(())
}

fn write_json(layout: &Layout, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        return write_layout_dump(path, layout);
    }
    let json = serde_json::to_string_pretty(&LayoutDump::from_layout(layout))?;
    writeln!(io::stdout(), "{json}")?;
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(orientation) = args.orientation {
        config.layout.orientation = orientation;
    }
    if args.roads {
        config.render.show_roads = true;
    }
    Ok(config)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
