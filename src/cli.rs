use crate::config::{load_config, Config};
use crate::drawing::Drawing;
use crate::graph::{parse_doc, Graph};
use crate::layout::{solve, OverlapMode, SolveStats};
use crate::normalize::{normalize, NormalizePolicy};
use crate::render::{render_svg, write_output_png, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "colar", version, about = "Constraint-driven graph layout and renderer")]
pub struct Args {
    /// Input graph documents (JSON/JSON5), or '-' for stdin
    #[arg(value_name = "GRAPH")]
    pub inputs: Vec<PathBuf>,

    /// Output file (svg/png/json). Defaults to stdout for svg and json.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Layout mode
    #[arg(short = 'm', long = "mode", value_enum, default_value = "plain")]
    pub mode: Mode,

    /// Coordinate normalization for json output (svg/png center internally)
    #[arg(long = "normalize", value_enum, default_value = "none")]
    pub normalize: NormalizeArg,

    /// Config JSON/JSON5 file (theme, layout and render sections)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Treat unsatisfied constraints as an error instead of a warning
    #[arg(long = "strict")]
    pub strict: bool,

    /// Suppress the per-input stats line on stderr
    #[arg(long = "quiet")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Link-length targets only.
    Plain,
    /// Targets from the document's distance matrix.
    Distance,
    /// Keep node rectangles disjoint.
    Overlap,
    /// Overlap avoidance with extra padding between different groups.
    Cluster,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeArg {
    None,
    Fit,
    Shift,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    if args.inputs.len() <= 1 {
        let input = args.inputs.first().map(PathBuf::as_path);
        let text = read_input(input)?;
        let label = input_label(input);
        let (graph, drawing) = solve_document(&text, &label, &config, &args)?;
        write_result(&graph, &drawing, &config, &args, args.output.as_deref())?;
        return Ok(());
    }

    if args.inputs.iter().any(|p| p == Path::new("-")) {
        return Err(anyhow::anyhow!("stdin ('-') must be the only input"));
    }
    let outputs = resolve_multi_outputs(args.output.as_deref(), args.output_format, &args.inputs)?;
    for (input, output) in args.inputs.iter().zip(&outputs) {
        let text = read_input(Some(input))?;
        let label = input_label(Some(input));
        let (graph, drawing) = solve_document(&text, &label, &config, &args)?;
        write_result(&graph, &drawing, &config, &args, Some(output))?;
    }
    Ok(())
}

fn solve_document(
    text: &str,
    label: &str,
    config: &Config,
    args: &Args,
) -> Result<(Graph, Drawing)> {
    let graph = parse_doc(text)?.into_graph(config.layout.default_node_size)?;
    if args.mode == Mode::Distance && graph.distance.is_none() {
        return Err(anyhow::anyhow!("distance mode requires a distance matrix in {label}"));
    }
    let overlap = match args.mode {
        Mode::Plain | Mode::Distance => OverlapMode::None,
        Mode::Overlap => OverlapMode::Standard,
        Mode::Cluster => OverlapMode::Cluster,
    };
    let (drawing, stats) = solve(&graph, &config.layout, overlap)?;
    if !args.quiet {
        eprintln!("{}", stats_line(label, &graph, &stats));
    }
    if args.strict {
        stats.ensure_feasible()?;
    }
    Ok((graph, drawing))
}

fn write_result(
    graph: &Graph,
    drawing: &Drawing,
    config: &Config,
    args: &Args,
    output: Option<&Path>,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(graph, drawing, &config.theme, &config.render)?;
            write_output_svg(&svg, output)?;
        }
        OutputFormat::Png => {
            let svg = render_svg(graph, drawing, &config.theme, &config.render)?;
            let path = ensure_output(output, "png")?;
            write_output_png(&svg, &path, &config.render)?;
        }
        OutputFormat::Json => {
            let policy = match args.normalize {
                NormalizeArg::None => NormalizePolicy::None,
                NormalizeArg::Fit => NormalizePolicy::Fit,
                NormalizeArg::Shift => NormalizePolicy::Shift,
            };
            let normalized =
                normalize(drawing, policy, config.render.width, config.render.height, 0.0);
            match output {
                Some(path) => normalized.write_json(path)?,
                None => println!("{}", normalized.to_json()?),
            }
        }
    }
    Ok(())
}

fn stats_line(label: &str, graph: &Graph, stats: &SolveStats) -> String {
    let mut line = format!(
        "{label}: {} nodes, {} links, stress {:.3}, max violation {:.3}",
        graph.nodes.len(),
        graph.links.len(),
        stats.stress,
        stats.max_violation_x.max(stats.max_violation_y)
    );
    if !stats.feasible {
        line.push_str(" [infeasible]");
    }
    line
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn input_label(path: Option<&Path>) -> String {
    match path {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "stdin".to_string(),
    }
}

fn ensure_output(output: Option<&Path>, ext: &str) -> Result<PathBuf> {
    output
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("Output path required for {} output", ext))
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    inputs: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let ext = match format {
        OutputFormat::Svg => "svg",
        OutputFormat::Png => "png",
        OutputFormat::Json => "json",
    };
    let base =
        output.ok_or_else(|| anyhow::anyhow!("Output path required for multiple inputs"))?;
    if base.is_dir() {
        let outputs = inputs
            .iter()
            .map(|input| {
                let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("layout");
                base.join(format!("{stem}.{ext}"))
            })
            .collect();
        return Ok(outputs);
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("layout");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    let outputs = (0..inputs.len())
        .map(|idx| parent.join(format!("{}-{}.{}", stem, idx + 1, ext)))
        .collect();
    Ok(outputs)
}
