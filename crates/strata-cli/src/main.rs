use serde::Serialize;
use std::io::Read;
use std::path::Path;
use strata::{Algorithm, Graph, LayoutOptions, NodeColors};
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Layout(strata::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Layout(err) => write!(f, "layout error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<strata::Error> for CliError {
    fn from(value: strata::Error) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Command {
    #[default]
    Layered,
    Force,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    root: Option<String>,
    config: Option<String>,
    colors: Option<String>,
    out: Option<String>,
    pretty: bool,
    seed: Option<u64>,
    force_strength: Option<f64>,
    separation: Option<f64>,
    threshold: Option<usize>,
    iterations: Option<usize>,
    flat: bool,
}

fn usage() -> &'static str {
    "strata\n\
\n\
USAGE:\n\
  strata [layered] --root <id> [OPTIONS] [<path>|-|<json>]\n\
  strata force [OPTIONS] [<path>|-|<json>]\n\
\n\
OPTIONS:\n\
  --config <path>          JSON layout options (camelCase keys, all optional)\n\
  --colors <path>          JSON object mapping node id to color name\n\
  --seed <n>               seed for jitter and initial placement\n\
  --force-strength <f>     spring rest length / force scale\n\
  --separation <f>         distance between layers along z\n\
  --threshold <n>          layers with more members than this are re-spaced\n\
  --iterations <n>         steps for force-directed runs\n\
  --2d                     keep every z at 0\n\
  --pretty                 pretty-print the JSON output\n\
  --out <path>             write the JSON to a file instead of stdout\n\
\n\
NOTES:\n\
  - If the input is omitted or '-', it is read from stdin.\n\
  - An argument that is not an existing file and starts with '[' or '{' is parsed as JSON.\n\
  - Input is an edge list ([[\"a\", \"b\"], ...]) or {\"nodes\": [...], \"edges\": [...]}.\n\
  - Flags override values from --config.\n\
  - Set RUST_LOG (e.g. RUST_LOG=strata=debug) for diagnostics on stderr.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_value<T: std::str::FromStr>(raw: &str) -> Result<T, CliError> {
    raw.parse::<T>().map_err(|_| CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layered" => args.command = Command::Layered,
            "force" => args.command = Command::Force,
            "--pretty" => args.pretty = true,
            "--2d" => args.flat = true,
            "--root" => args.root = Some(next_value(&mut it)?.clone()),
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--colors" => args.colors = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--seed" => args.seed = Some(parse_value(next_value(&mut it)?)?),
            "--force-strength" => args.force_strength = Some(parse_value(next_value(&mut it)?)?),
            "--separation" => args.separation = Some(parse_value(next_value(&mut it)?)?),
            "--threshold" => args.threshold = Some(parse_value(next_value(&mut it)?)?),
            "--iterations" => args.iterations = Some(parse_value(next_value(&mut it)?)?),
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(a.clone());
            }
            other if other.starts_with("--") => return Err(CliError::Usage(usage())),
            input => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(input.to_string());
            }
        }
    }

    if args.command == Command::Layered && args.root.is_none() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(arg) => {
            let trimmed = arg.trim_start();
            if !Path::new(arg).exists() && (trimmed.starts_with('[') || trimmed.starts_with('{'))
            {
                Ok(arg.to_string())
            } else {
                Ok(std::fs::read_to_string(arg)?)
            }
        }
    }
}

fn load_options(args: &Args) -> Result<LayoutOptions, CliError> {
    let mut opts: LayoutOptions = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => LayoutOptions::default(),
    };
    if let Some(seed) = args.seed {
        opts.seed = seed;
    }
    if let Some(k) = args.force_strength {
        opts.force_strength = k;
    }
    if let Some(sep) = args.separation {
        opts.separation = sep;
    }
    if let Some(t) = args.threshold {
        opts.crowding_threshold = t;
    }
    if let Some(n) = args.iterations {
        opts.iterations = n;
    }
    if args.flat {
        opts.is_3d = false;
    }
    Ok(opts)
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            let stdout = std::io::stdout().lock();
            if pretty {
                serde_json::to_writer_pretty(stdout, value)?;
            } else {
                serde_json::to_writer(stdout, value)?;
            }
            println!();
        }
        Some(path) => {
            let text = if pretty {
                serde_json::to_string_pretty(value)?
            } else {
                serde_json::to_string(value)?
            };
            std::fs::write(path, text)?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let graph: Graph = serde_json::from_str(&text)?;
    let opts = load_options(&args)?;

    let algorithm = match args.command {
        Command::Layered => Algorithm::Layered {
            root: args.root.clone().ok_or(CliError::Usage(usage()))?,
        },
        Command::Force => Algorithm::ForceDirected,
    };
    let mut result = strata::layout(&graph, &algorithm, &opts)?;
    tracing::info!(
        nodes = result.graph.nodes.len(),
        edges = result.graph.edges.len(),
        spaced_layers = result.spaced_layers.len(),
        "layout complete"
    );

    if let Some(path) = &args.colors {
        let colors: NodeColors = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let colored = strata::apply_colors(&mut result.graph, &colors);
        tracing::debug!(colored, "colors applied");
    }

    write_json(&result.graph, args.pretty, args.out.as_deref())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
