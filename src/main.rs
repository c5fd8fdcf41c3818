use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kalimba::notation::frontmatter;
use kalimba::{FixedLayout, GameConfig, Layout, LayoutSpec, ScaleKind};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kalimba", version, about = "Kalimba tablature compiler and layout tool")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a tab document to Song JSON
    Compile {
        input: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail if any token was skipped
        #[arg(long)]
        strict: bool,
    },

    /// Rewrite a tab document in canonical form
    Fmt {
        input: PathBuf,

        /// Replace the tab in the input file (frontmatter is kept)
        #[arg(short, long)]
        write: bool,
    },

    /// Print a key layout, left to right
    Layout {
        /// Use a fixed table (calibrated-21, chromatic-34)
        #[arg(long, conflicts_with_all = ["tines", "root", "scale", "octave"])]
        fixed: Option<String>,

        #[arg(long)]
        tines: Option<usize>,

        #[arg(long)]
        root: Option<String>,

        /// major, minor, major-pentatonic, minor-pentatonic
        #[arg(long)]
        scale: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        octave: Option<i8>,

        /// Start from the layout in this game config
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Export a tab document as MusicXML
    Musicxml {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Compile { input, output, strict } => {
            let source = read_source(&input)?;
            let compiled = kalimba::compile(&source)
                .with_context(|| format!("Failed to compile {}", input.display()))?;
            if strict && !compiled.warnings.is_empty() {
                for warning in &compiled.warnings {
                    eprintln!("  {}", warning);
                }
                anyhow::bail!(
                    "{} token(s) skipped in {}",
                    compiled.warnings.len(),
                    input.display()
                );
            }
            let json = compiled.song.to_json()?;
            emit(output.as_deref(), &json)?;
        }

        Commands::Fmt { input, write } => {
            let source = read_source(&input)?;
            let formatted = kalimba::format_notation(&source)
                .with_context(|| format!("Failed to format {}", input.display()))?;
            if write {
                let (header, _) = frontmatter::split(&source);
                fs::write(&input, format!("{}{}\n", header, formatted))
                    .with_context(|| format!("Failed to write {}", input.display()))?;
                eprintln!("Formatted {}", input.display());
            } else {
                println!("{}", formatted);
            }
        }

        Commands::Layout { fixed, tines, root, scale, octave, config } => {
            let mut spec = match config {
                Some(path) => GameConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
                    .layout,
                None => LayoutSpec::default(),
            };
            if let Some(name) = fixed {
                let fixed = FixedLayout::from_str(&name)
                    .with_context(|| format!("Unknown fixed layout '{}'", name))?;
                spec = LayoutSpec::Fixed { fixed };
            } else if tines.is_some() || root.is_some() || scale.is_some() || octave.is_some() {
                spec = override_generated(spec, tines, root, scale, octave)?;
            }
            let layout = spec.build().context("Failed to build layout")?;
            print_layout(&layout);
        }

        Commands::Musicxml { input, output } => {
            let source = read_source(&input)?;
            let xml = kalimba::compile_to_musicxml(&source)
                .with_context(|| format!("Failed to export {}", input.display()))?;
            emit(output.as_deref(), &xml)?;
        }
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn emit(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}

/// Apply command-line overrides on top of a generated spec (or the default
/// one, if the config named a fixed table)
fn override_generated(
    spec: LayoutSpec,
    tines: Option<usize>,
    root: Option<String>,
    scale: Option<String>,
    octave: Option<i8>,
) -> Result<LayoutSpec> {
    let (base_tines, base_root, base_scale, base_octave) = match spec {
        LayoutSpec::Generated { tines, root, scale, octave } => (tines, root, scale, octave),
        LayoutSpec::Fixed { .. } => {
            return override_generated(LayoutSpec::default(), tines, root, scale, octave)
        }
    };
    Ok(LayoutSpec::Generated {
        tines: tines.unwrap_or(base_tines),
        root: root.unwrap_or(base_root),
        scale: match scale {
            Some(name) => name.parse::<ScaleKind>()?,
            None => base_scale,
        },
        octave: octave.unwrap_or(base_octave),
    })
}

fn print_layout(layout: &Layout) {
    println!("{} ({} keys)", layout.name(), layout.len());
    println!("{:>5}  {:>6}  {:>5}  {:>9}", "index", "label", "note", "Hz");
    for key in layout.keys() {
        println!(
            "{:>5}  {:>6}  {:>5}  {:>9.2}",
            key.index, key.display_degree, key.display_note, key.frequency
        );
    }
}
