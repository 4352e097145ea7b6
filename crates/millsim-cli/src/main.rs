//! millsim CLI - inspect projects and process machining surfaces

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use millsim_math::{format_vec3, parse_vec3, Bounds3, Point3};
use millsim_project::{compute_resolution, Project, ResolutionMode, Settings, ToolPath};
use millsim_surface::{read_stl, write_stl, StlFormat, Surface, SurfaceBuilder, SurfaceView};

#[derive(Parser)]
#[command(name = "millsim")]
#[command(about = "CNC machining simulation tools", long_about = None)]
struct Cli {
    /// TOML file with defaults for new projects
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about a project
    Info {
        /// Project file
        project: PathBuf,
    },
    /// Print the tool table of a project as JSON
    Tools {
        /// Project file
        project: PathBuf,
    },
    /// Estimate the workpiece of a project from a tool path
    Estimate {
        /// Project file
        project: PathBuf,
        /// Tool path as a JSON list of moves
        toolpath: PathBuf,
        /// Write the estimate back to the project
        #[arg(long)]
        save: bool,
    },
    /// Compute the grid resolution for a workpiece
    Resolution {
        /// low, medium, high, very-high or manual
        mode: ResolutionMode,
        /// Workpiece minimum corner, e.g. "-10,-10,-5"
        #[arg(allow_hyphen_values = true)]
        min: String,
        /// Workpiece maximum corner
        #[arg(allow_hyphen_values = true)]
        max: String,
    },
    /// Merge redundant triangles of an STL surface
    Reduce {
        /// Input STL file
        input: PathBuf,
        /// Output STL file
        output: PathBuf,
        /// Write ASCII instead of binary STL
        #[arg(long)]
        ascii: bool,
    },
    /// Concatenate STL surfaces
    Merge {
        /// Output STL file
        output: PathBuf,
        /// Input STL files, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Write ASCII instead of binary STL
        #[arg(long)]
        ascii: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Info { project } => show_info(&project, &settings)?,
        Commands::Tools { project } => show_tools(&project, &settings)?,
        Commands::Estimate {
            project,
            toolpath,
            save,
        } => estimate(&project, &toolpath, save, &settings)?,
        Commands::Resolution { mode, min, max } => {
            let bounds = Bounds3::new(parse_vec3(&min)?, parse_vec3(&max)?);
            println!("{}", compute_resolution(mode, &bounds));
        }
        Commands::Reduce {
            input,
            output,
            ascii,
        } => reduce(&input, &output, stl_format(ascii))?,
        Commands::Merge {
            output,
            inputs,
            ascii,
        } => merge(&output, &inputs, stl_format(ascii))?,
    }

    Ok(())
}

fn stl_format(ascii: bool) -> StlFormat {
    if ascii {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    }
}

fn open_project(path: &Path, settings: &Settings) -> Result<Project> {
    if !path.exists() {
        anyhow::bail!("Project not found: {}", path.display());
    }
    Project::open(path, settings).with_context(|| format!("failed to load {}", path.display()))
}

fn show_info(path: &Path, settings: &Settings) -> Result<()> {
    let project = open_project(path, settings)?;

    println!("millsim project: {}", path.display());
    println!("  Units: {}", project.units());
    println!(
        "  Resolution: {} ({})",
        project.resolution(),
        project.resolution_mode()
    );
    println!("  Render mode: {}", project.render_mode());
    println!("  Watch: {}", project.watch());

    let bounds = project.workpiece_bounds();
    if project.automatic_workpiece() {
        println!("  Workpiece: automatic, {}% margin", project.workpiece_margin());
    } else {
        println!(
            "  Workpiece: {} to {}",
            format_vec3(&bounds.min()),
            format_vec3(&bounds.max())
        );
    }

    if !project.tools().is_empty() {
        println!("\nTools:");
        for tool in project.tools() {
            println!("  T{}: {}", tool.number(), tool.text());
        }
    }

    if !project.files().is_empty() {
        let dir = project.directory();
        println!("\nFiles:");
        for (i, file) in project.files().iter().enumerate() {
            println!("  {}: {}", i + 1, file.relative_to(&dir).display());
        }
    }

    Ok(())
}

fn show_tools(path: &Path, settings: &Settings) -> Result<()> {
    let project = open_project(path, settings)?;
    println!("{}", serde_json::to_string_pretty(&project.tools().to_json())?);
    Ok(())
}

fn estimate(path: &Path, toolpath: &Path, save: bool, settings: &Settings) -> Result<()> {
    let mut project = open_project(path, settings)?;

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(toolpath)?)
        .with_context(|| format!("failed to parse {}", toolpath.display()))?;
    let moves = ToolPath::from_json(&json)?;
    log::info!(
        "{} moves, {:.1} mm in {:.1} s",
        moves.len(),
        moves.distance(),
        moves.time()
    );

    if !project.automatic_workpiece() {
        log::warn!("workpiece is set manually, nothing to estimate");
    }
    project.update_automatic_workpiece(&moves);

    let bounds = project.workpiece_bounds();
    println!("Workpiece:");
    println!("  Min: {}", format_vec3(&bounds.min()));
    println!("  Max: {}", format_vec3(&bounds.max()));
    println!("  Size: {}", format_vec3(&Point3::from(bounds.dimensions())));
    println!(
        "Resolution: {} ({})",
        project.resolution(),
        project.resolution_mode()
    );

    if save {
        project.save()?;
        println!("Saved {}", path.display());
    }

    Ok(())
}

fn load_stl(path: &Path) -> Result<Surface> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let builder = read_stl(BufReader::new(file), None)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(builder.finalize())
}

fn save_stl(surface: &impl SurfaceView, path: &Path, format: StlFormat) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_stl(surface, file, format, None)?;
    Ok(())
}

fn reduce(input: &Path, output: &Path, format: StlFormat) -> Result<()> {
    let mut surface = load_stl(input)?;
    let before = surface.count();
    let removed = surface.reduce(None);

    save_stl(&surface, output, format)?;
    println!(
        "Reduced {} from {} to {} triangles ({} removed)",
        input.display(),
        before,
        surface.count(),
        removed
    );
    Ok(())
}

fn merge(output: &Path, inputs: &[PathBuf], format: StlFormat) -> Result<()> {
    let surfaces = inputs
        .iter()
        .map(|path| load_stl(path))
        .collect::<Result<Vec<_>>>()?;

    let merged = SurfaceBuilder::merge(&surfaces);
    save_stl(&merged, output, format)?;
    println!(
        "Merged {} surfaces into {} ({} triangles)",
        surfaces.len(),
        output.display(),
        merged.count()
    );
    Ok(())
}
