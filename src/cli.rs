//! The `powerdispatch` command line interface.
use crate::input::load_model;
use crate::log;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::simulation::{CancellationToken, RunOptions};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the dispatch model.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Solver backend to use instead of the one named in model.toml
    #[arg(long)]
    pub solver: Option<String>,
    /// Leave storage units out of the dispatch
    #[arg(long)]
    pub no_storage: bool,
    /// Build the optimisation instance without solving it
    #[arg(long)]
    pub no_solve: bool,
    /// Also write the topology and results to network.json
    #[arg(long)]
    pub export: bool,
}

impl RunOpts {
    /// The options passed on to [`crate::simulation::run`]
    fn run_options(&self) -> RunOptions {
        RunOptions {
            solver: self.solver.clone(),
            no_storage: self.no_storage,
            no_solve: self.no_solve,
            export: self.export,
        }
    }
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a dispatch model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ powerdispatch --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // No command given, so show the help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Use the given settings, or read them from the settings file
fn settings_or_load(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
///
/// Results go to `opts.output_dir`, or to a folder named after the model under
/// `powerdispatch_results` if none is given.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = settings_or_load(settings)?;
    let output_path = match &opts.output_dir {
        Some(dir) => dir.clone(),
        None => get_output_dir(model_path)?,
    };

    let overwritten = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(Some(&settings.log_level), Some(&output_path))
        .context("Failed to initialise logging.")?;

    // Only now that the logger exists can we report this
    if overwritten {
        warn!("Replacing existing output folder {}", output_path.display());
    }

    let model = load_model(model_path).context("Failed to load model.")?;
    info!(
        "Loaded model from {} ({} regions, {} generators, {} storage units, {} links, \
         {} snapshots)",
        model_path.display(),
        model.topology.regions().len(),
        model.topology.generators().len(),
        model.topology.storage_units().len(),
        model.topology.links().len(),
        model.snapshots.len()
    );

    let result = crate::simulation::run(
        &model,
        &output_path,
        &opts.run_options(),
        &CancellationToken::new(),
    )
    .context("Dispatch failed.")?;

    if let Some(result) = result {
        info!(
            "Dispatch complete! Total cost: {:.2}. Results written to {}",
            result.objective_value.value(),
            output_path.display()
        );
    }

    Ok(())
}

/// Handle the `validate` command.
///
/// The model is loaded and an optimisation instance built from it, but nothing is solved and no
/// files are written.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(settings)?;
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let model = load_model(model_path).context("Failed to validate model.")?;
    let instance =
        crate::network::build(&model.topology, &model.snapshots, &model.dispatch_config())
            .context("Failed to validate model.")?;
    info!(
        "Model validation successful! The dispatch problem has {} variables and {} constraints",
        instance.num_variables(),
        instance.num_constraints()
    );

    Ok(())
}
