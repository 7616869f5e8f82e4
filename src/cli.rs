//! The command line interface for times2lca.
use crate::flow::FlowQuery;
use crate::input::{read_inventory, read_plan, read_times_table};
use crate::inventory::InventoryStore;
use crate::log;
use crate::metrics::{efficiency, emission_factor};
use crate::output::{create_output_directory, get_output_dir, write_inventory, write_screening};
use crate::screening::screen_processes;
use crate::settings::Settings;
use crate::times::{
    CommodityPattern, DEFAULT_BIOSPHERE_PATTERN, DEFAULT_NON_TECHNOSPHERE_PATTERN, ProcessID,
    co2eq_by_process, split_flows,
};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indexmap::IndexMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for times2lca.
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

/// Options for the harmonise command
#[derive(Args)]
pub struct HarmoniseOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// Options for the metrics command
#[derive(Args)]
pub struct MetricsOpts {
    /// Name (or part of the name) of the fuel flow
    #[arg(long)]
    pub fuel: String,
    /// Name (or part of the name) of an emission flow, to compute its emission factor
    #[arg(long)]
    pub emission: Option<String>,
    /// Location of the activity, when identifying it by name
    #[arg(long)]
    pub location: Option<String>,
    /// Match flow names exactly rather than by substring
    #[arg(long)]
    pub exact: bool,
    /// List the names of matched flows when a match is ambiguous
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for the screen command
#[derive(Args)]
pub struct ScreenOpts {
    /// Proportion of the total change in emissions to cover [default: from settings]
    #[arg(long)]
    pub cutoff: Option<f64>,
    /// `|`-separated commodity name fragments identifying emissions
    #[arg(long, default_value = DEFAULT_BIOSPHERE_PATTERN)]
    pub emissions: String,
    /// CSV file to write the results to (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Apply a harmonisation plan to an inventory.
    Harmonise {
        /// Directory containing activities.csv and exchanges.csv.
        inventory_dir: PathBuf,
        /// Path to the plan TOML file.
        plan_file: PathBuf,
        /// Other harmonise options
        #[command(flatten)]
        opts: HarmoniseOpts,
    },
    /// Calculate the efficiency and emission factor of an activity.
    Metrics {
        /// Directory containing activities.csv and exchanges.csv.
        inventory_dir: PathBuf,
        /// Key or name of the activity.
        activity: String,
        /// Other metrics options
        #[command(flatten)]
        opts: MetricsOpts,
    },
    /// Find the processes contributing most to the change in emissions between two TIMES runs.
    Screen {
        /// TIMES results for the baseline scenario.
        baseline: PathBuf,
        /// TIMES results for the alternative scenario.
        alternative: PathBuf,
        /// Other screen options
        #[command(flatten)]
        opts: ScreenOpts,
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
            Self::Harmonise {
                inventory_dir,
                plan_file,
                opts,
            } => handle_harmonise_command(&inventory_dir, &plan_file, &opts, None),
            Self::Metrics {
                inventory_dir,
                activity,
                opts,
            } => handle_metrics_command(&inventory_dir, &activity, &opts, None),
            Self::Screen {
                baseline,
                alternative,
                opts,
            } => handle_screen_command(&baseline, &alternative, &opts, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start times2lca
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ times2lca --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `harmonise` command.
pub fn handle_harmonise_command(
    inventory_dir: &Path,
    plan_path: &Path,
    opts: &HarmoniseOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(inventory_dir)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let mut store = read_inventory(inventory_dir).context("Failed to load inventory.")?;
    info!("Loaded inventory from {}", inventory_dir.display());
    let plan = read_plan(plan_path).context("Failed to load harmonisation plan.")?;
    info!(
        "Loaded plan with {} steps from {}",
        plan.steps.len(),
        plan_path.display()
    );

    plan.apply(&mut store)?;
    write_inventory(output_path, &store).context("Failed to write inventory.")?;
    info!("Harmonised inventory written to {}", output_path.display());

    Ok(())
}

/// Handle the `metrics` command.
pub fn handle_metrics_command(
    inventory_dir: &Path,
    activity: &str,
    opts: &MetricsOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the metrics command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    let store = read_inventory(inventory_dir).context("Failed to load inventory.")?;
    let key = store.find_activity(activity, opts.location.as_deref())?;
    let name = &store.activity(&key)?.name;
    info!("Activity {key}: {name}");

    let fuel_query = FlowQuery::new(&opts.fuel, opts.exact).verbose(opts.verbose);
    match efficiency(&store, &key, &fuel_query)? {
        Some(eff) => println!("efficiency: {eff}"),
        None => println!("efficiency: undefined"),
    }

    if let Some(emission) = opts.emission.as_deref() {
        let emission_query = FlowQuery::new(emission, opts.exact).verbose(opts.verbose);
        match emission_factor(&store, &key, &fuel_query, &emission_query)? {
            Some(ef) => println!("emission factor: {ef}"),
            None => println!("emission factor: undefined"),
        }
    }

    Ok(())
}

/// Read a TIMES results file and total its CO2eq emissions by process
fn read_emissions(
    file_path: &Path,
    emissions: &CommodityPattern,
    settings: &Settings,
) -> Result<IndexMap<ProcessID, f64>> {
    let table = read_times_table(file_path)?;
    let non_technosphere = CommodityPattern::new(DEFAULT_NON_TECHNOSPHERE_PATTERN);
    let (biosphere, _) = split_flows(&table.records, emissions, &non_technosphere);
    info!(
        "{} emission records for scenario {} in {}",
        biosphere.len(),
        table.scenario,
        file_path.display()
    );

    Ok(co2eq_by_process(biosphere, &settings.gwp()))
}

/// Handle the `screen` command.
pub fn handle_screen_command(
    baseline_path: &Path,
    alternative_path: &Path,
    opts: &ScreenOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the screen command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    let emissions = CommodityPattern::new(&opts.emissions);
    let baseline = read_emissions(baseline_path, &emissions, &settings)
        .context("Failed to load baseline results.")?;
    let alternative = read_emissions(alternative_path, &emissions, &settings)
        .context("Failed to load alternative results.")?;

    let cutoff = opts.cutoff.unwrap_or(settings.screening_cutoff);
    let rows = screen_processes(&baseline, &alternative, cutoff)?;
    info!("{} processes selected with a cutoff of {cutoff}", rows.len());

    if let Some(output_path) = opts.output.as_deref() {
        let file = File::create(output_path)
            .with_context(|| format!("Could not create {}", output_path.display()))?;
        write_screening(file, &rows)?;
        info!("Screening results written to {}", output_path.display());
    } else {
        write_screening(io::stdout().lock(), &rows)?;
    }

    Ok(())
}
