//! Command-line driver for the census tract appreciation analyses.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tract_appreciation::{
    analyze_home_value_trend, analyze_poverty_regression, analyze_power_law,
    kernel_smoothing_study, monte_carlo_timing_study, power_law_null_study,
    power_law_power_study, regression_error_rates, AppreciationResult, CensusTable, StudyConfig,
    StudyDepth,
};

/// Preset sizes selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Depth {
    /// Smoke-test sizes
    Quick,
    /// Full analysis counts, reduced simulation counts
    Standard,
    /// Published study sizes
    Full,
}

impl From<Depth> for StudyDepth {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Quick => StudyDepth::Quick,
            Depth::Standard => StudyDepth::Standard,
            Depth::Full => StudyDepth::Full,
        }
    }
}

/// Simulation studies
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Study {
    /// Type-I error and power of the regression t-test
    Regression,
    /// Bias, MSE and band coverage of the kernel smoother
    Smoothing,
    /// Size of the Monte Carlo KS test on power-law data
    PowerLawNull,
    /// Power of the Monte Carlo KS test against lognormal data
    PowerLawPower,
    /// Runtime of the Monte Carlo KS test
    Timing,
    /// Every study in turn
    All,
}

#[derive(Parser, Debug)]
#[command(name = "tract-appreciation")]
#[command(version)]
#[command(about = "Resampling-based tests of census tract home value appreciation", long_about = None)]
struct Cli {
    /// Base random seed (drawn from entropy if omitted)
    #[arg(long, global = true, value_name = "SEED")]
    seed: Option<u64>,

    /// Preset iteration counts
    #[arg(long, global = true, value_enum, default_value = "full")]
    depth: Depth,

    /// Shorthand for --depth quick
    #[arg(long, global = true)]
    quick: bool,

    /// Run replicates on a single thread
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a power law to appreciation ratios and run the Monte Carlo KS test
    PowerLaw {
        /// Merged census CSV
        csv: PathBuf,
        /// Monte Carlo replicates
        #[arg(long, value_name = "N")]
        replicates: Option<usize>,
    },
    /// Kernel-smooth median home values over time with a bootstrap band
    Trend {
        /// Merged census CSV
        csv: PathBuf,
        /// Bootstrap resamples
        #[arg(long, value_name = "N")]
        bootstrap: Option<usize>,
        /// Write the curve as year,estimate,lower,upper
        #[arg(long, value_name = "PATH")]
        curve_csv: Option<PathBuf>,
    },
    /// Regress appreciation on tract characteristics with a permutation test
    Regression {
        /// Merged census CSV
        csv: PathBuf,
        /// Response permutations
        #[arg(long, value_name = "N")]
        permutations: Option<usize>,
    },
    /// Run a simulation study on synthetic data
    Simulate {
        /// Study to run
        #[arg(value_enum)]
        study: Study,
        /// Simulation iterations (regression and power-law studies, smoothing series)
        #[arg(long, value_name = "N")]
        runs: Option<usize>,
        /// Monte Carlo replicates or bootstrap resamples inside each run
        #[arg(long, value_name = "N")]
        replicates: Option<usize>,
    },
}

impl Cli {
    fn study_config(&self) -> StudyConfig {
        let depth = if self.quick {
            StudyDepth::Quick
        } else {
            self.depth.into()
        };
        let mut config = StudyConfig::for_depth(depth);
        config.seed = self.seed;
        config.parallel = !self.sequential;
        config
    }
}

fn run_simulation(study: Study, config: &StudyConfig) -> AppreciationResult<()> {
    let selected = |s: Study| study == s || study == Study::All;

    if selected(Study::Regression) {
        println!("{}", regression_error_rates(&config.regression_simulation())?);
    }
    if selected(Study::Smoothing) {
        println!("{}", kernel_smoothing_study(&config.smoothing_study())?);
    }
    if selected(Study::PowerLawNull) {
        println!("{}", power_law_null_study(&config.power_law_study())?);
    }
    if selected(Study::PowerLawPower) {
        println!("{}", power_law_power_study(&config.power_law_study())?);
    }
    if selected(Study::Timing) {
        println!("{}", monte_carlo_timing_study(&config.timing_study())?);
    }
    Ok(())
}

fn run(cli: Cli) -> AppreciationResult<()> {
    let mut config = cli.study_config();
    log::debug!("Study configuration: {:?}", config);

    match cli.command {
        Command::PowerLaw { csv, replicates } => {
            if let Some(n) = replicates {
                config.monte_carlo_replicates = n;
            }
            let table = CensusTable::from_path(&csv)?;
            let ratios = table.appreciation_ratios()?;
            println!("{}", analyze_power_law(&ratios, &config)?);
        }
        Command::Trend {
            csv,
            bootstrap,
            curve_csv,
        } => {
            if let Some(n) = bootstrap {
                config.bootstrap_samples = n;
            }
            let table = CensusTable::from_path(&csv)?;
            let panel = table.home_value_panel()?;
            let trend = analyze_home_value_trend(&panel.years, &panel.values, &config)?;
            println!("{}", trend);
            if let Some(path) = curve_csv {
                trend.write_csv_file(path)?;
            }
        }
        Command::Regression { csv, permutations } => {
            if let Some(n) = permutations {
                config.permutations = n;
            }
            let table = CensusTable::from_path(&csv)?;
            println!("{}", analyze_poverty_regression(&table, &config)?);
        }
        Command::Simulate {
            study,
            runs,
            replicates,
        } => {
            if let Some(n) = runs {
                config.simulation_runs = n;
                config.smoothing_simulations = n;
            }
            if let Some(n) = replicates {
                config.simulation_replicates = n;
                config.smoothing_bootstrap_samples = n;
            }
            run_simulation(study, &config)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
