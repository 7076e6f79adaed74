use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches as _};

use crate::config::SimulationConfig;
use crate::error::SirvdError;
use crate::log::{info, parse_log_level, set_log_level};
use crate::report::write_tick_report;
use crate::result::SimulationResult;

/// Command line arguments of the `sirvd` runner
#[derive(Args, Debug)]
pub struct BaseArgs {
    /// Path to the JSON simulation configuration
    #[arg(short, long)]
    pub config: PathBuf,

    /// Random seed, overrides the seed of the configuration
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Directory for the result and the tick report
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Prefix of the output file names
    #[arg(short, long, default_value = "sirvd")]
    pub prefix: String,

    /// Enable logging at the given level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Do not show the timeline progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// What a run produced and where it was written.
#[derive(Debug)]
pub struct RunOutput {
    pub result: SimulationResult,
    pub result_path: PathBuf,
    pub report_path: PathBuf,
}

fn create_sirvd_cli() -> Command {
    let cli = Command::new("sirvd").about("Network and compartmental SIRVD epidemic simulation");
    BaseArgs::augment_args(cli)
}

/// Parses the process arguments and runs the configured simulation.
///
/// # Errors
/// Returns an error if argument parsing, configuration, the run or writing the outputs fails
pub fn run_with_args() -> Result<RunOutput, Box<dyn std::error::Error>> {
    let matches = create_sirvd_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    Ok(run_with_args_internal(&args)?)
}

fn run_with_args_internal(args: &BaseArgs) -> Result<RunOutput, SirvdError> {
    if let Some(level) = &args.log_level {
        set_log_level(parse_log_level(level)?);
    }

    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.random_seed {
        config.seed = seed;
    }
    let result = config.build()?.with_progress(!args.no_progress).run()?;

    let result_path = args.output_dir.join(format!("{}_result.json", args.prefix));
    let report_path = args.output_dir.join(format!("{}_ticks.csv", args.prefix));
    result.save(&result_path)?;
    write_tick_report(&report_path, &result)?;
    info!("wrote {} and {}", result_path.display(), report_path.display());

    Ok(RunOutput {
        result,
        result_path,
        report_path,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::tempdir;

    use super::*;

    const CONFIG: &str = r#"{
        "population": 60,
        "duration": 8,
        "initial_infected": 2,
        "seed": 3,
        "model": { "network": { "topology": { "kind": "barabasi_albert", "parameters": { "m": 2 } } } },
        "rates": { "constant": { "infection_rate": 0.6, "recovery_rate": 0.2, "fatality_rate": 0.02,
                   "vaccination_rate": 0.01, "breakthrough_rate": 0.0 } }
    }"#;

    fn args(config: PathBuf, output_dir: &Path) -> BaseArgs {
        BaseArgs {
            config,
            random_seed: None,
            output_dir: output_dir.to_path_buf(),
            prefix: "test".to_string(),
            log_level: None,
            no_progress: true,
        }
    }

    #[test]
    fn test_run_writes_outputs() {
        let temp_dir = tempdir().unwrap();
        let config = temp_dir.path().join("config.json");
        fs::write(&config, CONFIG).unwrap();

        let output = run_with_args_internal(&args(config, &temp_dir.path().join("out"))).unwrap();
        assert_eq!(output.result_path, temp_dir.path().join("out").join("test_result.json"));
        assert_eq!(SimulationResult::load(&output.result_path).unwrap(), output.result);

        let report = fs::read_to_string(&output.report_path).unwrap();
        assert!(report.starts_with("tick,time,susceptible"));
        assert_eq!(report.lines().count(), 1 + 9);
    }

    #[test]
    fn test_random_seed_overrides_config() {
        let temp_dir = tempdir().unwrap();
        let config = temp_dir.path().join("config.json");
        fs::write(&config, CONFIG).unwrap();

        let first = run_with_args_internal(&args(config.clone(), temp_dir.path())).unwrap();
        let same = run_with_args_internal(&BaseArgs {
            random_seed: Some(3),
            ..args(config.clone(), temp_dir.path())
        })
        .unwrap();
        assert_eq!(first.result, same.result);
    }

    #[test]
    fn test_bad_log_level() {
        let temp_dir = tempdir().unwrap();
        let config = temp_dir.path().join("config.json");
        fs::write(&config, CONFIG).unwrap();
        let result = run_with_args_internal(&BaseArgs {
            log_level: Some("loud".to_string()),
            ..args(config, temp_dir.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_config() {
        let temp_dir = tempdir().unwrap();
        let result = run_with_args_internal(&args(temp_dir.path().join("absent.json"), temp_dir.path()));
        assert!(matches!(result, Err(SirvdError::IoError(_))));
    }
}
