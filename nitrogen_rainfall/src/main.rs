use std::process::ExitCode;

use nitrogen_rainfall::config::Config;
use nitrogen_rainfall::logging::{self, Stage};
use nitrogen_rainfall::model::AnalysisError;
use nitrogen_rainfall::{pipeline, report};

fn run() -> Result<(), AnalysisError> {
    let config = Config::from_env()?;
    logging::init_logger(
        config.log_level()?,
        config.logging.log_file.as_deref(),
        config.logging.timestamps,
    );
    logging::info(
        Stage::System,
        None,
        &format!(
            "Starting analysis: chemistry={}, rainfall={}",
            config.inputs.chemistry_csv.display(),
            config.inputs.rainfall_csv.display()
        ),
    );

    let analysis = pipeline::run(&config)?;
    println!("{}", analysis);

    if let Some(path) = &config.report.json_output {
        report::write_json(&analysis, path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if logging::is_initialized() {
                logging::error(Stage::System, None, &e.to_string());
            } else {
                eprintln!("❌ {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
