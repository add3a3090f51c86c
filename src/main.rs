use std::process::ExitCode;

use clap::Parser;
use pullsim::{AppError, Args};

fn main() -> ExitCode {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level() {
        logger.filter_level(level);
    }
    logger.init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), AppError> {
    let (config, options) = args.into_config();
    if options.headless {
        pullsim::run_headless(config, options.frames)?;
        Ok(())
    } else {
        pullsim::window::run(config, options)
    }
}
