use std::process;
use clap::Parser;
use log::{error, info};
use flexi_logger::with_thread;
use window_counter::config::{load_config, Args};
use window_counter::execution::application;

fn main() {
    let args = Args::parse();
    let _logger = match flexi_logger::Logger::try_with_env_or_str(&args.log_level)
        .and_then(|logger| logger.format(with_thread).start())
    {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("failed to start logger: {}", e);
            process::exit(1);
        }
    };
    let result = load_config(&args).and_then(application::run_application);
    if let Err(e) = result {
        error!("window-counter failed: {}", e);
        process::exit(1);
    }
    info!("window-counter stopped");
}
