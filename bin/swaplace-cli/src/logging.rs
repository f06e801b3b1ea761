use crate::cli::LogArgs;
use crate::settings::Settings;
use tracing_subscriber::EnvFilter;

/// Initialize logging.
///
/// `--quiet` shows errors only. Otherwise `RUST_LOG` wins, then the configured
/// level raised by each `-v`. Logs go to stderr so command output stays parseable.
pub fn init_logging(args: &LogArgs, settings: &Settings) {
    let filter = if args.quiet {
        EnvFilter::new("error")
    } else {
        let level = match args.verbosity {
            0 => settings.log_level.as_str(),
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if args.json || settings.log_json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
