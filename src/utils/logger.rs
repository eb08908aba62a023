use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

fn default_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose {
        "toy_coupler=debug,info"
    } else {
        "toy_coupler=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

pub fn init_cli_logger(verbose: bool, format: LogFormat) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(default_filter(verbose))
            .with(fmt_layer.with_thread_names(true).compact())
            .init(),
        // JSON lines for batch schedulers that collect job logs
        LogFormat::Json => tracing_subscriber::registry()
            .with(default_filter(verbose))
            .with(fmt_layer.json())
            .init(),
    }
}
