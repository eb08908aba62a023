pub mod definition;

pub use definition::DefinitionConfig;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use crate::utils::error::Result;
    use crate::utils::logger::LogFormat;
    use crate::utils::validation::{validate_non_empty_string, validate_path, validate_positive_number, Validate};
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "toy-coupler")]
    #[command(about = "Toy coupling model driven by a calendar and a TOML definition file")]
    pub struct CliConfig {
        /// Path to the TOML definition file
        #[arg(short, long, default_value = "toy-coupler.toml")]
        pub config: String,

        /// Context id the toy model runs as
        #[arg(long, default_value = "ocn")]
        pub model_id: String,

        /// Coupled field whose operation frequency drives field output
        #[arg(long, default_value = crate::core::toymodel::DEFAULT_FIELD_ID)]
        pub field_id: String,

        /// Size of the execution group; ranks other than 0 run as servers
        #[arg(long, default_value = "1")]
        pub ranks: usize,

        /// Directory for CSV field output; fields are discarded when absent
        #[arg(long)]
        pub output: Option<String>,

        /// Write the run report as JSON to this path
        #[arg(long)]
        pub report: Option<String>,

        /// Load and validate the definition without running the model
        #[arg(long)]
        pub dry_run: bool,

        /// Log process CPU and memory usage
        #[arg(long)]
        pub monitor: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
        pub log_format: LogFormat,
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_path("config", &self.config)?;
            validate_non_empty_string("model_id", &self.model_id)?;
            validate_non_empty_string("field_id", &self.field_id)?;
            validate_positive_number("ranks", self.ranks, 1)?;
            if let Some(output) = &self.output {
                validate_path("output", output)?;
            }
            if let Some(report) = &self.report {
                validate_path("report", report)?;
            }
            Ok(())
        }
    }

}
