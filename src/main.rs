use anyhow::Context as _;
use clap::Parser;
use toy_coupler::adapters::{CsvSink, NullSink};
use toy_coupler::domain::ports::FieldSink;
use toy_coupler::utils::error::ErrorSeverity;
use toy_coupler::utils::{logger, validation::Validate};
use toy_coupler::{CliConfig, CouplerEngine, DefinitionConfig, ToyModel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose, config.log_format);

    tracing::info!("🚀 Starting toy-coupler");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("📁 Loading definition from: {}", config.config);
    let definition = match DefinitionConfig::from_file(&config.config) {
        Ok(definition) => definition,
        Err(e) => {
            eprintln!("❌ Failed to load definition file '{}': {}", config.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = definition.validate() {
        tracing::error!("❌ Definition validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_definition_summary(&definition, &config);

    if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - definition is valid, model not started");
        return Ok(());
    }

    let sink: Box<dyn FieldSink> = match &config.output {
        Some(dir) => Box::new(CsvSink::new(dir).with_context(|| format!("creating output directory {}", dir))?),
        None => Box::new(NullSink),
    };

    let model = ToyModel::new(config.model_id.clone()).with_field(config.field_id.clone());
    let engine = CouplerEngine::new_with_monitoring(definition, model, config.monitor).with_ranks(config.ranks);

    match engine.run(sink).await {
        Ok(report) => {
            tracing::info!(
                "✅ Coupling finished after {} iterations at {}",
                report.iterations,
                report.final_date
            );
            println!(
                "✅ {} iterations, {} -> {} ({} field writes)",
                report.iterations, report.start_date, report.final_date, report.fields_sent
            );
            if let Some(path) = &config.report {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(path, json).with_context(|| format!("writing report {}", path))?;
                println!("📁 Report saved to: {}", path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Coupling run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_definition_summary(definition: &DefinitionConfig, config: &CliConfig) {
    tracing::info!("📋 Simulation: {}", definition.simulation.name);
    if let Some(description) = &definition.simulation.description {
        tracing::info!("   {}", description);
    }
    for context in &definition.contexts {
        tracing::info!(
            "   context '{}': {} calendar from {}, {} variables, {} domains, {} fields",
            context.id,
            context.calendar.kind,
            context.calendar.start_date,
            context.variables.len(),
            context.domains.len(),
            context.fields.len()
        );
    }
    tracing::info!("   model '{}' on {} rank(s)", config.model_id, config.ranks);
}
