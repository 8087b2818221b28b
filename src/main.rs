use clap::Parser;
use sheet_reconcile::{
    AppConfig, CliArgs, ComparisonReport, LoggingConfig, OutputFormat, init_logging,
    run_comparison,
};

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    if cli.print_schema {
        let schema = schemars::schema_for!(ComparisonReport);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = AppConfig::from_args(cli)?;

    // Fail fast before reading any workbook
    config.validate()?;

    let report = run_comparison(&config)?;
    match config.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
