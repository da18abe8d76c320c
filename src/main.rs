//! explainml - Main Entry Point

use clap::Parser;
use explainml::cli::{cmd_diagnose, cmd_info, Cli, Commands, DiagnoseArgs};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "explainml=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Diagnose { data, target, output, format, config, apply_fixes } => {
            cmd_diagnose(DiagnoseArgs {
                data: &data,
                target: &target,
                output: &output,
                format: format.as_deref(),
                config: config.as_deref(),
                apply_fixes,
            })?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
