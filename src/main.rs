use clap::Parser;
use mri_batch::{
    cli::{execute_check_failures, execute_check_segmentation, execute_run, Cli, Commands},
    core::ProcessingError,
    reporting::init_console_logging,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => execute_run(args).await,
        Commands::CheckFailures { directory, report } => {
            init_console_logging();
            execute_check_failures(directory, report).await
        }
        Commands::CheckSegmentation { directory, output } => {
            init_console_logging();
            execute_check_segmentation(directory, output).await
        }
    };

    match result {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(error) => {
            report_error(&error);
            ExitCode::FAILURE
        }
    }
}

fn report_error(error: &anyhow::Error) {
    eprintln!("Error: {error:#}");

    if let Some(processing_error) = error.downcast_ref::<ProcessingError>() {
        let context = processing_error.context();
        eprintln!(
            "  severity: {} ({})",
            processing_error.severity().as_str(),
            context.operation
        );
        if let Some(resource) = context.resource {
            eprintln!("  resource: {resource}");
        }
        if let Some(suggestion) = context.suggestion {
            eprintln!("  hint: {suggestion}");
        }
    }
}
