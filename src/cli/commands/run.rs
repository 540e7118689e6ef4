use super::CommandStatus;
use crate::cli::RunArgs;
use crate::command::{CommandTemplate, SystemCommandRunner};
use crate::core::{ProcessingError, ProcessingResult};
use crate::discovery::OutputLayout;
use crate::processing::{DefaultProcessingConfig, ProcessingConfig};
use crate::reporting::{init_logging, resolve_run_id, JsonReportWriter, LogConfig, RunReport};
use crate::App;
use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// ログディレクトリ未指定時に<DIRECTORY>直下に作るディレクトリ名
pub const DEFAULT_LOG_DIR_NAME: &str = "mri_logs";

/// 全被験者のバッチ処理を実行する
pub async fn execute_run(args: RunArgs) -> Result<CommandStatus> {
    let directory = args.directory.clone().ok_or_else(|| {
        ProcessingError::configuration("対象ディレクトリを引数またはSUBJECTS_DIRで指定してください")
    })?;
    let config = build_config(&args)?;

    let log_config = LogConfig::new(
        args.log_dir
            .clone()
            .unwrap_or_else(|| directory.join(DEFAULT_LOG_DIR_NAME)),
        resolve_run_id(args.run_id.as_deref()),
    );
    let log_file = init_logging(&log_config)?;

    info!("Starting MRI processing on {}", log_config.run_id);
    info!("Log file: {}", log_file.display());
    info!("Using {} CPU cores", config.max_workers());
    info!("Processing directory: {}", directory.display());

    let layout = output_layout(args.output.clone());
    let app = App::new(SystemCommandRunner::new(), config);

    let outcome = if args.hc_only {
        app.run_segmentation_only(&directory, &layout, args.force).await
    } else {
        app.run_full(&directory, &layout).await
    };
    let outcome = outcome.inspect_err(|e| error!("Run aborted: {e}"))?;

    outcome.summary.log();

    let writer = JsonReportWriter::new(log_config.report_file());
    writer.write(&RunReport {
        generated_at: Local::now(),
        run_id: &log_config.run_id,
        skipped: &outcome.skipped,
        summary: &outcome.summary,
        results: &outcome.results,
    })?;
    info!("Results written to {}", writer.output_path().display());

    if outcome.summary.has_failures() {
        Ok(CommandStatus::SubjectFailures)
    } else {
        Ok(CommandStatus::Success)
    }
}

/// コマンドライン引数から実行設定を組み立てる
pub fn build_config(args: &RunArgs) -> ProcessingResult<DefaultProcessingConfig> {
    let mut config = DefaultProcessingConfig::default()
        .with_stage_timeout(stage_timeout(args.timeout_hours))
        .with_reconstruction_command(command_template(
            args.recon_cmd.as_deref(),
            CommandTemplate::reconstruction(),
        )?)
        .with_segmentation_command(command_template(
            args.segment_cmd.as_deref(),
            CommandTemplate::segmentation(),
        )?);

    if let Some(cores) = args.cores {
        config = config.with_max_workers(cores);
    }

    config.validate()?;
    Ok(config)
}

/// `{subject}`を含む値はテンプレート全体、それ以外は実行ファイルの差し替えとして扱う
///
/// 実行ファイルのみの指定に引数が混ざっている場合は設定エラー
fn command_template(value: Option<&str>, default: CommandTemplate) -> ProcessingResult<CommandTemplate> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(template) if template.contains("{subject}") => CommandTemplate::parse(template),
        Some(program) if program.split_whitespace().nth(1).is_some() => {
            Err(ProcessingError::configuration(format!(
                "引数を指定する場合は{{subject}}を含むテンプレート全体を指定してください: {program}"
            )))
        }
        Some(program) => Ok(default.with_program(program)),
    }
}

fn stage_timeout(hours: u64) -> Option<Duration> {
    (hours > 0).then(|| Duration::from_secs(hours.saturating_mul(60 * 60)))
}

fn output_layout(output: Option<PathBuf>) -> OutputLayout {
    output.map(OutputLayout::Directory).unwrap_or_default()
}
