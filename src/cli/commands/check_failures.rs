use super::CommandStatus;
use crate::discovery::SubjectScanner;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// recon-all.error 1件分の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub subject: String,
    pub log_path: PathBuf,
    /// ログの最終行（失敗したステップが記録されている）
    pub last_line: String,
}

impl FailureEntry {
    pub fn line(&self) -> String {
        format!("{}: {}", self.subject, self.last_line)
    }
}

/// ディレクトリ配下の recon-all.error を集める
///
/// ログは <subject>/scripts/recon-all.error に置かれる
pub fn collect_failures(directory: &Path) -> Result<Vec<FailureEntry>> {
    let mut entries = Vec::new();

    for log_path in SubjectScanner::find_error_logs(directory)? {
        let subject = log_path
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let bytes = std::fs::read(&log_path)
            .with_context(|| format!("ログを読み込めません: {}", log_path.display()))?;
        let last_line = String::from_utf8_lossy(&bytes)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();

        entries.push(FailureEntry {
            subject,
            log_path,
            last_line,
        });
    }

    Ok(entries)
}

/// recon-allが失敗した被験者を報告する
pub async fn execute_check_failures(directory: PathBuf, report: Option<PathBuf>) -> Result<CommandStatus> {
    if !directory.is_dir() {
        anyhow::bail!("Directory does not exist: {}", directory.display());
    }

    let failures = collect_failures(&directory)?;
    println!("{} recon-all.error logs found", failures.len());

    for entry in &failures {
        println!("{}", entry.line());
    }

    if let Some(report) = report {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&report)
            .with_context(|| format!("レポートファイルを開けません: {}", report.display()))?;
        for entry in &failures {
            writeln!(file, "{}", entry.line())?;
        }
        println!("Failures appended to {}", report.display());
    }

    Ok(CommandStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_error_log(root: &Path, subject: &str, content: &str) {
        let scripts = root.join(subject).join("scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("recon-all.error"), content).unwrap();
    }

    #[test]
    fn test_collect_failures_reads_last_line() {
        let temp_dir = TempDir::new().unwrap();
        write_error_log(temp_dir.path(), "sub-02", "step 1\nERROR: mri_ca_register\n\n");
        write_error_log(temp_dir.path(), "sub-01", "ERROR: talairach failed\n");
        fs::create_dir_all(temp_dir.path().join("sub-03/scripts")).unwrap();

        let failures = collect_failures(temp_dir.path()).unwrap();

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].line(), "sub-01: ERROR: talairach failed");
        assert_eq!(failures[1].line(), "sub-02: ERROR: mri_ca_register");
    }

    #[tokio::test]
    async fn test_execute_check_failures_appends_report() {
        let temp_dir = TempDir::new().unwrap();
        let subjects = temp_dir.path().join("output");
        write_error_log(&subjects, "sub-01", "ERROR: talairach failed\n");
        let report = temp_dir.path().join("FS_log.txt");
        fs::write(&report, "previous run\n").unwrap();

        let status = execute_check_failures(subjects, Some(report.clone())).await.unwrap();

        assert_eq!(status, CommandStatus::Success);
        assert_eq!(
            fs::read_to_string(&report).unwrap(),
            "previous run\nsub-01: ERROR: talairach failed\n"
        );
    }

    #[tokio::test]
    async fn test_execute_check_failures_missing_directory() {
        let temp_dir = TempDir::new().unwrap();

        let result = execute_check_failures(temp_dir.path().join("missing"), None).await;
        assert!(result.is_err());
    }
}
