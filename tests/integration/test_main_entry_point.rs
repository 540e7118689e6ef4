// main.rsとエントリーポイントのテスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use fixtures::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mri_batch"));
    // 実行環境の設定がテストに混ざらないようにする
    cmd.env_remove("SUBJECTS_DIR")
        .env_remove("CPU_CORES")
        .env_remove("CONTAINER_NAME");
    cmd
}

#[test]
fn test_cli_help() {
    let output = binary().arg("--help").output().expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("mri_batch"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("check-failures"));
    assert!(stdout.contains("check-segmentation"));
}

#[test]
fn test_cli_version() {
    let output = binary().arg("--version").output().expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("mri_batch"));
}

#[test]
fn test_run_without_directory_exits_with_configuration_error() {
    let output = binary().arg("run").output().expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("SUBJECTS_DIR"));
}

#[test]
fn test_run_missing_directory_exits_with_error() {
    let temp_dir = TempDir::new().unwrap();

    let output = binary()
        .arg("run")
        .arg(temp_dir.path().join("missing"))
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(1));
}

#[cfg(unix)]
#[test]
fn test_run_reports_subject_failures() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    let tools = temp_dir.path().join("tools");
    build_subject_tree(&root, &["A", "B"]);

    let output = binary()
        .arg("run")
        .arg(&root)
        .args(["--cores", "2", "--run-id", "node-1"])
        .arg("--recon-cmd")
        .arg(recon_command_line(&fake_recon_all(&tools, &["B"])))
        .arg("--segment-cmd")
        .arg(segment_command_line(&fake_segment(&tools)))
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(2));

    let log = fs::read_to_string(root.join("mri_logs/node-1.log")).unwrap();
    assert!(log.contains("=== PROCESSING SUMMARY ==="));
    assert!(log.contains("Failed FreeSurfer subjects: B"));
    assert!(log.contains("=== MRI PROCESSING COMPLETE ==="));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("mri_logs/node-1_results.json")).unwrap())
            .unwrap();
    assert_eq!(report["run_id"], "node-1");
    assert_eq!(report["summary"]["total_subjects"], 2);
    assert_eq!(report["summary"]["fs_success_count"], 1);
    assert_eq!(report["summary"]["hc_success_count"], 1);
}

#[cfg(unix)]
#[test]
fn test_hc_only_run_succeeds_when_everything_is_segmented() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    let output_dir = temp_dir.path().join("output");
    let tools = temp_dir.path().join("tools");
    fs::create_dir_all(output_dir.join("S01/mri")).unwrap();
    fs::create_dir_all(&root).unwrap();

    let output = binary()
        .arg("run")
        .arg(&root)
        .arg("--hc-only")
        .arg("--output")
        .arg(&output_dir)
        .args(["--run-id", "hc"])
        .arg("--segment-cmd")
        .arg(segment_command_line(&fake_segment(&tools)))
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(0));
    assert!(output_dir
        .join("S01/mri")
        .join(mri_batch::discovery::COMPLETION_MARKER)
        .is_file());
}
