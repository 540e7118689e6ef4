// エンドツーエンド統合テスト
// 外部ツールをシェルスクリプトで置き換え、実プロセスを起動して検証する
#![cfg(unix)]

#[path = "../fixtures/mod.rs"]
mod fixtures;

use fixtures::*;
use mri_batch::{
    cli::collect_failures,
    command::SystemCommandRunner,
    core::{ProcessingError, StageStatus},
    discovery::{OutputLayout, SubjectScanner, COMPLETION_MARKER},
    processing::DefaultProcessingConfig,
    App,
};
use std::time::Duration;
use tempfile::TempDir;

fn config(tools: &std::path::Path, failing: &[&str]) -> DefaultProcessingConfig {
    DefaultProcessingConfig::default()
        .with_max_workers(2)
        .with_stage_timeout(Some(Duration::from_secs(60)))
        .with_reconstruction_command(recon_template(&fake_recon_all(tools, failing)))
        .with_segmentation_command(segment_template(&fake_segment(tools)))
}

#[tokio::test]
async fn test_full_run_with_one_failing_reconstruction() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    build_subject_tree(&root, &["A", "B"]);

    let app = App::new(
        SystemCommandRunner::quiet(),
        config(&temp_dir.path().join("tools"), &["B"]),
    );
    let outcome = app.run_full(&root, &OutputLayout::Session).await.unwrap();

    let summary = &outcome.summary;
    assert_eq!(summary.total_subjects, 2);
    assert_eq!(summary.fs_success_count, 1);
    assert_eq!(summary.hc_success_count, 1);
    assert_eq!(summary.failed_fs, vec!["B"]);
    assert!(summary.failed_hc.is_empty());
    assert!(summary.has_failures());

    let b = &outcome.results[1];
    assert_eq!(b.subject, "B");
    assert_eq!(b.reconstruction.status, StageStatus::Failed { exit_code: Some(1) });
    assert!(b.segmentation.is_none());

    // 出力はセッションディレクトリ内のfreesurfer741/に置かれる
    let a_recon = root.join("A/ses-01/freesurfer741/A");
    assert!(SubjectScanner::has_completion_marker(&a_recon));
    assert!(!root.join("B/ses-01/freesurfer741/B/mri").exists());

    let failures = collect_failures(&root).unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].line(), "B: ERROR: recon-all exited with ERRORS");
}

#[tokio::test]
async fn test_full_run_into_output_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    let output = temp_dir.path().join("output");
    build_subject_tree(&root, &["sub-01", "sub-02", "sub-03"]);

    let app = App::new(
        SystemCommandRunner::quiet(),
        config(&temp_dir.path().join("tools"), &[]),
    );
    let outcome = app
        .run_full(&root, &OutputLayout::Directory(output.clone()))
        .await
        .unwrap();

    assert!(!outcome.summary.has_failures());
    assert_eq!(outcome.summary.hc_success_count, 3);
    let subjects: Vec<_> = outcome.results.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["sub-01", "sub-02", "sub-03"]);
    for subject in subjects {
        assert!(output.join(subject).join("mri").join(COMPLETION_MARKER).is_file());
    }
}

#[tokio::test]
async fn test_segmentation_only_resumes_unfinished_subjects() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    let output = temp_dir.path().join("output");
    for subject in ["S01", "S02", "S03"] {
        std::fs::create_dir_all(output.join(subject).join("mri")).unwrap();
    }
    std::fs::write(output.join("S01/mri").join(COMPLETION_MARKER), "done").unwrap();
    std::fs::write(output.join("S03/mri").join(COMPLETION_MARKER), "done").unwrap();
    std::fs::create_dir_all(&root).unwrap();

    let app = App::new(
        SystemCommandRunner::quiet(),
        config(&temp_dir.path().join("tools"), &[]),
    );
    let outcome = app
        .run_segmentation_only(&root, &OutputLayout::Directory(output.clone()), false)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].subject, "S02");
    assert_eq!(outcome.skipped, vec!["S01", "S03"]);
    assert_eq!(outcome.summary.hc_success_count, 1);
    assert!(SubjectScanner::has_completion_marker(&output.join("S02")));
}

#[tokio::test]
async fn test_segmentation_failure_is_reported_per_subject() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    let tools = temp_dir.path().join("tools");
    build_subject_tree(&root, &["A"]);

    let config = DefaultProcessingConfig::default()
        .with_max_workers(1)
        .with_reconstruction_command(recon_template(&fake_recon_all(&tools, &[])))
        .with_segmentation_command(segment_template(&failing_script(&tools, "segment.sh")));
    let app = App::new(SystemCommandRunner::quiet(), config);
    let outcome = app.run_full(&root, &OutputLayout::Session).await.unwrap();

    assert_eq!(outcome.summary.fs_success_count, 1);
    assert_eq!(outcome.summary.hc_success_count, 0);
    assert_eq!(outcome.summary.failed_hc, vec!["A"]);
    let segmentation = outcome.results[0].segmentation.as_ref().unwrap();
    assert_eq!(segmentation.status, StageStatus::Failed { exit_code: Some(3) });
}

#[tokio::test]
async fn test_missing_tool_is_launch_failure() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    build_subject_tree(&root, &["A"]);

    let config = DefaultProcessingConfig::default()
        .with_max_workers(1)
        .with_reconstruction_command(
            mri_batch::command::CommandTemplate::reconstruction()
                .with_program(temp_dir.path().join("no-such-recon-all").display().to_string()),
        );
    let app = App::new(SystemCommandRunner::quiet(), config);
    let outcome = app.run_full(&root, &OutputLayout::Session).await.unwrap();

    assert_eq!(outcome.summary.failed_fs, vec!["A"]);
    assert!(matches!(
        outcome.results[0].reconstruction.status,
        StageStatus::LaunchFailed { .. }
    ));
}

#[tokio::test]
async fn test_duplicate_subject_ids_abort_before_dispatch() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bids");
    build_subject_tree(&root, &["A"]);
    let second = root.join("A/ses-02/anat");
    std::fs::create_dir_all(&second).unwrap();
    std::fs::write(second.join("A.nii"), b"nifti").unwrap();

    let app = App::new(
        SystemCommandRunner::quiet(),
        config(&temp_dir.path().join("tools"), &[]),
    );
    let result = app
        .run_full(&root, &OutputLayout::Directory(temp_dir.path().join("output")))
        .await;

    assert!(matches!(result, Err(ProcessingError::DuplicateSubject { .. })));
    assert!(!temp_dir.path().join("output").exists());
}
