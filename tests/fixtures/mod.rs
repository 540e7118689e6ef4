// テスト用の被験者ツリーと外部ツールの代替スクリプト
//
// スクリプトは`sh <script>`として起動するため実行権限は不要

#![allow(dead_code)]

use mri_batch::command::CommandTemplate;
use mri_batch::discovery::COMPLETION_MARKER;
use std::fs;
use std::path::{Path, PathBuf};

/// root/<subject>/ses-01/anat/<subject>.nii を作成する
pub fn build_subject_tree(root: &Path, subjects: &[&str]) {
    for subject in subjects {
        let anat = root.join(subject).join("ses-01").join("anat");
        fs::create_dir_all(&anat).unwrap();
        fs::write(anat.join(format!("{subject}.nii")), b"nifti").unwrap();
    }
}

/// recon-all の代替
///
/// `-subjid`と`-sd`から出力先を作り、`failing`に含まれる被験者は
/// scripts/recon-all.error を残して終了コード1で終わる
pub fn fake_recon_all(dir: &Path, failing: &[&str]) -> PathBuf {
    let fail_case = if failing.is_empty() {
        String::new()
    } else {
        format!(
            "case \"$subject\" in\n  {})\n    mkdir -p \"$sd/$subject/scripts\"\n    echo \"ERROR: recon-all exited with ERRORS\" > \"$sd/$subject/scripts/recon-all.error\"\n    exit 1 ;;\nesac\n",
            failing.join("|")
        )
    };

    let body = format!(
        "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    -subjid) subject=\"$2\"; shift 2 ;;\n    -sd) sd=\"$2\"; shift 2 ;;\n    *) shift ;;\n  esac\ndone\n{fail_case}mkdir -p \"$sd/$subject/mri\"\n"
    );
    write_script(dir, "recon-all.sh", &body)
}

/// segmentHA_T1.sh の代替（<subject> <subjects_dir>）
pub fn fake_segment(dir: &Path) -> PathBuf {
    let body = format!("mkdir -p \"$2/$1/mri\"\ntouch \"$2/$1/mri/{COMPLETION_MARKER}\"\n");
    write_script(dir, "segmentHA_T1.sh", &body)
}

/// 常に失敗するスクリプト
pub fn failing_script(dir: &Path, name: &str) -> PathBuf {
    write_script(dir, name, "exit 3\n")
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    path
}

/// `--recon-cmd`に渡す形式のテンプレート
pub fn recon_command_line(script: &Path) -> String {
    format!(
        "sh {} -i {{input}} -subjid {{subject}} -sd {{subjects_dir}} -all",
        script.display()
    )
}

/// `--segment-cmd`に渡す形式のテンプレート
pub fn segment_command_line(script: &Path) -> String {
    format!("sh {} {{subject}} {{subjects_dir}}", script.display())
}

pub fn recon_template(script: &Path) -> CommandTemplate {
    CommandTemplate::parse(&recon_command_line(script)).unwrap()
}

pub fn segment_template(script: &Path) -> CommandTemplate {
    CommandTemplate::parse(&segment_command_line(script)).unwrap()
}
