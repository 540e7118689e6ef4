// 被験者ファイルの発見
//
// 入力: root/<subjectID>/<session>/anat/*.nii
// 再構成出力: root/<subjectID>/<session>/freesurfer741/<subject>

use crate::core::{ProcessingError, ProcessingResult, WorkItem};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 入力スキャンが置かれるディレクトリ名
pub const SCAN_DIR_NAME: &str = "anat";
/// 入力スキャンの拡張子
pub const SCAN_EXTENSION: &str = "nii";
/// 再構成出力を置くディレクトリ名（anatと同じ階層）
pub const RECON_DIR_NAME: &str = "freesurfer741";
/// セグメンテーション完了を示すファイル（<recon>/mri/ 配下）
pub const COMPLETION_MARKER: &str = "lh.hippoSfVolumes-T1.v22.txt";
/// recon-allが失敗時に残すログファイル名
pub const ERROR_LOG_NAME: &str = "recon-all.error";

/// 再構成出力の配置方法
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// セッションディレクトリ内の freesurfer741/ に出力
    #[default]
    Session,
    /// 全被験者を指定ディレクトリ直下に出力
    Directory(PathBuf),
}

impl OutputLayout {
    /// スキャンファイルに対応するSUBJECTS_DIRを求める
    pub fn subjects_dir_for(&self, scan_path: &Path) -> Option<PathBuf> {
        match self {
            Self::Session => Some(scan_path.parent()?.parent()?.join(RECON_DIR_NAME)),
            Self::Directory(dir) => Some(dir.clone()),
        }
    }
}

/// セグメンテーションのみモードの実行計画
#[derive(Debug, Clone, Default)]
pub struct SegmentationPlan {
    /// セグメンテーションを実行する被験者
    pub pending: Vec<WorkItem>,
    /// 完了マーカーがあるためスキップする被験者
    pub skipped: Vec<String>,
}

pub struct SubjectScanner;

impl SubjectScanner {
    /// anat/ 直下の .nii ファイルを全て列挙する（パス順）
    pub fn find_scan_files(root: &Path) -> ProcessingResult<Vec<PathBuf>> {
        Self::ensure_directory(root)?;

        let mut file_paths = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| Self::walk_error(root, e))?;

            if Self::is_regular_or_linked_file(&entry) && Self::is_scan_file(entry.path()) {
                file_paths.push(entry.path().to_path_buf());
            }
        }

        file_paths.sort();
        Ok(file_paths)
    }

    /// スキャンファイルを作業単位に変換する
    ///
    /// 同じ被験者IDが2回現れた場合は発見処理のバグとみなしてエラーにする
    pub fn discover_work_items(root: &Path, layout: &OutputLayout) -> ProcessingResult<Vec<WorkItem>> {
        let scans = Self::find_scan_files(root)?;
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut items = Vec::with_capacity(scans.len());

        for scan in scans {
            let item = layout
                .subjects_dir_for(&scan)
                .and_then(|subjects_dir| WorkItem::new(&scan, subjects_dir))
                .ok_or_else(|| {
                    ProcessingError::file_discovery(
                        scan.display().to_string(),
                        anyhow::anyhow!("被験者IDを決定できません"),
                    )
                })?;

            if let Some(first) = seen.get(item.subject()) {
                return Err(ProcessingError::duplicate_subject(
                    item.subject(),
                    first.display().to_string(),
                    scan.display().to_string(),
                ));
            }
            seen.insert(item.subject().to_string(), scan);
            items.push(item);
        }

        Ok(items)
    }

    /// 既存の再構成ディレクトリを列挙する
    ///
    /// Session: root/*/*/freesurfer741/* 、Directory: <output>/*
    /// シンボリックリンク（recon-allが作るfsaverage等）は対象外
    pub fn find_reconstructions(root: &Path, layout: &OutputLayout) -> ProcessingResult<Vec<PathBuf>> {
        let (base, depth) = match layout {
            OutputLayout::Session => (root, 4),
            OutputLayout::Directory(dir) => (dir.as_path(), 1),
        };
        Self::ensure_directory(base)?;

        let mut dirs = Vec::new();
        for entry in WalkDir::new(base).min_depth(depth).max_depth(depth) {
            let entry = entry.map_err(|e| Self::walk_error(base, e))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let in_recon_dir = match layout {
                OutputLayout::Session => Self::parent_named(entry.path(), RECON_DIR_NAME),
                OutputLayout::Directory(_) => true,
            };
            if in_recon_dir {
                dirs.push(entry.path().to_path_buf());
            }
        }

        dirs.sort();
        Ok(dirs)
    }

    /// 既存の再構成ディレクトリからセグメンテーション対象を決める
    ///
    /// `force`がfalseなら完了マーカーのある被験者はスキップに回す
    pub fn plan_segmentation(
        root: &Path,
        layout: &OutputLayout,
        force: bool,
    ) -> ProcessingResult<SegmentationPlan> {
        let mut plan = SegmentationPlan::default();

        for dir in Self::find_reconstructions(root, layout)? {
            let item = WorkItem::from_reconstruction(&dir).ok_or_else(|| {
                ProcessingError::file_discovery(
                    dir.display().to_string(),
                    anyhow::anyhow!("被験者IDを決定できません"),
                )
            })?;

            if !force && Self::has_completion_marker(&dir) {
                plan.skipped.push(item.subject().to_string());
            } else {
                plan.pending.push(item);
            }
        }
        Ok(plan)
    }

    /// セグメンテーション完了マーカーが存在するか
    pub fn has_completion_marker(recon_dir: &Path) -> bool {
        recon_dir.join("mri").join(COMPLETION_MARKER).is_file()
    }

    /// recon-all.error ログを列挙する
    pub fn find_error_logs(root: &Path) -> ProcessingResult<Vec<PathBuf>> {
        Self::ensure_directory(root)?;

        let mut logs = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| Self::walk_error(root, e))?;
            if Self::is_regular_or_linked_file(&entry)
                && entry.file_name().to_string_lossy().contains(ERROR_LOG_NAME)
            {
                logs.push(entry.path().to_path_buf());
            }
        }

        logs.sort();
        Ok(logs)
    }

    /// 通常ファイル、またはファイルを指すシンボリックリンク（git-annex/DataLadのツリー）
    fn is_regular_or_linked_file(entry: &walkdir::DirEntry) -> bool {
        entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
    }

    fn is_scan_file(path: &Path) -> bool {
        // 派生ファイル(.nii.gz等)や中間ファイルを拾わないよう完全一致のみ
        Self::parent_named(path, SCAN_DIR_NAME)
            && path.extension().is_some_and(|ext| ext == SCAN_EXTENSION)
    }

    fn parent_named(path: &Path, name: &str) -> bool {
        path.parent()
            .and_then(Path::file_name)
            .is_some_and(|parent| parent == name)
    }

    fn ensure_directory(root: &Path) -> ProcessingResult<()> {
        if !root.is_dir() {
            return Err(ProcessingError::file_discovery(
                root.display().to_string(),
                anyhow::anyhow!("ディレクトリが存在しません"),
            ));
        }
        Ok(())
    }

    fn walk_error(root: &Path, error: walkdir::Error) -> ProcessingError {
        ProcessingError::file_discovery(root.display().to_string(), error.into())
    }
}
