use super::CommandStatus;
use crate::discovery::{OutputLayout, SubjectScanner};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// 完了マーカーのない再構成ディレクトリを列挙する
pub fn find_missing_segmentations(directory: &Path, layout: &OutputLayout) -> Result<Vec<PathBuf>> {
    let missing = SubjectScanner::find_reconstructions(directory, layout)?
        .into_iter()
        .filter(|dir| !SubjectScanner::has_completion_marker(dir))
        .collect();
    Ok(missing)
}

/// 海馬セグメンテーションが未完了の被験者を報告する
pub async fn execute_check_segmentation(directory: PathBuf, output: Option<PathBuf>) -> Result<CommandStatus> {
    let layout = output.map(OutputLayout::Directory).unwrap_or_default();
    let missing = find_missing_segmentations(&directory, &layout)?;

    if missing.is_empty() {
        println!("All reconstructions have a hippocampal segmentation");
        return Ok(CommandStatus::Success);
    }

    println!("{} reconstructions without hippocampal segmentation:", missing.len());
    for dir in &missing {
        println!("  {}", dir.display());
    }
    Ok(CommandStatus::Success)
}
