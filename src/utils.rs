use std::path::{Path, PathBuf};

use indicatif::ProgressStyle;
use regex::Regex;
use walkdir::WalkDir;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {wide_msg}",
    )
    .expect("failed to build progress style")
}

/// 根据逗号分隔的后缀名构建正则，忽略大小写
pub fn suffix_regex(suffix: &str) -> Regex {
    let alternation = suffix
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| regex::escape(s.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)^({alternation})$")).expect("failed to build regex")
}

/// 递归扫描目录，返回后缀名符合条件的文件，按文件名排序
pub fn scan_images(dir: impl AsRef<Path>, regex_suf: &Regex) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension().is_some_and(|ext| regex_suf.is_match(&ext.to_string_lossy()))
        })
        .collect()
}
