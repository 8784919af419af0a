use std::fs;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 写入只包含路径的配置文件，所有文件都放在临时目录中
fn write_config(dir: &assert_fs::TempDir) -> Result<std::path::PathBuf> {
    let config = serde_json::json!({
        "database_file": dir.path().join("meta.db"),
        "image_index_file": dir.path().join("image.index"),
        "text_index_file": dir.path().join("text.index"),
    });
    let path = dir.path().join("config.json");
    fs::write(&path, serde_json::to_string(&config)?)?;
    Ok(path)
}

#[rstest]
#[case::root(&["--help"])]
#[case::index(&["index", "--help"])]
#[case::search(&["search", "--help"])]
#[case::show(&["show", "--help"])]
#[case::server(&["server", "--help"])]
fn help(#[case] args: &[&str]) -> Result<()> {
    Command::cargo_bin("memesearch")?.args(args).assert().success();
    Ok(())
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
fn search_empty_query(#[case] query: &str) -> Result<()> {
    cargo_run!("memesearch", "search", query)
        .failure()
        .stderr(predicate::str::contains("查询文本不能为空"));
    Ok(())
}

#[test]
fn missing_config_file() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    cargo_run!("memesearch", "-c", dir.path().join("nope.json"), "show", "1")
        .failure()
        .stderr(predicate::str::contains("配置错误"));
    Ok(())
}

#[test]
fn invalid_config_file() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "search_params": { "rrf_k": 0 } }"#)?;
    cargo_run!("memesearch", "-c", &path, "show", "1")
        .failure()
        .stderr(predicate::str::contains("rrf_k"));
    Ok(())
}

#[test]
fn show_without_database() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let config = write_config(&dir)?;
    cargo_run!("memesearch", "-c", &config, "show", "1")
        .failure()
        .stderr(predicate::str::contains("数据库不存在"));
    assert!(!dir.path().join("meta.db").exists());
    Ok(())
}

#[test]
fn index_missing_directory() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let config = write_config(&dir)?;
    cargo_run!("memesearch", "-c", &config, "index", dir.path().join("nope"))
        .failure()
        .stderr(predicate::str::contains("目录不存在"));
    Ok(())
}

#[test]
fn invalid_output_format() -> Result<()> {
    cargo_run!("memesearch", "search", "cat", "--output-format", "xml").failure();
    Ok(())
}
