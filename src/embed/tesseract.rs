use std::path::Path;
use std::process::Command;

use log::debug;

use super::Ocr;
use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// 调用 tesseract 命令行识别图片中的文字
pub struct TesseractOcr {
    command: String,
    languages: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self { command: config.command.clone(), languages: config.languages.join("+") }
    }
}

impl Ocr for TesseractOcr {
    fn extract_text(&self, path: &Path) -> Result<String> {
        debug!("OCR: {}", path.display());
        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .args(["-l", &self.languages])
            .output()
            .map_err(|e| Error::OcrExtraction(format!("无法执行 {}: {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::OcrExtraction(format!("{}: {}", output.status, stderr.trim())));
        }

        // 多行、多段落的结果合并成一行
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}
