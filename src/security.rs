//! Security Module
//!
//! 信頼できない入力ファイルに対する制限を実装するモジュール。
//! 入力サイズの上限、ZIP bomb（エントリ数・展開サイズ）、パストラバーサルを検査します。

use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::XlsxToHtmlError;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の合計最大サイズ（バイト、デフォルト1GB）
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大エントリ数
    pub max_file_count: usize,
    /// 単一エントリの展開後の最大サイズ（バイト、デフォルト100MB）
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト、デフォルト2GB）
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824,
            max_file_count: 10_000,
            max_file_size: 104_857_600,
            max_input_file_size: 2_147_483_648,
        }
    }
}

impl SecurityConfig {
    /// 入力全体をメモリに読み込む
    ///
    /// 上限を1バイトでも超えた時点で読み込みを打ち切り、エラーを返します。
    pub fn read_input<R: Read>(&self, input: R) -> Result<Vec<u8>, XlsxToHtmlError> {
        let mut buffer = Vec::new();
        let bytes_read = input
            .take(self.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;

        if bytes_read as u64 > self.max_input_file_size {
            return Err(XlsxToHtmlError::SecurityViolation(format!(
                "Input file size exceeds maximum: more than {} bytes",
                self.max_input_file_size
            )));
        }

        Ok(buffer)
    }

    /// アーカイブの全エントリを検証する（エントリ数、パス、展開サイズ）
    ///
    /// エントリの中身は展開せず、セントラルディレクトリの申告サイズで判定します。
    pub fn check_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), XlsxToHtmlError> {
        if archive.len() > self.max_file_count {
            return Err(XlsxToHtmlError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index_raw(i)
                .map_err(|e| XlsxToHtmlError::Zip(format!("{}", e)))?;

            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                XlsxToHtmlError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > self.max_file_size {
                return Err(XlsxToHtmlError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, self.max_file_size
                )));
            }

            total = total.checked_add(file_size).ok_or_else(|| {
                XlsxToHtmlError::SecurityViolation(
                    "Total decompressed size calculation overflow".to_string(),
                )
            })?;
            if total > self.max_decompressed_size {
                return Err(XlsxToHtmlError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }
}

/// アーカイブ内のエントリ名を検証する
///
/// 空のパス、絶対パス（`/`、ドライブレター）、`..` を含むパス、`\` 区切りを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || has_drive {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}
