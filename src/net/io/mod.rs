//! I/O 支持：PNML 交换格式读写、DOT 可视化导出以及 JSON 报告序列化。
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::net::error::NetError;

pub mod dot;
pub mod pnml;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Net(#[from] NetError),
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let content = to_json_string(value)?;
    write_text(path, &content)?;
    Ok(())
}

/// Writes `content` to `path`, creating missing parent directories.
pub fn write_text<P: AsRef<Path>>(path: P, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())
}

/// Escapes text for use inside a double-quoted attribute or label.
pub(crate) fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
