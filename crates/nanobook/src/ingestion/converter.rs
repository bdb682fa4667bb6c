//! Legacy Office format conversion through a headless LibreOffice

use std::path::Path;

use tokio::process::Command;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Converts `.doc` and `.ppt` files into their OOXML counterparts
#[derive(Debug, Clone)]
pub struct LegacyConverter {
    program: String,
}

impl Default for LegacyConverter {
    fn default() -> Self {
        Self::new("libreoffice")
    }
}

impl LegacyConverter {
    /// Create a converter that runs the given LibreOffice executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Target extension for a legacy file type
    pub fn target_extension(file_type: FileType) -> Option<&'static str> {
        match file_type {
            FileType::Doc => Some("docx"),
            FileType::Ppt => Some("pptx"),
            _ => None,
        }
    }

    /// Convert `data`, returning the converted filename and bytes
    pub async fn convert(&self, filename: &str, data: &[u8]) -> Result<(String, Vec<u8>)> {
        let file_type = FileType::from_filename(filename);
        let output_ext = Self::target_extension(file_type).ok_or_else(|| {
            Error::UnsupportedFileType(format!("{} cannot be converted", file_type.display_name()))
        })?;

        let temp_dir = tempfile::Builder::new()
            .prefix("nanobook-convert-")
            .tempdir()
            .map_err(|e| Error::internal(format!("Failed to create temp dir: {}", e)))?;

        let input_name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.to_string());
        let input_path = temp_dir.path().join(&input_name);
        tokio::fs::write(&input_path, data).await?;

        tracing::debug!("Converting {} to {} with {}", filename, output_ext, self.program);

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg(output_ext)
            .arg("--outdir")
            .arg(temp_dir.path())
            .arg(&input_path)
            .output()
            .await
            .map_err(|e| {
                Error::file_parse(filename, format!("LibreOffice conversion failed: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::file_parse(
                filename,
                format!("LibreOffice error: {}", stderr.trim()),
            ));
        }

        let stem = Path::new(&input_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let converted_name = format!("{}.{}", stem, output_ext);

        let converted = tokio::fs::read(temp_dir.path().join(&converted_name))
            .await
            .map_err(|e| Error::file_parse(filename, format!("Converted file missing: {}", e)))?;

        Ok((converted_name, converted))
    }
}
