use anyhow::{Context, Result};
use log::{debug, info};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::models::Swagger;

/// Base name of every generated file
const OUTPUT_BASENAME: &str = "swagger";

/// Writes a built Swagger document to disk
pub struct Generator {
    swagger: Swagger,
}

impl Generator {
    pub fn new(swagger: Swagger) -> Self {
        Self { swagger }
    }

    /// Writes the document in each requested format (`json`, `yaml`)
    pub fn generate(&self, output_dir: impl AsRef<Path>, output_types: &[String]) -> Result<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();

        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

        let mut written = Vec::new();
        for output_type in output_types {
            match output_type.as_str() {
                "json" => written.push(self.generate_json(output_dir)?),
                "yaml" => written.push(self.generate_yaml(output_dir)?),
                _ => debug!("Unknown output type: {}", output_type),
            }
        }

        Ok(written)
    }

    fn generate_json(&self, output_dir: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(&self.swagger)
            .context("Failed to serialize Swagger document to JSON")?;
        write_file(output_dir, "json", &json)
    }

    fn generate_yaml(&self, output_dir: &Path) -> Result<PathBuf> {
        let yaml = serde_yaml::to_string(&self.swagger)
            .context("Failed to serialize Swagger document to YAML")?;
        write_file(output_dir, "yaml", &yaml)
    }
}

fn write_file(output_dir: &Path, file_ext: &str, content: &str) -> Result<PathBuf> {
    let file_path = output_dir.join(format!("{}.{}", OUTPUT_BASENAME, file_ext));
    let mut file = File::create(&file_path)
        .with_context(|| format!("Failed to create file: {:?}", file_path))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file: {:?}", file_path))?;

    info!("Generated file: {:?}", file_path);
    Ok(file_path)
}
