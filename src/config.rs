//! # Generator Configuration
//!
//! Where the icon is read from and where the two artifacts go. Values come
//! from three layers, later ones winning: built-in defaults, an optional JSON
//! file, then command-line flags.
//!
//! ```json
//! { "input": "assets/icon.png", "out_dir": "src/generated", "header": "icon.h", "source": "icon.cpp" }
//! ```

use std::path::{Path, PathBuf};
use anyhow::{Result, Context, bail};
use log::debug;
use serde::Deserialize;

pub const DEFAULT_INPUT: &str = "icon.png";
pub const DEFAULT_HEADER: &str = "icon.h";
pub const DEFAULT_SOURCE: &str = "icon.cpp";

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// The PNG to embed.
    pub input: PathBuf,
    /// Directory for the artifacts. `None` means beside the input.
    pub out_dir: Option<PathBuf>,
    /// File name of the declaration artifact. Also what the definition `#include`s.
    pub header: String,
    /// File name of the definition artifact.
    pub source: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            out_dir: None,
            header: DEFAULT_HEADER.to_string(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Command-line values that replace whatever the config file says.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub header: Option<String>,
    pub source: Option<String>,
}

impl GeneratorConfig {
    /// Parses a JSON config. Missing fields keep their defaults.
    ///
    /// Relative paths inside the file are resolved against the file's own directory.
    pub fn from_json(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text).context("Invalid config JSON")?;
        if config.input.is_relative() {
            config.input = base_dir.join(&config.input);
        }
        if let Some(dir) = config.out_dir.as_mut().filter(|d| d.is_relative()) {
            *dir = base_dir.join(&*dir);
        }
        Ok(config)
    }

    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let config = Self::from_json(&text, base)
            .with_context(|| format!("Failed to load config {:?}", path))?;
        debug!("Loaded config from {:?}: {:?}", path, config);
        Ok(config)
    }

    /// Builds the final config: defaults, then `file` if given, then `overrides`.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(input) = overrides.input {
            self.input = input;
        }
        if let Some(dir) = overrides.out_dir {
            self.out_dir = Some(dir);
        }
        if let Some(header) = overrides.header {
            self.header = header;
        }
        if let Some(source) = overrides.source {
            self.source = source;
        }
    }

    /// Artifact names must be distinct, plain file names.
    pub fn validate(&self) -> Result<()> {
        for (what, name) in [("header", &self.header), ("source", &self.source)] {
            if name.trim().is_empty() {
                bail!("The {} file name must not be empty", what);
            }
            if name.contains('/') || name.contains('\\') {
                bail!("The {} file name '{}' must not contain a path; use out_dir instead", what, name);
            }
            if name.contains('"') {
                bail!("The {} file name '{}' must not contain quotes", what, name);
            }
        }
        if self.header == self.source {
            bail!("Header and source would both be written to '{}'", self.header);
        }
        Ok(())
    }

    /// Directory receiving the artifacts.
    pub fn output_dir(&self) -> PathBuf {
        match &self.out_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    pub fn header_path(&self) -> PathBuf {
        self.output_dir().join(&self.header)
    }

    pub fn source_path(&self) -> PathBuf {
        self.output_dir().join(&self.source)
    }
}
