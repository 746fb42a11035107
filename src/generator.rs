//! # Generator
//!
//! Orchestrates one run of the tool:
//! 1. Decode the input image (`generate`, `check`).
//! 2. Emit the declaration and definition artifacts.
//! 3. Write them beside the input, or report what would be written (`dry_run`).
//!
//! `check` regenerates in memory and compares against what is on disk, which
//! lets a CI job fail when someone updates the PNG but forgets to regenerate.

use std::path::{Path, PathBuf};
use anyhow::{Result, Context, bail};
use log::{info, debug, warn};
use crate::assets::AssetOps;
use crate::config::GeneratorConfig;
use crate::emitter::{self, Artifacts, Image};
use crate::inspect;

/// What a generation run produced.
#[derive(Debug, Clone)]
pub struct Report {
    pub width: u32,
    pub height: u32,
    pub byte_len: u64,
    pub header_path: PathBuf,
    pub source_path: PathBuf,
    pub artifacts: Artifacts,
    /// False for dry runs.
    pub written: bool,
}

/// The state of one artifact on disk relative to a fresh emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactState {
    UpToDate,
    Missing,
    /// Same dimensions and bytes, different text (hand edits, older formatting).
    FormattingDiffers,
    /// Dimensions or pixel bytes differ, or the file cannot be parsed.
    ContentDiffers(String),
}

impl ArtifactState {
    pub fn is_up_to_date(&self) -> bool {
        *self == ArtifactState::UpToDate
    }
}

/// Result of `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub header: (PathBuf, ArtifactState),
    pub source: (PathBuf, ArtifactState),
}

impl CheckOutcome {
    pub fn is_up_to_date(&self) -> bool {
        self.header.1.is_up_to_date() && self.source.1.is_up_to_date()
    }
}

/// Decodes the input and writes both artifacts, overwriting any old ones.
///
/// # Arguments
///
/// * `dry_run` - If true, emits the artifacts into the report but writes nothing.
pub fn generate(config: &GeneratorConfig, assets: &impl AssetOps, dry_run: bool) -> Result<Report> {
    if would_overwrite_input(config) {
        bail!("Refusing to overwrite the input {:?} with a generated artifact", config.input);
    }
    let image = load(config, assets)?;
    let artifacts = emitter::emit(&image, &config.header)
        .with_context(|| format!("Failed to emit arrays for {:?}", config.input))?;

    let header_path = config.header_path();
    let source_path = config.source_path();

    if !dry_run {
        // Header first: a source without its header does not compile at all.
        assets.write_artifact(&header_path, &artifacts.declaration)?;
        debug!("Wrote {:?}", header_path);
        assets.write_artifact(&source_path, &artifacts.definition)?;
        debug!("Wrote {:?}", source_path);
        info!("Generated {:?} and {:?} ({}x{}, {} bytes)",
              header_path, source_path, image.width(), image.height(), image.byte_len());
    }

    Ok(Report {
        width: image.width(),
        height: image.height(),
        byte_len: image.byte_len(),
        header_path,
        source_path,
        artifacts,
        written: !dry_run,
    })
}

/// Compares the artifacts on disk with what `generate` would write now.
pub fn check(config: &GeneratorConfig, assets: &impl AssetOps) -> Result<CheckOutcome> {
    let image = load(config, assets)?;
    let fresh = emitter::emit(&image, &config.header)?;

    let header_path = config.header_path();
    let source_path = config.source_path();

    let header_state = stored_state(assets.read_artifact(&header_path)?, &fresh.declaration, |text| {
        compare_declaration(text, &image)
    });
    let source_state = stored_state(assets.read_artifact(&source_path)?, &fresh.definition, |text| {
        compare_definition(text, &image)
    });

    for (path, state) in [(&header_path, &header_state), (&source_path, &source_state)] {
        match state {
            ArtifactState::UpToDate => info!("{:?} is up to date", path),
            ArtifactState::Missing => warn!("{:?} is missing", path),
            ArtifactState::FormattingDiffers => warn!("{:?} has the right data but differs in formatting", path),
            ArtifactState::ContentDiffers(why) => warn!("{:?} is stale: {}", path, why),
        }
    }

    Ok(CheckOutcome {
        header: (header_path, header_state),
        source: (source_path, source_state),
    })
}

fn load(config: &GeneratorConfig, assets: &impl AssetOps) -> Result<Image> {
    let image = assets
        .load_image(&config.input)
        .with_context(|| format!("Input icon {:?} is unavailable or undecodable", config.input))?;
    debug!("Loaded {:?}: {}x{}", config.input, image.width(), image.height());
    Ok(image)
}

fn stored_state(
    stored: Option<Vec<u8>>,
    fresh: &str,
    compare: impl FnOnce(&str) -> ArtifactState,
) -> ArtifactState {
    let Some(bytes) = stored else {
        return ArtifactState::Missing;
    };
    match String::from_utf8(bytes) {
        Ok(text) if text == fresh => ArtifactState::UpToDate,
        Ok(text) => compare(&text),
        Err(e) => ArtifactState::ContentDiffers(format!("not valid UTF-8 text: {}", e.utf8_error())),
    }
}

fn compare_declaration(text: &str, image: &Image) -> ArtifactState {
    match inspect::parse_declaration(text) {
        Err(e) => ArtifactState::ContentDiffers(format!("unreadable declaration: {:#}", e)),
        Ok(d) if (d.width, d.height) != (image.width(), image.height()) => ArtifactState::ContentDiffers(
            format!("declares {}x{}, image is {}x{}", d.width, d.height, image.width(), image.height()),
        ),
        Ok(_) => ArtifactState::FormattingDiffers,
    }
}

fn compare_definition(text: &str, image: &Image) -> ArtifactState {
    let stored = match inspect::parse_definition(text)
        .and_then(|bytes| inspect::pixels_from_bytes(image.width(), image.height(), &bytes))
    {
        Ok(stored) => stored,
        Err(e) => return ArtifactState::ContentDiffers(format!("unreadable definition: {:#}", e)),
    };
    match image.pixels().iter().zip(stored.pixels()).position(|(a, b)| a != b) {
        Some(i) => {
            let width = image.width() as usize;
            ArtifactState::ContentDiffers(format!(
                "first differing pixel at ({}, {})",
                i % width,
                i / width
            ))
        }
        None => ArtifactState::FormattingDiffers,
    }
}

/// Paths `generate` will write for `config`, in write order.
pub fn planned_outputs(config: &GeneratorConfig) -> [PathBuf; 2] {
    [config.header_path(), config.source_path()]
}

/// True if either artifact path resolves to the input image.
pub fn would_overwrite_input(config: &GeneratorConfig) -> bool {
    planned_outputs(config).iter().any(|p| same_path(p, &config.input))
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
