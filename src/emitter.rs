//! # Array Emitter
//!
//! Turns a decoded image into two C++ artifacts:
//!
//! - a **declaration** header exposing `ICON_WIDTH`, `ICON_HEIGHT` and an
//!   `extern` declaration of `ICON_DATA`;
//! - a **definition** source holding the `ICON_DATA` array literal.
//!
//! Pixels are visited row-major (y outer, x inner) and each pixel contributes
//! its channels in R, G, B, A order. The consumer hard-codes
//! `ICON_WIDTH * ICON_HEIGHT * 4` as the array size, so this ordering and
//! length are part of the contract.

use std::io::{self, Write};
use anyhow::{Result, bail, Context};
use log::debug;
use crate::invariants::assert_invariant;

/// Name of the generated array symbol.
pub const ARRAY_NAME: &str = "ICON_DATA";
/// Channels per pixel (RGBA).
pub const CHANNELS: u64 = 4;
/// Channel values per line of the array literal.
pub const VALUES_PER_LINE: u64 = 8;

pub const VALUE_COUNT_RULE: &str = "ICON_DATA holds width * height * 4 values";
pub const BALANCED_BRACES_RULE: &str = "ICON_DATA literal has balanced braces";

/// A decoded RGBA image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Image {
    /// Builds an image, rejecting empty dimensions and mismatched pixel buffers.
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Result<Self> {
        if width == 0 || height == 0 {
            bail!("Image must not be empty (got {}x{})", width, height);
        }
        let expected = u64::from(width) * u64::from(height);
        if pixels.len() as u64 != expected {
            bail!(
                "Pixel buffer holds {} pixels but a {}x{} image needs {}",
                pixels.len(),
                width,
                height,
                expected
            );
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    /// Length of the flat byte sequence, `width * height * 4`.
    pub fn byte_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * CHANNELS
    }

    /// The flat byte sequence: row-major pixels, RGBA per pixel.
    pub fn flat_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.pixels.iter().flat_map(|p| p.iter().copied())
    }
}

impl From<image::RgbaImage> for Image {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        // `pixels()` walks rows top to bottom, left to right.
        let pixels = img.pixels().map(|p| p.0).collect();
        Self { width, height, pixels }
    }
}

/// The two generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// Contents of the header (`#pragma once`, sizes, `extern` declaration).
    pub declaration: String,
    /// Contents of the source file (`#include` plus the array literal).
    pub definition: String,
}

/// Emits both artifacts for `image`. `header_name` is what the definition
/// `#include`s.
pub fn emit(image: &Image, header_name: &str) -> Result<Artifacts> {
    if image.width == 0 || image.height == 0 {
        bail!("Refusing to emit an empty {}x{} image", image.width, image.height);
    }

    let mut buf = Vec::with_capacity(estimated_definition_len(image, header_name));
    write_definition(image, header_name, &mut buf)
        .context("Failed to format the definition artifact")?;
    let definition = String::from_utf8(buf).context("Definition artifact is not valid UTF-8")?;

    assert_invariant(literal_braces_balanced(&definition), BALANCED_BRACES_RULE, Some("Emitter"));

    let declaration = declaration(image);
    debug!(
        "Emitted {}x{} icon: {} values, {} + {} bytes of text",
        image.width,
        image.height,
        image.byte_len(),
        declaration.len(),
        definition.len()
    );

    Ok(Artifacts { declaration, definition })
}

/// Renders the declaration header.
pub fn declaration(image: &Image) -> String {
    format!(
        "#pragma once\n\
         constexpr int ICON_WIDTH = {w};\n\
         constexpr int ICON_HEIGHT = {h};\n\
         extern const char {name}[{w} * {h} * 4];\n",
        w = image.width,
        h = image.height,
        name = ARRAY_NAME,
    )
}

/// Streams the definition artifact into `out`.
///
/// The separator goes in front of every value but the first, so the literal
/// never ends with a dangling `, `. A line break follows every 8th value.
pub fn write_definition<W: Write>(image: &Image, header_name: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "#include \"{}\"", header_name)?;
    writeln!(out, "const char {}[] = {{", ARRAY_NAME)?;
    out.write_all(b"\t")?;

    let mut written: u64 = 0;
    for value in image.flat_bytes() {
        if written > 0 {
            if written % VALUES_PER_LINE == 0 {
                out.write_all(b",\n\t")?;
            } else {
                out.write_all(b", ")?;
            }
        }
        write!(out, "(char){}", value)?;
        written += 1;
    }

    out.write_all(b"\n};\n")?;

    assert_invariant(written == image.byte_len(), VALUE_COUNT_RULE, Some("Emitter"));
    Ok(())
}

/// Brace balance of the `ICON_DATA` initializer only; the `#include` line is
/// not part of the literal.
fn literal_braces_balanced(definition: &str) -> bool {
    let marker = format!("{}[] = ", ARRAY_NAME);
    match definition.rfind(&marker) {
        Some(i) => {
            let literal = &definition[i + marker.len()..];
            literal.matches('{').count() == 1 && literal.matches('}').count() == 1
        }
        None => false,
    }
}

/// Upper bound on the definition size so `emit` allocates once.
fn estimated_definition_len(image: &Image, header_name: &str) -> usize {
    // "(char)255, " is 11 bytes; line breaks add one more per line.
    let values = image.byte_len();
    let body = values * 11 + values / VALUES_PER_LINE * 2;
    let framing = 64 + header_name.len() as u64;
    usize::try_from(body + framing).unwrap_or(usize::MAX)
}
