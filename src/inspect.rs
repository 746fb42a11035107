//! # Artifact Inspection
//!
//! Reads previously generated artifacts back into numbers: the declared
//! dimensions from the header and the byte values from the array literal.
//! `check` uses this to tell pixel changes apart from formatting changes.

use anyhow::{Result, Context, bail, anyhow};
use crate::emitter::{Image, ARRAY_NAME, CHANNELS};

/// Dimensions declared by a header artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declared {
    pub width: u32,
    pub height: u32,
}

impl Declared {
    pub fn byte_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * CHANNELS
    }
}

/// Parses `ICON_WIDTH`, `ICON_HEIGHT` and the `extern` array size from a header.
///
/// The size expression must evaluate to `width * height * 4`.
pub fn parse_declaration(text: &str) -> Result<Declared> {
    let width = constant(text, "ICON_WIDTH")?;
    let height = constant(text, "ICON_HEIGHT")?;
    let declared = Declared { width, height };

    let extern_prefix = format!("extern const char {}[", ARRAY_NAME);
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with(&extern_prefix))
        .ok_or_else(|| anyhow!("No extern declaration of {}", ARRAY_NAME))?;
    let expr = line[extern_prefix.len()..]
        .split(']')
        .next()
        .unwrap_or_default();
    let size = eval_product(expr).with_context(|| format!("Bad array size expression '{}'", expr))?;

    if size != declared.byte_len() {
        bail!(
            "Declared {} size {} does not match {}x{}x4 = {}",
            ARRAY_NAME,
            size,
            width,
            height,
            declared.byte_len()
        );
    }
    Ok(declared)
}

/// Extracts the byte values of the `ICON_DATA` initializer.
///
/// Accepts `(char)N` casts and bare integers; negative values are read as
/// signed chars and wrapped back into `0..=255`.
pub fn parse_definition(text: &str) -> Result<Vec<u8>> {
    let marker = format!("{}[] = {{", ARRAY_NAME);
    let start = text
        .find(&marker)
        .map(|i| i + marker.len())
        .ok_or_else(|| anyhow!("No definition of {}", ARRAY_NAME))?;
    let len = text[start..]
        .find('}')
        .ok_or_else(|| anyhow!("Unterminated {} literal", ARRAY_NAME))?;
    let body = &text[start..start + len];

    let tokens: Vec<&str> = body.split(',').map(str::trim).collect();
    let last = tokens.len() - 1;
    let mut bytes = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().copied().enumerate() {
        if token.is_empty() {
            // An empty list or a single trailing comma is legal C++.
            if i == last && (i == 0 || !tokens[i - 1].is_empty()) {
                continue;
            }
            bail!("Empty value at position {} of {}", i, ARRAY_NAME);
        }
        let digits = token.strip_prefix("(char)").unwrap_or(token).trim();
        let value: i16 = digits
            .parse()
            .with_context(|| format!("Value '{}' at position {} is not an integer", token, i))?;
        if !(-128..=255).contains(&value) {
            bail!("Value {} at position {} does not fit in a byte", value, i);
        }
        bytes.push(value as u8);
    }
    Ok(bytes)
}

/// Rebuilds an image from a flat RGBA byte sequence, row-major.
pub fn pixels_from_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Image> {
    let expected = u64::from(width) * u64::from(height) * CHANNELS;
    if bytes.len() as u64 != expected {
        bail!("Expected {} bytes for a {}x{} image, found {}", expected, width, height, bytes.len());
    }
    let pixels = bytes
        .chunks_exact(CHANNELS as usize)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();
    Image::new(width, height, pixels)
}

fn constant(text: &str, name: &str) -> Result<u32> {
    let prefix = format!("constexpr int {} =", name);
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with(&prefix))
        .ok_or_else(|| anyhow!("Missing {}", name))?;
    let value = line[prefix.len()..].trim().trim_end_matches(';').trim();
    value.parse().with_context(|| format!("{} is not a non-negative integer: '{}'", name, value))
}

fn eval_product(expr: &str) -> Result<u64> {
    expr.split('*').try_fold(1u64, |acc, factor| -> Result<u64> {
        let n: u64 = factor.trim().parse()?;
        acc.checked_mul(n).ok_or_else(|| anyhow!("overflow"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "#pragma once\n\
                          constexpr int ICON_WIDTH = 3;\n\
                          constexpr int ICON_HEIGHT = 2;\n\
                          extern const char ICON_DATA[3 * 2 * 4];\n";

    #[test]
    fn reads_declared_dimensions() {
        let declared = parse_declaration(HEADER).unwrap();
        assert_eq!(declared, Declared { width: 3, height: 2 });
        assert_eq!(declared.byte_len(), 24);
    }

    #[test]
    fn rejects_inconsistent_array_size() {
        let header = HEADER.replace("[3 * 2 * 4]", "[3 * 2 * 3]");
        let err = parse_declaration(&header).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn accepts_folded_array_size() {
        let header = HEADER.replace("[3 * 2 * 4]", "[24]");
        assert!(parse_declaration(&header).is_ok());
    }

    #[test]
    fn missing_constant_is_an_error() {
        let header = HEADER.replace("ICON_HEIGHT", "ICON_DEPTH");
        assert!(parse_declaration(&header).is_err());
    }

    #[test]
    fn reads_casts_bare_values_and_signed_chars() {
        let src = "#include \"icon.h\"\nconst char ICON_DATA[] = {\n\t(char)255, 7,\n\t-1, (char) 0\n};\n";
        assert_eq!(parse_definition(src).unwrap(), vec![255, 7, 255, 0]);
    }

    #[test]
    fn tolerates_single_trailing_comma() {
        let src = "const char ICON_DATA[] = { (char)1, (char)2, };";
        assert_eq!(parse_definition(src).unwrap(), vec![1, 2]);
    }

    #[test]
    fn rejects_garbage_values() {
        assert!(parse_definition("const char ICON_DATA[] = { (char)1, x };").is_err());
        assert!(parse_definition("const char ICON_DATA[] = { 300 };").is_err());
        assert!(parse_definition("const char ICON_DATA[] = { 1,, 2 };").is_err());
        assert!(parse_definition("const char OTHER[] = { 1 };").is_err());
    }

    #[test]
    fn regroups_bytes_into_pixels() {
        let img = pixels_from_bytes(2, 1, &[255, 0, 0, 255, 0, 255, 0, 128]).unwrap();
        assert_eq!(img.pixels(), &[[255, 0, 0, 255], [0, 255, 0, 128]]);
        assert!(pixels_from_bytes(2, 1, &[1, 2, 3]).is_err());
    }
}
