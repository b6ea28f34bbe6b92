// src/bundle/source_map.rs

//! Minimal source map v3 writer (and a decoder for inspecting its output).

use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Serialized form of a v3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

/// One decoded mapping segment (absolute values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: i64,
    pub source: i64,
    pub original_line: i64,
    pub original_column: i64,
}

/// Builds a map where each mapped generated line starts with exactly one
/// segment pointing at column 0 of an original line.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    sources: Vec<String>,
    contents: Vec<String>,
    /// `(generated_line, source, original_line)`, in generated order.
    lines: Vec<(usize, usize, usize)>,
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its index.
    pub fn add_source(&mut self, path: impl Into<String>, content: impl Into<String>) -> usize {
        self.sources.push(path.into());
        self.contents.push(content.into());
        self.sources.len() - 1
    }

    pub fn map_line(&mut self, generated_line: usize, source: usize, original_line: usize) {
        self.lines.push((generated_line, source, original_line));
    }

    pub fn build(self, file: impl Into<String>) -> SourceMap {
        let mut mappings = String::new();
        let mut current_line = 0usize;
        let mut prev_source = 0i64;
        let mut prev_original_line = 0i64;

        for (generated_line, source, original_line) in self.lines {
            while current_line < generated_line {
                mappings.push(';');
                current_line += 1;
            }
            // Generated column resets each line; every other field is relative
            // to the previous segment.
            encode_vlq(&mut mappings, 0);
            encode_vlq(&mut mappings, source as i64 - prev_source);
            encode_vlq(&mut mappings, original_line as i64 - prev_original_line);
            encode_vlq(&mut mappings, 0);
            prev_source = source as i64;
            prev_original_line = original_line as i64;
        }

        SourceMap {
            version: 3,
            file: file.into(),
            sources: self.sources,
            sources_content: self.contents,
            names: Vec::new(),
            mappings,
        }
    }
}

pub fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

fn base64_value(c: u8) -> Option<u64> {
    BASE64.iter().position(|&b| b == c).map(|p| p as u64)
}

/// Decode a `mappings` string into absolute segments, one `Vec` per
/// generated line.
pub fn decode_mappings(mappings: &str) -> Result<Vec<Vec<Segment>>, String> {
    let mut lines = Vec::new();
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;

    for line in mappings.split(';') {
        let mut segments = Vec::new();
        let mut generated_column = 0i64;

        for raw in line.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_fields(raw)?;
            if fields.len() != 1 && fields.len() < 4 {
                return Err(format!("malformed segment {raw:?}"));
            }
            generated_column += fields[0];
            if fields.len() >= 4 {
                source += fields[1];
                original_line += fields[2];
                original_column += fields[3];
            }
            segments.push(Segment {
                generated_column,
                source,
                original_line,
                original_column,
            });
        }
        lines.push(segments);
    }

    Ok(lines)
}

fn decode_fields(raw: &str) -> Result<Vec<i64>, String> {
    let mut fields = Vec::new();
    let mut value: u64 = 0;
    let mut shift = 0u32;

    for c in raw.bytes() {
        let digit = base64_value(c).ok_or_else(|| format!("invalid base64 digit {:?}", c as char))?;
        value |= (digit & 0b11111) << shift;
        if digit & 0b100000 != 0 {
            shift += 5;
            continue;
        }
        let magnitude = (value >> 1) as i64;
        fields.push(if value & 1 == 1 { -magnitude } else { magnitude });
        value = 0;
        shift = 0;
    }

    if shift != 0 {
        return Err(format!("truncated segment {raw:?}"));
    }
    Ok(fields)
}
