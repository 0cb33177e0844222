// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Tilebook: tile geometry, permutation descriptors,
// book manifests and progress updates.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use tracing::warn;

use crate::error::{Result, TilebookError};

/// Pixel geometry of the tile grid.
///
/// Source images pad every tile with `tile_gap` pixels on the right and
/// bottom, so a source cell has a pitch of `tile_size + tile_gap`. The
/// recovered page packs tiles edge to edge with a pitch of `tile_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGeometry {
    /// Edge length of one square tile in pixels.
    pub tile_size: u32,
    /// Padding between neighbouring tiles in the scrambled source.
    pub tile_gap: u32,
}

impl TileGeometry {
    /// Distance between the origins of neighbouring source cells.
    pub fn source_pitch(&self) -> u32 {
        self.tile_size + self.tile_gap
    }

    /// Top-left pixel of the source cell `(col, row)`.
    ///
    /// Computed in 64 bits so absurd descriptor values cannot overflow; the
    /// result is clamped to `u32::MAX`, which the blitter treats as out of
    /// bounds.
    pub fn source_origin(&self, col: u32, row: u32) -> (u32, u32) {
        let pitch = u64::from(self.source_pitch());
        let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
        (clamp(u64::from(col) * pitch), clamp(u64::from(row) * pitch))
    }

    /// Top-left pixel of the destination cell `(col, row)`.
    pub fn dest_origin(&self, col: u32, row: u32) -> (i64, i64) {
        let pitch = i64::from(self.tile_size);
        (i64::from(col) * pitch, i64::from(row) * pitch)
    }
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self {
            tile_size: 50,
            tile_gap: 16,
        }
    }
}

/// One source-cell to destination-cell move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileMapping {
    pub source_col: u32,
    pub source_row: u32,
    pub dest_col: u32,
    pub dest_row: u32,
}

impl TileMapping {
    pub fn new(source_col: u32, source_row: u32, dest_col: u32, dest_row: u32) -> Self {
        Self {
            source_col,
            source_row,
            dest_col,
            dest_row,
        }
    }
}

/// The correct layout of one page: target size plus the ordered tile moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationDescriptor {
    pub target_width: u32,
    pub target_height: u32,
    pub tiles: Vec<TileMapping>,
}

impl PermutationDescriptor {
    pub fn new(target_width: u32, target_height: u32, tiles: Vec<TileMapping>) -> Self {
        Self {
            target_width,
            target_height,
            tiles,
        }
    }

    /// Resolve a wire payload into a descriptor.
    ///
    /// Explicit positive page dimensions win; otherwise each dimension is
    /// `cell_size * grid count`. A dimension that resolves to zero or less is
    /// rejected since no canvas can be allocated for it.
    pub fn from_payload(payload: &DescriptorPayload, cell_size: u32) -> Result<Self> {
        let target_width = resolve_dimension(payload.page_width, payload.columns, cell_size)
            .ok_or_else(|| {
                TilebookError::InvalidDescriptor(format!(
                    "no usable width (PageWidth={:?}, X={:?})",
                    payload.page_width, payload.columns
                ))
            })?;
        let target_height = resolve_dimension(payload.page_height, payload.rows, cell_size)
            .ok_or_else(|| {
                TilebookError::InvalidDescriptor(format!(
                    "no usable height (PageHeight={:?}, Y={:?})",
                    payload.page_height, payload.rows
                ))
            })?;

        // A malformed entry leaves its destination cell at the background
        // instead of failing the whole page.
        let tiles: Vec<TileMapping> = payload
            .tiles
            .iter()
            .enumerate()
            .filter_map(|(i, tile)| match tile.to_mapping() {
                Ok(mapping) => Some(mapping),
                Err(reason) => {
                    warn!(tile = i, %reason, "Skipping unusable tile mapping");
                    None
                }
            })
            .collect();

        Ok(Self::new(target_width, target_height, tiles))
    }

    /// Parse the JSON body returned by the page-data endpoint.
    pub fn from_json(body: &[u8], cell_size: u32) -> Result<Self> {
        let payload: DescriptorPayload = serde_json::from_slice(body)?;
        Self::from_payload(&payload, cell_size)
    }
}

fn resolve_dimension(explicit: Option<i64>, count: Option<i64>, cell_size: u32) -> Option<u32> {
    let pixels = match explicit {
        Some(px) if px > 0 => px,
        _ => count?.checked_mul(i64::from(cell_size))?,
    };
    u32::try_from(pixels).ok().filter(|px| *px > 0)
}

// -- Wire format --------------------------------------------------------------

/// Page-data JSON as served by the metadata endpoint.
///
/// Grid counts sometimes arrive as strings, so every integer is read
/// leniently and truncated toward zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptorPayload {
    #[serde(rename = "PageWidth", default, deserialize_with = "loose_int")]
    pub page_width: Option<i64>,
    #[serde(rename = "PageHeight", default, deserialize_with = "loose_int")]
    pub page_height: Option<i64>,
    #[serde(rename = "X", default, deserialize_with = "loose_int")]
    pub columns: Option<i64>,
    #[serde(rename = "Y", default, deserialize_with = "loose_int")]
    pub rows: Option<i64>,
    #[serde(rename = "Sub", default, deserialize_with = "loose_tiles")]
    pub tiles: Vec<TilePayload>,
}

/// One entry of the `Sub` array: `X1/Y1` source cell, `X2/Y2` destination.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TilePayload {
    #[serde(rename = "X1", default, deserialize_with = "loose_int")]
    pub source_col: Option<i64>,
    #[serde(rename = "Y1", default, deserialize_with = "loose_int")]
    pub source_row: Option<i64>,
    #[serde(rename = "X2", default, deserialize_with = "loose_int")]
    pub dest_col: Option<i64>,
    #[serde(rename = "Y2", default, deserialize_with = "loose_int")]
    pub dest_row: Option<i64>,
}

impl TilePayload {
    fn to_mapping(&self) -> std::result::Result<TileMapping, String> {
        let field = |name: &str, value: Option<i64>| -> std::result::Result<u32, String> {
            let v = value.ok_or_else(|| format!("missing {name}"))?;
            u32::try_from(v).map_err(|_| format!("{name}={v} out of range"))
        };
        Ok(TileMapping::new(
            field("X1", self.source_col)?,
            field("Y1", self.source_row)?,
            field("X2", self.dest_col)?,
            field("Y2", self.dest_row)?,
        ))
    }
}

fn loose_int<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => parse_int_prefix(&s),
        _ => None,
    })
}

/// `Sub` entries that are not objects become empty payloads, which
/// `from_payload` then skips. A non-array `Sub` means no tiles.
fn loose_tiles<'de, D>(deserializer: D) -> std::result::Result<Vec<TilePayload>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect())
}

/// Parse the leading integer of a string, ignoring anything after it.
/// `"4"`, `" 4"`, `"4.9"` and `"4px"` all yield 4.
fn parse_int_prefix(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first()? {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// -- Manifest -----------------------------------------------------------------

/// Identifies a book and its pages, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookManifest {
    pub book_id: String,
    pub page_image_refs: Vec<String>,
    pub page_metadata_ids: Vec<String>,
}

impl BookManifest {
    /// Build a manifest, checking that both page lists line up.
    pub fn new(
        book_id: impl Into<String>,
        page_image_refs: Vec<String>,
        page_metadata_ids: Vec<String>,
    ) -> Result<Self> {
        let book_id = book_id.into();
        if book_id.trim().is_empty() {
            return Err(TilebookError::ManifestMalformed("empty book id".into()));
        }
        if page_image_refs.is_empty() {
            return Err(TilebookError::ManifestMalformed("book has no pages".into()));
        }
        if page_image_refs.len() != page_metadata_ids.len() {
            return Err(TilebookError::ManifestMalformed(format!(
                "{} page images but {} page ids",
                page_image_refs.len(),
                page_metadata_ids.len()
            )));
        }
        Ok(Self {
            book_id,
            page_image_refs,
            page_metadata_ids,
        })
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.page_image_refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_image_refs.is_empty()
    }

    /// Pages in order as `(1-based index, image ref, metadata id)`.
    pub fn pages(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.page_image_refs
            .iter()
            .zip(&self.page_metadata_ids)
            .enumerate()
            .map(|(i, (image, meta))| (i + 1, image.as_str(), meta.as_str()))
    }

    /// Conventional output file name, `book-<bookId>.pdf`.
    pub fn output_file_name(&self) -> String {
        format!("book-{}.pdf", self.book_id)
    }
}

// -- Progress -----------------------------------------------------------------

/// Snapshot emitted after each page is appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// 1-based index of the page just completed.
    pub current: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl ProgressUpdate {
    /// Completed fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.current as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    /// Linear estimate of the time left, `None` once complete.
    pub fn remaining(&self) -> Option<Duration> {
        let fraction = self.fraction();
        if self.is_complete() || fraction <= 0.0 {
            return None;
        }
        let elapsed = self.elapsed.as_secs_f64();
        let total = elapsed / fraction;
        Some(Duration::from_secs_f64((total - elapsed).max(0.0)))
    }
}
