// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tile descrambler — redraws the padded, shuffled tile grid of a served page
// image into its legible layout. Operates on in-memory images using the
// `image` crate.

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, imageops};
use tilebook_core::error::TilebookError;
use tilebook_core::{PermutationDescriptor, TileGeometry};
use tracing::{debug, instrument, warn};

/// A reconstructed page: an opaque RGB raster of exactly the descriptor's
/// target size.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredPage {
    image: RgbImage,
}

impl RecoveredPage {
    /// Page width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Page height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying raster.
    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Consume the page and return the underlying raster.
    pub fn into_rgb(self) -> RgbImage {
        self.image
    }
}

/// Applies permutation descriptors to scrambled source images.
///
/// ```ignore
/// let page = Descrambler::new(TileGeometry::default())
///     .with_background([255, 255, 255])
///     .descramble_bytes(&jpeg_bytes, &descriptor)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Descrambler {
    geometry: TileGeometry,
    background: Rgb<u8>,
}

impl Descrambler {
    /// Create a descrambler with a white background.
    pub fn new(geometry: TileGeometry) -> Self {
        Self {
            geometry,
            background: Rgb([255, 255, 255]),
        }
    }

    /// Fill colour for canvas cells no tile lands on.
    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        self.background = Rgb(rgb);
        self
    }

    /// Decode raw source bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn decode(data: &[u8]) -> Result<DynamicImage, TilebookError> {
        let img = image::load_from_memory(data).map_err(|err| {
            TilebookError::ImageError(format!("failed to decode scrambled image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Scrambled image decoded"
        );
        Ok(img)
    }

    /// Decode `data` and descramble it in one step.
    pub fn descramble_bytes(
        &self,
        data: &[u8],
        descriptor: &PermutationDescriptor,
    ) -> Result<RecoveredPage, TilebookError> {
        let source = Self::decode(data)?;
        Ok(self.descramble(&source, descriptor))
    }

    /// Copy every tile of `descriptor` from `source` onto a fresh canvas.
    ///
    /// Tiles are applied in descriptor order, so overlapping destinations
    /// resolve last-write-wins. Source cells that run past the image edge are
    /// copied as far as they exist; the rest of the destination cell keeps
    /// the background. The output always has the target dimensions.
    #[instrument(skip_all, fields(
        width = descriptor.target_width,
        height = descriptor.target_height,
        tiles = descriptor.tiles.len()
    ))]
    pub fn descramble(
        &self,
        source: &DynamicImage,
        descriptor: &PermutationDescriptor,
    ) -> RecoveredPage {
        let source = source.to_rgb8();
        let size = self.geometry.tile_size;

        let mut canvas: RgbImage = ImageBuffer::from_pixel(
            descriptor.target_width,
            descriptor.target_height,
            self.background,
        );

        let mut clipped = 0usize;
        for tile in &descriptor.tiles {
            let (sx, sy) = self.geometry.source_origin(tile.source_col, tile.source_row);
            let (dx, dy) = self.geometry.dest_origin(tile.dest_col, tile.dest_row);

            let block = imageops::crop_imm(&source, sx, sy, size, size).to_image();
            if block.width() < size || block.height() < size {
                clipped += 1;
                debug!(?tile, got_w = block.width(), got_h = block.height(), "Source tile clipped");
            }

            imageops::replace(&mut canvas, &block, dx, dy);
        }

        if clipped > 0 {
            warn!(
                clipped,
                source_w = source.width(),
                source_h = source.height(),
                "Descriptor referenced tiles outside the source image"
            );
        }

        RecoveredPage { image: canvas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilebook_core::TileMapping;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    /// Build a scrambled source of `cols` x `rows` padded cells, each filled
    /// with a colour derived from its cell coordinates. Padding is grey.
    fn scrambled_source(cols: u32, rows: u32) -> DynamicImage {
        let g = TileGeometry::default();
        let pitch = g.source_pitch();
        let img = RgbImage::from_fn(cols * pitch, rows * pitch, |x, y| {
            let (col, row) = (x / pitch, y / pitch);
            if x % pitch >= g.tile_size || y % pitch >= g.tile_size {
                Rgb([128, 128, 128])
            } else {
                cell_colour(col, row)
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn cell_colour(col: u32, row: u32) -> Rgb<u8> {
        Rgb([10 + col as u8 * 40, 10 + row as u8 * 40, 200])
    }

    fn descrambler() -> Descrambler {
        Descrambler::new(TileGeometry::default())
    }

    #[test]
    fn single_tile_copies_one_block_to_origin() {
        let source = scrambled_source(1, 1);
        let d = PermutationDescriptor::new(100, 50, vec![TileMapping::new(0, 0, 0, 0)]);

        let page = descrambler().descramble(&source, &d);
        let img = page.as_rgb();

        assert_eq!((page.width(), page.height()), (100, 50));
        for (x, y, px) in img.enumerate_pixels() {
            if x < 50 {
                assert_eq!(*px, cell_colour(0, 0), "pixel ({x},{y}) inside tile");
            } else {
                assert_eq!(*px, WHITE, "pixel ({x},{y}) outside tile");
            }
        }
    }

    #[test]
    fn empty_descriptor_yields_blank_canvas() {
        let source = scrambled_source(1, 1);
        let d = PermutationDescriptor::new(200, 100, Vec::new());

        let page = descrambler().with_background([0, 0, 0]).descramble(&source, &d);

        assert_eq!((page.width(), page.height()), (200, 100));
        assert!(page.as_rgb().pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn tiles_are_unshuffled_and_padding_dropped() {
        // Source holds a 2x2 grid; the page wants it mirrored horizontally.
        let source = scrambled_source(2, 2);
        let d = PermutationDescriptor::new(
            100,
            100,
            vec![
                TileMapping::new(0, 0, 1, 0),
                TileMapping::new(1, 0, 0, 0),
                TileMapping::new(0, 1, 1, 1),
                TileMapping::new(1, 1, 0, 1),
            ],
        );

        let page = descrambler().descramble(&source, &d);
        let img = page.as_rgb();

        assert_eq!(*img.get_pixel(0, 0), cell_colour(1, 0));
        assert_eq!(*img.get_pixel(49, 49), cell_colour(1, 0));
        assert_eq!(*img.get_pixel(50, 0), cell_colour(0, 0));
        assert_eq!(*img.get_pixel(0, 50), cell_colour(1, 1));
        assert_eq!(*img.get_pixel(99, 99), cell_colour(0, 1));
        assert!(img.pixels().all(|p| *p != Rgb([128, 128, 128])));
    }

    #[test]
    fn output_size_ignores_tile_coverage() {
        let source = scrambled_source(1, 1);
        // Destination far outside the page: nothing lands, size is unchanged.
        let d = PermutationDescriptor::new(120, 70, vec![TileMapping::new(0, 0, 9, 9)]);

        let page = descrambler().descramble(&source, &d);
        assert_eq!((page.width(), page.height()), (120, 70));
        assert!(page.as_rgb().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn out_of_range_source_degrades_to_partial_blit() {
        // 60x60 source: cell (0,0) is complete, cell (1,0) starts at x=66 and
        // does not exist at all.
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 60, Rgb([1, 2, 3])));
        let d = PermutationDescriptor::new(
            100,
            50,
            vec![TileMapping::new(0, 0, 0, 0), TileMapping::new(1, 0, 1, 0)],
        );

        let page = descrambler().descramble(&source, &d);
        let img = page.as_rgb();

        assert_eq!(*img.get_pixel(10, 10), Rgb([1, 2, 3]));
        assert_eq!(*img.get_pixel(75, 10), WHITE);
    }

    #[test]
    fn overlapping_destinations_last_write_wins() {
        let source = scrambled_source(2, 1);
        let d = PermutationDescriptor::new(
            50,
            50,
            vec![TileMapping::new(0, 0, 0, 0), TileMapping::new(1, 0, 0, 0)],
        );

        let page = descrambler().descramble(&source, &d);
        assert_eq!(*page.as_rgb().get_pixel(25, 25), cell_colour(1, 0));
    }

    #[test]
    fn descramble_is_deterministic() {
        let source = scrambled_source(3, 2);
        let d = PermutationDescriptor::new(
            150,
            100,
            vec![
                TileMapping::new(2, 1, 0, 0),
                TileMapping::new(0, 0, 2, 1),
                TileMapping::new(1, 1, 1, 0),
            ],
        );

        let first = descrambler().descramble(&source, &d);
        let second = descrambler().descramble(&source, &d);
        assert_eq!(first, second);
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        let d = PermutationDescriptor::new(50, 50, Vec::new());
        let err = descrambler()
            .descramble_bytes(b"definitely not a jpeg", &d)
            .unwrap_err();
        assert!(matches!(err, TilebookError::ImageError(_)));
    }

    #[test]
    fn png_bytes_decode_into_page() {
        let mut png = Vec::new();
        scrambled_source(1, 1)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let d = PermutationDescriptor::new(50, 50, vec![TileMapping::new(0, 0, 0, 0)]);

        let page = descrambler().descramble_bytes(&png, &d).unwrap();
        assert_eq!(*page.as_rgb().get_pixel(0, 0), cell_colour(0, 0));
    }
}
