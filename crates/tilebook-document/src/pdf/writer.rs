// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Book document — accumulates recovered pages into one PDF using `lopdf`.
//
// Each recovered page is JPEG-encoded as soon as it is appended and stored as
// a DCTDecode image XObject at full resolution, drawn edge to edge on a page
// of the same size (1 px = 1 pt). Only the compressed stream is kept, so the
// decoded raster of a page can be dropped right after `append_page`.

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tilebook_core::error::{Result, TilebookError};
use tracing::{debug, info, instrument};

use crate::image::RecoveredPage;

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Resource name of the page image inside each page's /XObject dictionary.
const PAGE_IMAGE_NAME: &str = "Im0";

/// Reference to a page appended to a [`BookDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    /// 1-based position in the document.
    pub number: usize,
    pub width_px: u32,
    pub height_px: u32,
}

/// Append-only accumulator of recovered pages.
///
/// Pages keep the order of [`BookDocument::append_page`] calls. The document
/// is serialised by [`BookDocument::finalize`], which consumes it, so nothing
/// can be appended afterwards.
pub struct BookDocument {
    doc: Document,
    title: String,
    /// Reserved id of the /Pages node; written out in `finalize`.
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    handles: Vec<PageHandle>,
    jpeg_quality: u8,
}

impl BookDocument {
    /// Start an empty document carrying `title` in its metadata.
    pub fn new(title: &str) -> Self {
        info!(title, "Creating book document");
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            title: title.to_string(),
            pages_id,
            page_ids: Vec::new(),
            handles: Vec::new(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// JPEG quality (1-100) for pages appended from now on.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.handles.len()
    }

    /// Handles of all appended pages, in document order.
    pub fn pages(&self) -> &[PageHandle] {
        &self.handles
    }

    /// Embed `page` as a new last page sized exactly to the image.
    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    pub fn append_page(&mut self, page: RecoveredPage) -> Result<PageHandle> {
        let (width_px, height_px) = (page.width(), page.height());
        let (width, height) = (i64::from(width_px), i64::from(height_px));

        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
        page.into_rgb().write_with_encoder(encoder).map_err(|err| {
            TilebookError::ImageError(format!("JPEG encoding failed: {}", err))
        })?;
        let encoded_len = jpeg.len();

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = self.doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                        height.into(),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(PAGE_IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content.encode().map_err(|err| {
            TilebookError::PdfError(format!("cannot encode page content: {}", err))
        })?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                width.into(),
                height.into(),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    PAGE_IMAGE_NAME => image_id,
                },
            },
        });
        self.page_ids.push(page_id);

        let handle = PageHandle {
            number: self.handles.len() + 1,
            width_px,
            height_px,
        };
        self.handles.push(handle);

        debug!(page = handle.number, jpeg_bytes = encoded_len, "Page appended");
        Ok(handle)
    }

    /// Serialise all pages, in append order, to PDF bytes.
    #[instrument(skip_all, fields(pages = self.handles.len()))]
    pub fn finalize(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(self.title.as_str()),
            "Producer" => Object::string_literal(concat!("tilebook ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut output = Vec::new();
        self.doc.save_to(&mut output).map_err(|err| {
            TilebookError::PdfError(format!("failed to serialise book document: {}", err))
        })?;

        info!(bytes = output.len(), "Book document finalized");
        Ok(output)
    }
}
