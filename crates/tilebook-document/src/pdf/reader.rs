// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — inspect finished book documents (page count, page sizes and
// the embedded page images) using the `lopdf` crate.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tilebook_core::error::TilebookError;
use tracing::{debug, info, instrument};

/// The image XObject drawn on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    /// Stream filter name, e.g. `DCTDecode` for JPEG data.
    pub filter: Option<String>,
}

/// Reads an existing PDF for inspection.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TilebookError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            TilebookError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, TilebookError> {
        let document = Document::load_mem(data).map_err(|err| {
            TilebookError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Width and height in points of page `page_number` (1-indexed), taken
    /// from its /MediaBox (inherited from the page tree if absent).
    pub fn page_size(&self, page_number: u32) -> Result<(f32, f32), TilebookError> {
        let page_id = self.page_id(page_number)?;
        let media_box = self.media_box(page_id)?;
        Ok((media_box[2] - media_box[0], media_box[3] - media_box[1]))
    }

    /// Sizes of every page, in page order.
    pub fn page_sizes(&self) -> Result<Vec<(f32, f32)>, TilebookError> {
        (1..=self.page_count() as u32)
            .map(|n| self.page_size(n))
            .collect()
    }

    /// First image XObject in the resources of page `page_number` (1-indexed).
    pub fn page_image(&self, page_number: u32) -> Result<EmbeddedImage, TilebookError> {
        let page_id = self.page_id(page_number)?;
        let page = self.dict(page_id)?;

        let resources = page
            .get(b"Resources")
            .map_err(|err| TilebookError::PdfError(format!("page {page_number}: {err}")))?;
        let xobjects = self
            .resolve(resources)?
            .as_dict()
            .and_then(|res| res.get(b"XObject"))
            .map_err(|err| {
                TilebookError::PdfError(format!("page {page_number} has no /XObject: {err}"))
            })?;
        let xobjects = self.resolve(xobjects)?.as_dict().map_err(|err| {
            TilebookError::PdfError(format!("page {page_number}: bad /XObject: {err}"))
        })?;

        for (_, entry) in xobjects.iter() {
            let Ok(stream) = self.resolve(entry)?.as_stream() else {
                continue;
            };
            let dict = &stream.dict;
            if !matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image") {
                continue;
            }
            let dimension = |key: &[u8]| {
                dict.get(key)
                    .and_then(Object::as_i64)
                    .ok()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| {
                        TilebookError::PdfError(format!(
                            "page {page_number}: image has no valid /{}",
                            String::from_utf8_lossy(key)
                        ))
                    })
            };
            let filter = match dict.get(b"Filter") {
                Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            };
            return Ok(EmbeddedImage {
                width: dimension(b"Width")?,
                height: dimension(b"Height")?,
                filter,
            });
        }

        Err(TilebookError::PdfError(format!(
            "page {page_number} has no image XObject"
        )))
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId, TilebookError> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            TilebookError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    fn dict(&self, id: ObjectId) -> Result<&Dictionary, TilebookError> {
        self.document
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|err| TilebookError::PdfError(format!("cannot read object {:?}: {}", id, err)))
    }

    /// Follow `object` if it is an indirect reference.
    fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object, TilebookError> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).map_err(|err| {
                TilebookError::PdfError(format!("dangling reference {:?}: {}", id, err))
            }),
            other => Ok(other),
        }
    }

    fn media_box(&self, node_id: ObjectId) -> Result<[f32; 4], TilebookError> {
        let mut current = node_id;
        // Page trees are shallow; the bound guards against /Parent cycles.
        for _ in 0..32 {
            let dict = self.dict(current)?;

            if let Ok(Object::Array(values)) = dict.get(b"MediaBox") {
                return parse_rect(values);
            }

            current = match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => *parent,
                _ => break,
            };
        }

        Err(TilebookError::PdfError(format!(
            "no /MediaBox for page object {:?}",
            node_id
        )))
    }
}

fn parse_rect(values: &[Object]) -> Result<[f32; 4], TilebookError> {
    if values.len() != 4 {
        return Err(TilebookError::PdfError(format!(
            "/MediaBox has {} entries, expected 4",
            values.len()
        )));
    }
    let mut rect = [0f32; 4];
    for (slot, value) in rect.iter_mut().zip(values) {
        *slot = match value {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => {
                return Err(TilebookError::PdfError(format!(
                    "non-numeric /MediaBox entry: {:?}",
                    other
                )));
            }
        };
    }
    Ok(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Descrambler, RecoveredPage};
    use image::DynamicImage;
    use tilebook_core::{PermutationDescriptor, TileGeometry};

    fn blank_page(width: u32, height: u32) -> RecoveredPage {
        Descrambler::new(TileGeometry::default()).descramble(
            &DynamicImage::new_rgb8(1, 1),
            &PermutationDescriptor::new(width, height, Vec::new()),
        )
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = PdfReader::from_bytes(b"not a pdf").err().unwrap();
        assert!(matches!(err, TilebookError::PdfError(_)));
    }

    #[test]
    fn open_reads_a_document_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        let mut doc = crate::BookDocument::new("disk");
        doc.append_page(blank_page(120, 80)).unwrap();
        std::fs::write(&path, doc.finalize().unwrap()).unwrap();

        let reader = PdfReader::open(&path).unwrap();
        assert_eq!(reader.page_sizes().unwrap(), vec![(120.0, 80.0)]);
        let image = reader.page_image(1).unwrap();
        assert_eq!((image.width, image.height), (120, 80));
        assert!(reader.page_image(2).is_err());
    }

    #[test]
    fn open_missing_file_is_pdf_error() {
        let err = PdfReader::open("/nonexistent/book.pdf").err().unwrap();
        assert!(matches!(err, TilebookError::PdfError(_)));
    }

    #[test]
    fn media_box_parsing() {
        let rect = parse_rect(&[
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(100.5),
            Object::Integer(50),
        ])
        .unwrap();
        assert_eq!(rect, [0.0, 0.0, 100.5, 50.0]);

        assert!(parse_rect(&[Object::Integer(0)]).is_err());
    }
}
