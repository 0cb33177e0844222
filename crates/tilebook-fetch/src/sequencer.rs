// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page sequencer — builds the book document one page at a time.
//
// Each page runs fetch image -> fetch descriptor -> descramble -> append ->
// report before the next page starts. Only one page's scrambled bytes and
// decoded raster are alive at any point; appended pages are held as JPEG
// streams inside the document until it is finalized. Any failure aborts the
// run and drops the partially built document; nothing is retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tilebook_core::error::{Result, TilebookError};
use tilebook_core::{BookManifest, ProgressUpdate};
use tilebook_document::{BookDocument, Descrambler};
use tracing::{debug, info, instrument};

use crate::source::{DescriptorSource, ImageSource, ProgressSink};

/// Drives page reconstruction over injected retrieval capabilities.
pub struct PageSequencer<'a, I, D> {
    images: &'a I,
    descriptors: &'a D,
    descrambler: Descrambler,
    cancel: Option<Arc<AtomicBool>>,
    jpeg_quality: Option<u8>,
}

impl<'a, I, D> PageSequencer<'a, I, D>
where
    I: ImageSource,
    D: DescriptorSource,
{
    pub fn new(images: &'a I, descriptors: &'a D, descrambler: Descrambler) -> Self {
        Self {
            images,
            descriptors,
            descrambler,
            cancel: None,
            jpeg_quality: None,
        }
    }

    /// JPEG quality for the embedded page images.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    /// Stop at the next page boundary once `flag` is set. A page that has
    /// started always runs to completion first.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Reconstruct every page of `manifest`, in order, into one document.
    ///
    /// Per-page failures come back as [`TilebookError::Page`] carrying the
    /// 1-based page index and the originating error.
    #[instrument(skip_all, fields(book_id = %manifest.book_id, pages = manifest.len()))]
    pub async fn build_document<P>(
        &self,
        manifest: &BookManifest,
        progress: &mut P,
    ) -> Result<BookDocument>
    where
        P: ProgressSink + ?Sized,
    {
        let total = manifest.len();
        let started = Instant::now();
        let mut document = BookDocument::new(&manifest.book_id);
        if let Some(quality) = self.jpeg_quality {
            document = document.with_jpeg_quality(quality);
        }

        info!(total, "Reconstructing book");

        for (index, page_ref, page_id) in manifest.pages() {
            if self.cancelled() {
                info!(completed = index - 1, "Cancellation requested, stopping");
                return Err(TilebookError::Cancelled {
                    completed: index - 1,
                });
            }

            let bytes = self
                .images
                .fetch_scrambled_image(&manifest.book_id, page_ref)
                .await
                .map_err(|err| err.at_page(index))?;
            debug!(index, page_ref, bytes = bytes.len(), "Scrambled image fetched");

            let descriptor = self
                .descriptors
                .fetch_descriptor(page_id)
                .await
                .map_err(|err| err.at_page(index))?;
            debug!(
                index,
                page_id,
                tiles = descriptor.tiles.len(),
                "Descriptor fetched"
            );

            let page = self
                .descrambler
                .descramble_bytes(&bytes, &descriptor)
                .map_err(|err| err.at_page(index))?;
            drop(bytes);

            let handle = document
                .append_page(page)
                .map_err(|err| err.at_page(index))?;
            info!(
                index,
                total,
                width = handle.width_px,
                height = handle.height_px,
                "Page reconstructed"
            );

            progress.report(ProgressUpdate {
                current: index,
                total,
                elapsed: started.elapsed(),
            });
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use image::{DynamicImage, ImageFormat, RgbImage};
    use tilebook_core::{PermutationDescriptor, TileGeometry, TileMapping};
    use tilebook_document::PdfReader;

    /// In-memory image source that records every request.
    #[derive(Default)]
    struct FakeImages {
        pages: HashMap<String, Vec<u8>>,
        fail_on: Option<String>,
        log: Mutex<Vec<String>>,
    }

    impl ImageSource for FakeImages {
        async fn fetch_scrambled_image(&self, book_id: &str, page_ref: &str) -> Result<Vec<u8>> {
            self.log.lock().unwrap().push(format!("image:{book_id}/{page_ref}"));
            if self.fail_on.as_deref() == Some(page_ref) {
                return Err(TilebookError::Http(format!("404 for {page_ref}")));
            }
            self.pages
                .get(page_ref)
                .cloned()
                .ok_or_else(|| TilebookError::Http(format!("unknown page {page_ref}")))
        }
    }

    #[derive(Default)]
    struct FakeDescriptors {
        by_id: HashMap<String, PermutationDescriptor>,
        log: Mutex<Vec<String>>,
    }

    impl DescriptorSource for FakeDescriptors {
        async fn fetch_descriptor(&self, page_id: &str) -> Result<PermutationDescriptor> {
            self.log.lock().unwrap().push(format!("descriptor:{page_id}"));
            self.by_id
                .get(page_id)
                .cloned()
                .ok_or_else(|| TilebookError::InvalidDescriptor(format!("no page {page_id}")))
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    /// Three pages with distinct target sizes.
    fn three_page_book() -> (BookManifest, FakeImages, FakeDescriptors) {
        let sizes = [(100, 50), (200, 100), (50, 150)];
        let mut images = FakeImages::default();
        let mut descriptors = FakeDescriptors::default();
        let mut refs = Vec::new();
        let mut ids = Vec::new();

        for (i, (w, h)) in sizes.into_iter().enumerate() {
            let page_ref = format!("p{i}.jpg");
            let page_id = format!("id{i}");
            images.pages.insert(page_ref.clone(), png(132, 132));
            descriptors.by_id.insert(
                page_id.clone(),
                PermutationDescriptor::new(w, h, vec![TileMapping::new(1, 1, 0, 0)]),
            );
            refs.push(page_ref);
            ids.push(page_id);
        }

        (BookManifest::new("book42", refs, ids).unwrap(), images, descriptors)
    }

    fn descrambler() -> Descrambler {
        Descrambler::new(TileGeometry::default())
    }

    #[tokio::test]
    async fn builds_all_pages_in_manifest_order() {
        let (manifest, images, descriptors) = three_page_book();
        let sequencer = PageSequencer::new(&images, &descriptors, descrambler());

        let mut updates = Vec::new();
        let mut sink = |u: ProgressUpdate| updates.push((u.current, u.total));
        let document = sequencer.build_document(&manifest, &mut sink).await.unwrap();

        let sizes: Vec<_> = document
            .pages()
            .iter()
            .map(|p| (p.number, p.width_px, p.height_px))
            .collect();
        assert_eq!(sizes, vec![(1, 100, 50), (2, 200, 100), (3, 50, 150)]);
        assert_eq!(updates, vec![(1, 3), (2, 3), (3, 3)]);

        let bytes = document.finalize().unwrap();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(
            reader.page_sizes().unwrap(),
            vec![(100.0, 50.0), (200.0, 100.0), (50.0, 150.0)]
        );
    }

    #[tokio::test]
    async fn pages_are_embedded_as_full_size_jpeg() {
        let (manifest, images, descriptors) = three_page_book();
        let document = PageSequencer::new(&images, &descriptors, descrambler())
            .with_jpeg_quality(60)
            .build_document(&manifest, &mut |_: ProgressUpdate| {})
            .await
            .unwrap();

        let reader = PdfReader::from_bytes(&document.finalize().unwrap()).unwrap();
        let embedded: Vec<_> = (1..=3)
            .map(|n| reader.page_image(n).unwrap())
            .map(|img| (img.width, img.height, img.filter))
            .collect();
        let jpeg = || Some("DCTDecode".to_string());
        assert_eq!(
            embedded,
            vec![(100, 50, jpeg()), (200, 100, jpeg()), (50, 150, jpeg())]
        );
    }

    #[tokio::test]
    async fn fetches_alternate_image_then_descriptor_per_page() {
        let (manifest, images, descriptors) = three_page_book();
        let sequencer = PageSequencer::new(&images, &descriptors, descrambler());

        sequencer
            .build_document(&manifest, &mut |_: ProgressUpdate| {})
            .await
            .unwrap();

        let image_log = images.log.lock().unwrap().clone();
        let descriptor_log = descriptors.log.lock().unwrap().clone();
        assert_eq!(
            image_log,
            vec!["image:book42/p0.jpg", "image:book42/p1.jpg", "image:book42/p2.jpg"]
        );
        assert_eq!(descriptor_log, vec!["descriptor:id0", "descriptor:id1", "descriptor:id2"]);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_with_page_index() {
        let (manifest, mut images, descriptors) = three_page_book();
        images.fail_on = Some("p1.jpg".into());
        let sequencer = PageSequencer::new(&images, &descriptors, descrambler());

        let mut reported = 0;
        let mut sink = |_: ProgressUpdate| reported += 1;
        let err = sequencer
            .build_document(&manifest, &mut sink)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TilebookError::Page { index: 2, .. }), "{err}");
        assert_eq!(reported, 1);
        // Page 3 is never requested.
        assert_eq!(images.log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn undecodable_image_aborts_the_run() {
        let (manifest, mut images, descriptors) = three_page_book();
        images.pages.insert("p0.jpg".into(), b"garbage".to_vec());
        let sequencer = PageSequencer::new(&images, &descriptors, descrambler());

        let err = sequencer
            .build_document(&manifest, &mut |_: ProgressUpdate| {})
            .await
            .err()
            .unwrap();

        match err {
            TilebookError::Page { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, TilebookError::ImageError(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cancellation_is_checked_between_pages() {
        let (manifest, images, descriptors) = three_page_book();
        let flag = Arc::new(AtomicBool::new(false));
        let sequencer = PageSequencer::new(&images, &descriptors, descrambler())
            .with_cancel_flag(flag.clone());

        // Request cancellation while page 2 is being reported; page 2 still
        // completes, page 3 never starts.
        let mut sink = |u: ProgressUpdate| {
            if u.current == 2 {
                flag.store(true, Ordering::SeqCst);
            }
        };
        let err = sequencer
            .build_document(&manifest, &mut sink)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, TilebookError::Cancelled { completed: 2 }));
        assert_eq!(images.log.lock().unwrap().len(), 2);
    }
}
