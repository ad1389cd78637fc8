//! PDF pre-flight analyzer
//!
//! Samples a document's pages to decide whether it is image-dominant or
//! text-dominant before any compression work starts. Analysis is read-only
//! and never fails: documents that cannot be parsed fall back to a
//! size-based heuristic profile.

use std::collections::HashSet;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::PdfType;

/// Pages with more than this fraction of sampled image pages are
/// classified image-heavy.
pub const IMAGE_RATIO_THRESHOLD: f64 = 0.3;

/// Maximum number of pages inspected per document.
pub const MAX_SAMPLED_PAGES: u32 = 10;

/// Above this size, an unparseable document is assumed image-heavy.
const HEURISTIC_LARGE_MB: f64 = 10.0;

/// Structural profile of a PDF document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfAnalysis {
    /// Number of pages (estimated when `parsed` is false).
    pub page_count: u32,
    /// File size in megabytes.
    pub size_mb: f64,
    /// Fraction of sampled pages containing raster image paint operations.
    pub image_ratio: f64,
    /// False when the document could not be opened and the profile was
    /// estimated from the byte length alone.
    pub parsed: bool,
}

/// What a sampled page's content stream showed.
enum PageKind {
    /// At least one image paint operator, possibly mixed with text.
    Image,
    /// Text show operators and no image operator.
    Text,
    /// Neither text nor images (blank or vector-only).
    Other,
}

impl PdfAnalysis {
    /// Analyze a document. Never fails; see the module docs.
    pub fn analyze(data: &[u8]) -> Self {
        let size_mb = data.len() as f64 / (1024.0 * 1024.0);

        if data.len() < 8 || &data[0..4] != b"%PDF" {
            return Self::heuristic(size_mb);
        }

        match Document::load_mem(data) {
            Ok(doc) => Self::from_document(&doc, size_mb),
            Err(e) => {
                warn!("PDF parse failed, using size heuristic: {}", e);
                Self::heuristic(size_mb)
            }
        }
    }

    /// Profile for a document whose classification was made elsewhere
    /// (e.g. declared by a client in the `pdfType` form field).
    pub fn assumed(pdf_type: PdfType, size_bytes: u64) -> Self {
        let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
        let image_ratio = match pdf_type {
            PdfType::ImageHeavy => 0.8,
            PdfType::TextHeavy => 0.2,
        };
        Self {
            page_count: (size_mb * 10.0).ceil() as u32,
            size_mb,
            image_ratio,
            parsed: false,
        }
    }

    pub fn is_image_heavy(&self) -> bool {
        self.image_ratio > IMAGE_RATIO_THRESHOLD
    }

    pub fn is_text_heavy(&self) -> bool {
        !self.is_image_heavy()
    }

    pub fn pdf_type(&self) -> PdfType {
        if self.is_image_heavy() {
            PdfType::ImageHeavy
        } else {
            PdfType::TextHeavy
        }
    }

    /// Size-only profile for documents that cannot be opened. Large files
    /// are assumed to be scans.
    fn heuristic(size_mb: f64) -> Self {
        let image_ratio = if size_mb > HEURISTIC_LARGE_MB { 0.8 } else { 0.2 };
        Self {
            page_count: (size_mb * 10.0).ceil() as u32,
            size_mb,
            image_ratio,
            parsed: false,
        }
    }

    fn from_document(doc: &Document, size_mb: f64) -> Self {
        let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        let page_count = pages.len() as u32;

        if pages.is_empty() {
            return Self {
                page_count: 0,
                size_mb,
                image_ratio: 0.0,
                parsed: true,
            };
        }

        // Sample up to MAX_SAMPLED_PAGES pages, evenly spaced.
        let samples = pages.len().min(MAX_SAMPLED_PAGES as usize);
        let step = (pages.len() / samples).max(1);

        let mut image_pages = 0usize;
        for i in 0..samples {
            let idx = (i * step).min(pages.len() - 1);
            match classify_page(doc, pages[idx]) {
                Ok(PageKind::Image) => image_pages += 1,
                Ok(_) => {}
                Err(e) => {
                    // Corrupt content streams count as text pages; the
                    // cheaper path is the safe assumption.
                    debug!("page {} inspection failed, counting as text: {}", idx + 1, e);
                }
            }
        }

        Self {
            page_count,
            size_mb,
            image_ratio: image_pages as f64 / samples as f64,
            parsed: true,
        }
    }
}

/// Inspect one page's content stream operators.
fn classify_page(doc: &Document, page_id: ObjectId) -> lopdf::Result<PageKind> {
    let image_names = image_xobject_names(doc, page_id);

    let content = doc.get_page_content(page_id)?;
    let operations = Content::decode(&content)?;

    let mut has_text = false;
    for op in &operations.operations {
        match op.operator.as_str() {
            "Tj" | "TJ" | "'" | "\"" => has_text = true,
            // Inline image
            "BI" | "ID" | "EI" => return Ok(PageKind::Image),
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    if image_names.contains(name) {
                        return Ok(PageKind::Image);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(if has_text { PageKind::Text } else { PageKind::Other })
}

/// Names of XObjects in the page's resources whose subtype is `Image`.
/// Best-effort: unresolvable resources yield an empty set, so the page
/// classifies by its text operators alone.
fn image_xobject_names(doc: &Document, page_id: ObjectId) -> HashSet<Vec<u8>> {
    let mut names = HashSet::new();

    let page = match doc.get_object(page_id).and_then(Object::as_dict) {
        Ok(dict) => dict,
        Err(_) => return names,
    };

    let resources = match resolve_dict(doc, page.get(b"Resources").ok()) {
        Some(dict) => dict,
        None => return names,
    };

    let xobjects = match resolve_dict(doc, resources.get(b"XObject").ok()) {
        Some(dict) => dict,
        None => return names,
    };

    for (name, entry) in xobjects.iter() {
        let stream = match entry {
            Object::Reference(id) => doc.get_object(*id).and_then(Object::as_stream),
            Object::Stream(s) => Ok(s),
            _ => continue,
        };
        if let Ok(stream) = stream {
            if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name_str) {
                if subtype == "Image" {
                    names.insert(name.clone());
                }
            }
        }
    }

    names
}

/// Follow an optional reference to a dictionary.
fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    match obj {
        Some(Object::Dictionary(dict)) => Some(dict),
        Some(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_dict).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_pdf_is_text_heavy() {
        let pdf = fixtures::text_pdf(5);
        let analysis = PdfAnalysis::analyze(&pdf);
        assert!(analysis.parsed);
        assert_eq!(analysis.page_count, 5);
        assert_eq!(analysis.image_ratio, 0.0);
        assert!(analysis.is_text_heavy());
        assert!(!analysis.is_image_heavy());
    }

    #[test]
    fn test_image_pdf_is_image_heavy() {
        let pdf = fixtures::image_pdf(4);
        let analysis = PdfAnalysis::analyze(&pdf);
        assert!(analysis.parsed);
        assert_eq!(analysis.image_ratio, 1.0);
        assert!(analysis.is_image_heavy());
        assert!(!analysis.is_text_heavy());
    }

    #[test]
    fn test_mixed_page_with_image_counts_as_image() {
        // One page carrying both text and an image counts as an image page.
        let pdf = fixtures::mixed_pdf(1, 0);
        let analysis = PdfAnalysis::analyze(&pdf);
        assert_eq!(analysis.image_ratio, 1.0);
    }

    #[test]
    fn test_half_image_document_crosses_threshold() {
        let pdf = fixtures::mixed_pdf(2, 2);
        let analysis = PdfAnalysis::analyze(&pdf);
        assert_eq!(analysis.page_count, 4);
        assert_eq!(analysis.image_ratio, 0.5);
        assert!(analysis.is_image_heavy());
    }

    #[test]
    fn test_classification_is_deterministic_and_complementary() {
        let pdf = fixtures::mixed_pdf(3, 7);
        let first = PdfAnalysis::analyze(&pdf);
        for _ in 0..3 {
            let again = PdfAnalysis::analyze(&pdf);
            assert_eq!(again.image_ratio, first.image_ratio);
            assert_eq!(again.is_image_heavy(), first.is_image_heavy());
            assert_ne!(again.is_image_heavy(), again.is_text_heavy());
        }
    }

    #[test]
    fn test_corrupt_page_counts_as_text() {
        let pdf = fixtures::pdf_with_corrupt_page();
        let analysis = PdfAnalysis::analyze(&pdf);
        assert!(analysis.parsed);
        // The broken page is absorbed, not fatal.
        assert_eq!(analysis.image_ratio, 0.0);
    }

    #[test]
    fn test_unparseable_small_file_uses_heuristic() {
        let data = vec![0u8; 1024];
        let analysis = PdfAnalysis::analyze(&data);
        assert!(!analysis.parsed);
        assert_eq!(analysis.image_ratio, 0.2);
        assert!(analysis.is_text_heavy());
    }

    #[test]
    fn test_unparseable_large_file_assumed_image_heavy() {
        // 11 MB of garbage with a PDF header that does not parse.
        let mut data = b"%PDF-1.7 broken".to_vec();
        data.extend(std::iter::repeat(0xA7u8).take(11 * 1024 * 1024));
        let analysis = PdfAnalysis::analyze(&data);
        assert!(!analysis.parsed);
        assert_eq!(analysis.image_ratio, 0.8);
        assert!(analysis.is_image_heavy());
        // pageCount estimated as ceil(sizeMb * 10)
        assert_eq!(analysis.page_count, (analysis.size_mb * 10.0).ceil() as u32);
    }

    #[test]
    fn test_empty_input_never_panics() {
        let analysis = PdfAnalysis::analyze(&[]);
        assert!(!analysis.parsed);
        assert_eq!(analysis.page_count, 0);
    }

    #[test]
    fn test_assumed_profile_respects_declared_type() {
        let assumed = PdfAnalysis::assumed(PdfType::ImageHeavy, 2 * 1024 * 1024);
        assert!(assumed.is_image_heavy());
        let assumed = PdfAnalysis::assumed(PdfType::TextHeavy, 2 * 1024 * 1024);
        assert!(assumed.is_text_heavy());
    }
}
