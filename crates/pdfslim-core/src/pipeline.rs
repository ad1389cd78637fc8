//! Same-thread compression pipeline.
//!
//! Used directly when worker execution is unavailable, inside the worker
//! thread otherwise, and by the server binary for remote jobs. The work is
//! the same in all three places: strip document metadata, prune
//! non-essential catalog entries, and recompress object streams in batches
//! sized by the preset.

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::analyzer::PdfAnalysis;
use crate::error::CompressError;
use crate::types::CompressionLevel;

const EPOCH_DATE: &str = "D:19700101000000Z";

const INFO_TEXT_KEYS: &[&[u8]] = &[
    b"Title",
    b"Author",
    b"Subject",
    b"Keywords",
    b"Producer",
    b"Creator",
];

const INFO_DATE_KEYS: &[&[u8]] = &[b"CreationDate", b"ModDate"];

const CATALOG_PRUNE_KEYS: &[&[u8]] = &[
    b"ViewerPreferences",
    b"PageLayout",
    b"PageMode",
    b"OpenAction",
];

/// Compress a document in place on the calling thread.
///
/// `on_tick` receives the fraction of serialization work done (0.0..=1.0),
/// once per batch of `objects_per_tick` objects.
pub fn compress_document(
    data: &[u8],
    level: CompressionLevel,
    analysis: &PdfAnalysis,
    on_tick: impl FnMut(f32),
) -> Result<Vec<u8>, CompressError> {
    let doc = Document::load_mem(data).map_err(|e| CompressError::Parse(e.to_string()))?;

    if analysis.is_image_heavy() {
        compress_image_heavy(doc, data.len(), level, on_tick)
    } else {
        compress_text_heavy(doc, data.len(), level, on_tick)
    }
}

/// Pipeline for image-dominant documents.
///
/// Re-encoding embedded raster images is not implemented; this currently
/// performs the shared stripping work only.
fn compress_image_heavy(
    doc: Document,
    input_len: usize,
    level: CompressionLevel,
    on_tick: impl FnMut(f32),
) -> Result<Vec<u8>, CompressError> {
    debug!("image-heavy document: stripping metadata and catalog entries");
    strip_and_save(doc, input_len, level, on_tick)
}

/// Pipeline for text-dominant documents.
///
/// Font subsetting is not implemented; this currently performs the shared
/// stripping work only.
fn compress_text_heavy(
    doc: Document,
    input_len: usize,
    level: CompressionLevel,
    on_tick: impl FnMut(f32),
) -> Result<Vec<u8>, CompressError> {
    debug!("text-heavy document: stripping metadata and catalog entries");
    strip_and_save(doc, input_len, level, on_tick)
}

fn strip_and_save(
    mut doc: Document,
    input_len: usize,
    level: CompressionLevel,
    mut on_tick: impl FnMut(f32),
) -> Result<Vec<u8>, CompressError> {
    // Stripping failures are absorbed; a document without an Info
    // dictionary is still worth recompressing.
    if let Err(e) = strip_metadata(&mut doc) {
        warn!("metadata strip failed: {}", e);
    }
    if let Err(e) = prune_catalog(&mut doc) {
        warn!("catalog prune failed: {}", e);
    }

    recompress_streams(&mut doc, level, &mut on_tick);

    let mut out = Vec::with_capacity(input_len);
    doc.save_to(&mut out)
        .map_err(|e| CompressError::Save(e.to_string()))?;
    Ok(out)
}

/// Blank out the document information dictionary: titles, authorship, and
/// producer strings become empty, dates become the epoch.
fn strip_metadata(doc: &mut Document) -> lopdf::Result<()> {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        _ => return Ok(()),
    };

    let info = doc.get_object_mut(info_id)?.as_dict_mut()?;
    for key in INFO_TEXT_KEYS {
        if info.has(key) {
            info.set(*key, Object::string_literal(""));
        }
    }
    for key in INFO_DATE_KEYS {
        if info.has(key) {
            info.set(*key, Object::string_literal(EPOCH_DATE));
        }
    }
    Ok(())
}

/// Remove viewer-preference entries the document works without.
fn prune_catalog(doc: &mut Document) -> lopdf::Result<()> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let catalog = doc.get_object_mut(root_id)?.as_dict_mut()?;
    for key in CATALOG_PRUNE_KEYS {
        catalog.remove(key);
    }
    Ok(())
}

/// Flate-compress unfiltered streams, ticking once per batch.
fn recompress_streams(
    doc: &mut Document,
    level: CompressionLevel,
    on_tick: &mut impl FnMut(f32),
) {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    let total = ids.len().max(1);
    let mut done = 0usize;

    for chunk in ids.chunks(level.objects_per_tick()) {
        for id in chunk {
            if let Some(Object::Stream(stream)) = doc.objects.get_mut(id) {
                if stream.allows_compression {
                    // Streams that fail to deflate stay uncompressed.
                    let _ = stream.compress();
                }
            }
        }
        done += chunk.len();
        on_tick(done as f32 / total as f32);
    }
}
