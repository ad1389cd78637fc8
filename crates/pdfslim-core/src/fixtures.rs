//! Test PDF builders shared by the unit tests.

use lopdf::{Dictionary, Document, Object, Stream};

/// A text-only PDF with populated document metadata.
pub(crate) fn text_pdf(num_pages: u32) -> Vec<u8> {
    build_pdf(BuildSpec {
        text_pages: num_pages,
        image_pages: 0,
        ..BuildSpec::default()
    })
}

/// An image-only PDF (each page paints one XObject image).
pub(crate) fn image_pdf(num_pages: u32) -> Vec<u8> {
    build_pdf(BuildSpec {
        text_pages: 0,
        image_pages: num_pages,
        ..BuildSpec::default()
    })
}

/// Image pages first, then text pages.
pub(crate) fn mixed_pdf(image_pages: u32, text_pages: u32) -> Vec<u8> {
    build_pdf(BuildSpec {
        text_pages,
        image_pages,
        ..BuildSpec::default()
    })
}

/// A text PDF whose catalog carries viewer preferences and an open action.
pub(crate) fn text_pdf_with_viewer_prefs() -> Vec<u8> {
    build_pdf(BuildSpec {
        text_pages: 1,
        image_pages: 0,
        viewer_prefs: true,
        ..BuildSpec::default()
    })
}

/// A text PDF with one page whose content stream is garbage.
pub(crate) fn pdf_with_corrupt_page() -> Vec<u8> {
    build_pdf(BuildSpec {
        text_pages: 2,
        image_pages: 0,
        corrupt_pages: 1,
        ..BuildSpec::default()
    })
}

/// A one-page text PDF padded with an extra zero-filled stream of the
/// given size, which deflates to almost nothing.
pub(crate) fn padded_text_pdf(padding_bytes: usize) -> Vec<u8> {
    build_pdf(BuildSpec {
        text_pages: 1,
        image_pages: 0,
        padding_bytes,
        ..BuildSpec::default()
    })
}

struct BuildSpec {
    text_pages: u32,
    image_pages: u32,
    corrupt_pages: u32,
    viewer_prefs: bool,
    padding_bytes: usize,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            text_pages: 1,
            image_pages: 0,
            corrupt_pages: 0,
            viewer_prefs: false,
            padding_bytes: 0,
        }
    }
}

fn build_pdf(spec: BuildSpec) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::new();

    // Image pages first.
    for n in 0..spec.image_pages {
        let mut img_dict = Dictionary::new();
        img_dict.set("Type", Object::Name(b"XObject".to_vec()));
        img_dict.set("Subtype", Object::Name(b"Image".to_vec()));
        img_dict.set("Width", Object::Integer(8));
        img_dict.set("Height", Object::Integer(8));
        img_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
        img_dict.set("BitsPerComponent", Object::Integer(8));
        let img_id = doc.add_object(Object::Stream(Stream::new(img_dict, vec![0x55u8; 64])));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(img_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        // A caption plus the image: pages with any image paint classify as
        // image pages even when they also show text.
        let content = format!(
            "BT /F1 9 Tf 50 40 Td (Scan {}) Tj ET q 100 0 0 100 50 {} cm /Im0 Do Q",
            n + 1,
            600 - n * 10
        );
        page_ids.push(add_page(
            &mut doc,
            pages_id,
            content.into_bytes(),
            Some(resources),
        ));
    }

    for n in 0..spec.text_pages {
        let content = format!("BT /F1 12 Tf 50 700 Td (Fixture-Page-{}) Tj ET", n + 1);
        page_ids.push(add_page(&mut doc, pages_id, content.into_bytes(), None));
    }

    for _ in 0..spec.corrupt_pages {
        // Not decodable as a content stream.
        page_ids.push(add_page(&mut doc, pages_id, vec![0xFF, 0xFE, 0x00, 0x01], None));
    }

    if spec.padding_bytes > 0 {
        doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            vec![0u8; spec.padding_bytes],
        )));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(page_ids.len() as i64));
    pages_dict.set(
        "Kids",
        Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    if spec.viewer_prefs {
        let mut prefs = Dictionary::new();
        prefs.set("HideToolbar", Object::Boolean(true));
        catalog_dict.set("ViewerPreferences", Object::Dictionary(prefs));
        catalog_dict.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        catalog_dict.set("PageLayout", Object::Name(b"TwoColumnLeft".to_vec()));
        catalog_dict.set(
            "OpenAction",
            Object::Array(vec![Object::Reference(page_ids[0])]),
        );
    }
    let catalog_id = doc.add_object(Object::Dictionary(catalog_dict));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut info = Dictionary::new();
    info.set("Title", Object::string_literal("Quarterly Report"));
    info.set("Author", Object::string_literal("Fixture Factory"));
    info.set("Producer", Object::string_literal("pdfslim test fixtures"));
    info.set("CreationDate", Object::string_literal("D:20240115093000Z"));
    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn add_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    content: Vec<u8>,
    resources: Option<Dictionary>,
) -> lopdf::ObjectId {
    let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]),
    );
    if let Some(resources) = resources {
        page_dict.set("Resources", Object::Dictionary(resources));
    }

    doc.add_object(Object::Dictionary(page_dict))
}
