//! End-to-end scenarios over the public `Document` facade.

use pdf_graph::document::{Document, EmbedFontOptions, LoadOptions, NewPage, SaveOptions};
use pdf_graph::embed::standard_font::StandardFont;
use pdf_graph::error::PdfError;

#[test]
fn create_and_save_empty_yields_one_default_page() {
    let mut doc = Document::create();
    let bytes = doc.save(SaveOptions::default()).unwrap();

    let mut reloaded = Document::load(bytes, LoadOptions::default()).unwrap();
    assert_eq!(reloaded.get_page_count().unwrap(), 1);
    let page = reloaded.get_pages().unwrap()[0];
    assert_eq!(reloaded.page_media_box(&page).unwrap(), [0.0, 0.0, 595.28, 841.89]);
}

#[test]
fn insert_at_head_reorders_pages() {
    let mut doc = Document::create();
    doc.add_page(Some(NewPage::Size([100.0, 100.0]))).unwrap();
    doc.insert_page(0, Some(NewPage::Size([200.0, 200.0]))).unwrap();

    let pages = doc.get_pages().unwrap().to_vec();
    assert_eq!(doc.page_media_box(&pages[0]).unwrap(), [0.0, 0.0, 200.0, 200.0]);
    assert_eq!(doc.page_media_box(&pages[1]).unwrap(), [0.0, 0.0, 100.0, 100.0]);
}

#[test]
fn remove_from_empty_fails_without_mutating() {
    let mut doc = Document::create();
    let err = doc.remove_page(0).unwrap_err();
    assert!(matches!(err, PdfError::RemovePageFromEmptyDocument));
    assert_eq!(doc.get_page_count().unwrap(), 0);
}

#[test]
fn standard_font_width_matches_afm_sum() {
    let mut doc = Document::create();
    let handle = doc.embed_standard_font("Helvetica").unwrap();
    doc.flush().unwrap();
    let dict = doc.context().get(handle.target()).unwrap().as_dict().unwrap();
    assert_eq!(dict.get("BaseFont").unwrap().as_name().unwrap(), "Helvetica");

    let width = StandardFont::Helvetica.width_of("Hello", 12.0);
    let expected: f64 = "Hello"
        .bytes()
        .map(|b| StandardFont::Helvetica.width(b) * 12.0 / 1000.0)
        .sum();
    assert!((width - expected).abs() < 1e-9);
}

#[test]
fn png_with_alpha_produces_smask_of_matching_dimensions() {
    fn chunk(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out.extend_from_slice(&[0u8; 4]);
        out
    }

    let (w, h) = (3u32, 2u32);
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&w.to_be_bytes());
    ihdr.extend_from_slice(&h.to_be_bytes());
    ihdr.push(8);
    ihdr.push(6); // RGBA
    ihdr.extend_from_slice(&[0, 0, 0]);

    let row_bytes = (w * 4) as usize;
    let mut raw = Vec::new();
    for _ in 0..h {
        raw.push(0);
        raw.extend(std::iter::repeat(0x80).take(row_bytes));
    }
    let idat = pdf_graph::enc::flate_encode(&raw);

    let mut png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    png.extend(chunk(b"IHDR", &ihdr));
    png.extend(chunk(b"IDAT", &idat));
    png.extend(chunk(b"IEND", &[]));

    let mut doc = Document::create();
    let image_ref = doc.embed_png(png).unwrap();
    doc.flush().unwrap();

    let dict = doc.context().get(image_ref).unwrap().as_dict().unwrap();
    assert_eq!(dict.get("Width").unwrap().as_integer().unwrap(), w as i64);
    assert_eq!(dict.get("Height").unwrap().as_integer().unwrap(), h as i64);
    let smask_ref = dict.get("SMask").unwrap().as_reference().unwrap();
    let smask = doc.context().get(smask_ref).unwrap().as_dict().unwrap();
    assert_eq!(smask.get("ColorSpace").unwrap().as_name().unwrap(), "DeviceGray");
}

#[test]
fn cross_document_copy_leaves_source_intact() {
    let mut src = Document::create();
    src.add_page(Some(NewPage::Size([10.0, 10.0]))).unwrap();
    src.add_page(Some(NewPage::Size([20.0, 20.0]))).unwrap();
    src.add_page(Some(NewPage::Size([30.0, 30.0]))).unwrap();
    let saved = src.save(SaveOptions { add_default_page: false, ..SaveOptions::default() }).unwrap();

    let mut src_reloaded = Document::load(saved, LoadOptions::default()).unwrap();
    let mut dst = Document::create();
    let copies = dst.copy_pages(&mut src_reloaded, &[2, 0]).unwrap();

    // `dst` started from `Document::create()` with 2 objects (root `/Pages`
    // node + catalog); copying 2 of the 3 source pages must add exactly the
    // 2 copied leaves and nothing reachable from the uncopied middle page or
    // the source's own page-tree root, which `/Parent` would otherwise drag
    // in transitively.
    assert_eq!(dst.context().iter().count(), 4);
    for &page in &copies {
        assert!(dst.context().get(page.leaf).unwrap().as_dict().unwrap().get("Parent").is_none());
    }

    dst.add_page(Some(NewPage::Existing(copies[0]))).unwrap();
    dst.add_page(Some(NewPage::Existing(copies[1]))).unwrap();

    assert_eq!(src_reloaded.get_page_count().unwrap(), 3);
    let dst_bytes = dst.save(SaveOptions::default()).unwrap();
    let mut dst_reloaded = Document::load(dst_bytes, LoadOptions::default()).unwrap();
    assert_eq!(dst_reloaded.get_page_count().unwrap(), 2);
    let pages = dst_reloaded.get_pages().unwrap().to_vec();
    assert_eq!(dst_reloaded.page_media_box(&pages[0]).unwrap(), [0.0, 0.0, 30.0, 30.0]);
    assert_eq!(dst_reloaded.page_media_box(&pages[1]).unwrap(), [0.0, 0.0, 10.0, 10.0]);
}

#[test]
fn embed_font_without_fontkit_fails() {
    let mut doc = Document::create();
    let err = doc.embed_font(vec![0u8; 4], EmbedFontOptions::default()).unwrap_err();
    assert!(matches!(err, PdfError::FontkitNotRegistered));
}

#[test]
fn random_mutation_sequence_keeps_page_count_consistent() {
    let mut doc = Document::create();
    let mut model: Vec<f64> = Vec::new();
    let ops: [(&str, usize, f64); 8] = [
        ("add", 0, 10.0),
        ("add", 0, 20.0),
        ("insert", 0, 30.0),
        ("add", 0, 40.0),
        ("remove", 1, 0.0),
        ("insert", 0, 50.0),
        ("remove", 0, 0.0),
        ("add", 0, 60.0),
    ];
    for (kind, index, size) in ops {
        match kind {
            "add" => {
                doc.add_page(Some(NewPage::Size([size, size]))).unwrap();
                model.push(size);
            }
            "insert" => {
                doc.insert_page(index, Some(NewPage::Size([size, size]))).unwrap();
                model.insert(index.min(model.len()), size);
            }
            "remove" => {
                if !model.is_empty() {
                    let at = index.min(model.len() - 1);
                    doc.remove_page(at).unwrap();
                    model.remove(at);
                }
            }
            _ => unreachable!(),
        }
        assert_eq!(doc.get_page_count().unwrap() as usize, model.len());
    }

    let pages = doc.get_pages().unwrap().to_vec();
    for (page, expected) in pages.iter().zip(model.iter()) {
        let bbox = doc.page_media_box(page).unwrap();
        assert_eq!(bbox, [0.0, 0.0, *expected, *expected]);
    }
}
