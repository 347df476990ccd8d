//! Cross-module properties spanning the writer, xref loader and copier.

use pdf_graph::context::Context;
use pdf_graph::document::{Document, LoadOptions, NewPage, SaveOptions};
use pdf_graph::primitive::Primitive;
use pdf_graph::xref;

#[test]
fn numeric_formatting_round_trips_within_tolerance() {
    let mut doc = Document::create();
    doc.add_page(Some(NewPage::Size([123.456, 789.01234]))).unwrap();
    let bytes = doc.save(SaveOptions::default()).unwrap();

    let mut reloaded = Document::load(bytes, LoadOptions::default()).unwrap();
    let page = reloaded.get_pages().unwrap()[0];
    let bbox = reloaded.page_media_box(&page).unwrap();
    assert!((bbox[2] - 123.456).abs() < 1e-4);
    assert!((bbox[3] - 789.01234).abs() < 1e-4);
}

#[test]
fn both_writer_modes_round_trip_through_xref_load() {
    for use_object_streams in [true, false] {
        let mut doc = Document::create();
        doc.add_page(Some(NewPage::Size([50.0, 60.0]))).unwrap();
        doc.add_page(Some(NewPage::Size([70.0, 80.0]))).unwrap();
        let bytes = doc.save(SaveOptions { use_object_streams, ..SaveOptions::default() }).unwrap();

        let ctx = xref::load(&bytes, 0, &mut |_| {}).unwrap();
        assert!(ctx.trailer.root.is_some());

        let mut reloaded = Document::load(bytes, LoadOptions::default()).unwrap();
        assert_eq!(reloaded.get_page_count().unwrap(), 2);
    }
}

#[test]
fn flush_is_idempotent() {
    let mut doc = Document::create();
    doc.embed_standard_font("Times-Roman").unwrap();
    doc.flush().unwrap();
    let once = doc.save(SaveOptions::default()).unwrap();
    doc.flush().unwrap();
    let twice = doc.save(SaveOptions::default()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn copier_mutation_does_not_leak_into_source() {
    let mut src = Context::new();
    let leaf = src.register(Primitive::Dictionary({
        let mut d = pdf_graph::primitive::Dictionary::new();
        d.insert("Type", Primitive::name("Page"));
        d.insert("MediaBox", Primitive::Array(vec![
            Primitive::Integer(0), Primitive::Integer(0), Primitive::Integer(10), Primitive::Integer(10),
        ]));
        d
    }));

    let mut dst = Context::new();
    let copied = {
        let mut copier = pdf_graph::copier::Copier::new(&src, &mut dst);
        copier.copy_ref(leaf).unwrap()
    };

    let mut mutated = dst.get(copied).unwrap().as_dict().unwrap().clone();
    mutated.insert("MediaBox", Primitive::Array(vec![
        Primitive::Integer(0), Primitive::Integer(0), Primitive::Integer(999), Primitive::Integer(999),
    ]));
    dst.assign(copied, Primitive::Dictionary(mutated));

    let original = src.get(leaf).unwrap().as_dict().unwrap();
    let arr = original.get("MediaBox").unwrap().as_array().unwrap();
    assert_eq!(arr[2].as_integer().unwrap(), 10);
}
