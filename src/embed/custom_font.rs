//! Custom (non-standard) font embedder (spec §4.5): a `/Type0` composite
//! font over a CIDFontType0/2 descendant, built from font-program bytes
//! handed to the caller-supplied `Fontkit` collaborator. Two modes share one
//! implementation: full embed carries every glyph in the original font
//! program, subset embed asks the fontkit to cut the program down to the
//! glyphs actually drawn and tags `/BaseFont` accordingly.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::context::Context;
use crate::embed::Embedder;
use crate::error::{EmbedderErrorKind, PdfError, Result};
use crate::fontkit::Fontkit;
use crate::object::PlainRef;
use crate::primitive::{Dictionary, PdfStream, Primitive};

/// Builds a deterministic `ABCDEF`-shaped subset tag from an object number,
/// so the same font embedded twice in one document gets the same prefix.
fn subset_tag(id: u32) -> String {
    let mut n = id;
    let mut letters = [b'A'; 6];
    for slot in letters.iter_mut().rev() {
        *slot = b'A' + (n % 26) as u8;
        n /= 26;
    }
    std::string::String::from_utf8(letters.to_vec()).unwrap()
}

pub struct CustomFontEmbedder {
    target: PlainRef,
    bytes: Vec<u8>,
    fontkit: Arc<dyn Fontkit>,
    subset: bool,
    used_glyphs: RefCell<BTreeSet<u32>>,
}

impl CustomFontEmbedder {
    pub fn new(target: PlainRef, bytes: Vec<u8>, fontkit: Arc<dyn Fontkit>, subset: bool) -> CustomFontEmbedder {
        CustomFontEmbedder { target, bytes, fontkit, subset, used_glyphs: RefCell::new(BTreeSet::new()) }
    }

    /// Record a glyph id as drawn; accumulates across `drawText` calls made
    /// between `embed()` invocations (spec §4.5).
    pub fn mark_glyph_used(&self, glyph_id: u32) {
        self.used_glyphs.borrow_mut().insert(glyph_id);
    }
}

impl Embedder for CustomFontEmbedder {
    fn target(&self) -> PlainRef {
        self.target
    }

    fn embed_into(&self, ctx: &mut Context) -> Result<()> {
        let parsed = self
            .fontkit
            .parse(&self.bytes)
            .map_err(|_| PdfError::EmbedderError { kind: EmbedderErrorKind::FontParseFailed })?;

        let glyph_ids: Vec<u32> = self.used_glyphs.borrow().iter().copied().collect();

        let (program, base_name) = if self.subset {
            let subset_bytes = self
                .fontkit
                .subset(&self.bytes, &glyph_ids)
                .map_err(|_| PdfError::EmbedderError { kind: EmbedderErrorKind::SubsetFailed })?;
            (subset_bytes, format!("{}+CustomFont", subset_tag(self.target.id)))
        } else {
            (self.bytes.clone(), "CustomFont".to_string())
        };

        let font_file_ref = ctx.next_ref();
        let mut font_file_dict = Dictionary::new();
        font_file_dict.insert("Length1", Primitive::Integer(program.len() as i64));
        ctx.assign(font_file_ref, Primitive::Stream(PdfStream::new(font_file_dict, program)));

        let bbox = parsed.bbox();
        let mut descriptor = Dictionary::new();
        descriptor.insert("Type", Primitive::Name("FontDescriptor".into()));
        descriptor.insert("FontName", Primitive::Name(base_name.clone()));
        descriptor.insert(
            "FontBBox",
            Primitive::Array(bbox.iter().copied().map(Primitive::Real).collect()),
        );
        descriptor.insert("Flags", Primitive::Integer(4));
        descriptor.insert("ItalicAngle", Primitive::Integer(0));
        descriptor.insert("Ascent", Primitive::Real(bbox[3]));
        descriptor.insert("Descent", Primitive::Real(bbox[1]));
        descriptor.insert("CapHeight", Primitive::Real(bbox[3]));
        descriptor.insert("StemV", Primitive::Integer(80));
        if parsed.is_truetype() {
            descriptor.insert("FontFile2", Primitive::Reference(font_file_ref));
        } else {
            descriptor.insert("FontFile3", Primitive::Reference(font_file_ref));
        }
        let descriptor_ref = ctx.next_ref();
        ctx.assign(descriptor_ref, Primitive::Dictionary(descriptor));

        let mut widths = Vec::new();
        for &gid in &glyph_ids {
            let w = parsed.hmtx(gid).unwrap_or(0.0);
            widths.push(Primitive::Integer(gid as i64));
            widths.push(Primitive::Array(vec![Primitive::Real(w)]));
        }

        let mut cid_system_info = Dictionary::new();
        cid_system_info.insert("Registry", Primitive::String("Adobe".into()));
        cid_system_info.insert("Ordering", Primitive::String("Identity".into()));
        cid_system_info.insert("Supplement", Primitive::Integer(0));

        let mut descendant = Dictionary::new();
        descendant.insert(
            "Type",
            Primitive::Name("Font".into()),
        );
        descendant.insert(
            "Subtype",
            Primitive::Name(if parsed.is_truetype() { "CIDFontType2" } else { "CIDFontType0" }.into()),
        );
        descendant.insert("BaseFont", Primitive::Name(base_name.clone()));
        descendant.insert("CIDSystemInfo", Primitive::Dictionary(cid_system_info));
        descendant.insert("FontDescriptor", Primitive::Reference(descriptor_ref));
        descendant.insert("DW", Primitive::Integer(1000));
        descendant.insert("W", Primitive::Array(widths));
        descendant.insert("CIDToGIDMap", Primitive::Name("Identity".into()));
        let descendant_ref = ctx.next_ref();
        ctx.assign(descendant_ref, Primitive::Dictionary(descendant));

        let cmap_bytes = parsed.cmap(&glyph_ids);
        let to_unicode_ref = ctx.next_ref();
        ctx.assign(
            to_unicode_ref,
            Primitive::Stream(PdfStream::new(Dictionary::new(), cmap_bytes)),
        );

        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::Name("Font".into()));
        dict.insert("Subtype", Primitive::Name("Type0".into()));
        dict.insert("BaseFont", Primitive::Name(base_name));
        dict.insert("Encoding", Primitive::Name("Identity-H".into()));
        dict.insert("DescendantFonts", Primitive::Array(vec![Primitive::Reference(descendant_ref)]));
        dict.insert("ToUnicode", Primitive::Reference(to_unicode_ref));

        ctx.assign(self.target, Primitive::Dictionary(dict));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fontkit::{Glyph, ParsedFont};

    struct FakeFont;
    impl ParsedFont for FakeFont {
        fn glyph_for_codepoint(&self, codepoint: u32) -> Option<Glyph> {
            Some(Glyph { id: codepoint, advance_width: 500.0, unicode: char::from_u32(codepoint) })
        }
        fn hmtx(&self, _glyph_id: u32) -> Option<f64> {
            Some(500.0)
        }
        fn bbox(&self) -> [f64; 4] {
            [-100.0, -200.0, 900.0, 800.0]
        }
        fn cmap(&self, _glyph_ids: &[u32]) -> Vec<u8> {
            b"fake-cmap".to_vec()
        }
        fn is_truetype(&self) -> bool {
            true
        }
    }

    struct FakeKit;
    impl Fontkit for FakeKit {
        fn parse(&self, _bytes: &[u8]) -> Result<Arc<dyn ParsedFont>> {
            Ok(Arc::new(FakeFont))
        }
        fn subset(&self, _bytes: &[u8], glyph_ids: &[u32]) -> Result<Vec<u8>> {
            Ok(glyph_ids.iter().map(|&g| g as u8).collect())
        }
    }

    #[test]
    fn full_embed_produces_type0_dict() {
        let mut ctx = Context::new();
        let r = ctx.next_ref();
        let embedder = CustomFontEmbedder::new(r, vec![0u8; 16], Arc::new(FakeKit), false);
        embedder.mark_glyph_used(1);
        embedder.embed_into(&mut ctx).unwrap();
        let dict = ctx.get(r).unwrap().as_dict().unwrap();
        assert_eq!(dict.get("Subtype").unwrap().as_name().unwrap(), "Type0");
    }

    #[test]
    fn subset_embed_tags_base_font() {
        let mut ctx = Context::new();
        let r = ctx.next_ref();
        let embedder = CustomFontEmbedder::new(r, vec![0u8; 16], Arc::new(FakeKit), true);
        embedder.mark_glyph_used(2);
        embedder.mark_glyph_used(3);
        embedder.embed_into(&mut ctx).unwrap();
        let dict = ctx.get(r).unwrap().as_dict().unwrap();
        let base_font = dict.get("BaseFont").unwrap().as_name().unwrap();
        assert!(base_font.contains('+'));
        assert_eq!(base_font.split('+').next().unwrap().len(), 6);
    }

    #[test]
    fn subset_tag_is_deterministic() {
        assert_eq!(subset_tag(42), subset_tag(42));
    }
}
