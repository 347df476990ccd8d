//! The `Document` facade (spec §4.6): the one type most callers touch.
//! Owns the `Context`, the catalog and page-tree root refs, a page cache,
//! the deferred embedder list, and the caller-supplied `Fontkit`.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::context::Context;
use crate::embed::custom_font::CustomFontEmbedder;
use crate::embed::jpeg::JpegEmbedder;
use crate::embed::png::PngEmbedder;
use crate::embed::standard_font::{self, StandardFont, StandardFontEmbedder};
use crate::embed::Embedder;
use crate::error::{PdfError, Result};
use crate::fontkit::Fontkit;
use crate::object::PlainRef;
use crate::page_tree;
use crate::primitive::{Dictionary, Primitive};
use crate::util::{self, PageSize, PdfInput};
use crate::xref;

static NEXT_DOC_ID: AtomicU64 = AtomicU64::new(1);

/// A handle to one page's leaf object, tagged with the id of the `Document`
/// that owns it so a page from one document can't silently be spliced into
/// another's tree (spec §7 `ForeignPage`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Page {
    doc_id: u64,
    pub leaf: PlainRef,
}

/// What to place at a given index for `add_page`/`insert_page`.
pub enum NewPage {
    /// A blank page sized to the default page size ([`PageSize::default`]).
    Blank,
    /// A blank page of the given `[width, height]`, in points.
    Size([f64; 2]),
    /// Re-link a page already owned by this document.
    Existing(Page),
}

impl From<[f64; 2]> for NewPage {
    fn from(size: [f64; 2]) -> NewPage {
        NewPage::Size(size)
    }
}
impl From<PageSize> for NewPage {
    fn from(size: PageSize) -> NewPage {
        NewPage::Size(size.dimensions())
    }
}
impl From<Page> for NewPage {
    fn from(page: Page) -> NewPage {
        NewPage::Existing(page)
    }
}

/// `embed_font`'s input: either a standard-font tag (a `/BaseFont`-style
/// name such as `"Helvetica"`) or font-program bytes in any accepted shape
/// (spec §9's Open Question on the dual-shape `font` argument).
pub enum FontInput {
    Tag(String),
    Bytes(PdfInput),
}
impl From<&str> for FontInput {
    fn from(s: &str) -> FontInput {
        FontInput::Tag(s.to_string())
    }
}
impl From<String> for FontInput {
    fn from(s: String) -> FontInput {
        FontInput::Tag(s)
    }
}
impl From<Vec<u8>> for FontInput {
    fn from(bytes: Vec<u8>) -> FontInput {
        FontInput::Bytes(PdfInput::Bytes(bytes))
    }
}
impl From<PdfInput> for FontInput {
    fn from(input: PdfInput) -> FontInput {
        FontInput::Bytes(input)
    }
}

/// A handle returned by `embed_font`/`embed_standard_font`. Custom-font
/// handles carry the live embedder so `mark_glyph_used` (called by the
/// out-of-scope text-drawing API between here and `flush`) reaches it.
pub enum FontHandle {
    Standard(PlainRef),
    Custom(PlainRef, Rc<CustomFontEmbedder>),
}
impl FontHandle {
    pub fn target(&self) -> PlainRef {
        match self {
            FontHandle::Standard(r) => *r,
            FontHandle::Custom(r, _) => *r,
        }
    }

    pub fn mark_glyph_used(&self, glyph_id: u32) {
        if let FontHandle::Custom(_, embedder) = self {
            embedder.mark_glyph_used(glyph_id);
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
    pub ignore_encryption: bool,
    /// Objects parsed between cooperative yields; `0` means unbounded.
    pub parse_speed: usize,
}
impl Default for LoadOptions {
    fn default() -> LoadOptions {
        LoadOptions { ignore_encryption: false, parse_speed: 0 }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EmbedFontOptions {
    pub subset: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct SaveOptions {
    pub use_object_streams: bool,
    pub add_default_page: bool,
    pub objects_per_tick: usize,
}
impl Default for SaveOptions {
    fn default() -> SaveOptions {
        SaveOptions { use_object_streams: true, add_default_page: true, objects_per_tick: 50 }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SaveBase64Options {
    pub data_uri: bool,
}

fn new_blank_leaf(ctx: &mut Context, size: [f64; 2]) -> PlainRef {
    let mut dict = Dictionary::new();
    dict.insert("Type", Primitive::name("Page"));
    dict.insert(
        "MediaBox",
        Primitive::Array(vec![
            Primitive::Real(0.0),
            Primitive::Real(0.0),
            Primitive::Real(size[0]),
            Primitive::Real(size[1]),
        ]),
    );
    dict.insert("Resources", Primitive::Dictionary(Dictionary::new()));
    ctx.register(Primitive::Dictionary(dict))
}

pub struct Document {
    id: u64,
    ctx: Context,
    catalog: PlainRef,
    page_root: PlainRef,
    pages_cache: Option<Vec<Page>>,
    pending: Vec<Rc<dyn Embedder>>,
    fontkit: Option<Arc<dyn Fontkit>>,
}

impl Document {
    /// Build an empty document: a fresh `Context`, a root `/Pages` node and
    /// a `/Catalog` pointing at it.
    pub fn create() -> Document {
        let mut ctx = Context::new();
        let page_root = page_tree::new_root(&mut ctx);
        let mut catalog_dict = Dictionary::new();
        catalog_dict.insert("Type", Primitive::name("Catalog"));
        catalog_dict.insert("Pages", Primitive::Reference(page_root));
        let catalog = ctx.register(Primitive::Dictionary(catalog_dict));
        ctx.trailer.root = Some(catalog);

        Document {
            id: NEXT_DOC_ID.fetch_add(1, Ordering::Relaxed),
            ctx,
            catalog,
            page_root,
            pages_cache: None,
            pending: Vec::new(),
            fontkit: None,
        }
    }

    /// Parse `input` and wrap it as a `Document`. Fails if the trailer
    /// carries `/Encrypt` and `ignore_encryption` wasn't set.
    pub fn load(input: impl Into<PdfInput>, options: LoadOptions) -> Result<Document> {
        let bytes = util::normalize_input(input.into())?;
        let ctx = xref::load(&bytes, options.parse_speed, &mut |_| {})?;

        if ctx.trailer.encrypt.is_some() && !options.ignore_encryption {
            return Err(PdfError::EncryptedPdf);
        }

        let catalog = ctx
            .trailer
            .root
            .ok_or(PdfError::MissingEntry { typ: "Trailer", field: "Root".into() })?;
        let page_root = ctx
            .get(catalog)?
            .as_dict()?
            .get("Pages")
            .ok_or(PdfError::MissingEntry { typ: "Catalog", field: "Pages".into() })?
            .as_reference()?;

        Ok(Document {
            id: NEXT_DOC_ID.fetch_add(1, Ordering::Relaxed),
            ctx,
            catalog,
            page_root,
            pages_cache: None,
            pending: Vec::new(),
            fontkit: None,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn catalog(&self) -> PlainRef {
        self.catalog
    }

    fn invalidate_cache(&mut self) {
        self.pages_cache = None;
    }

    /// Pre-order page leaves, in rendering order; rebuilt on first access
    /// after any mutation (spec §9's page cache).
    pub fn get_pages(&mut self) -> Result<&[Page]> {
        if self.pages_cache.is_none() {
            let id = self.id;
            let mut pages = Vec::new();
            page_tree::traverse(&self.ctx, self.page_root, &mut |r, _dict| {
                pages.push(Page { doc_id: id, leaf: r });
            })?;
            self.pages_cache = Some(pages);
        }
        Ok(self.pages_cache.as_deref().unwrap())
    }

    pub fn get_page_count(&self) -> Result<u32> {
        page_tree::page_count(&self.ctx, self.page_root)
    }

    pub fn get_page_indices(&self) -> Result<Vec<u32>> {
        Ok((0..self.get_page_count()?).collect())
    }

    pub fn page_dict(&self, page: &Page) -> Result<&Dictionary> {
        self.ctx.get(page.leaf)?.as_dict()
    }

    /// Resolve `/MediaBox` by walking `/Parent` links if the leaf doesn't
    /// carry its own (spec §4.4 inherited attributes).
    pub fn page_media_box(&self, page: &Page) -> Result<[f64; 4]> {
        let get_dict = |r: PlainRef| -> Result<Dictionary> { Ok(self.ctx.get(r)?.as_dict()?.clone()) };
        let value = page_tree::inherited_attribute(&get_dict, page.leaf, "MediaBox")?
            .ok_or(PdfError::MissingEntry { typ: "Page", field: "MediaBox".into() })?;
        let arr = value.as_array()?;
        Ok([arr[0].as_real()?, arr[1].as_real()?, arr[2].as_real()?, arr[3].as_real()?])
    }

    fn resolve_new_page(&mut self, page: Option<NewPage>) -> Result<PlainRef> {
        match page.unwrap_or(NewPage::Blank) {
            NewPage::Blank => Ok(new_blank_leaf(&mut self.ctx, PageSize::default().dimensions())),
            NewPage::Size(size) => Ok(new_blank_leaf(&mut self.ctx, size)),
            NewPage::Existing(existing) => {
                if existing.doc_id != self.id {
                    return Err(PdfError::ForeignPage);
                }
                Ok(existing.leaf)
            }
        }
    }

    pub fn insert_page(&mut self, index: usize, page: Option<NewPage>) -> Result<Page> {
        let leaf = self.resolve_new_page(page)?;
        let (new_root, _parent) = page_tree::insert(&mut self.ctx, self.page_root, leaf, index)?;
        self.page_root = new_root;
        self.invalidate_cache();
        Ok(Page { doc_id: self.id, leaf })
    }

    pub fn add_page(&mut self, page: Option<NewPage>) -> Result<Page> {
        let count = self.get_page_count()?;
        self.insert_page(count as usize, page)
    }

    /// Fails with `RemovePageFromEmptyDocument` on an empty tree and
    /// `PageOutOfBounds` for any other invalid index (spec §9's Open
    /// Question on tightening the emptiness check to the true page count).
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        let count = self.get_page_count()?;
        if count == 0 {
            return Err(PdfError::RemovePageFromEmptyDocument);
        }
        if index as u32 >= count {
            return Err(PdfError::PageOutOfBounds { page_nr: index as u32, max: count });
        }
        let (new_root, removed) = page_tree::remove(&mut self.ctx, self.page_root, index)?;
        self.page_root = new_root;
        self.ctx.free(removed.id);
        self.invalidate_cache();
        Ok(())
    }

    /// Flush `src`, then copy the leaf subgraph at each requested index into
    /// this document via one shared object `Copier`, so resources the
    /// requested pages have in common (fonts, images) land in a single
    /// destination object instead of being duplicated per page. Does not
    /// link the copies into this document's page tree — pass the results to
    /// `add_page`/`insert_page`.
    ///
    /// Each leaf's `/Parent` is stripped before copying: `Copier` follows
    /// every `Reference` it meets, and `/Parent` points back into the
    /// source's page tree, so copying it verbatim would pull in every
    /// sibling page reachable from the same root.
    pub fn copy_pages(&mut self, src: &mut Document, indices: &[usize]) -> Result<Vec<Page>> {
        src.flush()?;
        let src_pages = src.get_pages()?.to_vec();

        let mut copier = crate::copier::Copier::new(&src.ctx, &mut self.ctx);
        let mut out = Vec::with_capacity(indices.len());
        for &idx in indices {
            let src_page = src_pages.get(idx).ok_or(PdfError::PageOutOfBounds {
                page_nr: idx as u32,
                max: src_pages.len() as u32,
            })?;
            let mut dict = src.ctx.get(src_page.leaf)?.as_dict()?.clone();
            dict.remove("Parent");
            let new_leaf = copier.register_copy(Primitive::Dictionary(dict))?;
            out.push(Page { doc_id: self.id, leaf: new_leaf });
        }
        Ok(out)
    }

    pub fn register_fontkit(&mut self, fontkit: Arc<dyn Fontkit>) {
        self.fontkit = Some(fontkit);
    }

    /// Dispatches on the input's shape: a string is first checked against
    /// the standard-font enumeration; if it matches, it goes to the Type1
    /// embedder. Any other input — including a string that doesn't match a
    /// recognized tag — falls through to binary-font handling and is
    /// treated as font-program bytes (base64 for a plain string, or as
    /// given for anything already shaped as bytes), which requires a
    /// registered fontkit to parse metrics (subsetting additionally calls
    /// into it to cut the program down).
    pub fn embed_font(&mut self, input: impl Into<FontInput>, options: EmbedFontOptions) -> Result<FontHandle> {
        match input.into() {
            FontInput::Tag(tag) => match standard_font::lookup(&tag) {
                Ok(font) => Ok(self.embed_standard_font_value(font)),
                Err(_) => self.embed_custom_font(PdfInput::Base64(tag), options),
            },
            FontInput::Bytes(input) => self.embed_custom_font(input, options),
        }
    }

    fn embed_custom_font(&mut self, input: PdfInput, options: EmbedFontOptions) -> Result<FontHandle> {
        let bytes = util::normalize_input(input)?;
        let fontkit = self.fontkit.clone().ok_or(PdfError::FontkitNotRegistered)?;
        let target = self.ctx.next_ref();
        let embedder = Rc::new(CustomFontEmbedder::new(target, bytes, fontkit, options.subset));
        self.pending.push(embedder.clone());
        Ok(FontHandle::Custom(target, embedder))
    }

    fn embed_standard_font_value(&mut self, font: StandardFont) -> FontHandle {
        let target = self.ctx.next_ref();
        self.pending.push(Rc::new(StandardFontEmbedder::new(target, font)));
        FontHandle::Standard(target)
    }

    pub fn embed_standard_font(&mut self, name: &str) -> Result<FontHandle> {
        let font: StandardFont = standard_font::lookup(name)?;
        Ok(self.embed_standard_font_value(font))
    }

    pub fn embed_jpg(&mut self, input: impl Into<PdfInput>) -> Result<PlainRef> {
        let bytes = util::normalize_input(input.into())?;
        let target = self.ctx.next_ref();
        self.pending.push(Rc::new(JpegEmbedder::new(target, bytes)));
        Ok(target)
    }

    pub fn embed_png(&mut self, input: impl Into<PdfInput>) -> Result<PlainRef> {
        let bytes = util::normalize_input(input.into())?;
        let target = self.ctx.next_ref();
        self.pending.push(Rc::new(PngEmbedder::new(target, bytes)));
        Ok(target)
    }

    /// Drain the deferred embedder list in insertion order. Idempotent: a
    /// second call sees an empty list and does nothing.
    pub fn flush(&mut self) -> Result<()> {
        for embedder in self.pending.drain(..) {
            embedder.embed_into(&mut self.ctx)?;
        }
        Ok(())
    }

    pub fn save(&mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if options.add_default_page && self.get_page_count()? == 0 {
            self.add_page(None)?;
        }
        self.flush()?;
        if options.use_object_streams {
            crate::writer::write_with_object_streams(&self.ctx, options.objects_per_tick, &mut |_| {})
        } else {
            crate::writer::write_classical(&self.ctx, options.objects_per_tick, &mut |_| {})
        }
    }

    pub fn save_as_base64(&mut self, save_options: SaveOptions, options: SaveBase64Options) -> Result<String> {
        let bytes = self.save(save_options)?;
        let encoded = util::encode_base64(&bytes);
        if options.data_uri {
            Ok(format!("data:application/pdf;base64,{}", encoded))
        } else {
            Ok(encoded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_save_empty_yields_one_a4_page() {
        let mut doc = Document::create();
        let bytes = doc.save(SaveOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));

        let mut reloaded = Document::load(bytes, LoadOptions::default()).unwrap();
        assert_eq!(reloaded.get_page_count().unwrap(), 1);
        let page = reloaded.get_pages().unwrap()[0];
        assert_eq!(reloaded.page_media_box(&page).unwrap(), [0.0, 0.0, 595.28, 841.89]);
    }

    #[test]
    fn insert_at_head_shifts_order() {
        let mut doc = Document::create();
        doc.add_page(Some(NewPage::Size([100.0, 100.0]))).unwrap();
        doc.insert_page(0, Some(NewPage::Size([200.0, 200.0]))).unwrap();

        let pages = doc.get_pages().unwrap().to_vec();
        assert_eq!(pages.len(), 2);
        assert_eq!(doc.page_media_box(&pages[0]).unwrap(), [0.0, 0.0, 200.0, 200.0]);
        assert_eq!(doc.page_media_box(&pages[1]).unwrap(), [0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn remove_from_empty_document_fails_and_leaves_it_unchanged() {
        let mut doc = Document::create();
        let err = doc.remove_page(0).unwrap_err();
        assert!(matches!(err, PdfError::RemovePageFromEmptyDocument));
        assert_eq!(doc.get_page_count().unwrap(), 0);
    }

    #[test]
    fn foreign_page_is_rejected() {
        let mut a = Document::create();
        let mut b = Document::create();
        let page_in_a = a.add_page(None).unwrap();
        let err = b.add_page(Some(NewPage::Existing(page_in_a))).unwrap_err();
        assert!(matches!(err, PdfError::ForeignPage));
    }

    #[test]
    fn embed_font_with_unrecognized_tag_falls_through_to_custom_embedder() {
        let mut doc = Document::create();
        // Not one of the 14 standard names, so this must fall through to
        // binary-font handling rather than hard-erroring out of `lookup`.
        let err = doc.embed_font("not-a-standard-font", EmbedFontOptions::default()).unwrap_err();
        assert!(matches!(err, PdfError::FontkitNotRegistered));
    }

    #[test]
    fn embed_standard_font_deferred_until_flush() {
        let mut doc = Document::create();
        let handle = doc.embed_standard_font("Helvetica").unwrap();
        assert!(doc.ctx.get(handle.target()).is_err());
        doc.flush().unwrap();
        assert!(doc.ctx.get(handle.target()).is_ok());
    }

    #[test]
    fn copy_pages_shares_common_resource_across_one_call() {
        let mut src = Document::create();
        let font = src.embed_standard_font("Helvetica").unwrap();
        src.flush().unwrap();
        let font_ref = font.target();

        let page_a = src.add_page(Some(NewPage::Size([10.0, 10.0]))).unwrap();
        let page_b = src.add_page(Some(NewPage::Size([20.0, 20.0]))).unwrap();

        // Attach the same font resource to both pages directly through the
        // arena, since drawing text onto a page is out of scope here.
        for page in [page_a, page_b] {
            let mut dict = src.ctx.get(page.leaf).unwrap().as_dict().unwrap().clone();
            let mut resources = dict.get("Resources").unwrap().as_dict().unwrap().clone();
            let mut fonts = Dictionary::new();
            fonts.insert("F1", Primitive::Reference(font_ref));
            resources.insert("Font", Primitive::Dictionary(fonts));
            dict.insert("Resources", Primitive::Dictionary(resources));
            src.ctx.assign(page.leaf, Primitive::Dictionary(dict));
        }

        let mut dst = Document::create();
        let copies = dst.copy_pages(&mut src, &[0, 1]).unwrap();

        let font_of = |p: &Page| -> PlainRef {
            let dict = dst.ctx.get(p.leaf).unwrap().as_dict().unwrap();
            let resources = dict.get("Resources").unwrap().as_dict().unwrap();
            let fonts = resources.get("Font").unwrap().as_dict().unwrap();
            fonts.get("F1").unwrap().as_reference().unwrap()
        };
        assert_eq!(font_of(&copies[0]), font_of(&copies[1]));

        // 2 (root + catalog from `create`) + 2 copied page leaves + 1 shared
        // font object — not one font object per copied page.
        assert_eq!(dst.ctx.iter().count(), 5);
    }

    #[test]
    fn cross_document_copy_preserves_source() {
        let mut src = Document::create();
        src.add_page(Some(NewPage::Size([10.0, 10.0]))).unwrap();
        src.add_page(Some(NewPage::Size([20.0, 20.0]))).unwrap();
        src.add_page(Some(NewPage::Size([30.0, 30.0]))).unwrap();

        let mut dst = Document::create();
        let copies = dst.copy_pages(&mut src, &[2, 0]).unwrap();
        dst.add_page(Some(NewPage::Existing(copies[0]))).unwrap();
        dst.add_page(Some(NewPage::Existing(copies[1]))).unwrap();

        assert_eq!(src.get_page_count().unwrap(), 3);
        let dst_pages = dst.get_pages().unwrap().to_vec();
        assert_eq!(dst.page_media_box(&dst_pages[0]).unwrap(), [0.0, 0.0, 30.0, 30.0]);
        assert_eq!(dst.page_media_box(&dst_pages[1]).unwrap(), [0.0, 0.0, 10.0, 10.0]);
    }
}
