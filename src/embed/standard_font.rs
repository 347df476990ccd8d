//! Standard-14 font embedder (spec §4.5). Produces a bare `/Type1` font
//! dictionary referencing one of the 14 base faces guaranteed present in any
//! PDF viewer; no font-program bytes are embedded. Width/height metrics come
//! from the bundled Core-14 AFM tables below, covering the WinAnsiEncoding
//! printable range (0x20..=0x7E); characters outside it fall back to each
//! face's AFM-average width rather than a full non-Latin table.

use crate::context::Context;
use crate::embed::Embedder;
use crate::error::{PdfError, Result};
use crate::object::PlainRef;
use crate::primitive::{Dictionary, Primitive};

/// The 14 base faces every PDF consumer is required to provide a rendering
/// for, without any embedded font program.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    /// Match a `/BaseFont`-style name. Recognizes the canonical Adobe name
    /// (spec §9's Open Question: the standard-font tag is a distinguished
    /// string value resolved by enumeration lookup).
    pub fn from_name(name: &str) -> Option<StandardFont> {
        use StandardFont::*;
        Some(match name {
            "Helvetica" => Helvetica,
            "Helvetica-Bold" => HelveticaBold,
            "Helvetica-Oblique" => HelveticaOblique,
            "Helvetica-BoldOblique" => HelveticaBoldOblique,
            "Times-Roman" => TimesRoman,
            "Times-Bold" => TimesBold,
            "Times-Italic" => TimesItalic,
            "Times-BoldItalic" => TimesBoldItalic,
            "Courier" => Courier,
            "Courier-Bold" => CourierBold,
            "Courier-Oblique" => CourierOblique,
            "Courier-BoldOblique" => CourierBoldOblique,
            "Symbol" => Symbol,
            "ZapfDingbats" => ZapfDingbats,
            _ => return None,
        })
    }

    pub fn base_name(&self) -> &'static str {
        use StandardFont::*;
        match self {
            Helvetica => "Helvetica",
            HelveticaBold => "Helvetica-Bold",
            HelveticaOblique => "Helvetica-Oblique",
            HelveticaBoldOblique => "Helvetica-BoldOblique",
            TimesRoman => "Times-Roman",
            TimesBold => "Times-Bold",
            TimesItalic => "Times-Italic",
            TimesBoldItalic => "Times-BoldItalic",
            Courier => "Courier",
            CourierBold => "Courier-Bold",
            CourierOblique => "Courier-Oblique",
            CourierBoldOblique => "Courier-BoldOblique",
            Symbol => "Symbol",
            ZapfDingbats => "ZapfDingbats",
        }
    }

    /// `[llx lly urx ury]` font bounding box in 1000-unit glyph space, as
    /// recorded in the face's AFM `FontBBox` entry.
    pub fn bbox(&self) -> [f64; 4] {
        use StandardFont::*;
        match self {
            Helvetica | HelveticaOblique => [-166.0, -225.0, 1000.0, 931.0],
            HelveticaBold | HelveticaBoldOblique => [-170.0, -228.0, 1003.0, 962.0],
            TimesRoman => [-168.0, -218.0, 1000.0, 898.0],
            TimesBold => [-168.0, -218.0, 1000.0, 935.0],
            TimesItalic => [-169.0, -217.0, 1010.0, 883.0],
            TimesBoldItalic => [-200.0, -218.0, 996.0, 921.0],
            Courier | CourierBold | CourierOblique | CourierBoldOblique => {
                [-23.0, -250.0, 715.0, 805.0]
            }
            Symbol => [-180.0, -293.0, 1090.0, 1010.0],
            ZapfDingbats => [-1.0, -143.0, 981.0, 820.0],
        }
    }

    /// AFM advance width, in 1000-unit glyph space, for one WinAnsi-encoded
    /// byte. Bytes outside the printable ASCII range resolve to this face's
    /// typical width rather than a full high-byte table.
    pub fn width(&self, ch: u8) -> f64 {
        use StandardFont::*;
        if let Courier | CourierBold | CourierOblique | CourierBoldOblique = self {
            return 600.0;
        }
        let table: &[u16; 95] = match self {
            Helvetica | HelveticaOblique => &HELVETICA,
            HelveticaBold | HelveticaBoldOblique => &HELVETICA_BOLD,
            TimesRoman => &TIMES_ROMAN,
            TimesBold => &TIMES_BOLD,
            TimesItalic => &TIMES_ITALIC,
            TimesBoldItalic => &TIMES_BOLD_ITALIC,
            Symbol | ZapfDingbats => return 600.0,
            Courier | CourierBold | CourierOblique | CourierBoldOblique => unreachable!(),
        };
        if (0x20..=0x7E).contains(&ch) {
            table[(ch - 0x20) as usize] as f64
        } else {
            // average width over the printable range, as a stand-in for
            // glyphs this table doesn't carry individually.
            let sum: u32 = table.iter().map(|&w| w as u32).sum();
            sum as f64 / table.len() as f64
        }
    }

    /// Sum of `width()` over `text`'s bytes, scaled to `size` points.
    pub fn width_of(&self, text: &str, size: f64) -> f64 {
        text.bytes().map(|b| self.width(b)).sum::<f64>() * size / 1000.0
    }
}

/// Adobe Core-14 AFM widths, WinAnsi/ASCII 0x20..=0x7E (space through `~`).
#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];
#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 333, 280, 333, 584,
];
#[rustfmt::skip]
static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];
#[rustfmt::skip]
static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 667, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
#[rustfmt::skip]
static TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];
#[rustfmt::skip]
static TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    832, 667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
    611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333, 278, 333, 570, 500,
    333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500,
    500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570,
];

/// Two-phase: `target()` is valid before `embed_into` ever runs (spec §4.8's
/// deferred-embed pattern), so a `Font` handle can be created and referenced
/// from content streams before `flush` actually writes the dictionary.
pub struct StandardFontEmbedder {
    target: PlainRef,
    font: StandardFont,
}

impl StandardFontEmbedder {
    pub fn new(target: PlainRef, font: StandardFont) -> StandardFontEmbedder {
        StandardFontEmbedder { target, font }
    }

    pub fn font(&self) -> StandardFont {
        self.font
    }
}

impl Embedder for StandardFontEmbedder {
    fn target(&self) -> PlainRef {
        self.target
    }

    fn embed_into(&self, ctx: &mut Context) -> Result<()> {
        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::Name("Font".into()));
        dict.insert("Subtype", Primitive::Name("Type1".into()));
        dict.insert("BaseFont", Primitive::Name(self.font.base_name().into()));
        if !matches!(self.font, StandardFont::Symbol | StandardFont::ZapfDingbats) {
            dict.insert("Encoding", Primitive::Name("WinAnsiEncoding".into()));
        }
        ctx.assign(self.target, dict.into());
        Ok(())
    }
}

pub fn lookup(name: &str) -> Result<StandardFont> {
    StandardFont::from_name(name).ok_or(PdfError::EmbedderError {
        kind: crate::error::EmbedderErrorKind::FontParseFailed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_width_of_hello_matches_afm_sum() {
        let f = StandardFont::Helvetica;
        // H=722 e=556 l=222 l=222 o=556 => 2278 /1000 * 12
        let expected = (722.0 + 556.0 + 222.0 + 222.0 + 556.0) * 12.0 / 1000.0;
        assert!((f.width_of("Hello", 12.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn courier_is_monospace() {
        let f = StandardFont::Courier;
        assert_eq!(f.width(b'i'), f.width(b'W'));
    }

    #[test]
    fn embed_produces_type1_dict() {
        let mut ctx = Context::new();
        let r = ctx.next_ref();
        let embedder = StandardFontEmbedder::new(r, StandardFont::Helvetica);
        embedder.embed_into(&mut ctx).unwrap();
        let dict = ctx.get(r).unwrap().as_dict().unwrap();
        assert_eq!(dict.get("BaseFont").unwrap().as_name().unwrap(), "Helvetica");
        assert_eq!(dict.get("Subtype").unwrap().as_name().unwrap(), "Type1");
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert!(StandardFont::from_name("Comic-Sans").is_none());
    }
}
