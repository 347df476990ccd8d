//! PNG image embedder (spec §4.5). Decodes the chunk structure only as far
//! as necessary to describe the raster to a PDF viewer: IHDR for dimensions
//! and color type, PLTE for an indexed palette, IDAT for the compressed
//! scanlines. When the PNG carries no alpha channel its IDAT bytes are a
//! valid `/FlateDecode` stream with `/DecodeParms /Predictor 15` as-is and
//! are stored unchanged; an alpha channel forces a full decode so the
//! channel can be split into a separate `/SMask` image.

use crate::context::Context;
use crate::embed::Embedder;
use crate::enc::{filter, unfilter, PredictorType};
use crate::error::{EmbedderErrorKind, PdfError, Result};
use crate::object::PlainRef;
use crate::primitive::{Dictionary, PdfStream, Primitive};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorType {
    Gray,
    Rgb,
    Indexed,
    GrayAlpha,
    Rgba,
}

impl ColorType {
    fn from_u8(n: u8) -> Result<ColorType> {
        Ok(match n {
            0 => ColorType::Gray,
            2 => ColorType::Rgb,
            3 => ColorType::Indexed,
            4 => ColorType::GrayAlpha,
            6 => ColorType::Rgba,
            _ => return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::PngMissingIhdr }),
        })
    }

    fn channels(&self) -> usize {
        match self {
            ColorType::Gray | ColorType::Indexed => 1,
            ColorType::GrayAlpha => 2,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }

    fn has_alpha(&self) -> bool {
        matches!(self, ColorType::GrayAlpha | ColorType::Rgba)
    }
}

struct Ihdr {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: ColorType,
}

struct Chunks<'a> {
    ihdr: Ihdr,
    palette: Option<&'a [u8]>,
    idat: Vec<u8>,
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn parse_chunks(data: &[u8]) -> Result<Chunks> {
    if data.len() < 8 || data[..8] != SIGNATURE {
        return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::PngMissingIhdr });
    }
    let mut pos = 8;
    let mut ihdr = None;
    let mut palette = None;
    let mut idat = Vec::new();

    while pos + 8 <= data.len() {
        let len = read_u32(&data[pos..pos + 4]) as usize;
        let kind = &data[pos + 4..pos + 8];
        let body_start = pos + 8;
        if body_start + len + 4 > data.len() {
            return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::PngTruncatedIdat });
        }
        let body = &data[body_start..body_start + len];
        match kind {
            b"IHDR" => {
                if len < 13 {
                    return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::PngMissingIhdr });
                }
                let color_type = ColorType::from_u8(body[9])?;
                let interlace = body[12];
                if interlace != 0 {
                    return Err(PdfError::Other { msg: "interlaced PNG not supported".into() });
                }
                ihdr = Some(Ihdr {
                    width: read_u32(&body[0..4]),
                    height: read_u32(&body[4..8]),
                    bit_depth: body[8],
                    color_type,
                });
            }
            b"PLTE" => palette = Some(body),
            b"IDAT" => idat.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        pos = body_start + len + 4;
    }

    let ihdr = ihdr.ok_or(PdfError::EmbedderError { kind: EmbedderErrorKind::PngMissingIhdr })?;
    if idat.is_empty() {
        return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::PngTruncatedIdat });
    }
    Ok(Chunks { ihdr, palette, idat })
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    use std::io::Read;
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::Other { msg: format!("png inflate failed: {}", e) })?;
    Ok(out)
}

/// Remove PNG per-row filtering, returning raw interleaved samples.
fn defilter(raw: &[u8], width: u32, height: u32, channels: usize, bit_depth: u8) -> Result<Vec<u8>> {
    let bpp = ((channels * bit_depth as usize) + 7) / 8;
    let row_bits = width as usize * channels * bit_depth as usize;
    let row_bytes = (row_bits + 7) / 8;
    let stride = row_bytes + 1;
    if raw.len() < stride * height as usize {
        return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::PngTruncatedIdat });
    }
    let mut out = vec![0u8; row_bytes * height as usize];
    let mut prev = vec![0u8; row_bytes];
    for y in 0..height as usize {
        let row = &raw[y * stride..y * stride + stride];
        let filter_type = PredictorType::from_u8(row[0])?;
        let inp = &row[1..];
        let dst = &mut out[y * row_bytes..(y + 1) * row_bytes];
        unfilter(filter_type, bpp.max(1), &prev, inp, dst);
        prev.copy_from_slice(dst);
    }
    Ok(out)
}

/// Re-apply an Up filter per row and deflate, for a freshly split channel
/// stream that needs to become its own `/FlateDecode` object.
fn refilter_and_compress(raw: &[u8], width: u32, height: u32, channels: usize, bit_depth: u8) -> Vec<u8> {
    let bpp = ((channels * bit_depth as usize) + 7) / 8;
    let row_bytes = (width as usize * channels * bit_depth as usize + 7) / 8;
    let mut prev = vec![0u8; row_bytes];
    let mut out = Vec::with_capacity(raw.len() + height as usize);
    for y in 0..height as usize {
        let mut current = raw[y * row_bytes..(y + 1) * row_bytes].to_vec();
        filter(PredictorType::Up, bpp.max(1), &prev, &mut current);
        out.push(PredictorType::Up as u8);
        out.extend_from_slice(&current);
        prev.copy_from_slice(&raw[y * row_bytes..(y + 1) * row_bytes]);
    }
    crate::enc::flate_encode(&out)
}

pub struct PngEmbedder {
    target: PlainRef,
    data: Vec<u8>,
}

impl PngEmbedder {
    pub fn new(target: PlainRef, data: Vec<u8>) -> PngEmbedder {
        PngEmbedder { target, data }
    }
}

impl Embedder for PngEmbedder {
    fn target(&self) -> PlainRef {
        self.target
    }

    fn embed_into(&self, ctx: &mut Context) -> Result<()> {
        let chunks = parse_chunks(&self.data)?;
        let ihdr = &chunks.ihdr;
        if ihdr.bit_depth != 8 {
            return Err(PdfError::Other { msg: "only 8-bit PNG samples are supported".into() });
        }

        if !ihdr.color_type.has_alpha() {
            let colorspace = match ihdr.color_type {
                ColorType::Gray => Primitive::Name("DeviceGray".into()),
                ColorType::Rgb => Primitive::Name("DeviceRGB".into()),
                ColorType::Indexed => {
                    let palette = chunks
                        .palette
                        .ok_or(PdfError::EmbedderError { kind: EmbedderErrorKind::PngMissingIhdr })?;
                    Primitive::Array(vec![
                        Primitive::Name("Indexed".into()),
                        Primitive::Name("DeviceRGB".into()),
                        Primitive::Integer((palette.len() / 3) as i64 - 1),
                        Primitive::String(crate::primitive::PdfString::new(palette.to_vec())),
                    ])
                }
                ColorType::GrayAlpha | ColorType::Rgba => unreachable!(),
            };

            let mut dict = Dictionary::new();
            dict.insert("Type", Primitive::Name("XObject".into()));
            dict.insert("Subtype", Primitive::Name("Image".into()));
            dict.insert("Width", Primitive::Integer(ihdr.width as i64));
            dict.insert("Height", Primitive::Integer(ihdr.height as i64));
            dict.insert("ColorSpace", colorspace);
            dict.insert("BitsPerComponent", Primitive::Integer(8));
            dict.insert("Filter", Primitive::Name("FlateDecode".into()));
            let mut parms = Dictionary::new();
            parms.insert("Predictor", Primitive::Integer(15));
            parms.insert("Columns", Primitive::Integer(ihdr.width as i64));
            parms.insert("Colors", Primitive::Integer(ihdr.color_type.channels() as i64));
            parms.insert("BitsPerComponent", Primitive::Integer(8));
            dict.insert("DecodeParms", Primitive::Dictionary(parms));

            let stream = PdfStream::new(dict, chunks.idat);
            ctx.assign(self.target, Primitive::Stream(stream));
            return Ok(());
        }

        // Alpha present: decode fully, split channels, re-encode each.
        let channels = ihdr.color_type.channels();
        let raw = inflate(&chunks.idat)?;
        let samples = defilter(&raw, ihdr.width, ihdr.height, channels, ihdr.bit_depth)?;

        let color_channels = channels - 1;
        let pixel_count = (ihdr.width * ihdr.height) as usize;
        let mut color = Vec::with_capacity(pixel_count * color_channels);
        let mut alpha = Vec::with_capacity(pixel_count);
        for px in samples.chunks_exact(channels) {
            color.extend_from_slice(&px[..color_channels]);
            alpha.push(px[color_channels]);
        }

        let colorspace = if color_channels == 1 { "DeviceGray" } else { "DeviceRGB" };
        let color_compressed = refilter_and_compress(&color, ihdr.width, ihdr.height, color_channels, 8);
        let alpha_compressed = refilter_and_compress(&alpha, ihdr.width, ihdr.height, 1, 8);

        let smask_ref = ctx.next_ref();
        let mut smask_dict = Dictionary::new();
        smask_dict.insert("Type", Primitive::Name("XObject".into()));
        smask_dict.insert("Subtype", Primitive::Name("Image".into()));
        smask_dict.insert("Width", Primitive::Integer(ihdr.width as i64));
        smask_dict.insert("Height", Primitive::Integer(ihdr.height as i64));
        smask_dict.insert("ColorSpace", Primitive::Name("DeviceGray".into()));
        smask_dict.insert("BitsPerComponent", Primitive::Integer(8));
        smask_dict.insert("Filter", Primitive::Name("FlateDecode".into()));
        let mut smask_parms = Dictionary::new();
        smask_parms.insert("Predictor", Primitive::Integer(15));
        smask_parms.insert("Columns", Primitive::Integer(ihdr.width as i64));
        smask_parms.insert("Colors", Primitive::Integer(1));
        smask_parms.insert("BitsPerComponent", Primitive::Integer(8));
        smask_dict.insert("DecodeParms", Primitive::Dictionary(smask_parms));
        ctx.assign(smask_ref, Primitive::Stream(PdfStream::new(smask_dict, alpha_compressed)));

        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::Name("XObject".into()));
        dict.insert("Subtype", Primitive::Name("Image".into()));
        dict.insert("Width", Primitive::Integer(ihdr.width as i64));
        dict.insert("Height", Primitive::Integer(ihdr.height as i64));
        dict.insert("ColorSpace", Primitive::Name(colorspace.into()));
        dict.insert("BitsPerComponent", Primitive::Integer(8));
        dict.insert("Filter", Primitive::Name("FlateDecode".into()));
        let mut parms = Dictionary::new();
        parms.insert("Predictor", Primitive::Integer(15));
        parms.insert("Columns", Primitive::Integer(ihdr.width as i64));
        parms.insert("Colors", Primitive::Integer(color_channels as i64));
        parms.insert("BitsPerComponent", Primitive::Integer(8));
        dict.insert("DecodeParms", Primitive::Dictionary(parms));
        dict.insert("SMask", Primitive::Reference(smask_ref));

        ctx.assign(self.target, Primitive::Stream(PdfStream::new(dict, color_compressed)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out.extend_from_slice(&[0u8; 4]); // crc not checked
        out
    }

    fn make_rgb_png(width: u32, height: u32) -> Vec<u8> {
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.push(8); // bit depth
        ihdr.push(2); // color type: RGB
        ihdr.extend_from_slice(&[0, 0, 0]);

        let row_bytes = (width * 3) as usize;
        let mut raw = Vec::new();
        for _ in 0..height {
            raw.push(0); // filter: none
            raw.extend(std::iter::repeat(0x42).take(row_bytes));
        }
        let idat = crate::enc::flate_encode(&raw);

        let mut png = SIGNATURE.to_vec();
        png.extend(chunk(b"IHDR", &ihdr));
        png.extend(chunk(b"IDAT", &idat));
        png.extend(chunk(b"IEND", &[]));
        png
    }

    #[test]
    fn parses_rgb_png_dimensions() {
        let png = make_rgb_png(4, 3);
        let chunks = parse_chunks(&png).unwrap();
        assert_eq!(chunks.ihdr.width, 4);
        assert_eq!(chunks.ihdr.height, 3);
        assert_eq!(chunks.ihdr.color_type, ColorType::Rgb);
    }

    #[test]
    fn embeds_opaque_png_without_smask() {
        let png = make_rgb_png(2, 2);
        let mut ctx = Context::new();
        let r = ctx.next_ref();
        let embedder = PngEmbedder::new(r, png);
        embedder.embed_into(&mut ctx).unwrap();
        let dict = ctx.get(r).unwrap().as_dict().unwrap();
        assert_eq!(dict.get("ColorSpace").unwrap().as_name().unwrap(), "DeviceRGB");
        assert!(dict.get("SMask").is_none());
    }

    #[test]
    fn rejects_bad_signature() {
        assert!(parse_chunks(b"not a png").is_err());
    }
}
