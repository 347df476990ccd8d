//! JPEG image embedder (spec §4.5). Reads just enough of the JFIF header to
//! build the `/XObject /Subtype /Image` dictionary — width, height, bit
//! depth and color space — then stores the original compressed bytes behind
//! `/Filter /DCTDecode` without re-encoding them.

use crate::context::Context;
use crate::embed::Embedder;
use crate::error::{EmbedderErrorKind, PdfError, Result};
use crate::object::PlainRef;
use crate::primitive::{Dictionary, PdfStream, Primitive};

struct JpegInfo {
    width: u16,
    height: u16,
    components: u8,
}

/// Parse the SOF0/SOF2 marker to recover width/height/component-count
/// without fully decoding the entropy-coded pixel data.
fn read_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    use jpeg_decoder::{Decoder, PixelFormat};
    let mut decoder = Decoder::new(data);
    decoder
        .read_info()
        .map_err(|_| PdfError::EmbedderError { kind: EmbedderErrorKind::UnsupportedJpegBitdepth })?;
    let info = decoder
        .info()
        .ok_or(PdfError::EmbedderError { kind: EmbedderErrorKind::UnsupportedJpegBitdepth })?;
    let components = match info.pixel_format {
        PixelFormat::L8 => 1,
        PixelFormat::RGB24 => 3,
        PixelFormat::CMYK32 => 4,
        _ => return Err(PdfError::EmbedderError { kind: EmbedderErrorKind::UnsupportedJpegBitdepth }),
    };
    Ok(JpegInfo { width: info.width, height: info.height, components })
}

fn colorspace_for(components: u8) -> Result<&'static str> {
    match components {
        1 => Ok("DeviceGray"),
        3 => Ok("DeviceRGB"),
        4 => Ok("DeviceCMYK"),
        _ => Err(PdfError::EmbedderError { kind: EmbedderErrorKind::UnsupportedJpegBitdepth }),
    }
}

pub struct JpegEmbedder {
    target: PlainRef,
    data: Vec<u8>,
}

impl JpegEmbedder {
    pub fn new(target: PlainRef, data: Vec<u8>) -> JpegEmbedder {
        JpegEmbedder { target, data }
    }
}

impl Embedder for JpegEmbedder {
    fn target(&self) -> PlainRef {
        self.target
    }

    fn embed_into(&self, ctx: &mut Context) -> Result<()> {
        let info = read_jpeg_info(&self.data)?;
        let colorspace = colorspace_for(info.components)?;

        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::Name("XObject".into()));
        dict.insert("Subtype", Primitive::Name("Image".into()));
        dict.insert("Width", Primitive::Integer(info.width as i64));
        dict.insert("Height", Primitive::Integer(info.height as i64));
        dict.insert("ColorSpace", Primitive::Name(colorspace.into()));
        dict.insert("BitsPerComponent", Primitive::Integer(8));
        dict.insert("Filter", Primitive::Name("DCTDecode".into()));
        // Adobe APP14-tagged CMYK JPEGs store inverted ink values.
        if info.components == 4 {
            dict.insert(
                "Decode",
                Primitive::Array(
                    [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]
                        .into_iter()
                        .map(Primitive::Real)
                        .collect(),
                ),
            );
        }

        let stream = PdfStream::new(dict, self.data.clone());
        ctx.assign(self.target, Primitive::Stream(stream));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorspace_mapping() {
        assert_eq!(colorspace_for(1).unwrap(), "DeviceGray");
        assert_eq!(colorspace_for(3).unwrap(), "DeviceRGB");
        assert_eq!(colorspace_for(4).unwrap(), "DeviceCMYK");
        assert!(colorspace_for(2).is_err());
    }
}
