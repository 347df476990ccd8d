//! Turns a byte slice into `Primitive` values: the recursive-descent object parser.

mod lexer;

pub use self::lexer::{Lexer, Substr, StringLexer, HexStringLexer};

use crate::error::*;
use crate::object::{GenNr, ObjNr, PlainRef, Resolve};
use crate::primitive::{Dictionary, PdfStream, PdfString, Primitive};

/// Recursion guard for nested arrays/dictionaries (spec §4.2 `DepthExceeded`).
const MAX_DEPTH: usize = 32;

/// Parse a single object from `data`. `resolve` is consulted only for an
/// indirect `/Length` on a stream dictionary.
pub fn parse(data: &[u8], resolve: &impl Resolve) -> Result<Primitive> {
    let mut lexer = Lexer::new(data);
    parse_object(&mut lexer, resolve, MAX_DEPTH)
}

/// Parse a single object directly off an existing, positioned `Lexer`,
/// advancing it past the value. Used where the caller needs to know how
/// much input the value consumed (e.g. a trailer dictionary preceding an
/// xref section that continues in the same buffer).
pub fn parse_from_lexer(lexer: &mut Lexer, resolve: &impl Resolve) -> Result<Primitive> {
    parse_object(lexer, resolve, MAX_DEPTH)
}

/// Parse the body of an `n g obj ... endobj` indirect object, returning its
/// reference and value. `offset` lets error positions refer to the file.
pub fn parse_indirect_object(data: &[u8], offset: usize, resolve: &impl Resolve) -> Result<(PlainRef, Primitive)> {
    let mut lexer = Lexer::with_offset(data, offset);
    let id: ObjNr = lexer.next()?.to()?;
    let gen: GenNr = lexer.next()?.to()?;
    lexer.next_expect("obj")?;
    let value = parse_object(&mut lexer, resolve, MAX_DEPTH)?;
    lexer.next_expect("endobj")?;
    Ok((PlainRef { id, gen }, value))
}

fn parse_object(lexer: &mut Lexer, resolve: &impl Resolve, depth: usize) -> Result<Primitive> {
    if depth == 0 {
        return Err(PdfError::ParseError {
            offset: lexer.get_pos(),
            kind: ParseErrorKind::DepthExceeded,
        });
    }

    let first = lexer.next()?;

    if first.equals(b"<<") {
        let dict = parse_dictionary(lexer, resolve, depth - 1)?;
        if lexer.peek()?.equals(b"stream") {
            Ok(Primitive::Stream(parse_stream_body(dict, lexer, resolve)?))
        } else {
            Ok(Primitive::Dictionary(dict))
        }
    } else if first.equals(b"[") {
        let mut array = Vec::new();
        loop {
            if lexer.peek()?.equals(b"]") {
                lexer.next()?;
                break;
            }
            array.push(parse_object(lexer, resolve, depth - 1)?);
        }
        Ok(Primitive::Array(array))
    } else if first.equals(b"(") {
        let mut data = Vec::new();
        let consumed = {
            let mut string_lexer = StringLexer::new(lexer.get_remaining_slice());
            for byte in string_lexer.iter() {
                data.push(byte?);
            }
            string_lexer.get_offset()
        };
        lexer.offset_pos(consumed);
        Ok(Primitive::String(PdfString::new(data)))
    } else if first.equals(b"<") {
        let mut data = Vec::new();
        let consumed = {
            let mut hex_lexer = HexStringLexer::new(lexer.get_remaining_slice());
            for byte in hex_lexer.iter() {
                data.push(byte?);
            }
            hex_lexer.get_offset()
        };
        lexer.offset_pos(consumed);
        Ok(Primitive::String(PdfString::new(data)))
    } else if first.starts_with(b"/") {
        Ok(Primitive::Name(first.reslice(1..).to_name()?))
    } else if first.equals(b"true") {
        Ok(Primitive::Boolean(true))
    } else if first.equals(b"false") {
        Ok(Primitive::Boolean(false))
    } else if first.equals(b"null") {
        Ok(Primitive::Null)
    } else if first.is_integer() {
        // Could be a bare integer or the start of `id gen R`.
        let checkpoint = lexer.get_pos();
        if let Ok(second) = lexer.next() {
            if second.is_integer() {
                if let Ok(third) = lexer.next() {
                    if third.equals(b"R") {
                        return Ok(Primitive::Reference(PlainRef {
                            id: first.to::<ObjNr>()?,
                            gen: second.to::<GenNr>()?,
                        }));
                    }
                }
            }
        }
        lexer.set_pos(checkpoint);
        Ok(Primitive::Integer(first.to::<i64>()?))
    } else if let Some(real) = first.real_number() {
        Ok(Primitive::Real(real.to::<f64>()?))
    } else {
        Err(PdfError::UnknownType {
            pos: lexer.get_pos(),
            first_lexeme: first.to_string(),
        })
    }
}

fn parse_dictionary(lexer: &mut Lexer, resolve: &impl Resolve, depth: usize) -> Result<Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let token = lexer.next()?;
        if token.equals(b">>") {
            break;
        }
        if !token.starts_with(b"/") {
            return Err(PdfError::UnexpectedLexeme {
                pos: lexer.get_pos(),
                lexeme: token.to_string(),
                expected: "/ or >>",
            });
        }
        let key = token.reslice(1..).to_name()?;
        let value = parse_object(lexer, resolve, depth)?;
        dict.insert(key, value);
    }
    Ok(dict)
}

fn parse_stream_body(dict: Dictionary, lexer: &mut Lexer, resolve: &impl Resolve) -> Result<PdfStream> {
    lexer.next_stream()?;

    let length = match dict.get("Length") {
        Some(Primitive::Integer(n)) if *n >= 0 => *n as usize,
        Some(Primitive::Reference(r)) => resolve.resolve(*r)?.as_usize()?,
        Some(other) => {
            return Err(PdfError::UnexpectedPrimitive {
                expected: "non-negative Integer or Reference",
                found: other.get_debug_name(),
            })
        }
        None => {
            return Err(PdfError::MissingEntry {
                typ: "<Stream>",
                field: "Length".into(),
            })
        }
    };

    let body = lexer.read_n(length);
    if body.len() != length {
        return Err(PdfError::EOF);
    }
    let data = body.to_vec();

    lexer.next_expect("endstream")?;
    Ok(PdfStream::new(dict, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::NoResolve;

    #[test]
    fn parses_dictionary_and_names() {
        let data = b"<< /Type /Catalog /Count 3 >>";
        let p = parse(data, &NoResolve).unwrap();
        let dict = p.into_dictionary().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name().unwrap(), "Catalog");
        assert_eq!(dict.get("Count").unwrap().as_integer().unwrap(), 3);
    }

    #[test]
    fn parses_reference_vs_bare_integers() {
        let data = b"[1 2 3 0 R]";
        let array = parse(data, &NoResolve).unwrap().into_array().unwrap();
        assert_eq!(array[0].as_integer().unwrap(), 1);
        assert_eq!(array[1].as_integer().unwrap(), 2);
        assert_eq!(array[2].as_reference().unwrap(), PlainRef { id: 3, gen: 0 });
    }

    #[test]
    fn parses_escaped_name() {
        let data = b"/A#20Name";
        let p = parse(data, &NoResolve).unwrap();
        assert_eq!(p.as_name().unwrap(), "A Name");
    }

    #[test]
    fn parses_stream_with_direct_length() {
        let data = b"<< /Length 5 >>\nstream\nhello\nendstream";
        let p = parse(data, &NoResolve).unwrap();
        let stream = p.into_stream().unwrap();
        assert_eq!(stream.data, b"hello");
    }

    #[test]
    fn rejects_excessive_nesting() {
        let mut data = Vec::new();
        for _ in 0..64 {
            data.extend_from_slice(b"[");
        }
        let err = parse(&data, &NoResolve).unwrap_err();
        assert!(matches!(err, PdfError::ParseError { kind: ParseErrorKind::DepthExceeded, .. }));
    }

    #[test]
    fn parses_indirect_object_header() {
        let data = b"12 0 obj\n(hi)\nendobj";
        let (r, value) = parse_indirect_object(data, 0, &NoResolve).unwrap();
        assert_eq!(r, PlainRef { id: 12, gen: 0 });
        assert_eq!(value.as_string().unwrap().as_bytes(), b"hi");
    }
}
