//! Cross-reference table location, parsing (classical table and stream forms),
//! `/Prev`-chain following, and full-document materialization into a `Context`.

use std::collections::HashMap;

use crate::context::Context;
use crate::enc::decode_stream_data;
use crate::error::*;
use crate::object::{GenNr, NoResolve, ObjNr, PlainRef};
use crate::parser::{parse_indirect_object, Lexer};
use crate::primitive::{Dictionary, Primitive};

/// Bound on the number of `/Prev` links followed before declaring a cycle
/// (spec §4.2: "reject cycles, bounded recursion depth, default 1024").
const MAX_PREV_CHAIN: usize = 1024;

#[derive(Copy, Clone, Debug)]
enum XRefEntry {
    Free,
    InUse { offset: usize, gen: GenNr },
    Compressed { stream_id: ObjNr, index: usize },
}

#[derive(Default)]
struct XRefTable {
    entries: HashMap<ObjNr, XRefEntry>,
}
impl XRefTable {
    /// Earlier-processed (i.e. newer, since we read backward via `/Prev`)
    /// sections win: only fill in entries not already present.
    fn merge(&mut self, other: HashMap<ObjNr, XRefEntry>) {
        for (id, entry) in other {
            self.entries.entry(id).or_insert(entry);
        }
    }
}

/// Parse every object named by the cross-reference chain rooted at the
/// `startxref` offset, returning a populated `Context`. `tick` is called
/// with a running object count every `objects_per_yield` objects (spec
/// §4.2's cooperative parse knob); pass a no-op for unbounded speed.
pub fn load(data: &[u8], objects_per_yield: usize, tick: &mut dyn FnMut(usize)) -> Result<Context> {
    let start_offset = locate_header(data)?;
    let mut lexer = Lexer::new(data);
    lexer.set_pos_from_end(0);
    lexer.seek_substr_back(b"startxref")?;
    let xref_offset: usize = lexer.next()?.to()?;

    let mut table = XRefTable::default();
    let mut trailer_dict: Option<Dictionary> = None;
    let mut seen = Vec::new();
    let mut next_offset = Some(start_offset + xref_offset);

    while let Some(pos) = next_offset {
        if pos >= data.len() {
            return Err(PdfError::ParseError { offset: pos, kind: ParseErrorKind::BadXref });
        }
        if seen.contains(&pos) {
            return Err(PdfError::ParseError { offset: pos, kind: ParseErrorKind::BadXref });
        }
        seen.push(pos);
        if seen.len() > MAX_PREV_CHAIN {
            return Err(PdfError::ParseError { offset: pos, kind: ParseErrorKind::BadXref });
        }

        let (section, trailer) = read_xref_section_at(data, pos)?;
        table.merge(section);
        if trailer_dict.is_none() {
            trailer_dict = Some(trailer.clone());
        }
        next_offset = match trailer.get("Prev") {
            Some(p) => Some(start_offset + p.as_usize()?),
            None => None,
        };
    }

    let trailer = trailer_dict.ok_or(PdfError::ParseError {
        offset: xref_offset,
        kind: ParseErrorKind::BadXref,
    })?;

    let mut ctx = Context::new();
    ctx.trailer.root = match trailer.get("Root") {
        Some(p) => Some(p.as_reference()?),
        None => None,
    };
    ctx.trailer.info = match trailer.get("Info") {
        Some(p) => Some(p.as_reference()?),
        None => None,
    };
    ctx.trailer.encrypt = match trailer.get("Encrypt") {
        Some(p) => Some(p.as_reference()?),
        None => None,
    };
    ctx.trailer.id = match trailer.get("ID") {
        Some(Primitive::Array(arr)) if arr.len() == 2 => Some([
            arr[0].as_string()?.as_bytes().to_vec(),
            arr[1].as_string()?.as_bytes().to_vec(),
        ]),
        _ => None,
    };

    // First materialize every directly-located object so object streams are
    // available to resolve compressed entries against.
    let mut count = 0usize;
    for (&id, entry) in table.entries.iter() {
        if let XRefEntry::InUse { offset, gen } = *entry {
            match parse_indirect_object(&data[start_offset + offset..], start_offset + offset, &NoResolve) {
                Ok((r, value)) => {
                    debug_assert_eq!(r.id, id);
                    ctx.assign(PlainRef { id, gen }, value);
                }
                Err(_) => {
                    log::warn!("failed to parse object {} at offset {}", id, offset);
                    ctx.dangling.insert(id);
                }
            }
            count += 1;
            if objects_per_yield != 0 && count % objects_per_yield == 0 {
                tick(count);
            }
        }
    }

    // Then decode compressed entries from their hosting object streams.
    let mut stream_cache: HashMap<ObjNr, Vec<(ObjNr, Primitive)>> = HashMap::new();
    for (&id, entry) in table.entries.iter() {
        if let XRefEntry::Compressed { stream_id, index } = *entry {
            let objects = match stream_cache.get(&stream_id) {
                Some(v) => v,
                None => {
                    let decoded = decode_object_stream(&ctx, stream_id)?;
                    stream_cache.entry(stream_id).or_insert(decoded)
                }
            };
            match objects.get(index) {
                Some((_, value)) => {
                    ctx.assign(PlainRef { id, gen: 0 }, value.clone());
                }
                None => {
                    log::warn!("object stream {} has no entry at index {}", stream_id, index);
                    ctx.dangling.insert(id);
                }
            }
            count += 1;
            if objects_per_yield != 0 && count % objects_per_yield == 0 {
                tick(count);
            }
        }
    }

    // Reserve the object numbers recorded free (not in use) too, so a later
    // `register()` never collides with a number the source file already had.
    for id in table.entries.keys() {
        ctx.note_seen(*id);
    }

    Ok(ctx)
}

fn locate_header(data: &[u8]) -> Result<usize> {
    const HEADER: &[u8] = b"%PDF-";
    let window = &data[..data.len().min(1024)];
    window
        .windows(HEADER.len())
        .position(|w| w == HEADER)
        .ok_or(PdfError::ParseError { offset: 0, kind: ParseErrorKind::MissingEof })
}

fn read_xref_section_at(data: &[u8], pos: usize) -> Result<(HashMap<ObjNr, XRefEntry>, Dictionary)> {
    let mut lexer = Lexer::with_offset(&data[pos..], pos);
    let first = lexer.next()?;
    if first.equals(b"xref") {
        read_classical_section(&mut lexer)
    } else {
        lexer.back()?;
        read_stream_section(&mut lexer)
    }
}

fn read_classical_section(lexer: &mut Lexer) -> Result<(HashMap<ObjNr, XRefEntry>, Dictionary)> {
    let mut entries = HashMap::new();
    loop {
        if lexer.peek()?.equals(b"trailer") {
            break;
        }
        let start_id: ObjNr = lexer.next()?.to()?;
        let count: u32 = lexer.next()?.to()?;
        for i in 0..count {
            let offset_tok = lexer.next()?;
            if offset_tok.equals(b"trailer") {
                return Err(PdfError::ParseError { offset: lexer.get_pos(), kind: ParseErrorKind::BadXref });
            }
            let gen_tok = lexer.next()?;
            let kind_tok = lexer.next()?;
            let id = start_id + i;
            if kind_tok.equals(b"f") {
                entries.entry(id).or_insert(XRefEntry::Free);
            } else if kind_tok.equals(b"n") {
                entries.entry(id).or_insert(XRefEntry::InUse {
                    offset: offset_tok.to()?,
                    gen: gen_tok.to()?,
                });
            } else {
                return Err(PdfError::UnexpectedLexeme {
                    pos: lexer.get_pos(),
                    lexeme: kind_tok.to_string(),
                    expected: "f or n",
                });
            }
        }
    }
    lexer.next_expect("trailer")?;
    let trailer = crate::parser::parse_from_lexer(lexer, &NoResolve)?;
    Ok((entries, trailer.into_dictionary()?))
}

fn read_stream_section(lexer: &mut Lexer) -> Result<(HashMap<ObjNr, XRefEntry>, Dictionary)> {
    let (_, value) = parse_indirect_object(lexer.get_remaining_slice(), lexer.get_pos(), &NoResolve)?;
    let stream = value.into_stream()?;
    let info = stream.info.clone();

    let w: Vec<usize> = info
        .get("W")
        .ok_or(PdfError::MissingEntry { typ: "XRefStm", field: "W".into() })?
        .as_array()?
        .iter()
        .map(|p| p.as_usize())
        .collect::<Result<Vec<_>>>()?;
    if w.len() != 3 {
        return Err(PdfError::Other { msg: "xref stream /W must have 3 entries".into() });
    }
    let (w0, w1, w2) = (w[0], w[1], w[2]);

    let size = info.get("Size").ok_or(PdfError::MissingEntry { typ: "XRefStm", field: "Size".into() })?.as_usize()?;
    let index: Vec<usize> = match info.get("Index") {
        Some(p) => p.as_array()?.iter().map(|p| p.as_usize()).collect::<Result<Vec<_>>>()?,
        None => vec![0, size],
    };

    let decoded = decode_stream_data(&info, &stream.data)?;
    let mut data = &decoded[..];

    let mut entries = HashMap::new();
    for pair in index.chunks_exact(2) {
        let (first_id, count) = (pair[0] as ObjNr, pair[1]);
        for i in 0..count {
            let ty = if w0 == 0 { 1 } else { read_be(&mut data, w0)? };
            let f1 = read_be(&mut data, w1)?;
            let f2 = read_be(&mut data, w2)?;
            let id = first_id + i as ObjNr;
            let entry = match ty {
                0 => XRefEntry::Free,
                1 => XRefEntry::InUse { offset: f1 as usize, gen: f2 as GenNr },
                2 => XRefEntry::Compressed { stream_id: f1 as ObjNr, index: f2 as usize },
                other => return Err(PdfError::XRefStreamType { found: other }),
            };
            entries.entry(id).or_insert(entry);
        }
    }
    Ok((entries, info))
}

fn read_be(data: &mut &[u8], width: usize) -> Result<u64> {
    if width == 0 {
        return Ok(0);
    }
    if data.len() < width {
        return Err(PdfError::EOF);
    }
    let mut v = 0u64;
    for &b in &data[..width] {
        v = (v << 8) | u64::from(b);
    }
    *data = &data[width..];
    Ok(v)
}

/// Decode an object stream's `/N` objects, each paired with its object number.
fn decode_object_stream(ctx: &Context, stream_id: ObjNr) -> Result<Vec<(ObjNr, Primitive)>> {
    let stream = ctx
        .get(PlainRef { id: stream_id, gen: 0 })?
        .clone()
        .into_stream()?;
    let n = stream.info.get("N").ok_or(PdfError::MissingEntry { typ: "ObjStm", field: "N".into() })?.as_usize()?;
    let first = stream.info.get("First").ok_or(PdfError::MissingEntry { typ: "ObjStm", field: "First".into() })?.as_usize()?;

    let decoded = decode_stream_data(&stream.info, &stream.data)?;

    let mut header_lexer = Lexer::new(&decoded[..first]);
    let mut headers = Vec::with_capacity(n);
    for _ in 0..n {
        let id: ObjNr = header_lexer.next()?.to()?;
        let rel_offset: usize = header_lexer.next()?.to()?;
        headers.push((id, rel_offset));
    }

    let mut objects = Vec::with_capacity(n);
    for (id, rel_offset) in headers {
        let body = &decoded[first + rel_offset..];
        let value = crate::parser::parse(body, &NoResolve)?;
        objects.push((id, value));
    }
    Ok(objects)
}
