//! Serializes a `Context` back into PDF bytes: classical cross-reference
//! table mode, and `/ObjStm`+`/XRef`-stream mode (spec §4.2/§4.8). Both
//! support cooperative yielding every `objects_per_tick` objects via the
//! same `FnMut(usize)` tick pattern the parser uses on the read side.

use std::io::Write as _;

use crate::context::Context;
use crate::enc::flate_encode;
use crate::error::Result;
use crate::object::{GenNr, ObjNr};
use crate::primitive::{Dictionary, PdfStream, Primitive};

/// 4 bytes, each `>= 0x80`, conventionally placed after the header so
/// byte-sniffing tools treat the file as binary.
const BINARY_MARKER: [u8; 4] = [0xE2, 0xE3, 0xCF, 0xD3];

fn write_header(out: &mut Vec<u8>) {
    out.extend_from_slice(b"%PDF-1.7\n%");
    out.extend_from_slice(&BINARY_MARKER);
    out.push(b'\n');
}

fn trailer_dict(ctx: &Context, size: ObjNr) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("Size", Primitive::Integer(size as i64));
    if let Some(root) = ctx.trailer.root {
        dict.insert("Root", Primitive::Reference(root));
    }
    if let Some(info) = ctx.trailer.info {
        dict.insert("Info", Primitive::Reference(info));
    }
    if let Some([a, b]) = &ctx.trailer.id {
        dict.insert(
            "ID",
            Primitive::Array(vec![
                Primitive::String(crate::primitive::PdfString::new(a.clone())),
                Primitive::String(crate::primitive::PdfString::new(b.clone())),
            ]),
        );
    }
    dict
}

/// Classical mode: `n gen obj`/`endobj` bodies, a plain `xref` table with
/// 20-byte-exact entry lines, and a `trailer` dictionary.
pub fn write_classical(ctx: &Context, objects_per_tick: usize, tick: &mut dyn FnMut(usize)) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_header(&mut out);

    let mut offsets: Vec<Option<(usize, GenNr)>> = vec![None; ctx.largest_id() as usize + 1];
    let mut count = 0usize;
    for (id, gen, value) in ctx.iter() {
        offsets[id as usize] = Some((out.len(), gen));
        write!(out, "{} {} obj\n", id, gen)?;
        value.serialize(&mut out, 0)?;
        write!(out, "\nendobj\n")?;
        count += 1;
        if objects_per_tick != 0 && count % objects_per_tick == 0 {
            tick(count);
        }
    }

    let xref_offset = out.len();
    let size = ctx.largest_id() + 1;

    // Chain the free list through unused object numbers; object 0 always
    // heads it and points back to itself when nothing else is free.
    let mut free_ids: Vec<ObjNr> = (0..size).filter(|&id| offsets.get(id as usize).map(|o| o.is_none()).unwrap_or(true)).collect();
    if free_ids.first() != Some(&0) {
        free_ids.insert(0, 0);
    }

    out.extend_from_slice(b"xref\n");
    write!(out, "0 {}\n", size)?;
    for id in 0..size {
        match offsets.get(id as usize).and_then(|o| *o) {
            Some((offset, gen)) => write!(out, "{:010} {:05} n \n", offset, gen)?,
            None => {
                let pos = free_ids.iter().position(|&f| f == id).unwrap();
                let next = free_ids.get(pos + 1).copied().unwrap_or(0);
                let gen = if id == 0 { 65535 } else { 0 };
                write!(out, "{:010} {:05} f \n", next, gen)?;
            }
        }
    }

    let trailer = trailer_dict(ctx, size);
    out.extend_from_slice(b"trailer\n");
    Primitive::Dictionary(trailer).serialize(&mut out, 0)?;
    write!(out, "\nstartxref\n{}\n%%EOF", xref_offset)?;
    Ok(out)
}

enum XRefRow {
    InUse { offset: usize, gen: GenNr },
    Compressed { stream_id: ObjNr, index: usize },
}

/// `/ObjStm`+`/XRef`-stream mode: every non-stream object is packed into one
/// or more compressed object streams of up to `objects_per_tick` entries;
/// streams themselves (which can't be compressed) and the object streams are
/// written classically; a trailing `/XRef` stream replaces the `trailer`
/// keyword and classical table.
pub fn write_with_object_streams(ctx: &Context, objects_per_tick: usize, tick: &mut dyn FnMut(usize)) -> Result<Vec<u8>> {
    let batch = if objects_per_tick == 0 { usize::MAX } else { objects_per_tick };
    let mut out = Vec::new();
    write_header(&mut out);

    let size_hint = ctx.largest_id() as usize + 2;
    let mut rows: Vec<Option<XRefRow>> = (0..size_hint).map(|_| None).collect();

    let mut pending: Vec<(ObjNr, Primitive)> = Vec::new();
    let mut count = 0usize;

    let flush_pending = |pending: &mut Vec<(ObjNr, Primitive)>, out: &mut Vec<u8>, rows: &mut Vec<Option<XRefRow>>, next_id: &mut ObjNr| -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }
        let mut header = Vec::new();
        let mut body = Vec::new();
        for (id, value) in pending.iter() {
            write!(header, "{} {} ", id, body.len())?;
            value.serialize(&mut body, 0)?;
            body.push(b'\n');
        }
        let first = header.len();
        let mut data = header;
        data.extend_from_slice(&body);

        let stream_id = *next_id;
        *next_id += 1;
        if rows.len() <= stream_id as usize {
            rows.resize_with(stream_id as usize + 1, || None);
        }

        for (index, (id, _)) in pending.iter().enumerate() {
            if rows.len() <= *id as usize {
                rows.resize_with(*id as usize + 1, || None);
            }
            rows[*id as usize] = Some(XRefRow::Compressed { stream_id, index });
        }

        let mut info = Dictionary::new();
        info.insert("Type", Primitive::Name("ObjStm".into()));
        info.insert("N", Primitive::Integer(pending.len() as i64));
        info.insert("First", Primitive::Integer(first as i64));
        info.insert("Filter", Primitive::Name("FlateDecode".into()));
        let compressed = flate_encode(&data);
        let stream = PdfStream::new(info, compressed);

        rows[stream_id as usize] = Some(XRefRow::InUse { offset: out.len(), gen: 0 });
        write!(out, "{} 0 obj\n", stream_id)?;
        Primitive::Stream(stream).serialize(out, 0)?;
        write!(out, "\nendobj\n")?;

        pending.clear();
        Ok(())
    };

    let mut next_stream_id = ctx.largest_id() + 1;
    for (id, gen, value) in ctx.iter() {
        if let Primitive::Stream(_) = value {
            if rows.len() <= id as usize {
                rows.resize_with(id as usize + 1, || None);
            }
            rows[id as usize] = Some(XRefRow::InUse { offset: out.len(), gen });
            write!(out, "{} {} obj\n", id, gen)?;
            value.serialize(&mut out, 0)?;
            write!(out, "\nendobj\n")?;
        } else {
            pending.push((id, value.clone()));
            if pending.len() >= batch {
                flush_pending(&mut pending, &mut out, &mut rows, &mut next_stream_id)?;
            }
        }
        count += 1;
        if objects_per_tick != 0 && count % objects_per_tick == 0 {
            tick(count);
        }
    }
    flush_pending(&mut pending, &mut out, &mut rows, &mut next_stream_id)?;

    let xref_id = next_stream_id;
    let xref_offset = out.len();
    if rows.len() <= xref_id as usize {
        rows.resize_with(xref_id as usize + 1, || None);
    }
    rows[xref_id as usize] = Some(XRefRow::InUse { offset: xref_offset, gen: 0 });

    let size = xref_id + 1;
    let mut body = Vec::new();
    for id in 0..size {
        match rows.get(id as usize).and_then(|r| r.as_ref()) {
            Some(XRefRow::InUse { offset, gen }) => {
                body.push(1);
                body.extend_from_slice(&(*offset as u32).to_be_bytes());
                body.extend_from_slice(&gen.to_be_bytes());
            }
            Some(XRefRow::Compressed { stream_id, index }) => {
                body.push(2);
                body.extend_from_slice(&stream_id.to_be_bytes());
                body.extend_from_slice(&(*index as u16).to_be_bytes());
            }
            None => {
                body.push(0);
                body.extend_from_slice(&0u32.to_be_bytes());
                body.extend_from_slice(&0u16.to_be_bytes());
            }
        }
    }
    let compressed = flate_encode(&body);

    let mut info = trailer_dict(ctx, size);
    info.insert("Type", Primitive::Name("XRef".into()));
    info.insert("W", Primitive::Array(vec![Primitive::Integer(1), Primitive::Integer(4), Primitive::Integer(2)]));
    info.insert("Filter", Primitive::Name("FlateDecode".into()));
    let stream = PdfStream::new(info, compressed);

    write!(out, "{} 0 obj\n", xref_id)?;
    Primitive::Stream(stream).serialize(&mut out, 0)?;
    write!(out, "\nendobj\n")?;
    write!(out, "startxref\n{}\n%%EOF", xref_offset)?;
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;

    #[test]
    fn classical_roundtrips_through_parser() {
        let mut ctx = Context::new();
        let root = ctx.register(Primitive::Dictionary({
            let mut d = Dictionary::new();
            d.insert("Type", Primitive::Name("Catalog".into()));
            d
        }));
        ctx.trailer.root = Some(root);

        let mut count = 0;
        let bytes = write_classical(&ctx, 0, &mut |_| count += 1).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF"));

        let reloaded = crate::xref::load(&bytes, 0, &mut |_| {}).unwrap();
        assert_eq!(reloaded.trailer.root, Some(root));
        let cat = reloaded.get(root).unwrap().as_dict().unwrap();
        assert_eq!(cat.get("Type").unwrap().as_name().unwrap(), "Catalog");
    }

    #[test]
    fn object_stream_mode_roundtrips() {
        let mut ctx = Context::new();
        let a = ctx.register(Primitive::Integer(1));
        let b = ctx.register(Primitive::Integer(2));
        let stream_ref = ctx.register(Primitive::Stream(PdfStream::new(Dictionary::new(), b"hello".to_vec())));
        ctx.trailer.root = Some(a);

        let bytes = write_with_object_streams(&ctx, 0, &mut |_| {}).unwrap();
        let reloaded = crate::xref::load(&bytes, 0, &mut |_| {}).unwrap();
        assert_eq!(reloaded.get(a).unwrap().as_integer().unwrap(), 1);
        assert_eq!(reloaded.get(b).unwrap().as_integer().unwrap(), 2);
        let stream = reloaded.get(stream_ref).unwrap().clone().into_stream().unwrap();
        assert_eq!(stream.data, b"hello");
    }
}
