use crate::error::*;
use crate::object::{PlainRef, Resolve};

use indexmap::IndexMap;
use itertools::Itertools;
use std::borrow::Cow;
use std::ops::{Deref, Index};
use std::{fmt, io, str};

/// The algebraic PDF value. See §3 of the data model: every object reachable
/// from the trailer, direct or indirect, is one of these.
#[derive(Clone, Debug)]
pub enum Primitive {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(String),
    String(PdfString),
    Array(Vec<Primitive>),
    Dictionary(Dictionary),
    Stream(PdfStream),
    Reference(PlainRef),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Primitive::Null => write!(f, "null"),
            Primitive::Boolean(b) => b.fmt(f),
            Primitive::Integer(i) => i.fmt(f),
            Primitive::Real(n) => n.fmt(f),
            Primitive::Name(ref s) => write!(f, "/{}", s),
            Primitive::String(ref s) => write!(f, "{:?}", s),
            Primitive::Array(ref arr) => write!(f, "[{}]", arr.iter().format(", ")),
            Primitive::Dictionary(ref d) => d.fmt(f),
            Primitive::Stream(_) => write!(f, "stream"),
            Primitive::Reference(r) => write!(f, "{} {} R", r.id, r.gen),
        }
    }
}

impl Primitive {
    pub fn name(name: impl Into<String>) -> Primitive {
        Primitive::Name(name.into())
    }

    pub fn array<T: Into<Primitive>>(items: impl IntoIterator<Item = T>) -> Primitive {
        Primitive::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn reference(r: PlainRef) -> Primitive {
        Primitive::Reference(r)
    }

    /// Serialize following the numeric/string emission rules of the writer component:
    /// integers in decimal, reals with up to 5 trimmed fractional digits (never scientific),
    /// names escaped with `#xx` outside the printable range, literal strings with the
    /// standard backslash escapes, hex strings uppercase.
    pub fn serialize(&self, out: &mut impl io::Write, level: usize) -> Result<()> {
        match self {
            Primitive::Null => write!(out, "null")?,
            Primitive::Boolean(b) => write!(out, "{}", b)?,
            Primitive::Integer(i) => write!(out, "{}", i)?,
            Primitive::Real(n) => write!(out, "{}", format_real(*n))?,
            Primitive::Name(ref s) => serialize_name(s, out)?,
            Primitive::String(ref s) => s.serialize(out)?,
            Primitive::Array(ref arr) => serialize_list(arr, out, level)?,
            Primitive::Dictionary(ref d) => d.serialize(out, level)?,
            Primitive::Stream(ref s) => s.serialize(out, level)?,
            Primitive::Reference(r) => write!(out, "{} {} R", r.id, r.gen)?,
        }
        Ok(())
    }

    pub fn get_debug_name(&self) -> &'static str {
        match *self {
            Primitive::Null => "Null",
            Primitive::Boolean(..) => "Boolean",
            Primitive::Integer(..) => "Integer",
            Primitive::Real(..) => "Real",
            Primitive::Name(..) => "Name",
            Primitive::String(..) => "String",
            Primitive::Array(..) => "Array",
            Primitive::Dictionary(..) => "Dictionary",
            Primitive::Stream(..) => "Stream",
            Primitive::Reference(..) => "Reference",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match *self {
            Primitive::Boolean(b) => Ok(b),
            ref p => unexpected_primitive(Boolean, p.get_debug_name()),
        }
    }
    pub fn as_integer(&self) -> Result<i64> {
        match *self {
            Primitive::Integer(n) => Ok(n),
            ref p => unexpected_primitive(Integer, p.get_debug_name()),
        }
    }
    pub fn as_u32(&self) -> Result<u32> {
        match *self {
            Primitive::Integer(n) if n >= 0 && n <= u32::MAX as i64 => Ok(n as u32),
            Primitive::Integer(_) => Err(PdfError::Other {
                msg: "integer out of range for u32".into(),
            }),
            ref p => unexpected_primitive(Integer, p.get_debug_name()),
        }
    }
    pub fn as_usize(&self) -> Result<usize> {
        self.as_u32().map(|n| n as usize)
    }
    pub fn as_real(&self) -> Result<f64> {
        match *self {
            Primitive::Integer(n) => Ok(n as f64),
            Primitive::Real(f) => Ok(f),
            ref p => unexpected_primitive(Real, p.get_debug_name()),
        }
    }
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Primitive::Name(ref name) => Ok(name.as_str()),
            p => unexpected_primitive(Name, p.get_debug_name()),
        }
    }
    pub fn as_string(&self) -> Result<&PdfString> {
        match self {
            Primitive::String(ref data) => Ok(data),
            p => unexpected_primitive(String, p.get_debug_name()),
        }
    }
    pub fn as_array(&self) -> Result<&[Primitive]> {
        match self {
            Primitive::Array(ref v) => Ok(v),
            p => unexpected_primitive(Array, p.get_debug_name()),
        }
    }
    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Primitive::Dictionary(ref d) => Ok(d),
            p => unexpected_primitive(Dictionary, p.get_debug_name()),
        }
    }
    pub fn as_reference(&self) -> Result<PlainRef> {
        match *self {
            Primitive::Reference(r) => Ok(r),
            ref p => unexpected_primitive(Reference, p.get_debug_name()),
        }
    }

    pub fn into_array(self) -> Result<Vec<Primitive>> {
        match self {
            Primitive::Array(v) => Ok(v),
            p => unexpected_primitive(Array, p.get_debug_name()),
        }
    }
    pub fn into_dictionary(self) -> Result<Dictionary> {
        match self {
            Primitive::Dictionary(dict) => Ok(dict),
            p => unexpected_primitive(Dictionary, p.get_debug_name()),
        }
    }
    pub fn into_stream(self) -> Result<PdfStream> {
        match self {
            Primitive::Stream(s) => Ok(s),
            p => unexpected_primitive(Stream, p.get_debug_name()),
        }
    }
    pub fn into_name(self) -> Result<String> {
        match self {
            Primitive::Name(name) => Ok(name),
            p => unexpected_primitive(Name, p.get_debug_name()),
        }
    }

    /// Follow one level of indirection through `resolve` if this is a `Reference`.
    /// Per the Context invariant, chains of references are rejected at parse time,
    /// so a single hop always suffices.
    pub fn resolve(self, resolve: &impl Resolve) -> Result<Primitive> {
        match self {
            Primitive::Reference(r) => resolve.resolve(r),
            p => Ok(p),
        }
    }
}

fn unexpected_primitive<T>(expected: PrimKind, found: &'static str) -> Result<T> {
    Err(PdfError::UnexpectedPrimitive {
        expected: expected.name(),
        found,
    })
}

// tiny trick to keep call sites above readable (`unexpected_primitive(Integer, ...)`)
// without repeating string literals.
#[allow(non_upper_case_globals)]
mod kind_consts {
    use super::PrimKind;
    pub const Boolean: PrimKind = PrimKind("Boolean");
    pub const Integer: PrimKind = PrimKind("Integer");
    pub const Real: PrimKind = PrimKind("Real");
    pub const Name: PrimKind = PrimKind("Name");
    pub const String: PrimKind = PrimKind("String");
    pub const Array: PrimKind = PrimKind("Array");
    pub const Dictionary: PrimKind = PrimKind("Dictionary");
    pub const Stream: PrimKind = PrimKind("Stream");
    pub const Reference: PrimKind = PrimKind("Reference");
}
use kind_consts::*;
pub struct PrimKind(&'static str);
impl PrimKind {
    fn name(&self) -> &'static str {
        self.0
    }
}

fn format_real(n: f64) -> std::string::String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let mut s = format!("{:.5}", n);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

fn serialize_list(arr: &[Primitive], out: &mut impl io::Write, level: usize) -> Result<()> {
    write!(out, "[")?;
    let mut first = true;
    for p in arr {
        if !first {
            write!(out, " ")?;
        }
        first = false;
        p.serialize(out, level + 1)?;
    }
    write!(out, "]")?;
    Ok(())
}

/// Names are emitted with `#xx` escapes for bytes outside the printable-name set
/// (anything <= 0x20, 0x7f, or a PDF delimiter/`#` itself).
pub fn serialize_name(s: &str, out: &mut impl io::Write) -> Result<()> {
    write!(out, "/")?;
    for &b in s.as_bytes() {
        match b {
            b'\x00'..=b'\x20' | 0x7f..=0xff | b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']'
            | b'{' | b'}' | b'/' | b'%' => write!(out, "#{:02X}", b)?,
            _ => out.write_all(&[b])?,
        }
    }
    Ok(())
}

/// Decode a `/Name` token's `#xx` escapes into its literal bytes.
pub fn decode_name(raw: &str) -> std::string::String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&raw[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    std::string::String::from_utf8_lossy(&out).into_owned()
}

/// Primitive dictionary type: insertion-ordered, per the Value-model invariant
/// that dict iteration order is reproducible across parse/write round-trips.
#[derive(Default, Clone)]
pub struct Dictionary {
    dict: IndexMap<std::string::String, Primitive>,
}
impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary {
            dict: IndexMap::new(),
        }
    }
    pub fn len(&self) -> usize {
        self.dict.len()
    }
    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }
    pub fn get(&self, key: &str) -> Option<&Primitive> {
        self.dict.get(key)
    }
    pub fn insert(&mut self, key: impl Into<std::string::String>, val: Primitive) -> Option<Primitive> {
        self.dict.insert(key.into(), val)
    }
    pub fn iter(&self) -> indexmap::map::Iter<std::string::String, Primitive> {
        self.dict.iter()
    }
    pub fn remove(&mut self, key: &str) -> Option<Primitive> {
        self.dict.shift_remove(key)
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.dict.contains_key(key)
    }
    /// Like `remove`, but returns `PdfError::MissingEntry` naming the dict type if absent.
    pub fn require(&mut self, typ: &'static str, key: &str) -> Result<Primitive> {
        self.remove(key).ok_or(PdfError::MissingEntry {
            typ,
            field: key.into(),
        })
    }
    pub fn expect(&self, typ: &'static str, key: &str, value: &str, required: bool) -> Result<()> {
        match self.dict.get(key) {
            Some(ty) => {
                let ty = ty.as_name()?;
                if ty != value {
                    Err(PdfError::KeyValueMismatch {
                        key: key.into(),
                        value: value.into(),
                        found: ty.into(),
                    })
                } else {
                    Ok(())
                }
            }
            None if required => Err(PdfError::MissingEntry {
                typ,
                field: key.into(),
            }),
            None => Ok(()),
        }
    }
}
impl Deref for Dictionary {
    type Target = IndexMap<std::string::String, Primitive>;
    fn deref(&self) -> &IndexMap<std::string::String, Primitive> {
        &self.dict
    }
}
impl Dictionary {
    fn serialize(&self, out: &mut impl io::Write, level: usize) -> Result<()> {
        writeln!(out, "<<")?;
        for (key, val) in self.iter() {
            write!(out, "{:w$}", "", w = 2 * level + 2)?;
            serialize_name(key, out)?;
            write!(out, " ")?;
            val.serialize(out, level + 2)?;
            out.write_all(b"\n")?;
        }
        write!(out, "{:w$}>>", "", w = 2 * level)?;
        Ok(())
    }
}
impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{{")?;
        for (k, v) in self {
            writeln!(f, "{:>15}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}
impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{}>",
            self.iter()
                .format_with(", ", |(k, v), f| f(&format_args!("{}={}", k, v)))
        )
    }
}
impl<'a> Index<&'a str> for Dictionary {
    type Output = Primitive;
    fn index(&self, idx: &'a str) -> &Primitive {
        self.dict.index(idx)
    }
}
impl IntoIterator for Dictionary {
    type Item = (std::string::String, Primitive);
    type IntoIter = indexmap::map::IntoIter<std::string::String, Primitive>;
    fn into_iter(self) -> Self::IntoIter {
        self.dict.into_iter()
    }
}
impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a std::string::String, &'a Primitive);
    type IntoIter = indexmap::map::Iter<'a, std::string::String, Primitive>;
    fn into_iter(self) -> Self::IntoIter {
        (&self.dict).into_iter()
    }
}
impl FromIterator<(std::string::String, Primitive)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (std::string::String, Primitive)>>(iter: I) -> Self {
        Dictionary {
            dict: IndexMap::from_iter(iter),
        }
    }
}

/// Primitive stream: a dictionary plus raw (still-encoded) bytes. `/Length` is
/// never trusted from here; the writer recomputes it from `data.len()`.
#[derive(Clone, Debug)]
pub struct PdfStream {
    pub info: Dictionary,
    pub data: Vec<u8>,
}
impl PdfStream {
    pub fn new(info: Dictionary, data: Vec<u8>) -> PdfStream {
        PdfStream { info, data }
    }
    fn serialize(&self, out: &mut impl io::Write, level: usize) -> Result<()> {
        let mut info = self.info.clone();
        info.insert("Length", Primitive::Integer(self.data.len() as i64));
        info.serialize(out, level)?;
        writeln!(out, "\nstream")?;
        out.write_all(&self.data)?;
        writeln!(out, "\nendstream")?;
        Ok(())
    }
}

/// Primitive string: literal `( )` or hex `< >`, tracked as raw bytes. The
/// original-encoding hint is not retained post-parse (the writer always picks
/// the shortest correct encoding per the emission rules).
#[derive(Clone)]
pub struct PdfString {
    pub data: Vec<u8>,
}
impl fmt::Debug for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"")?;
        for &b in &self.data {
            match b {
                b'"' => write!(f, "\\\"")?,
                b' '..=b'~' => write!(f, "{}", b as char)?,
                o @ 0..=7 => write!(f, "\\{}", o)?,
                x => write!(f, "\\x{:02x}", x)?,
            }
        }
        write!(f, "\"")
    }
}
impl PdfString {
    pub fn new(data: Vec<u8>) -> PdfString {
        PdfString { data }
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
    pub fn as_str(&self) -> Result<Cow<str>> {
        if self.data.starts_with(&[0xfe, 0xff]) {
            let utf16: Vec<u16> = self.data[2..]
                .chunks(2)
                .map(|c| (c[0] as u16) << 8 | *c.get(1).unwrap_or(&0) as u16)
                .collect();
            Ok(Cow::Owned(
                std::string::String::from_utf16(&utf16).map_err(|_| PdfError::Other {
                    msg: "invalid utf16 PDF string".into(),
                })?,
            ))
        } else {
            Ok(Cow::Borrowed(str::from_utf8(&self.data)?))
        }
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Literal strings escape `( ) \ \n \r \t \b \f`; any other non-ASCII byte is
    /// emitted as a three-digit octal escape. Strings containing bytes unsafe to
    /// round-trip as literals fall back to uppercase hex.
    fn serialize(&self, out: &mut impl io::Write) -> Result<()> {
        let needs_hex = self.data.iter().any(|&b| b >= 0x80);
        if needs_hex {
            write!(out, "<")?;
            for &b in &self.data {
                write!(out, "{:02X}", b)?;
            }
            write!(out, ">")?;
        } else {
            write!(out, "(")?;
            for &b in &self.data {
                match b {
                    b'(' | b')' | b'\\' => {
                        write!(out, "\\")?;
                        out.write_all(&[b])?;
                    }
                    b'\n' => write!(out, "\\n")?,
                    b'\r' => write!(out, "\\r")?,
                    b'\t' => write!(out, "\\t")?,
                    0x08 => write!(out, "\\b")?,
                    0x0c => write!(out, "\\f")?,
                    _ => out.write_all(&[b])?,
                }
            }
            write!(out, ")")?;
        }
        Ok(())
    }
}
impl AsRef<[u8]> for PdfString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
impl From<&str> for PdfString {
    fn from(s: &str) -> PdfString {
        PdfString::new(s.as_bytes().to_vec())
    }
}
impl From<std::string::String> for PdfString {
    fn from(s: std::string::String) -> PdfString {
        PdfString::new(s.into_bytes())
    }
}

impl From<i64> for Primitive {
    fn from(x: i64) -> Primitive {
        Primitive::Integer(x)
    }
}
impl From<i32> for Primitive {
    fn from(x: i32) -> Primitive {
        Primitive::Integer(x as i64)
    }
}
impl From<u32> for Primitive {
    fn from(x: u32) -> Primitive {
        Primitive::Integer(x as i64)
    }
}
impl From<usize> for Primitive {
    fn from(x: usize) -> Primitive {
        Primitive::Integer(x as i64)
    }
}
impl From<f64> for Primitive {
    fn from(x: f64) -> Primitive {
        Primitive::Real(x)
    }
}
impl From<f32> for Primitive {
    fn from(x: f32) -> Primitive {
        Primitive::Real(x as f64)
    }
}
impl From<bool> for Primitive {
    fn from(x: bool) -> Primitive {
        Primitive::Boolean(x)
    }
}
impl From<PdfString> for Primitive {
    fn from(x: PdfString) -> Primitive {
        Primitive::String(x)
    }
}
impl From<PdfStream> for Primitive {
    fn from(x: PdfStream) -> Primitive {
        Primitive::Stream(x)
    }
}
impl From<Dictionary> for Primitive {
    fn from(x: Dictionary) -> Primitive {
        Primitive::Dictionary(x)
    }
}
impl From<Vec<Primitive>> for Primitive {
    fn from(x: Vec<Primitive>) -> Primitive {
        Primitive::Array(x)
    }
}
impl From<PlainRef> for Primitive {
    fn from(x: PlainRef) -> Primitive {
        Primitive::Reference(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ser(p: &Primitive) -> std::string::String {
        let mut buf = Vec::new();
        p.serialize(&mut buf, 0).unwrap();
        std::string::String::from_utf8(buf).unwrap()
    }

    #[test]
    fn integer_round_trip() {
        assert_eq!(ser(&Primitive::Integer(-17)), "-17");
    }

    #[test]
    fn real_trims_trailing_zeros() {
        assert_eq!(ser(&Primitive::Real(12.5)), "12.5");
        assert_eq!(ser(&Primitive::Real(12.0)), "12");
        assert_eq!(ser(&Primitive::Real(0.1)), "0.1");
    }

    #[test]
    fn name_escapes_space() {
        assert_eq!(ser(&Primitive::name("A Name")), "/A#20Name");
    }

    #[test]
    fn name_round_trips_through_decode() {
        assert_eq!(decode_name("A#20Name"), "A Name");
    }

    #[test]
    fn dictionary_preserves_insertion_order() {
        let mut d = Dictionary::new();
        d.insert("Z", Primitive::Integer(1));
        d.insert("A", Primitive::Integer(2));
        let keys: Vec<_> = d.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["Z".to_string(), "A".to_string()]);
    }

    #[test]
    fn string_literal_escapes_parens() {
        let s = PdfString::from("a(b)c");
        assert_eq!(ser_string(&s), "(a\\(b\\)c)");
    }

    #[test]
    fn string_with_high_byte_uses_hex() {
        let s = PdfString::new(vec![0xff, 0x00]);
        assert_eq!(ser_string(&s), "<FF00>");
    }

    fn ser_string(s: &PdfString) -> std::string::String {
        let mut buf = Vec::new();
        s.serialize(&mut buf).unwrap();
        std::string::String::from_utf8(buf).unwrap()
    }
}
