use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PdfError {
    // Syntax / parsing
    #[snafu(display("Unexpected end of file"))]
    EOF,

    #[snafu(display("Unexpected token '{}' at {} - expected '{}'", lexeme, pos, expected))]
    UnexpectedLexeme {
        pos: usize,
        lexeme: String,
        expected: &'static str,
    },

    #[snafu(display("Expecting an object, encountered {} at pos {}", first_lexeme, pos))]
    UnknownType { pos: usize, first_lexeme: String },

    #[snafu(display("Cannot follow reference during parsing - no resolve fn given (most likely /Length of Stream)."))]
    Reference,

    #[snafu(display("Erroneous 'type' field in xref stream - expected 0, 1 or 2, found {}", found))]
    XRefStreamType { found: u64 },

    #[snafu(display("Parsing read past boundary of Contents."))]
    ContentReadPastBoundary,

    #[snafu(display("Hex decode error. Position {}, bytes {:?}", pos, bytes))]
    HexDecode { pos: usize, bytes: [u8; 2] },

    #[snafu(display("Ascii85 tail error"))]
    Ascii85TailError,

    #[snafu(display("Failed to convert '{}' into PredictorType", n))]
    IncorrectPredictorType { n: u8 },

    #[snafu(display("Field /{} is missing in dictionary for type {}.", field, typ))]
    MissingEntry { typ: &'static str, field: String },

    #[snafu(display("Expected to find value {} for key {}. Found {} instead.", value, key, found))]
    KeyValueMismatch {
        key: String,
        value: String,
        found: String,
    },

    #[snafu(display("Expected dictionary /Type = {}. Found /Type = {}.", expected, found))]
    WrongDictionaryType { expected: String, found: String },

    #[snafu(display("Tried to dereference free or non-existing object nr {}.", obj_nr))]
    FreeObject { obj_nr: u32 },

    #[snafu(display("Expected primitive {}, found primitive {} instead.", expected, found))]
    UnexpectedPrimitive {
        expected: &'static str,
        found: &'static str,
    },

    #[snafu(display("Object stream index out of bounds ({}/{}).", index, max))]
    ObjStmOutOfBounds { index: usize, max: usize },

    #[snafu(display("Page out of bounds ({}/{}).", page_nr, max))]
    PageOutOfBounds { page_nr: u32, max: u32 },

    #[snafu(display("Entry {} in xref table unspecified", id))]
    UnspecifiedXRefEntry { id: u32 },

    // Document-facade errors (spec §7)
    #[snafu(display("document is encrypted; load with ignore_encryption to proceed"))]
    EncryptedPdf,

    #[snafu(display("page belongs to a different document; use copy_pages first"))]
    ForeignPage,

    #[snafu(display("cannot remove a page from an empty document"))]
    RemovePageFromEmptyDocument,

    #[snafu(display("embed_font with subset=true requires register_fontkit first"))]
    FontkitNotRegistered,

    #[snafu(display("invalid input: {}", reason))]
    InvalidInputType { reason: String },

    #[snafu(display("parse error at offset {}: {}", offset, kind))]
    ParseError {
        offset: usize,
        kind: ParseErrorKind,
    },

    #[snafu(display("embedder error: {}", kind))]
    EmbedderError { kind: EmbedderErrorKind },

    #[snafu(display("IO Error: {}", source))]
    Io { source: io::Error },

    #[snafu(display("{}", msg))]
    Other { msg: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingEof,
    BadXref,
    BadObjectHeader,
    BadStreamLength,
    UnsupportedFilter,
    DepthExceeded,
}
impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ParseErrorKind::MissingEof => "missing-eof",
            ParseErrorKind::BadXref => "bad-xref",
            ParseErrorKind::BadObjectHeader => "bad-object-header",
            ParseErrorKind::BadStreamLength => "bad-stream-length",
            ParseErrorKind::UnsupportedFilter => "unsupported-filter",
            ParseErrorKind::DepthExceeded => "depth-exceeded",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderErrorKind {
    UnsupportedJpegBitdepth,
    PngMissingIhdr,
    PngTruncatedIdat,
    FontParseFailed,
    SubsetFailed,
}
impl std::fmt::Display for EmbedderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            EmbedderErrorKind::UnsupportedJpegBitdepth => "unsupported-jpeg-bitdepth",
            EmbedderErrorKind::PngMissingIhdr => "png-missing-ihdr",
            EmbedderErrorKind::PngTruncatedIdat => "png-truncated-idat",
            EmbedderErrorKind::FontParseFailed => "font-parse-failed",
            EmbedderErrorKind::SubsetFailed => "subset-failed",
        };
        write!(f, "{}", s)
    }
}

pub type Result<T, E = PdfError> = std::result::Result<T, E>;

impl From<io::Error> for PdfError {
    fn from(source: io::Error) -> PdfError {
        PdfError::Io { source }
    }
}
impl From<std::str::Utf8Error> for PdfError {
    fn from(source: std::str::Utf8Error) -> PdfError {
        PdfError::Other {
            msg: format!("invalid utf8: {}", source),
        }
    }
}
impl From<std::string::FromUtf8Error> for PdfError {
    fn from(source: std::string::FromUtf8Error) -> PdfError {
        PdfError::Other {
            msg: format!("invalid utf8: {}", source),
        }
    }
}
impl From<std::num::ParseIntError> for PdfError {
    fn from(source: std::num::ParseIntError) -> PdfError {
        PdfError::Other {
            msg: format!("integer parse error: {}", source),
        }
    }
}
impl From<std::num::ParseFloatError> for PdfError {
    fn from(source: std::num::ParseFloatError) -> PdfError {
        PdfError::Other {
            msg: format!("float parse error: {}", source),
        }
    }
}

macro_rules! bail {
    ($($t:tt)*) => {
        return Err($crate::error::PdfError::Other { msg: format!($($t)*) })
    }
}
pub(crate) use bail;
