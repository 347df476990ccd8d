//! Pluggable converters that produce the PDF objects backing a `Font` or
//! image handle (spec §4.5). Each embedder is a two-phase object: it is
//! constructed against a pre-reserved `Ref`, and `embed_into` writes the
//! actual objects into the `Context` exactly once.

pub mod custom_font;
pub mod jpeg;
pub mod png;
pub mod standard_font;

use crate::context::Context;
use crate::error::Result;
use crate::object::PlainRef;

/// Common shape for every embedder the `Document` facade's deferred-embed
/// list drains on `flush`.
pub trait Embedder {
    /// The `Ref` this embedder was constructed with; already valid as a
    /// `Reference` primitive before `embed_into` ever runs.
    fn target(&self) -> PlainRef;
    /// Write this embedder's objects into `ctx` at `self.target()` (and any
    /// auxiliary objects it needs, such as a `/FontDescriptor`). Idempotent:
    /// calling twice reproduces the same objects.
    fn embed_into(&self, ctx: &mut Context) -> Result<()>;
}
