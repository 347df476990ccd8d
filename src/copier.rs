//! Deep-copies an object subgraph from one `Context` into another, preserving
//! shared structure and breaking reference cycles (spec §4.3).

use std::collections::HashMap;

use crate::context::Context;
use crate::error::*;
use crate::object::{ObjNr, PlainRef};
use crate::primitive::{Dictionary, PdfStream, Primitive};

/// Translates references from a source `Context` into freshly allocated
/// references in a destination `Context`, as a single copy operation.
pub struct Copier<'a> {
    src: &'a Context,
    dst: &'a mut Context,
    map: HashMap<ObjNr, PlainRef>,
}

impl<'a> Copier<'a> {
    pub fn new(src: &'a Context, dst: &'a mut Context) -> Copier<'a> {
        Copier { src, dst, map: HashMap::new() }
    }

    /// Copy a foreign reference, returning the equivalent local reference.
    /// Idempotent: copying the same foreign ref twice in one `Copier`
    /// returns the same local ref and does not duplicate the object.
    pub fn copy_ref(&mut self, foreign: PlainRef) -> Result<PlainRef> {
        if let Some(&local) = self.map.get(&foreign.id) {
            return Ok(local);
        }
        // Reserve before recursing: a cycle back to `foreign` resolves
        // through this map entry instead of recursing forever.
        let local = self.dst.next_ref();
        self.map.insert(foreign.id, local);

        let value = self.src.get(foreign)?.clone();
        let copied = self.copy_value(value)?;
        self.dst.assign(local, copied);
        Ok(local)
    }

    /// Copy a value that has no foreign ref of its own (e.g. a dictionary
    /// plucked out of the source and trimmed before copying), translating
    /// any references it contains, and register the result as a new object
    /// in `dst`. Shares this `Copier`'s translation map with any `copy_ref`/
    /// `copy_value` calls made before or after it.
    pub fn register_copy(&mut self, value: Primitive) -> Result<PlainRef> {
        let copied = self.copy_value(value)?;
        Ok(self.dst.register(copied))
    }

    /// Structurally duplicate a value, translating any `Reference`s found
    /// (directly or nested in arrays/dictionaries/streams) into local refs.
    pub fn copy_value(&mut self, value: Primitive) -> Result<Primitive> {
        Ok(match value {
            Primitive::Reference(r) => Primitive::Reference(self.copy_ref(r)?),
            Primitive::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.copy_value(item)?);
                }
                Primitive::Array(out)
            }
            Primitive::Dictionary(dict) => Primitive::Dictionary(self.copy_dict(dict)?),
            Primitive::Stream(stream) => Primitive::Stream(PdfStream::new(
                self.copy_dict(stream.info)?,
                stream.data,
            )),
            other => other,
        })
    }

    fn copy_dict(&mut self, dict: Dictionary) -> Result<Dictionary> {
        let mut out = Dictionary::new();
        for (key, value) in dict {
            let copied = self.copy_value(value)?;
            out.insert(key, copied);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Primitive;

    #[test]
    fn copies_simple_dict() {
        let mut src = Context::new();
        let leaf = src.register(Primitive::Integer(42));
        let mut dst = Context::new();
        let mut copier = Copier::new(&src, &mut dst);
        let local = copier.copy_ref(leaf).unwrap();
        assert_eq!(dst.get(local).unwrap().as_integer().unwrap(), 42);
    }

    #[test]
    fn breaks_cycles() {
        let mut src = Context::new();
        let a = src.next_ref();
        let b = src.next_ref();
        src.assign(a, Primitive::Array(vec![Primitive::Reference(b)]));
        src.assign(b, Primitive::Array(vec![Primitive::Reference(a)]));

        let mut dst = Context::new();
        let mut copier = Copier::new(&src, &mut dst);
        let local_a = copier.copy_ref(a).unwrap();

        let arr = dst.get(local_a).unwrap().as_array().unwrap();
        let local_b = arr[0].as_reference().unwrap();
        let back = dst.get(local_b).unwrap().as_array().unwrap();
        assert_eq!(back[0].as_reference().unwrap(), local_a);
    }

    #[test]
    fn shared_subgraph_stays_shared() {
        let mut src = Context::new();
        let shared = src.register(Primitive::Integer(7));
        let a = src.register(Primitive::Reference(shared));
        let b = src.register(Primitive::Reference(shared));

        let mut dst = Context::new();
        let mut copier = Copier::new(&src, &mut dst);
        let local_a = copier.copy_ref(a).unwrap();
        let local_b = copier.copy_ref(b).unwrap();

        let ra = dst.get(local_a).unwrap().as_reference().unwrap();
        let rb = dst.get(local_b).unwrap().as_reference().unwrap();
        assert_eq!(ra, rb);
    }
}
