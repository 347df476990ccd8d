use crate::error::*;
use crate::object::{GenNr, ObjNr, PlainRef, Resolve};
use crate::primitive::Primitive;

use indexmap::IndexMap;

/// The document trailer: catalog, metadata and (detected-but-unsupported)
/// encryption dictionary, plus the file identifier pair.
#[derive(Clone, Debug, Default)]
pub struct Trailer {
    pub root: Option<PlainRef>,
    pub info: Option<PlainRef>,
    pub encrypt: Option<PlainRef>,
    pub id: Option<[Vec<u8>; 2]>,
}

/// Per-document arena owning every indirect object, indexed by
/// `(object-number, generation)`. See spec §3/§4.1.
pub struct Context {
    objects: IndexMap<ObjNr, Entry>,
    largest_id: ObjNr,
    free: Vec<ObjNr>,
    pub trailer: Trailer,
    /// object numbers that were referenced but never defined at parse time;
    /// `lookup` tolerates these and resolves them to `Null` (spec §4.2 errors).
    pub dangling: std::collections::HashSet<ObjNr>,
}

struct Entry {
    gen: GenNr,
    value: Primitive,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Context {
        Context {
            objects: IndexMap::new(),
            largest_id: 0,
            free: Vec::new(),
            trailer: Trailer::default(),
            dangling: std::collections::HashSet::new(),
        }
    }

    /// Allocate the next object number (from the free list if one exists,
    /// else `largest_id + 1`) and insert `value` at generation 0.
    pub fn register(&mut self, value: Primitive) -> PlainRef {
        let id = self.free.pop().unwrap_or_else(|| {
            self.largest_id += 1;
            self.largest_id
        });
        self.largest_id = self.largest_id.max(id);
        self.objects.insert(id, Entry { gen: 0, value });
        PlainRef { id, gen: 0 }
    }

    /// Reserve a number without assigning a value yet — used by embedders
    /// that must hand out a `Ref` before the object they describe exists.
    pub fn next_ref(&mut self) -> PlainRef {
        self.largest_id += 1;
        let id = self.largest_id;
        PlainRef { id, gen: 0 }
    }

    /// Assign (insert or overwrite) the value at a previously reserved or
    /// existing reference. Assigning a number greater than `largest_id` is a
    /// logic error — the caller must reserve via `next_ref`/`register` first.
    pub fn assign(&mut self, r: PlainRef, value: Primitive) {
        debug_assert!(
            r.id <= self.largest_id,
            "assign() to an unreserved object number {}",
            r.id
        );
        self.largest_id = self.largest_id.max(r.id);
        self.free.retain(|&id| id != r.id);
        self.objects.insert(r.id, Entry { gen: r.gen, value });
    }

    /// Release a number back to the free list (a classical-xref `f` entry on write).
    pub fn free(&mut self, id: ObjNr) {
        if self.objects.shift_remove(&id).is_some() {
            self.free.push(id);
        }
    }

    /// Bump `largest_id` to account for an object number known to the source
    /// xref table, even if it was never actually assigned a value (a stale
    /// free-list entry, or a reference that turned out dangling). Ensures a
    /// later `register()`/`next_ref()` never reuses a number the file had.
    pub fn note_seen(&mut self, id: ObjNr) {
        self.largest_id = self.largest_id.max(id);
    }

    pub fn get(&self, r: PlainRef) -> Result<&Primitive> {
        match self.objects.get(&r.id) {
            Some(entry) => Ok(&entry.value),
            None => {
                if self.dangling.contains(&r.id) {
                    Ok(&Primitive::Null)
                } else {
                    Err(PdfError::FreeObject { obj_nr: r.id })
                }
            }
        }
    }

    /// `lookup`: follow one level of reference, else return unchanged. Dangling
    /// references resolve to `Null` rather than erroring (spec §4.1).
    pub fn lookup(&self, value: Primitive) -> Result<Primitive> {
        match value {
            Primitive::Reference(r) => match self.objects.get(&r.id) {
                Some(entry) => Ok(entry.value.clone()),
                None => {
                    log::warn!("dangling reference to object {}", r.id);
                    Ok(Primitive::Null)
                }
            },
            other => Ok(other),
        }
    }

    pub fn largest_id(&self) -> ObjNr {
        self.largest_id
    }

    /// Iterate `(id, generation, value)` in ascending object-number order —
    /// the order the writer walks to assign byte offsets.
    pub fn iter(&self) -> impl Iterator<Item = (ObjNr, GenNr, &Primitive)> {
        let mut ids: Vec<_> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(move |id| {
            let e = &self.objects[&id];
            (id, e.gen, &e.value)
        })
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Resolve for Context {
    fn resolve(&self, r: PlainRef) -> Result<Primitive> {
        self.get(r).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let mut ctx = Context::new();
        let r = ctx.register(Primitive::Integer(42));
        assert_eq!(ctx.lookup(Primitive::Reference(r)).unwrap().as_integer().unwrap(), 42);
    }

    #[test]
    fn dangling_reference_resolves_null() {
        let ctx = Context::new();
        let r = PlainRef::new(999, 0);
        let looked_up = ctx.lookup(Primitive::Reference(r)).unwrap();
        assert!(matches!(looked_up, Primitive::Null));
    }

    #[test]
    fn free_then_register_reuses_number() {
        let mut ctx = Context::new();
        let r1 = ctx.register(Primitive::Integer(1));
        ctx.free(r1.id);
        let r2 = ctx.register(Primitive::Integer(2));
        assert_eq!(r1.id, r2.id);
    }

    #[test]
    fn next_ref_then_assign() {
        let mut ctx = Context::new();
        let r = ctx.next_ref();
        ctx.assign(r, Primitive::Integer(7));
        assert_eq!(ctx.get(r).unwrap().as_integer().unwrap(), 7);
    }
}
