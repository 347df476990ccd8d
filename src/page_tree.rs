//! The page tree: a rose-tree of `/Type /Pagesdict` nodes and `/Type /Page`
//! leaves with inherited attributes, kept balanced under insert/remove
//! (spec §4.4).

use crate::context::Context;
use crate::error::*;
use crate::object::PlainRef;
use crate::primitive::{Dictionary, Primitive};

/// Default branching factor. The spec allows any value in 10–16; callers
/// that want a different fan-out pass it explicitly to the `_with_b` variants.
pub const DEFAULT_B: usize = 12;

fn min_kids(b: usize) -> usize {
    (b + 1) / 2
}

fn kids_of(dict: &Dictionary) -> Result<Vec<PlainRef>> {
    match dict.get("Kids") {
        Some(Primitive::Array(arr)) => arr.iter().map(|p| p.as_reference()).collect(),
        None => Ok(Vec::new()),
        Some(other) => Err(PdfError::UnexpectedPrimitive { expected: "Array", found: other.get_debug_name() }),
    }
}

fn is_leaf_ref(ctx: &Context, r: PlainRef) -> Result<bool> {
    let dict = ctx.get(r)?.as_dict()?;
    match dict.get("Type") {
        Some(Primitive::Name(n)) => Ok(n == "Page"),
        _ => Ok(false),
    }
}

fn set_kids_and_count(ctx: &mut Context, node: PlainRef, kids: &[PlainRef], count: u32) -> Result<()> {
    let mut dict = ctx.get(node)?.as_dict()?.clone();
    dict.insert("Kids", Primitive::Array(kids.iter().map(|&r| Primitive::Reference(r)).collect()));
    dict.insert("Count", Primitive::Integer(count as i64));
    ctx.assign(node, Primitive::Dictionary(dict));
    Ok(())
}

fn set_parent(ctx: &mut Context, child: PlainRef, parent: PlainRef) -> Result<()> {
    let mut dict = ctx.get(child)?.as_dict()?.clone();
    dict.insert("Parent", Primitive::Reference(parent));
    ctx.assign(child, Primitive::Dictionary(dict));
    Ok(())
}

fn count_of(ctx: &Context, node: PlainRef) -> Result<u32> {
    if is_leaf_ref(ctx, node)? {
        return Ok(1);
    }
    let dict = ctx.get(node)?.as_dict()?;
    match dict.get("Count") {
        Some(p) => Ok(p.as_u32()?),
        None => Ok(0),
    }
}

/// Create a fresh, empty `/Type /Pages` root node (no `/Parent`).
pub fn new_root(ctx: &mut Context) -> PlainRef {
    let mut dict = Dictionary::new();
    dict.insert("Type", Primitive::name("Pages"));
    dict.insert("Kids", Primitive::Array(Vec::new()));
    dict.insert("Count", Primitive::Integer(0));
    ctx.register(Primitive::Dictionary(dict))
}

/// Pre-order DFS over every `/Type /Page` leaf reachable from `root`,
/// in rendering order.
pub fn traverse(ctx: &Context, root: PlainRef, callback: &mut dyn FnMut(PlainRef, &Dictionary)) -> Result<()> {
    if is_leaf_ref(ctx, root)? {
        let dict = ctx.get(root)?.as_dict()?;
        callback(root, dict);
        return Ok(());
    }
    let dict = ctx.get(root)?.as_dict()?.clone();
    for kid in kids_of(&dict)? {
        traverse(ctx, kid, callback)?;
    }
    Ok(())
}

pub fn page_count(ctx: &Context, root: PlainRef) -> Result<u32> {
    count_of(ctx, root)
}

/// Insert `leaf` at position `index` (`0 <= index <= page_count`). Returns
/// the (possibly new) tree root and the direct parent of the inserted leaf;
/// the caller is responsible for setting the leaf's own `/Parent` afterward
/// is already handled here.
pub fn insert(ctx: &mut Context, root: PlainRef, leaf: PlainRef, index: usize) -> Result<(PlainRef, PlainRef)> {
    insert_with_b(ctx, root, leaf, index, DEFAULT_B)
}

pub fn insert_with_b(ctx: &mut Context, root: PlainRef, leaf: PlainRef, index: usize, b: usize) -> Result<(PlainRef, PlainRef)> {
    let (promoted, parent_of_leaf) = insert_into(ctx, root, leaf, index, b)?;
    match promoted {
        None => Ok((root, parent_of_leaf)),
        Some((right_ref, right_count)) => {
            let left_count = count_of(ctx, root)?;
            let mut new_root_dict = Dictionary::new();
            new_root_dict.insert("Type", Primitive::name("Pages"));
            new_root_dict.insert("Kids", Primitive::Array(vec![Primitive::Reference(root), Primitive::Reference(right_ref)]));
            new_root_dict.insert("Count", Primitive::Integer((left_count + right_count) as i64));
            let new_root = ctx.register(Primitive::Dictionary(new_root_dict));
            set_parent(ctx, root, new_root)?;
            set_parent(ctx, right_ref, new_root)?;
            Ok((new_root, parent_of_leaf))
        }
    }
}

/// Returns `(Some((promoted_right_sibling, its_count)), parent_of_inserted_leaf)`.
fn insert_into(ctx: &mut Context, node: PlainRef, leaf: PlainRef, index: usize, b: usize) -> Result<(Option<(PlainRef, u32)>, PlainRef)> {
    let dict = ctx.get(node)?.as_dict()?.clone();
    let mut kids = kids_of(&dict)?;
    let leaves_level = kids.is_empty() || is_leaf_ref(ctx, kids[0])?;

    let parent_of_leaf;
    if leaves_level {
        let at = index.min(kids.len());
        kids.insert(at, leaf);
        set_parent(ctx, leaf, node)?;
        parent_of_leaf = node;
    } else {
        let mut remaining = index;
        let mut chosen = kids.len() - 1;
        for (i, &kid) in kids.iter().enumerate() {
            let c = count_of(ctx, kid)? as usize;
            if remaining <= c || i == kids.len() - 1 {
                chosen = i;
                break;
            }
            remaining -= c;
        }
        let (promoted, p) = insert_into(ctx, kids[chosen], leaf, remaining, b)?;
        parent_of_leaf = p;
        if let Some((right_ref, _)) = promoted {
            kids.insert(chosen + 1, right_ref);
            set_parent(ctx, right_ref, node)?;
        }
    }

    let new_count = count_of_all(ctx, &kids)?;
    if kids.len() > b {
        let mid = kids.len() / 2;
        let right_kids: Vec<PlainRef> = kids.split_off(mid);
        let left_count = count_of_all(ctx, &kids)?;
        let right_count = count_of_all(ctx, &right_kids)?;
        set_kids_and_count(ctx, node, &kids, left_count)?;

        let mut right_dict = Dictionary::new();
        right_dict.insert("Type", Primitive::name("Pages"));
        right_dict.insert("Kids", Primitive::Array(right_kids.iter().map(|&r| Primitive::Reference(r)).collect()));
        right_dict.insert("Count", Primitive::Integer(right_count as i64));
        let right_ref = ctx.register(Primitive::Dictionary(right_dict));
        for &k in &right_kids {
            set_parent(ctx, k, right_ref)?;
        }
        Ok((Some((right_ref, right_count)), parent_of_leaf))
    } else {
        set_kids_and_count(ctx, node, &kids, new_count)?;
        Ok((None, parent_of_leaf))
    }
}

fn count_of_all(ctx: &Context, kids: &[PlainRef]) -> Result<u32> {
    let mut total = 0;
    for &k in kids {
        total += count_of(ctx, k)?;
    }
    Ok(total)
}

/// Remove the leaf at `index`. Returns the (possibly new, if the old root
/// collapsed) tree root and the removed leaf's ref.
pub fn remove(ctx: &mut Context, root: PlainRef, index: usize) -> Result<(PlainRef, PlainRef)> {
    remove_with_b(ctx, root, index, DEFAULT_B)
}

pub fn remove_with_b(ctx: &mut Context, root: PlainRef, index: usize, b: usize) -> Result<(PlainRef, PlainRef)> {
    let (removed, _underflow) = remove_at(ctx, root, index, b, true)?;

    let dict = ctx.get(root)?.as_dict()?.clone();
    let kids = kids_of(&dict)?;
    if kids.len() == 1 && !is_leaf_ref(ctx, kids[0])? {
        let new_root = kids[0];
        ctx.free(root.id);
        let mut new_root_dict = ctx.get(new_root)?.as_dict()?.clone();
        new_root_dict.remove("Parent");
        ctx.assign(new_root, Primitive::Dictionary(new_root_dict));
        Ok((new_root, removed))
    } else {
        Ok((root, removed))
    }
}

/// Returns `(removed_leaf_ref, this_node_is_underflowing)`. `is_root`
/// suppresses the underflow rule for the root node (spec: "except the root").
fn remove_at(ctx: &mut Context, node: PlainRef, index: usize, b: usize, is_root: bool) -> Result<(PlainRef, bool)> {
    let dict = ctx.get(node)?.as_dict()?.clone();
    let mut kids = kids_of(&dict)?;
    let leaves_level = !kids.is_empty() && is_leaf_ref(ctx, kids[0])?;

    let removed;
    if leaves_level {
        let at = index.min(kids.len().saturating_sub(1));
        removed = kids.remove(at);
        set_kids_and_count(ctx, node, &kids, kids.len() as u32)?;
    } else {
        let mut remaining = index;
        let mut chosen = kids.len() - 1;
        for (i, &kid) in kids.iter().enumerate() {
            let c = count_of(ctx, kid)? as usize;
            if remaining < c || i == kids.len() - 1 {
                chosen = i;
                break;
            }
            remaining -= c;
        }
        let (r, child_underflow) = remove_at(ctx, kids[chosen], remaining, b, false)?;
        removed = r;

        if child_underflow {
            rebalance_child(ctx, &mut kids, chosen, b)?;
        }
        let new_count = count_of_all(ctx, &kids)?;
        set_kids_and_count(ctx, node, &kids, new_count)?;
    }

    let underflow = !is_root && kids.len() < min_kids(b);
    Ok((removed, underflow))
}

/// Merge or borrow to fix an underflowing child at `kids[chosen]`, preferring
/// its left sibling when one exists.
fn rebalance_child(ctx: &mut Context, kids: &mut Vec<PlainRef>, chosen: usize, b: usize) -> Result<()> {
    let min = min_kids(b);
    let sibling_idx = if chosen > 0 { chosen - 1 } else { chosen + 1 };
    if sibling_idx >= kids.len() {
        return Ok(());
    }
    let (left_idx, right_idx) = if sibling_idx < chosen { (sibling_idx, chosen) } else { (chosen, sibling_idx) };

    let left_dict = ctx.get(kids[left_idx])?.as_dict()?.clone();
    let right_dict = ctx.get(kids[right_idx])?.as_dict()?.clone();
    let mut left_kids = kids_of(&left_dict)?;
    let mut right_kids = kids_of(&right_dict)?;

    if left_kids.len() + right_kids.len() <= b {
        // Merge right into left, drop right from the parent.
        left_kids.append(&mut right_kids);
        for &k in &left_kids {
            set_parent(ctx, k, kids[left_idx])?;
        }
        let count = count_of_all(ctx, &left_kids)?;
        set_kids_and_count(ctx, kids[left_idx], &left_kids, count)?;
        ctx.free(kids[right_idx].id);
        kids.remove(right_idx);
    } else if left_kids.len() > min {
        // Borrow the left sibling's last kid.
        let borrowed = left_kids.pop().unwrap();
        right_kids.insert(0, borrowed);
        set_parent(ctx, borrowed, kids[right_idx])?;
        let lc = count_of_all(ctx, &left_kids)?;
        let rc = count_of_all(ctx, &right_kids)?;
        set_kids_and_count(ctx, kids[left_idx], &left_kids, lc)?;
        set_kids_and_count(ctx, kids[right_idx], &right_kids, rc)?;
    } else if right_kids.len() > min {
        // Borrow the right sibling's first kid.
        let borrowed = right_kids.remove(0);
        left_kids.push(borrowed);
        set_parent(ctx, borrowed, kids[left_idx])?;
        let lc = count_of_all(ctx, &left_kids)?;
        let rc = count_of_all(ctx, &right_kids)?;
        set_kids_and_count(ctx, kids[left_idx], &left_kids, lc)?;
        set_kids_and_count(ctx, kids[right_idx], &right_kids, rc)?;
    }
    Ok(())
}

/// Resolve an inherited attribute (`/MediaBox`, `/Resources`, `/Rotate`,
/// `/CropBox`) by walking `/Parent` links starting at `leaf` (spec §4.4).
pub fn inherited_attribute(get_dict: &dyn Fn(PlainRef) -> Result<Dictionary>, leaf: PlainRef, key: &str) -> Result<Option<Primitive>> {
    let mut current = Some(leaf);
    while let Some(r) = current {
        let dict = get_dict(r)?;
        if let Some(v) = dict.get(key) {
            return Ok(Some(v.clone()));
        }
        current = match dict.get("Parent") {
            Some(p) => Some(p.as_reference()?),
            None => None,
        };
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_leaf(ctx: &mut Context, w: f64, h: f64) -> PlainRef {
        let mut dict = Dictionary::new();
        dict.insert("Type", Primitive::name("Page"));
        dict.insert("MediaBox", Primitive::Array(vec![0.0.into(), 0.0.into(), w.into(), h.into()]));
        ctx.register(Primitive::Dictionary(dict))
    }

    #[test]
    fn insert_and_traverse_preserves_order() {
        let mut ctx = Context::new();
        let mut root = new_root(&mut ctx);
        let a = new_leaf(&mut ctx, 100.0, 100.0);
        let b = new_leaf(&mut ctx, 200.0, 200.0);
        let (r, _) = insert(&mut ctx, root, a, 0).unwrap();
        root = r;
        let (r, _) = insert(&mut ctx, root, b, 0).unwrap();
        root = r;

        let mut seen = Vec::new();
        traverse(&ctx, root, &mut |r, _| seen.push(r)).unwrap();
        assert_eq!(seen, vec![b, a]);
        assert_eq!(page_count(&ctx, root).unwrap(), 2);
    }

    #[test]
    fn split_on_overflow() {
        let mut ctx = Context::new();
        let mut root = new_root(&mut ctx);
        for i in 0..20 {
            let leaf = new_leaf(&mut ctx, i as f64, i as f64);
            let (r, _) = insert_with_b(&mut ctx, root, leaf, i, 4).unwrap();
            root = r;
        }
        assert_eq!(page_count(&ctx, root).unwrap(), 20);
        let mut count = 0;
        traverse(&ctx, root, &mut |_, _| count += 1).unwrap();
        assert_eq!(count, 20);
    }

    #[test]
    fn remove_from_single_page_doc() {
        let mut ctx = Context::new();
        let mut root = new_root(&mut ctx);
        let a = new_leaf(&mut ctx, 1.0, 1.0);
        let (r, _) = insert(&mut ctx, root, a, 0).unwrap();
        root = r;
        let (root, removed) = remove(&mut ctx, root, 0).unwrap();
        assert_eq!(removed, a);
        assert_eq!(page_count(&ctx, root).unwrap(), 0);
    }

    #[test]
    fn remove_many_keeps_counts_correct() {
        let mut ctx = Context::new();
        let mut root = new_root(&mut ctx);
        let mut leaves = Vec::new();
        for i in 0..20 {
            let leaf = new_leaf(&mut ctx, i as f64, i as f64);
            leaves.push(leaf);
            let (r, _) = insert_with_b(&mut ctx, root, leaf, i, 4).unwrap();
            root = r;
        }
        for _ in 0..15 {
            let (r, _) = remove_with_b(&mut ctx, root, 0, 4).unwrap();
            root = r;
        }
        assert_eq!(page_count(&ctx, root).unwrap(), 5);
        let mut count = 0;
        traverse(&ctx, root, &mut |_, _| count += 1).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn inherited_media_box_resolves_from_parent() {
        let mut ctx = Context::new();
        let root = new_root(&mut ctx);
        let mut root_dict = ctx.get(root).unwrap().as_dict().unwrap().clone();
        root_dict.insert("MediaBox", Primitive::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]));
        ctx.assign(root, Primitive::Dictionary(root_dict));

        let mut leaf_dict = Dictionary::new();
        leaf_dict.insert("Type", Primitive::name("Page"));
        leaf_dict.insert("Parent", Primitive::Reference(root));
        let leaf = ctx.register(Primitive::Dictionary(leaf_dict));

        let get_dict = |r: PlainRef| -> Result<Dictionary> { Ok(ctx.get(r)?.as_dict()?.clone()) };
        let value = inherited_attribute(&get_dict, leaf, "MediaBox").unwrap();
        assert!(value.is_some());
    }
}
