//! Stack growth guard for recursive type-graph walks.
//!
//! Type lowering, layout computation and ABI classification all recurse
//! structurally through a type's children. A deeply nested type (an array of
//! an optional of a struct of an array ...) can exhaust the native stack long
//! before any cycle is involved, so every recursive step that descends into a
//! child type goes through [`ensure_sufficient_stack`].
//!
//! On native hosts the stack is grown with `stacker`. On `wasm32` hosts the
//! closure is called directly.

/// Grow the stack when less than this many bytes remain.
const RED_ZONE: usize = 96 * 1024;

/// Size of each new stack segment.
const NEW_SEGMENT: usize = 1024 * 1024;

/// Run `f`, first growing the stack if the remaining space is below the red zone.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, NEW_SEGMENT, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A chain of nested "array of" wrappers, walked the way the layout
    /// code walks element types.
    enum Nested {
        Leaf(u64),
        ArrayOf(u64, Box<Nested>),
    }

    fn byte_size(ty: &Nested) -> u64 {
        ensure_sufficient_stack(|| match ty {
            Nested::Leaf(size) => *size,
            Nested::ArrayOf(len, elem) => len * byte_size(elem),
        })
    }

    fn build(depth: usize) -> Nested {
        let mut ty = Nested::Leaf(1);
        for _ in 0..depth {
            ty = Nested::ArrayOf(1, Box::new(ty));
        }
        ty
    }

    #[test]
    fn shallow_walk() {
        let ty = Nested::ArrayOf(4, Box::new(Nested::ArrayOf(2, Box::new(Nested::Leaf(8)))));
        assert_eq!(byte_size(&ty), 64);
    }

    #[test]
    fn deep_walk_does_not_overflow() {
        let ty = build(200_000);
        assert_eq!(byte_size(&ty), 1);
        // Drop iteratively; the recursive destructor would overflow on its own.
        let mut cur = ty;
        while let Nested::ArrayOf(_, next) = cur {
            cur = *next;
        }
    }

    #[test]
    fn propagates_results() {
        let r: Result<u32, &str> = ensure_sufficient_stack(|| Err("unsized"));
        assert_eq!(r, Err("unsized"));
    }
}
