use failure::Fail;

use crate::handle::{hsize, EdgeHandle, ElementKind, Generation};


/// Everything that can go wrong in fallible kernel and builder operations.
///
/// Passing an invalid primary handle to a non-`try_` method is a contract
/// violation and panics instead.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum Error {
    /// The handle refers to an empty slot or to an older generation of the
    /// arena.
    #[fail(
        display = "stale {} handle (index {}, generation {})",
        kind, index, generation,
    )]
    StaleHandle {
        kind: ElementKind,
        index: hsize,
        generation: Generation,
    },

    #[fail(
        display = "`{}` needs at least {} elements, but {} were given",
        operation, required, given,
    )]
    InsufficientInput {
        operation: &'static str,
        required: usize,
        given: usize,
    },

    /// A loop of half edges references itself or never returns to its root.
    #[fail(display = "degenerate edge loop at {:?}", edge)]
    DegenerateLoop { edge: EdgeHandle },

    #[fail(display = "not implemented: {}", _0)]
    Unimplemented(&'static str),
}
