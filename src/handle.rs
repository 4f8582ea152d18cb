//! Handles: typed, generation-stamped references to mesh elements.
//!
//! A handle is nothing more than an index into one of the element arenas of a
//! [`MeshKernel`][crate::MeshKernel] plus the generation of the arena at the
//! time the handle was issued. Handles never borrow the kernel, so they can be
//! stored anywhere (including inside other elements of the same kernel).
//!
//! There are four distinct handle types, one per element kind. They are
//! structurally identical, but not interchangeable: passing a
//! [`FaceHandle`] where an [`EdgeHandle`] is expected is a compile error.
//!
//!
//! # Generations
//!
//! Every arena has a generation counter that is bumped whenever the arena is
//! compacted (see [`MeshKernel::defrag`][crate::MeshKernel::defrag]). A handle
//! is only valid if its generation matches the arena's current generation.
//! The special value [`IGNORED_GENERATION`] opts out of this check: such a
//! handle refers to "whatever currently lives at this index".
//!
//! Two handles are equal if their indices are equal and either one of them
//! ignores the generation or both generations are equal. Ordering and hashing
//! only look at the index.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};
#[cfg(feature = "io")]
use std::io;

#[cfg(feature = "io")]
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use derive_more::Display;
use static_assertions::assert_eq_size;


/// The integer type used as index of all handles.
///
/// This is `u32` by default and `u64` with the `large-handle` feature.
#[cfg(not(feature = "large-handle"))]
#[allow(non_camel_case_types)]
pub type hsize = u32;

/// The integer type used as index of all handles.
///
/// This is `u32` by default and `u64` with the `large-handle` feature.
#[cfg(feature = "large-handle")]
#[allow(non_camel_case_types)]
pub type hsize = u64;

/// Counts how many times an arena has been compacted.
pub type Generation = u32;

/// An optional handle. The invalid handle is used as niche, so this type has
/// the same size as the handle itself.
pub type Opt<H> = optional::Optioned<H>;

/// Index value that marks a handle as "no element".
pub const INVALID_OFFSET: hsize = hsize::max_value();

/// Generation value that matches every generation.
pub const IGNORED_GENERATION: Generation = 0;

/// The generation of a freshly created arena.
pub const FIRST_GENERATION: Generation = 1;

/// Returns the generation following `generation`, skipping
/// [`IGNORED_GENERATION`] on overflow.
pub(crate) fn next_generation(generation: Generation) -> Generation {
    generation.checked_add(1).unwrap_or(FIRST_GENERATION)
}


/// The four kinds of elements stored in a mesh kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ElementKind {
    #[display(fmt = "point")]
    Point,
    #[display(fmt = "vertex")]
    Vertex,
    #[display(fmt = "half edge")]
    HalfEdge,
    #[display(fmt = "face")]
    Face,
}


/// Common interface of all handle types.
pub trait Handle: 'static + Copy + fmt::Debug + Eq + Ord + Hash + optional::Noned {
    /// The kind of element this handle refers to.
    const KIND: ElementKind;

    /// Creates a handle from the raw index and generation.
    fn new(idx: hsize, generation: Generation) -> Self;

    /// Returns the index of the slot this handle refers to.
    fn idx(&self) -> hsize;

    /// Returns the generation this handle was issued in.
    fn generation(&self) -> Generation;

    /// Creates a handle that ignores the generation of its arena.
    #[inline(always)]
    fn from_idx(idx: hsize) -> Self {
        Self::new(idx, IGNORED_GENERATION)
    }

    /// Creates a handle with ignored generation from a `usize` index.
    ///
    /// Panics if the index does not fit into `hsize` or collides with
    /// [`INVALID_OFFSET`].
    #[inline(always)]
    fn from_usize(raw: usize) -> Self {
        assert!(
            (raw as u128) < INVALID_OFFSET as u128,
            "index {} is too large to be stored in a handle",
            raw,
        );
        Self::from_idx(raw as hsize)
    }

    #[inline(always)]
    fn to_usize(&self) -> usize {
        self.idx() as usize
    }

    /// Returns the handle that refers to no element at all.
    #[inline(always)]
    fn invalid() -> Self {
        Self::new(INVALID_OFFSET, IGNORED_GENERATION)
    }

    /// Returns `true` if this is the "no element" handle. Note that `false`
    /// does not imply that the handle refers to an existing element; ask the
    /// kernel for that.
    #[inline(always)]
    fn is_invalid(&self) -> bool {
        self.idx() == INVALID_OFFSET
    }

    #[inline(always)]
    fn ignores_generation(&self) -> bool {
        self.generation() == IGNORED_GENERATION
    }

    /// Returns the same index stamped with `generation`.
    #[inline(always)]
    fn with_generation(self, generation: Generation) -> Self {
        Self::new(self.idx(), generation)
    }

    /// Returns the same index with the ignored generation.
    #[inline(always)]
    fn without_generation(self) -> Self {
        Self::from_idx(self.idx())
    }

    /// Checks the generation part of the equality rule against `generation`.
    #[inline(always)]
    fn matches_generation(&self, generation: Generation) -> bool {
        self.ignores_generation()
            || generation == IGNORED_GENERATION
            || self.generation() == generation
    }

    /// `None` for the invalid handle, `Some(self)` otherwise.
    #[inline(always)]
    fn into_option(self) -> Option<Self> {
        if self.is_invalid() {
            None
        } else {
            Some(self)
        }
    }

    /// Wraps this handle into an [`Opt`], mapping the invalid handle to none.
    #[inline(always)]
    fn into_opt(self) -> Opt<Self> {
        if self.is_invalid() {
            Opt::none()
        } else {
            Opt::some(self)
        }
    }

    /// Writes the raw index of this handle as little endian integer. The
    /// generation is not written.
    #[cfg(feature = "io")]
    fn write_raw<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write_idx(w, self.idx())
    }

    /// Reads a handle written by [`Handle::write_raw`]. As generations are
    /// not persisted, the returned handle ignores the generation.
    #[cfg(feature = "io")]
    fn read_raw<R: io::Read>(r: &mut R) -> io::Result<Self> {
        read_idx(r).map(Self::from_idx)
    }
}

#[cfg(all(feature = "io", not(feature = "large-handle")))]
fn write_idx<W: io::Write>(w: &mut W, idx: hsize) -> io::Result<()> {
    w.write_u32::<LittleEndian>(idx)
}

#[cfg(all(feature = "io", feature = "large-handle"))]
fn write_idx<W: io::Write>(w: &mut W, idx: hsize) -> io::Result<()> {
    w.write_u64::<LittleEndian>(idx)
}

#[cfg(all(feature = "io", not(feature = "large-handle")))]
fn read_idx<R: io::Read>(r: &mut R) -> io::Result<hsize> {
    r.read_u32::<LittleEndian>()
}

#[cfg(all(feature = "io", feature = "large-handle"))]
fn read_idx<R: io::Read>(r: &mut R) -> io::Result<hsize> {
    r.read_u64::<LittleEndian>()
}


macro_rules! make_handle_type {
    ($(#[$attr:meta])* $name:ident, $short:expr, $kind:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy)]
        pub struct $name {
            idx: hsize,
            generation: Generation,
        }

        impl Handle for $name {
            const KIND: ElementKind = ElementKind::$kind;

            #[inline(always)]
            fn new(idx: hsize, generation: Generation) -> Self {
                $name { idx, generation }
            }

            #[inline(always)]
            fn idx(&self) -> hsize {
                self.idx
            }

            #[inline(always)]
            fn generation(&self) -> Generation {
                self.generation
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.idx == other.idx && self.matches_generation(other.generation)
            }
        }

        // Not transitive across generations when an ignored generation is
        // involved. Handles stored by the kernel always carry the arena
        // generation, so sets of them stay consistent.
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.idx.cmp(&other.idx)
            }
        }

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.idx.hash(state);
            }
        }

        impl optional::Noned for $name {
            fn is_none(&self) -> bool {
                self.idx == INVALID_OFFSET
            }
            fn get_none() -> Self {
                Self::invalid()
            }
        }

        impl optional::OptEq for $name {
            fn opt_eq(&self, other: &Self) -> bool {
                self == other
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if self.is_invalid() {
                    write!(f, "{}-", $short)
                } else if self.ignores_generation() {
                    write!(f, "{}{}", $short, self.idx)
                } else {
                    write!(f, "{}{}@{}", $short, self.idx, self.generation)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if self.is_invalid() {
                    write!(f, "{}-", $short)
                } else {
                    write!(f, "{}{}", $short, self.idx)
                }
            }
        }
    }
}

make_handle_type!(
    /// Handle to refer to half edges.
    EdgeHandle, "E", HalfEdge
);
make_handle_type!(
    /// Handle to refer to faces.
    FaceHandle, "F", Face
);
make_handle_type!(
    /// Handle to refer to vertices (face corners).
    VertexHandle, "V", Vertex
);
make_handle_type!(
    /// Handle to refer to points (shared positions).
    PointHandle, "P", Point
);

assert_eq_size!(EdgeHandle, (hsize, Generation));
assert_eq_size!(Opt<EdgeHandle>, EdgeHandle);
assert_eq_size!(Opt<PointHandle>, PointHandle);
