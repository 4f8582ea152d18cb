//! A half edge mesh kernel.
//!
//! Meshes are stored as four kinds of elements, each living in its own arena:
//!
//! - **points**: positions in space, possibly shared by many vertices,
//! - **vertices**: corners of exactly one half edge,
//! - **half edges**: directed edges with their twin (`adjacent`) and the
//!   `next`/`prev` links of the face loop they are part of,
//! - **faces**: a root half edge plus a cached triangulation.
//!
//! Elements are referred to by [handles][handle::Handle]: an index plus the
//! generation of the arena at the time the handle was created. Removing an
//! element keeps all other handles valid; [defragmenting][MeshKernel::defrag]
//! bumps the generation so that old handles are detected as stale.
//!
//! [`MeshKernel`] offers all low level operations and never repairs the
//! topology on its own beyond the documented cascades. [`HedgeMesh`] builds
//! on top of it to add faces from point lists or existing edges. Both can be
//! navigated with the proxies in [`refs`].
//!
//! ```
//! use hedge::{HedgeMesh, Position};
//!
//! let mut mesh = HedgeMesh::<hedge::DefaultConfig>::new();
//! let a = mesh.add_point(Position::new(0.0, 0.0, 0.0));
//! let b = mesh.add_point(Position::new(1.0, 0.0, 0.0));
//! let c = mesh.add_point(Position::new(0.0, 1.0, 0.0));
//! let face = mesh.add_face(&[a, b, c]);
//!
//! let root = mesh.face(face).root_edge();
//! assert_eq!(root.next().next().next().handle(), root.handle());
//! assert_eq!(root.adjacent().vertex().point().handle(), b);
//! ```


#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod arena;
pub mod element;
mod error;
pub mod handle;
pub mod kernel;
pub mod mesh;
pub mod prelude;
pub mod refs;

pub use self::{
    element::Position,
    error::Error,
    handle::{EdgeHandle, FaceHandle, PointHandle, VertexHandle},
    kernel::{Config, DefaultConfig, MeshKernel, PruneEmptyFaces, Remap},
    mesh::{HedgeMesh, MeshStats},
};
