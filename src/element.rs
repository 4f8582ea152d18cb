//! The element types stored in the arenas of a [`MeshKernel`][crate::MeshKernel].
//!
//! Elements only hold handles to other elements. All fields are public, but
//! mutating them directly bypasses the bookkeeping the kernel does for you
//! (back-references, generation stamps). Prefer the kernel operations.

use std::fmt;

use fxhash::FxHashSet;
use smallvec::SmallVec;

use crate::handle::{EdgeHandle, FaceHandle, Handle, Opt, PointHandle, VertexHandle};


/// The position of a point in 3D space.
pub type Position = cgmath::Point3<f32>;

/// Returns the handle stored in `opt` or the invalid handle.
#[inline(always)]
pub(crate) fn unpack<H: Handle>(opt: Opt<H>) -> H {
    opt.into_option().unwrap_or_else(H::invalid)
}


/// A unique position in space, shared by all vertices (face corners) that sit
/// at this position.
#[derive(Clone)]
pub struct Point {
    pub position: Position,

    /// All vertices referring to this point. Maintained by
    /// [`MeshKernel::set_vertex_point`][crate::MeshKernel::set_vertex_point].
    pub vertices: FxHashSet<VertexHandle>,
}

impl Point {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            vertices: FxHashSet::default(),
        }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(Position::new(0.0, 0.0, 0.0))
    }
}

/// A face corner. Connects exactly one half edge (the one starting here) with
/// a point.
#[derive(Clone, Copy)]
pub struct Vertex {
    pub point: Opt<PointHandle>,

    /// The half edge originating at this vertex.
    pub edge: Opt<EdgeHandle>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            point: Opt::none(),
            edge: Opt::none(),
        }
    }
}

/// One directed half of an edge.
#[derive(Clone, Copy)]
pub struct HalfEdge {
    /// The vertex this half edge starts at.
    pub vertex: Opt<VertexHandle>,

    /// The face this half edge borders. `None` for boundary edges.
    pub face: Opt<FaceHandle>,

    pub next: Opt<EdgeHandle>,
    pub prev: Opt<EdgeHandle>,

    /// The twin running in the opposite direction.
    pub adjacent: Opt<EdgeHandle>,
}

impl Default for HalfEdge {
    fn default() -> Self {
        Self {
            vertex: Opt::none(),
            face: Opt::none(),
            next: Opt::none(),
            prev: Opt::none(),
            adjacent: Opt::none(),
        }
    }
}

/// A triangle of a face, given by three vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceTriangle {
    pub v0: VertexHandle,
    pub v1: VertexHandle,
    pub v2: VertexHandle,
}

impl FaceTriangle {
    pub fn vertices(&self) -> [VertexHandle; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// A face bordered by a loop of half edges.
#[derive(Clone)]
pub struct Face {
    /// The half edge the loop starts at.
    pub root_edge: Opt<EdgeHandle>,

    /// Only filled for faces with exactly three edges.
    pub triangles: SmallVec<[FaceTriangle; 2]>,
}

impl Default for Face {
    fn default() -> Self {
        Self {
            root_edge: Opt::none(),
            triangles: SmallVec::new(),
        }
    }
}


impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut vertices = self.vertices.iter().collect::<Vec<_>>();
        vertices.sort();
        write!(
            f,
            "Point {{ position: [{}, {}, {}], vertices: {:?} }}",
            self.position.x,
            self.position.y,
            self.position.z,
            vertices,
        )
    }
}

impl fmt::Debug for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Vertex {{ point: {:?}, edge: {:?} }}",
            unpack(self.point),
            unpack(self.edge),
        )
    }
}

impl fmt::Debug for HalfEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "HalfEdge {{ vertex: {:5} next: {:6} prev: {:6} adjacent: {:6} face: {:?} }}",
            format!("{:?},", unpack(self.vertex)),
            format!("{:?},", unpack(self.next)),
            format!("{:?},", unpack(self.prev)),
            format!("{:?},", unpack(self.adjacent)),
            unpack(self.face),
        )
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Face {{ root_edge: {:?}, triangles: {:?} }}",
            unpack(self.root_edge),
            self.triangles,
        )
    }
}
