//! The mesh builder: convenient face construction on top of the kernel.

use std::fmt;

use derive_more::Display;
use log::{debug, error};

use crate::{
    element::Position,
    error::Error,
    handle::{hsize, EdgeHandle, FaceHandle, Handle, PointHandle, VertexHandle},
    kernel::{Config, DefaultConfig, KernelHandle, MeshKernel, Remap},
    refs::{EdgeRef, FaceRef, PointRef, VertexRef},
};


/// Element counts of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[display(
    fmt = "{} points, {} vertices, {} half edges, {} faces",
    num_points, num_vertices, num_edges, num_faces
)]
pub struct MeshStats {
    pub num_points: hsize,
    pub num_vertices: hsize,
    pub num_edges: hsize,
    pub num_faces: hsize,
}

/// A polygon mesh.
///
/// This owns a [`MeshKernel`] and offers face construction from point lists
/// and existing edges, plus removal operations that take neighboring
/// elements with them ("dissolve"). Everything else is available through
/// [`kernel`][HedgeMesh::kernel] and [`kernel_mut`][HedgeMesh::kernel_mut].
///
/// # Example
///
/// ```
/// use hedge::{HedgeMesh, Position};
///
/// let mut mesh = HedgeMesh::<hedge::DefaultConfig>::new();
/// let points = mesh.add_points(&[
///     Position::new(0.0, 0.0, 0.0),
///     Position::new(1.0, 0.0, 0.0),
///     Position::new(0.0, 1.0, 0.0),
/// ]);
/// let face = mesh.add_face(&points);
///
/// assert_eq!(mesh.face(face).perimeter_edges().len(), 3);
/// assert_eq!(mesh.stats().num_edges, 6);
/// ```
pub struct HedgeMesh<C: Config = DefaultConfig> {
    kernel: MeshKernel<C>,
}

impl<C: Config> HedgeMesh<C> {
    pub fn new() -> Self {
        Self::from_kernel(MeshKernel::new())
    }

    pub fn from_kernel(kernel: MeshKernel<C>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &MeshKernel<C> {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut MeshKernel<C> {
        &mut self.kernel
    }

    pub fn into_kernel(self) -> MeshKernel<C> {
        self.kernel
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            num_points: self.kernel.num_points(),
            num_vertices: self.kernel.num_vertices(),
            num_edges: self.kernel.num_edges(),
            num_faces: self.kernel.num_faces(),
        }
    }

    /// Compacts the kernel, see [`MeshKernel::defrag`].
    pub fn defrag(&mut self) -> Remap {
        self.kernel.defrag()
    }

    // ===== Element access =====================================================================

    pub fn face(&self, handle: FaceHandle) -> FaceRef<'_, C> {
        FaceRef::new(&self.kernel, handle)
    }

    pub fn edge(&self, handle: EdgeHandle) -> EdgeRef<'_, C> {
        EdgeRef::new(&self.kernel, handle)
    }

    pub fn vertex(&self, handle: VertexHandle) -> VertexRef<'_, C> {
        VertexRef::new(&self.kernel, handle)
    }

    pub fn point(&self, handle: PointHandle) -> PointRef<'_, C> {
        PointRef::new(&self.kernel, handle)
    }

    pub fn faces(&self) -> impl Iterator<Item = FaceRef<'_, C>> {
        let kernel = &self.kernel;
        kernel.face_handles().map(move |h| FaceRef::new(kernel, h))
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_, C>> {
        let kernel = &self.kernel;
        kernel.edge_handles().map(move |h| EdgeRef::new(kernel, h))
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexRef<'_, C>> {
        let kernel = &self.kernel;
        kernel.vertex_handles().map(move |h| VertexRef::new(kernel, h))
    }

    pub fn points(&self) -> impl Iterator<Item = PointRef<'_, C>> {
        let kernel = &self.kernel;
        kernel.point_handles().map(move |h| PointRef::new(kernel, h))
    }

    // ===== Construction =======================================================================

    pub fn add_point(&mut self, position: Position) -> PointHandle {
        self.kernel.new_point(position)
    }

    pub fn add_points(&mut self, positions: &[Position]) -> Vec<PointHandle> {
        positions.iter().map(|&p| self.add_point(p)).collect()
    }

    /// Adds a face with the given corners. Returns the invalid handle (and
    /// logs an error) if that fails, see [`try_add_face`][Self::try_add_face].
    pub fn add_face(&mut self, points: &[PointHandle]) -> FaceHandle {
        let res = self.try_add_face(points);
        log_failure("add_face", res)
    }

    /// Adds a face with the given corners (at least three).
    ///
    /// A new edge pair is created for each side, so the face does not share
    /// any edge with existing faces. The root edge of the face starts at
    /// `points[0]`.
    pub fn try_add_face(&mut self, points: &[PointHandle]) -> Result<FaceHandle, Error> {
        check_len("add_face", 3, points.len())?;
        self.check_all(points)?;

        let face = self.kernel.new_face();
        let root = self.kernel.make_edge_pair(points[0], points[1], Some(face));
        let mut last = root;
        for &p in &points[2..] {
            last = self.kernel.extend_edge_pair(last, p, Some(face));
        }
        self.kernel.close_edge_pair(last, root, Some(face));

        self.kernel.set_face(face, root)?;
        debug!("added {:?} with {} corners", face, points.len());
        Ok(face)
    }

    /// Adds a face bordered by an existing half edge. Returns the invalid
    /// handle (and logs an error) if that fails, see
    /// [`try_add_face_from_edge`][Self::try_add_face_from_edge].
    pub fn add_face_from_edge(&mut self, edge: EdgeHandle, points: &[PointHandle]) -> FaceHandle {
        let res = self.try_add_face_from_edge(edge, points);
        log_failure("add_face_from_edge", res)
    }

    /// Adds a face whose loop starts with the existing half edge `edge` and
    /// continues through `points` (at least one) back to the start of
    /// `edge`. `edge` becomes the root edge.
    ///
    /// This is how a face is attached to a boundary: pass the twin of an
    /// edge of an existing face.
    pub fn try_add_face_from_edge(
        &mut self,
        edge: EdgeHandle,
        points: &[PointHandle],
    ) -> Result<FaceHandle, Error> {
        check_len("add_face_from_edge", 1, points.len())?;
        self.check_valid(edge)?;
        self.check_all(points)?;

        let face = self.kernel.new_face();
        let mut last = edge;
        for &p in points {
            last = self.kernel.extend_edge_pair(last, p, Some(face));
        }
        self.kernel.close_edge_pair(last, edge, Some(face));

        self.kernel.set_face(face, edge)?;
        debug!("added {:?} from {:?} and {} points", face, edge, points.len());
        Ok(face)
    }

    /// Adds a face from existing half edges. Returns the invalid handle (and
    /// logs an error) if that fails, see
    /// [`try_add_face_from_edges`][Self::try_add_face_from_edges].
    pub fn add_face_from_edges(&mut self, edges: &[EdgeHandle]) -> FaceHandle {
        let res = self.try_add_face_from_edges(edges);
        log_failure("add_face_from_edges", res)
    }

    /// Adds a face whose loop runs through the given half edges (at least
    /// two) in order. `edges[0]` becomes the root edge.
    ///
    /// Consecutive edges that already meet (the end point of one is the
    /// start point of the next) are connected directly. Between all others,
    /// a new edge pair is inserted. The same holds for closing the loop from
    /// the last edge back to the first one.
    pub fn try_add_face_from_edges(&mut self, edges: &[EdgeHandle]) -> Result<FaceHandle, Error> {
        check_len("add_face_from_edges", 2, edges.len())?;
        self.check_all(edges)?;

        let face = self.kernel.new_face();
        let first = edges[0];
        let last = edges[edges.len() - 1];
        for pair in edges.windows(2) {
            self.join(pair[0], pair[1], face);
        }
        self.join(last, first, face);

        self.kernel.set_face(face, first)?;
        debug!("added {:?} from {} edges", face, edges.len());
        Ok(face)
    }

    /// Connects `a -> b`, inserting a new edge pair if they do not meet.
    fn join(&mut self, a: EdgeHandle, b: EdgeHandle, face: FaceHandle) {
        let end = self.kernel.edge_end_point(a);
        if end.is_some() && end == self.kernel.edge_start_point(b) {
            self.kernel.connect_edges(a, b);
        } else {
            self.kernel.close_edge_pair(a, b, Some(face));
        }
    }

    fn check_valid<H: KernelHandle>(&self, handle: H) -> Result<(), Error> {
        self.kernel.try_get(handle).map(|_| ())
    }

    fn check_all<H: KernelHandle>(&self, handles: &[H]) -> Result<(), Error> {
        handles.iter().try_for_each(|&h| self.check_valid(h))
    }

    // ===== Dissolve ===========================================================================

    /// Removes the face. Its edges stay as boundary edges.
    pub fn dissolve_face(&mut self, face: FaceHandle) -> bool {
        self.kernel.remove_face(face)
    }

    /// Removes the faces on both sides of the edge and then the edge pair.
    pub fn dissolve_edge(&mut self, edge: EdgeHandle) -> bool {
        let (face, twin) = match self.kernel.try_get(edge) {
            Ok(e) => (e.face.into_option(), e.adjacent.into_option()),
            Err(_) => return false,
        };
        let twin_face = twin
            .and_then(|t| self.kernel.try_get(t).ok())
            .and_then(|t| t.face.into_option());

        for f in face.into_iter().chain(twin_face) {
            self.kernel.remove_face(f);
        }
        self.kernel.remove_edge(edge);
        true
    }

    /// Dissolves the edge leaving the vertex and the edge arriving at it,
    /// then removes the vertex if it still exists.
    pub fn dissolve_vertex(&mut self, vertex: VertexHandle) -> bool {
        let outgoing = match self.kernel.try_get(vertex) {
            Ok(v) => v.edge.into_option(),
            Err(_) => return false,
        };
        let incoming = outgoing
            .and_then(|e| self.kernel.try_get(e).ok())
            .and_then(|e| e.prev.into_option());

        for e in outgoing.into_iter().chain(incoming) {
            self.dissolve_edge(e);
        }
        self.kernel.remove_vertex(vertex);
        true
    }

    /// Dissolves every vertex at the point, then removes the point.
    pub fn dissolve_point(&mut self, point: PointHandle) -> bool {
        let mut vertices = match self.kernel.try_get(point) {
            Ok(p) => p.vertices.iter().cloned().collect::<Vec<_>>(),
            Err(_) => return false,
        };
        vertices.sort();

        for v in vertices {
            self.dissolve_vertex(v);
        }
        self.kernel.remove_point(point)
    }
}

fn check_len(operation: &'static str, required: usize, given: usize) -> Result<(), Error> {
    if given < required {
        Err(Error::InsufficientInput { operation, required, given })
    } else {
        Ok(())
    }
}

fn log_failure(operation: &str, res: Result<FaceHandle, Error>) -> FaceHandle {
    res.unwrap_or_else(|e| {
        error!("{} failed: {}", operation, e);
        FaceHandle::invalid()
    })
}

impl<C: Config> Default for HedgeMesh<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> Clone for HedgeMesh<C> {
    fn clone(&self) -> Self {
        Self::from_kernel(self.kernel.clone())
    }
}

impl<C: Config> fmt::Debug for HedgeMesh<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HedgeMesh")
            .field("kernel", &self.kernel)
            .finish()
    }
}
