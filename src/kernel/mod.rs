//! Everything related to the [`MeshKernel`].

// # Some notes for developers about this implementation
//
// - Every handle stored inside an element is stamped with the current
//   generation of its arena. Handles passed in by users may ignore the
//   generation, so they are stamped before being stored. The point vertex
//   sets rely on this: their hash only looks at the index, so equality must
//   not depend on which side ignores the generation.
// - Removal operations are ordered such that the structure is consistent
//   after each step. Only `remove_edge` recurses, and only once into the
//   twin (the twin link is broken first).

use std::{fmt, marker::PhantomData};

use log::{debug, trace, warn};
use smallvec::SmallVec;

use crate::{
    arena::{ElementArena, Handles, RemapTable},
    element::{Face, FaceTriangle, HalfEdge, Point, Position, Vertex},
    error::Error,
    handle::{hsize, EdgeHandle, FaceHandle, Handle, Opt, PointHandle, VertexHandle},
};


#[cfg(test)]
mod tests;



// ===============================================================================================
// ===== Compile time configuration of MeshKernel
// ===============================================================================================

/// Compile-time configuration for [`MeshKernel`].
///
/// To configure a kernel, either use one of the existing types implementing
/// this trait, or create your own (preferably inhabitable) type and implement
/// this trait.
pub trait Config: 'static {
    /// Whether a face is removed automatically once the removal of half edges
    /// leaves it without any edge.
    const REMOVE_EMPTY_FACES: bool;
}

/// The standard configuration: faces that lose all their edges stay in the
/// kernel until removed explicitly.
#[allow(missing_debug_implementations)]
pub enum DefaultConfig {}
impl Config for DefaultConfig {
    const REMOVE_EMPTY_FACES: bool = false;
}

/// Faces that lose all their edges are removed as part of the edge removal.
#[allow(missing_debug_implementations)]
pub enum PruneEmptyFaces {}
impl Config for PruneEmptyFaces {
    const REMOVE_EMPTY_FACES: bool = true;
}



// ===============================================================================================
// ===== Generic element access
// ===============================================================================================

/// Handles of elements stored in a [`MeshKernel`]. This is what makes the
/// generic accessors (`get`, `add`, `remove`, ...) of the kernel work for all
/// four element kinds.
pub trait KernelHandle: Handle {
    /// The element type this handle refers to.
    type Element: 'static;

    #[doc(hidden)]
    fn arena<C: Config>(kernel: &MeshKernel<C>) -> &ElementArena<Self, Self::Element>;

    #[doc(hidden)]
    fn arena_mut<C: Config>(kernel: &mut MeshKernel<C>) -> &mut ElementArena<Self, Self::Element>;

    #[doc(hidden)]
    fn remove_from<C: Config>(kernel: &mut MeshKernel<C>, handle: Self) -> bool;
}

macro_rules! impl_kernel_handle {
    ($handle:ident => $elem:ident, $field:ident, $remove:ident) => {
        impl KernelHandle for $handle {
            type Element = $elem;

            #[inline(always)]
            fn arena<C: Config>(kernel: &MeshKernel<C>) -> &ElementArena<Self, $elem> {
                &kernel.$field
            }

            #[inline(always)]
            fn arena_mut<C: Config>(kernel: &mut MeshKernel<C>) -> &mut ElementArena<Self, $elem> {
                &mut kernel.$field
            }

            fn remove_from<C: Config>(kernel: &mut MeshKernel<C>, handle: Self) -> bool {
                kernel.$remove(handle)
            }
        }
    }
}

impl_kernel_handle!(PointHandle => Point, points, remove_point);
impl_kernel_handle!(VertexHandle => Vertex, vertices, remove_vertex);
impl_kernel_handle!(EdgeHandle => HalfEdge, edges, remove_edge);
impl_kernel_handle!(FaceHandle => Face, faces, remove_face);



// ===============================================================================================
// ===== Definition of the kernel
// ===============================================================================================

/// Owner of all mesh elements and the only place where the connectivity is
/// changed.
///
/// The kernel stores points, vertices, half edges and faces in four
/// independent arenas. Elements refer to each other only through handles. All
/// operations here keep these references consistent: back-references
/// (point to vertices, vertex to edge, twin to twin, next to prev) are
/// updated together with the forward reference.
///
/// Removing elements leaves holes that are reused by later insertions. Call
/// [`defrag`][MeshKernel::defrag] to close them; this invalidates all handles
/// issued before and returns a [`Remap`] to translate them.
pub struct MeshKernel<C: Config = DefaultConfig> {
    points: ElementArena<PointHandle, Point>,
    vertices: ElementArena<VertexHandle, Vertex>,
    edges: ElementArena<EdgeHandle, HalfEdge>,
    faces: ElementArena<FaceHandle, Face>,
    _config: PhantomData<C>,
}

/// The result of [`MeshKernel::defrag`]: one remap table per element kind.
#[derive(Debug, Clone)]
pub struct Remap {
    pub points: RemapTable<PointHandle>,
    pub vertices: RemapTable<VertexHandle>,
    pub edges: RemapTable<EdgeHandle>,
    pub faces: RemapTable<FaceHandle>,
}

/// The half edges visited when following `next` links, see
/// [`MeshKernel::edge_loop`].
#[derive(Debug, Clone, Default)]
pub struct EdgeLoop {
    /// Visited edges in walking order, starting with the root.
    pub edges: SmallVec<[EdgeHandle; 8]>,

    /// `true` if the walk returned to the root edge.
    pub closed: bool,

    /// Set if the walk had to be aborted: either an edge is its own `next`
    /// or the walk did not return to the root within as many steps as there
    /// are half edges.
    pub degenerate: Option<EdgeHandle>,
}

impl EdgeLoop {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl<C: Config> MeshKernel<C> {
    /// Creates an empty kernel.
    pub fn new() -> Self {
        Self {
            points: ElementArena::new(),
            vertices: ElementArena::new(),
            edges: ElementArena::new(),
            faces: ElementArena::new(),
            _config: PhantomData,
        }
    }

    /// Panics if `handle` does not refer to an existing element.
    fn check<H: KernelHandle>(&self, handle: H) {
        if !self.is_valid_handle(handle) {
            panic!(
                "{:?} was passed to a mesh kernel, but this {} does not exist",
                handle,
                H::KIND,
            );
        }
    }

    // ===== Generic access =====================================================================

    /// Returns `true` if `handle` refers to an existing element of the
    /// current generation.
    pub fn is_valid_handle<H: KernelHandle>(&self, handle: H) -> bool {
        H::arena(self).is_valid_handle(handle)
    }

    /// Returns the element `handle` refers to.
    ///
    /// Panics if the handle is invalid or stale. See [`try_get`][Self::try_get]
    /// for the fallible version.
    pub fn get<H: KernelHandle>(&self, handle: H) -> &H::Element {
        &H::arena(self)[handle]
    }

    pub fn get_mut<H: KernelHandle>(&mut self, handle: H) -> &mut H::Element {
        &mut H::arena_mut(self)[handle]
    }

    pub fn try_get<H: KernelHandle>(&self, handle: H) -> Result<&H::Element, Error> {
        H::arena(self).get(handle).ok_or_else(|| stale(handle))
    }

    pub fn try_get_mut<H: KernelHandle>(&mut self, handle: H) -> Result<&mut H::Element, Error> {
        H::arena_mut(self).get_mut(handle).ok_or_else(|| stale(handle))
    }

    /// Inserts an element as is and returns its handle.
    ///
    /// The element's references are not checked and no back-references are
    /// created. Prefer the specific operations (`new_point`, `make_vertex`,
    /// ...) unless you know what you are doing.
    pub fn add<H: KernelHandle>(&mut self, elem: H::Element) -> H {
        H::arena_mut(self).add(elem)
    }

    /// Removes the element `handle` refers to, including all cascading
    /// updates for this element kind. Returns `false` if the handle was not
    /// valid.
    pub fn remove<H: KernelHandle>(&mut self, handle: H) -> bool {
        H::remove_from(self, handle)
    }

    // ===== Creation, counts and iteration =====================================================

    pub fn new_point(&mut self, position: Position) -> PointHandle {
        self.points.add(Point::new(position))
    }

    pub fn new_vertex(&mut self) -> VertexHandle {
        self.vertices.add(Vertex::default())
    }

    pub fn new_edge(&mut self) -> EdgeHandle {
        self.edges.add(HalfEdge::default())
    }

    pub fn new_face(&mut self) -> FaceHandle {
        self.faces.add(Face::default())
    }

    pub fn num_points(&self) -> hsize {
        self.points.num_elements()
    }

    pub fn num_vertices(&self) -> hsize {
        self.vertices.num_elements()
    }

    /// Number of half edges (twice the number of full edges).
    pub fn num_edges(&self) -> hsize {
        self.edges.num_elements()
    }

    pub fn num_faces(&self) -> hsize {
        self.faces.num_elements()
    }

    pub fn point_handles(&self) -> Handles<'_, PointHandle, Point> {
        self.points.handles()
    }

    pub fn vertex_handles(&self) -> Handles<'_, VertexHandle, Vertex> {
        self.vertices.handles()
    }

    pub fn edge_handles(&self) -> Handles<'_, EdgeHandle, HalfEdge> {
        self.edges.handles()
    }

    pub fn face_handles(&self) -> Handles<'_, FaceHandle, Face> {
        self.faces.handles()
    }

    // ===== Small queries ======================================================================

    /// The point at the origin vertex of `edge`, if any.
    pub fn edge_start_point(&self, edge: EdgeHandle) -> Option<PointHandle> {
        self.edges.get(edge)
            .and_then(|e| e.vertex.into_option())
            .and_then(|v| self.vertices.get(v))
            .and_then(|v| v.point.into_option())
            .filter(|&p| self.points.is_valid_handle(p))
    }

    /// The point at the origin vertex of the twin of `edge`, if any.
    pub fn edge_end_point(&self, edge: EdgeHandle) -> Option<PointHandle> {
        self.edges.get(edge)
            .and_then(|e| e.adjacent.into_option())
            .and_then(|twin| self.edge_start_point(twin))
    }

    /// Follows the `next` links starting at `root` until the walk returns to
    /// `root`, reaches an edge without (existing) `next` or finds a
    /// degenerate link. Never loops forever.
    pub fn edge_loop(&self, root: EdgeHandle) -> EdgeLoop {
        let mut out = EdgeLoop::default();
        if !self.edges.is_valid_handle(root) {
            return out;
        }

        let root = self.edges.stamp(root);
        let limit = self.edges.num_elements() as usize;
        let mut current = root;
        loop {
            out.edges.push(current);

            let next = match self.edges[current].next.into_option() {
                Some(next) if self.edges.is_valid_handle(next) => next,
                _ => break,
            };

            if next == current {
                out.degenerate = Some(current);
                break;
            }
            if next == root {
                out.closed = true;
                break;
            }
            if out.edges.len() >= limit {
                out.degenerate = Some(next);
                break;
            }

            current = next;
        }

        out
    }



    // ===========================================================================================
    // ===== Topology operations
    // ===========================================================================================

    /// Creates a vertex and optionally attaches it to `point` and `edge`
    /// right away.
    pub fn make_vertex(
        &mut self,
        point: Option<PointHandle>,
        edge: Option<EdgeHandle>,
    ) -> VertexHandle {
        let vertex = self.new_vertex();
        if let Some(point) = point {
            self.set_vertex_point(vertex, point);
        }
        if let Some(edge) = edge {
            self.set_vertex_edge(vertex, edge);
        }
        vertex
    }

    /// Creates two half edges that are each other's twin. Neither has a
    /// vertex nor a face.
    pub fn new_edge_pair(&mut self) -> (EdgeHandle, EdgeHandle) {
        let a = self.new_edge();
        let b = self.new_edge();
        self.edges[a].adjacent = Opt::some(b);
        self.edges[b].adjacent = Opt::some(a);
        (a, b)
    }

    /// Creates an edge pair running from `p0` to `p1` and returns the half
    /// edge starting at `p0`.
    ///
    /// Each half edge gets its own origin vertex at the respective point. An
    /// invalid point handle creates no vertex at that end. Only the returned
    /// half edge is tagged with `face`; the twin stays a boundary edge.
    pub fn make_edge_pair(
        &mut self,
        p0: PointHandle,
        p1: PointHandle,
        face: Option<FaceHandle>,
    ) -> EdgeHandle {
        self.make_edge_pair_impl(p0.into_option(), p1.into_option(), face)
    }

    fn make_edge_pair_impl(
        &mut self,
        p0: Option<PointHandle>,
        p1: Option<PointHandle>,
        face: Option<FaceHandle>,
    ) -> EdgeHandle {
        let (edge, twin) = self.new_edge_pair();
        for &(e, p) in &[(edge, p0), (twin, p1)] {
            if let Some(p) = p.filter(|&p| self.points.is_valid_handle(p)) {
                self.make_vertex(Some(p), Some(e));
            }
        }

        if let Some(face) = face.filter(|&f| self.faces.is_valid_handle(f)) {
            self.edges[edge].face = Opt::some(self.faces.stamp(face));
        }

        trace!("created edge pair {:?}/{:?} ({:?} -> {:?})", edge, twin, p0, p1);
        edge
    }

    /// Appends a new edge pair to `previous`: the new half edge starts where
    /// `previous` ends and runs to `point`. Returns the new half edge, which
    /// is already connected as `previous.next`.
    pub fn extend_edge_pair(
        &mut self,
        previous: EdgeHandle,
        point: PointHandle,
        face: Option<FaceHandle>,
    ) -> EdgeHandle {
        self.check(previous);

        let start = self.edge_end_point(previous);
        let edge = self.make_edge_pair_impl(start, point.into_option(), face);
        self.connect_edges(previous, edge);
        edge
    }

    /// Inserts a new edge pair between `previous` and `next`: the new half
    /// edge runs from the end of `previous` to the start of `next` and is
    /// connected on both sides.
    pub fn close_edge_pair(
        &mut self,
        previous: EdgeHandle,
        next: EdgeHandle,
        face: Option<FaceHandle>,
    ) -> EdgeHandle {
        self.check(previous);
        self.check(next);

        let start = self.edge_end_point(previous);
        let end = self.edge_start_point(next);
        let edge = self.make_edge_pair_impl(start, end, face);
        self.connect_edges(previous, edge);
        self.connect_edges(edge, next);
        edge
    }

    /// Sets `a.next = b` and `b.prev = a`. Links that pointed to `a` or `b`
    /// before from the other side are cleared.
    pub fn connect_edges(&mut self, a: EdgeHandle, b: EdgeHandle) {
        self.check(a);
        self.check(b);
        let a = self.edges.stamp(a);
        let b = self.edges.stamp(b);

        if let Some(old_next) = self.edges[a].next.into_option() {
            if old_next != b {
                if let Some(e) = self.edges.get_mut(old_next) {
                    if e.prev.into_option() == Some(a) {
                        e.prev = Opt::none();
                    }
                }
            }
        }
        if let Some(old_prev) = self.edges[b].prev.into_option() {
            if old_prev != a {
                if let Some(e) = self.edges.get_mut(old_prev) {
                    if e.next.into_option() == Some(b) {
                        e.next = Opt::none();
                    }
                }
            }
        }

        self.edges[a].next = Opt::some(b);
        self.edges[b].prev = Opt::some(a);
    }

    /// Creates a vertex at `point` as the origin of `b` and connects
    /// `a -> b`. Returns the new vertex.
    pub fn connect_edges_at(
        &mut self,
        a: EdgeHandle,
        point: PointHandle,
        b: EdgeHandle,
    ) -> VertexHandle {
        self.check(a);
        self.check(b);

        let vertex = self.make_vertex(Some(point), Some(b));
        self.connect_edges(a, b);
        vertex
    }

    /// Assigns `face` to every half edge of the loop starting at `root` and
    /// makes `root` the root edge of the face. Returns the number of edges
    /// that were assigned.
    ///
    /// If the loop is degenerate (an edge is its own `next` or the loop never
    /// returns to `root`), the walk stops there and `DegenerateLoop` is
    /// returned. Edges visited up to that point keep the face.
    pub fn set_face(&mut self, face: FaceHandle, root: EdgeHandle) -> Result<hsize, Error> {
        self.check(face);
        self.check(root);
        let face = self.faces.stamp(face);
        let root = self.edges.stamp(root);

        let edge_loop = self.edge_loop(root);
        for &e in &edge_loop.edges {
            self.edges[e].face = Opt::some(face);
        }
        self.faces[face].root_edge = Opt::some(root);
        self.faces[face].triangles.clear();

        if let Some(edge) = edge_loop.degenerate {
            warn!(
                "degenerate edge loop at {:?} while assigning {:?} (stopped after {} edges)",
                edge,
                face,
                edge_loop.len(),
            );
            return Err(Error::DegenerateLoop { edge });
        }

        if let Err(e) = self.triangulate_face(face) {
            debug!("{:?} has no triangles: {}", face, e);
        }

        Ok(edge_loop.len() as hsize)
    }

    /// Rebuilds the triangle list of `face` from its edge loop.
    ///
    /// Only closed loops of exactly three edges are supported. Open or
    /// shorter loops leave the list empty.
    pub fn triangulate_face(&mut self, face: FaceHandle) -> Result<(), Error> {
        self.check(face);

        self.faces[face].triangles.clear();
        let root = match self.faces[face].root_edge.into_option() {
            Some(root) => root,
            None => return Ok(()),
        };

        let edge_loop = self.edge_loop(root);
        if let Some(edge) = edge_loop.degenerate {
            return Err(Error::DegenerateLoop { edge });
        }
        if !edge_loop.closed {
            return Ok(());
        }

        match edge_loop.len() {
            3 => {
                let corners = edge_loop.edges.iter()
                    .filter_map(|&e| self.edges[e].vertex.into_option())
                    .filter(|&v| self.vertices.is_valid_handle(v))
                    .collect::<SmallVec<[_; 3]>>();

                if let &[v0, v1, v2] = &corners[..] {
                    self.faces[face].triangles.push(FaceTriangle { v0, v1, v2 });
                }
                Ok(())
            }
            n if n < 3 => Ok(()),
            _ => Err(Error::Unimplemented("triangulation of faces with more than three edges")),
        }
    }

    /// Makes `point` the point of `vertex`, updating the vertex sets of the
    /// old and new point. An invalid `point` detaches the vertex.
    pub fn set_vertex_point(&mut self, vertex: VertexHandle, point: PointHandle) {
        self.check(vertex);
        let vertex = self.vertices.stamp(vertex);
        let new_point = Some(point)
            .filter(|&p| self.points.is_valid_handle(p))
            .map(|p| self.points.stamp(p));

        let old_point = self.vertices[vertex].point.into_option();
        if old_point.is_some() && old_point == new_point {
            return;
        }

        if let Some(old) = old_point {
            if let Some(p) = self.points.get_mut(old) {
                p.vertices.remove(&vertex);
            }
        }

        match new_point {
            Some(p) => {
                self.points[p].vertices.insert(vertex);
                self.vertices[vertex].point = Opt::some(p);
            }
            None => self.vertices[vertex].point = Opt::none(),
        }
    }

    /// Links `vertex` and `edge` in both directions. The previous edge of
    /// `vertex` and the previous vertex of `edge` lose their link. An
    /// invalid `edge` detaches the vertex.
    pub fn set_vertex_edge(&mut self, vertex: VertexHandle, edge: EdgeHandle) {
        self.check(vertex);
        let vertex = self.vertices.stamp(vertex);
        let new_edge = Some(edge)
            .filter(|&e| self.edges.is_valid_handle(e))
            .map(|e| self.edges.stamp(e));

        if let Some(old) = self.vertices[vertex].edge.into_option() {
            if Some(old) != new_edge {
                if let Some(e) = self.edges.get_mut(old) {
                    if e.vertex.into_option() == Some(vertex) {
                        e.vertex = Opt::none();
                    }
                }
            }
        }

        match new_edge {
            Some(edge) => {
                if let Some(old_vertex) = self.edges[edge].vertex.into_option() {
                    if old_vertex != vertex {
                        if let Some(v) = self.vertices.get_mut(old_vertex) {
                            if v.edge.into_option() == Some(edge) {
                                v.edge = Opt::none();
                            }
                        }
                    }
                }

                self.edges[edge].vertex = Opt::some(vertex);
                self.vertices[vertex].edge = Opt::some(edge);
            }
            None => self.vertices[vertex].edge = Opt::none(),
        }
    }



    // ===========================================================================================
    // ===== Removal
    // ===========================================================================================

    /// Removes the point. Its vertices survive, but lose their point.
    pub fn remove_point(&mut self, point: PointHandle) -> bool {
        let removed = match self.points.remove(point) {
            Some(p) => p,
            None => return false,
        };

        for v in &removed.vertices {
            if let Some(vertex) = self.vertices.get_mut(*v) {
                vertex.point = Opt::none();
            }
        }

        trace!("removed {:?} (detached {} vertices)", point, removed.vertices.len());
        true
    }

    /// Removes the vertex from its point and from its edge, then frees it.
    /// Triangles of the face bordering that edge are dropped.
    pub fn remove_vertex(&mut self, vertex: VertexHandle) -> bool {
        let removed = match self.vertices.remove(vertex) {
            Some(v) => v,
            None => return false,
        };
        let vertex = self.vertices.stamp(vertex);

        if let Some(p) = removed.point.into_option() {
            if let Some(point) = self.points.get_mut(p) {
                point.vertices.remove(&vertex);
            }
        }

        if let Some(e) = removed.edge.into_option() {
            let mut face = None;
            if let Some(edge) = self.edges.get_mut(e) {
                if edge.vertex.into_option() == Some(vertex) {
                    edge.vertex = Opt::none();
                }
                face = edge.face.into_option();
            }
            if let Some(f) = face.and_then(|f| self.faces.get_mut(f)) {
                f.triangles.clear();
            }
        }

        trace!("removed {:?}", vertex);
        true
    }

    /// Removes the half edge and its twin.
    ///
    /// The cascade runs in this order:
    /// 1. the origin vertex is removed if this edge was its edge,
    /// 2. `next.prev` and `prev.next` are cleared,
    /// 3. the face's root edge moves to the old `next` (or `prev`, or any
    ///    other edge still bordering the face); if there is none, the face is
    ///    left without edges (and removed if `C` says so). The face's
    ///    triangles are dropped.
    /// 4. the twin link is broken, the slot freed and the twin removed the
    ///    same way.
    pub fn remove_edge(&mut self, edge: EdgeHandle) -> bool {
        if !self.edges.is_valid_handle(edge) {
            return false;
        }
        let edge = self.edges.stamp(edge);
        let HalfEdge { vertex, face, next, prev, adjacent } = self.edges[edge];

        if let Some(v) = vertex.into_option() {
            let owned = self.vertices.get(v)
                .map_or(false, |v| v.edge.into_option() == Some(edge));
            if owned {
                self.vertices[v].edge = Opt::none();
                self.edges[edge].vertex = Opt::none();
                self.remove_vertex(v);
            }
        }

        let twin = adjacent.into_option();
        let is_neighbor = |e: &EdgeHandle| *e != edge && Some(*e) != twin;
        let next = next.into_option()
            .filter(is_neighbor)
            .filter(|&e| self.edges.is_valid_handle(e));
        let prev = prev.into_option()
            .filter(is_neighbor)
            .filter(|&e| self.edges.is_valid_handle(e));

        if let Some(n) = next {
            if self.edges[n].prev.into_option() == Some(edge) {
                self.edges[n].prev = Opt::none();
            }
        }
        if let Some(p) = prev {
            if self.edges[p].next.into_option() == Some(edge) {
                self.edges[p].next = Opt::none();
            }
        }

        if let Some(f) = face.into_option().filter(|&f| self.faces.is_valid_handle(f)) {
            self.faces[f].triangles.clear();

            let root = self.faces[f].root_edge.into_option();
            let root_gone = root.map_or(true, |r| r == edge || !self.edges.is_valid_handle(r));
            if root_gone {
                // On an already broken loop, other edges may still border the face.
                let new_root = next.or(prev).or_else(|| {
                    self.edges.iter()
                        .find(|&(e, elem)| {
                            e != edge && Some(e) != twin && elem.face.into_option() == Some(f)
                        })
                        .map(|(e, _)| e)
                });
                match new_root {
                    Some(new_root) => self.faces[f].root_edge = Opt::some(new_root),
                    None => {
                        self.faces[f].root_edge = Opt::none();
                        if C::REMOVE_EMPTY_FACES {
                            self.edges[edge].face = Opt::none();
                            trace!("{:?} lost its last edge {:?}, removing it", f, edge);
                            self.remove_face(f);
                        }
                    }
                }
            }
        }

        let mut twin_linked = false;
        if let Some(t) = twin {
            if let Some(twin_edge) = self.edges.get_mut(t) {
                if twin_edge.adjacent.into_option() == Some(edge) {
                    twin_edge.adjacent = Opt::none();
                    twin_linked = true;
                }
            }
        }
        self.edges[edge].adjacent = Opt::none();
        self.edges.remove(edge);
        trace!("removed {:?}", edge);

        if let (Some(t), true) = (twin, twin_linked) {
            self.remove_edge(t);
        }

        true
    }

    /// Removes the face. The half edges of its loop survive as boundary
    /// edges.
    pub fn remove_face(&mut self, face: FaceHandle) -> bool {
        if !self.faces.is_valid_handle(face) {
            return false;
        }
        let face = self.faces.stamp(face);

        let edge_loop = self.faces[face].root_edge.into_option().map(|root| self.edge_loop(root));
        match edge_loop {
            Some(ref l) if l.closed => {
                for &e in &l.edges {
                    if self.edges[e].face.into_option() == Some(face) {
                        self.edges[e].face = Opt::none();
                    }
                }
            }
            _ => {
                // Without a closed loop we cannot know which edges still refer
                // to this face.
                self.edges.for_each_mut(|_, e| {
                    if e.face.into_option() == Some(face) {
                        e.face = Opt::none();
                    }
                });
            }
        }

        self.faces.remove(face);
        trace!("removed {:?}", face);
        true
    }



    // ===========================================================================================
    // ===== Compaction
    // ===========================================================================================

    /// Closes all holes in the element arenas.
    ///
    /// All four arenas are compacted first, then every handle stored in any
    /// element is rewritten. References to elements that do not exist anymore
    /// become `None`; triangles referring to such vertices are dropped.
    ///
    /// Afterwards, all handles issued before are invalid (unless they ignore
    /// the generation). Use the returned [`Remap`] to translate them.
    pub fn defrag(&mut self) -> Remap {
        let remap = Remap {
            points: self.points.defrag(),
            vertices: self.vertices.defrag(),
            edges: self.edges.defrag(),
            faces: self.faces.defrag(),
        };

        {
            let Remap { points, vertices, edges, faces } = &remap;

            self.points.for_each_mut(|_, p| {
                p.vertices = p.vertices.iter().filter_map(|&v| vertices.get(v)).collect();
            });
            self.vertices.for_each_mut(|_, v| {
                v.point = points.remap(v.point);
                v.edge = edges.remap(v.edge);
            });
            self.edges.for_each_mut(|_, e| {
                e.vertex = vertices.remap(e.vertex);
                e.face = faces.remap(e.face);
                e.next = edges.remap(e.next);
                e.prev = edges.remap(e.prev);
                e.adjacent = edges.remap(e.adjacent);
            });
            self.faces.for_each_mut(|_, f| {
                f.root_edge = edges.remap(f.root_edge);
                f.triangles = f.triangles.iter()
                    .filter_map(|t| Some(FaceTriangle {
                        v0: vertices.get(t.v0)?,
                        v1: vertices.get(t.v1)?,
                        v2: vertices.get(t.v2)?,
                    }))
                    .collect();
            });
        }

        debug!(
            "defragmented mesh kernel: {} points, {} vertices, {} half edges, {} faces",
            self.num_points(),
            self.num_vertices(),
            self.num_edges(),
            self.num_faces(),
        );

        remap
    }



    // ===========================================================================================
    // ===== Integrity check
    // ===========================================================================================

    /// Checks all connectivity invariants and panics with a `bug:` message
    /// naming the first violation. Useful in tests and after manual edits
    /// through [`get_mut`][Self::get_mut].
    pub fn check_integrity(&self) {
        for (eh, e) in self.edges.iter() {
            if let Some(twin) = link(eh, "adjacent", e.adjacent, &self.edges) {
                if self.edges[twin].adjacent.into_option() != Some(eh) {
                    panic!("bug: {:?} has twin {:?}, but not the other way around", eh, twin);
                }
                if twin == eh {
                    panic!("bug: {:?} is its own twin", eh);
                }
            }
            if let Some(next) = link(eh, "next", e.next, &self.edges) {
                if self.edges[next].prev.into_option() != Some(eh) {
                    panic!("bug: {:?}.next is {:?}, but {:?}.prev is not {:?}", eh, next, next, eh);
                }
            }
            if let Some(prev) = link(eh, "prev", e.prev, &self.edges) {
                if self.edges[prev].next.into_option() != Some(eh) {
                    panic!("bug: {:?}.prev is {:?}, but {:?}.next is not {:?}", eh, prev, prev, eh);
                }
            }
            if let Some(v) = link(eh, "vertex", e.vertex, &self.vertices) {
                if self.vertices[v].edge.into_option() != Some(eh) {
                    panic!("bug: {:?}.vertex is {:?}, but {:?}.edge is not {:?}", eh, v, v, eh);
                }
            }
            link(eh, "face", e.face, &self.faces);
        }

        for (vh, v) in self.vertices.iter() {
            if let Some(e) = link(vh, "edge", v.edge, &self.edges) {
                if self.edges[e].vertex.into_option() != Some(vh) {
                    panic!("bug: {:?}.edge is {:?}, but {:?}.vertex is not {:?}", vh, e, e, vh);
                }
            }
            if let Some(p) = link(vh, "point", v.point, &self.points) {
                if !self.points[p].vertices.contains(&vh) {
                    panic!("bug: {:?}.point is {:?}, but {:?} does not list {:?}", vh, p, p, vh);
                }
            }
        }

        for (ph, p) in self.points.iter() {
            for &vh in &p.vertices {
                if !self.vertices.is_valid_handle(vh) {
                    panic!("bug: {:?} lists {:?}, which does not exist", ph, vh);
                }
                if self.vertices[vh].point.into_option() != Some(ph) {
                    panic!("bug: {:?} lists {:?}, but {:?}.point is not {:?}", ph, vh, vh, ph);
                }
            }
        }

        for (fh, f) in self.faces.iter() {
            link(fh, "root_edge", f.root_edge, &self.edges);
            for t in &f.triangles {
                for &v in &t.vertices() {
                    if !self.vertices.is_valid_handle(v) {
                        panic!("bug: triangle {:?} of {:?} refers to missing {:?}", t, fh, v);
                    }
                }
            }
        }
    }
}

/// Returns the handle stored in the field `field` of element `source`, if
/// any. Panics if it refers to a missing element.
fn link<S: fmt::Debug, H: Handle, T>(
    source: S,
    field: &str,
    value: Opt<H>,
    arena: &ElementArena<H, T>,
) -> Option<H> {
    value.into_option().map(|h| {
        if !arena.is_valid_handle(h) {
            panic!("bug: {:?}.{} refers to {:?}, which does not exist", source, field, h);
        }
        h
    })
}

fn stale<H: Handle>(handle: H) -> Error {
    Error::StaleHandle {
        kind: H::KIND,
        index: handle.idx(),
        generation: handle.generation(),
    }
}

impl<C: Config> Default for MeshKernel<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> Clone for MeshKernel<C> {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
            faces: self.faces.clone(),
            _config: PhantomData,
        }
    }
}

impl<C: Config> fmt::Debug for MeshKernel<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MeshKernel")
            .field("points", &self.points)
            .field("vertices", &self.vertices)
            .field("edges", &self.edges)
            .field("faces", &self.faces)
            .finish()
    }
}
