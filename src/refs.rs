//! Types for references to elements within a kernel.
//!
//! These proxies allow chained navigation like
//! `edge.next().adjacent().vertex().point()`. Every step tolerates missing
//! links: navigating from an invalid proxy (or along a link that is not set)
//! yields an invalid proxy, and value accessors return `Option`.

use std::fmt;

use log::warn;
use smallvec::SmallVec;

use crate::{
    element::{FaceTriangle, Position},
    handle::{EdgeHandle, FaceHandle, Handle, Opt, PointHandle, VertexHandle},
    kernel::{Config, DefaultConfig, KernelHandle, MeshKernel},
};


/// A reference to an element within a kernel.
///
/// This is just a handle paired with a reference to the kernel associated
/// with that handle. The handle does not need to be valid.
pub struct ElementRef<'a, H: KernelHandle, C: Config = DefaultConfig> {
    handle: H,
    kernel: &'a MeshKernel<C>,
}

/// A reference to a half edge within a kernel. See [`ElementRef`] for more
/// information.
pub type EdgeRef<'a, C = DefaultConfig> = ElementRef<'a, EdgeHandle, C>;

/// A reference to a face within a kernel. See [`ElementRef`] for more
/// information.
pub type FaceRef<'a, C = DefaultConfig> = ElementRef<'a, FaceHandle, C>;

/// A reference to a vertex within a kernel. See [`ElementRef`] for more
/// information.
pub type VertexRef<'a, C = DefaultConfig> = ElementRef<'a, VertexHandle, C>;

/// A reference to a point within a kernel. See [`ElementRef`] for more
/// information.
pub type PointRef<'a, C = DefaultConfig> = ElementRef<'a, PointHandle, C>;


/// A mutable reference to an element within a kernel.
///
/// This is just a handle paired with a mutable reference to the kernel
/// associated with that handle.
pub struct ElementRefMut<'a, H: KernelHandle, C: Config = DefaultConfig> {
    handle: H,
    kernel: &'a mut MeshKernel<C>,
}

/// A mutable reference to a point within a kernel. See [`ElementRefMut`] for
/// more information.
pub type PointRefMut<'a, C = DefaultConfig> = ElementRefMut<'a, PointHandle, C>;



/// Allows to create multiple impl blocks with different headers but same body.
macro_rules! multi_impl {
    (
        [$(
            { $($header:tt)* },
        )*]
        $body:tt
    ) => {
        $(
            $($header)*
            $body
        )*
    }
}


impl<'a, H: KernelHandle, C: Config> ElementRef<'a, H, C> {
    pub fn new(kernel: &'a MeshKernel<C>, handle: H) -> Self {
        Self { kernel, handle }
    }

    /// Returns the linked kernel.
    pub fn kernel(&self) -> &'a MeshKernel<C> {
        self.kernel
    }

    /// Returns the element, or `None` if the handle is not valid.
    pub fn element(&self) -> Option<&'a H::Element> {
        self.kernel.try_get(self.handle).ok()
    }

    /// Creates a proxy for another handle in the same kernel.
    fn to<T: KernelHandle>(&self, handle: T) -> ElementRef<'a, T, C> {
        ElementRef::new(self.kernel, handle)
    }

    /// Follows the link selected by `field`, yielding an invalid proxy if the
    /// element or the link does not exist.
    fn follow<T: KernelHandle>(&self, field: impl FnOnce(&H::Element) -> Opt<T>) -> ElementRef<'a, T, C> {
        let handle = self.element()
            .and_then(|elem| field(elem).into_option())
            .unwrap_or_else(<T as Handle>::invalid);
        self.to(handle)
    }
}

impl<'a, H: KernelHandle, C: Config> ElementRefMut<'a, H, C> {
    pub fn new(kernel: &'a mut MeshKernel<C>, handle: H) -> Self {
        Self { kernel, handle }
    }

    /// Returns a mutable reference to the linked kernel.
    pub fn kernel_mut(&mut self) -> &mut MeshKernel<C> {
        self.kernel
    }

    /// Returns an immutable reference to the linked kernel.
    pub fn kernel(&self) -> &MeshKernel<C> {
        self.kernel
    }

    pub fn element(&self) -> Option<&H::Element> {
        self.kernel.try_get(self.handle).ok()
    }

    pub fn element_mut(&mut self) -> Option<&mut H::Element> {
        self.kernel.try_get_mut(self.handle).ok()
    }

    /// Converts into an immutable proxy.
    pub fn into_ref(self) -> ElementRef<'a, H, C> {
        ElementRef::new(self.kernel, self.handle)
    }
}

impl<'a, H: KernelHandle, C: Config> Clone for ElementRef<'a, H, C> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle,
            kernel: self.kernel,
        }
    }
}

impl<'a, H: KernelHandle, C: Config> Copy for ElementRef<'a, H, C> {}


multi_impl!{
    [
        { impl<'a, H: KernelHandle, C: Config> ElementRef<'a, H, C> },
        { impl<'a, H: KernelHandle, C: Config> ElementRefMut<'a, H, C> },
    ]
    {
        /// Returns the stored handle.
        pub fn handle(&self) -> H {
            self.handle
        }

        /// Returns `true` if the handle refers to an existing element.
        pub fn is_valid(&self) -> bool {
            self.kernel.is_valid_handle(self.handle)
        }
    }
}

multi_impl!{
    [
        { impl<'a, H: KernelHandle, C: Config> fmt::Debug for ElementRef<'a, H, C> },
        { impl<'a, H: KernelHandle, C: Config> fmt::Debug for ElementRefMut<'a, H, C> },
    ]
    {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Ref({:?})", self.handle)
        }
    }
}

// ===========================================================================
// ===== With EdgeHandle
// ===========================================================================
impl<'a, C: Config> EdgeRef<'a, C> {
    pub fn next(&self) -> EdgeRef<'a, C> {
        self.follow(|e| e.next)
    }

    pub fn prev(&self) -> EdgeRef<'a, C> {
        self.follow(|e| e.prev)
    }

    /// The twin half edge.
    pub fn adjacent(&self) -> EdgeRef<'a, C> {
        self.follow(|e| e.adjacent)
    }

    /// The origin vertex.
    pub fn vertex(&self) -> VertexRef<'a, C> {
        self.follow(|e| e.vertex)
    }

    pub fn face(&self) -> FaceRef<'a, C> {
        self.follow(|e| e.face)
    }

    /// Returns `true` if this half edge or its twin has no face.
    pub fn is_boundary(&self) -> bool {
        !self.face().is_valid() || !self.adjacent().face().is_valid()
    }

    /// The vertex this half edge ends at: the origin of `next`, or of the
    /// twin if there is no `next`.
    fn end_vertex(&self) -> VertexRef<'a, C> {
        let next = self.next();
        if next.is_valid() {
            next.vertex()
        } else {
            self.adjacent().vertex()
        }
    }

    /// Start and end vertex.
    pub fn vertices(&self) -> SmallVec<[VertexRef<'a, C>; 2]> {
        smallvec::smallvec![self.vertex(), self.end_vertex()]
    }

    /// Start and end point.
    pub fn points(&self) -> SmallVec<[PointRef<'a, C>; 2]> {
        smallvec::smallvec![self.vertex().point(), self.end_vertex().point()]
    }
}

// ===========================================================================
// ===== With FaceHandle
// ===========================================================================
impl<'a, C: Config> FaceRef<'a, C> {
    pub fn root_edge(&self) -> EdgeRef<'a, C> {
        self.follow(|f| f.root_edge)
    }

    /// All half edges around this face, starting with the root edge.
    ///
    /// Stops (and logs a warning) when a half edge turns out to be its own
    /// `next` or the loop does not close.
    pub fn perimeter_edges(&self) -> Vec<EdgeRef<'a, C>> {
        let root = self.root_edge();
        let edge_loop = self.kernel.edge_loop(root.handle());
        if let Some(edge) = edge_loop.degenerate {
            warn!(
                "perimeter of {:?} is degenerate at {:?}, stopping after {} edges",
                self.handle,
                edge,
                edge_loop.len(),
            );
        }

        edge_loop.edges.iter().map(|&e| self.to(e)).collect()
    }

    /// The triangles of this face. Empty for invalid faces and faces that
    /// are not triangles.
    pub fn triangles(&self) -> &'a [FaceTriangle] {
        self.element().map(|f| &f.triangles[..]).unwrap_or(&[])
    }
}

// ===========================================================================
// ===== With VertexHandle
// ===========================================================================
impl<'a, C: Config> VertexRef<'a, C> {
    /// The half edge originating at this vertex.
    pub fn edge(&self) -> EdgeRef<'a, C> {
        self.follow(|v| v.edge)
    }

    pub fn point(&self) -> PointRef<'a, C> {
        self.follow(|v| v.point)
    }
}

// ===========================================================================
// ===== With PointHandle
// ===========================================================================
impl<'a, C: Config> PointRef<'a, C> {
    pub fn position(&self) -> Option<Position> {
        self.element().map(|p| p.position)
    }

    /// All vertices at this point, in increasing handle order.
    pub fn vertices(&self) -> Vec<VertexRef<'a, C>> {
        let mut handles = self.element()
            .map(|p| p.vertices.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        handles.sort();
        handles.into_iter().map(|v| self.to(v)).collect()
    }
}

impl<'a, C: Config> PointRefMut<'a, C> {
    pub fn position(&self) -> Option<Position> {
        self.element().map(|p| p.position)
    }

    /// Moves the point. Returns `false` if the point does not exist.
    pub fn set_position(&mut self, position: Position) -> bool {
        match self.element_mut() {
            Some(p) => {
                p.position = position;
                true
            }
            None => false,
        }
    }
}
