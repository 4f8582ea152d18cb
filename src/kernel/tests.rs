use super::*;
use crate::test_utils::pos;


type Kernel = MeshKernel<DefaultConfig>;

fn next(k: &MeshKernel<impl Config>, e: EdgeHandle) -> Option<EdgeHandle> {
    k.get(e).next.into_option()
}

fn prev(k: &MeshKernel<impl Config>, e: EdgeHandle) -> Option<EdgeHandle> {
    k.get(e).prev.into_option()
}

/// Builds the triangle `p0 -> p1 -> p2` with the kernel operations only.
/// Returns the face and its three (inner) half edges.
fn triangle<C: Config>(
    k: &mut MeshKernel<C>,
    [p0, p1, p2]: [PointHandle; 3],
) -> (FaceHandle, [EdgeHandle; 3]) {
    let f = k.new_face();
    let e0 = k.make_edge_pair(p0, p1, Some(f));
    let e1 = k.extend_edge_pair(e0, p2, Some(f));
    let e2 = k.close_edge_pair(e1, e0, Some(f));
    assert_eq!(k.set_face(f, e0), Ok(3));
    (f, [e0, e1, e2])
}

fn three_points(k: &mut MeshKernel<impl Config>) -> [PointHandle; 3] {
    [
        k.new_point(pos(0.0, 0.0, 0.0)),
        k.new_point(pos(1.0, 0.0, 0.0)),
        k.new_point(pos(0.0, 1.0, 0.0)),
    ]
}


// ===== Element storage ========================================================================

#[test]
fn empty() {
    let k = Kernel::new();
    assert_eq!(k.num_points(), 0);
    assert_eq!(k.num_vertices(), 0);
    assert_eq!(k.num_edges(), 0);
    assert_eq!(k.num_faces(), 0);
    assert_eq!(k.point_handles().count(), 0);
    k.check_integrity();
}

#[test]
fn add_and_remove_points() {
    let mut k = Kernel::new();
    let p0 = k.new_point(pos(0.0, 0.0, 0.0));
    let p1 = k.new_point(pos(1.0, 0.0, 0.0));
    let p2 = k.new_point(pos(0.0, 1.0, 0.0));
    let p3 = k.new_point(pos(0.0, 0.0, 1.0));

    assert_eq!(k.num_points(), 4);
    assert_eq!([p0.idx(), p1.idx(), p2.idx(), p3.idx()], [0, 1, 2, 3]);
    assert!(k.get(p1).vertices.is_empty());
    assert_eq!(k.get(p1).position, pos(1.0, 0.0, 0.0));

    assert!(k.remove(p2));
    assert_eq!(k.num_points(), 3);
    assert!(!k.is_valid_handle(p2));
    assert!(!k.remove(p2));

    // The freed slot is reused and the old handle refers to the new point.
    let p4 = k.new_point(pos(2.0, 2.0, 2.0));
    assert_eq!(p4.idx(), 2);
    assert!(k.is_valid_handle(p2));
    assert_eq!(k.get(p2).position, pos(2.0, 2.0, 2.0));
}

#[test]
fn slot_reuse_is_most_recent_first() {
    let mut k = Kernel::new();
    let points = (0..5)
        .map(|i| k.new_point(pos(i as f32, 0.0, 0.0)))
        .collect::<Vec<_>>();

    k.remove_point(points[1]);
    k.remove_point(points[3]);
    assert!(!k.is_valid_handle(points[1]));
    assert!(!k.is_valid_handle(points[3]));
    assert_eq!(k.num_points(), 3);

    // Last freed, first reused: slot 3 comes back before slot 1.
    let a = k.new_point(pos(10.0, 0.0, 0.0));
    assert_eq!(a.idx(), 3);
    assert!(k.is_valid_handle(points[3]));
    assert!(!k.is_valid_handle(points[1]));

    let b = k.new_point(pos(11.0, 0.0, 0.0));
    assert_eq!(b.idx(), 1);
    let c = k.new_point(pos(12.0, 0.0, 0.0));
    assert_eq!(c.idx(), 5);
}

#[test]
fn try_get_reports_stale_handles() {
    let mut k = Kernel::new();
    let p = k.new_point(pos(0.0, 0.0, 0.0));
    assert!(k.try_get(p).is_ok());

    k.remove(p);
    assert_eq!(
        k.try_get(p).err(),
        Some(Error::StaleHandle {
            kind: crate::handle::ElementKind::Point,
            index: 0,
            generation: 1,
        }),
    );
    assert!(k.try_get_mut(FaceHandle::invalid()).is_err());
}

#[test]
#[should_panic(expected = "does not exist")]
fn get_panics_on_stale_handle() {
    let mut k = Kernel::new();
    let f = k.new_face();
    k.remove(f);
    k.get(f);
}

#[test]
#[should_panic(expected = "does not exist")]
fn connect_edges_panics_on_missing_edge() {
    let mut k = Kernel::new();
    let e = k.new_edge();
    k.connect_edges(e, EdgeHandle::from_idx(7));
}


// ===== Topology operations ====================================================================

#[test]
fn manual_triangle() {
    let mut k = Kernel::new();
    let [p0, p1, p2] = three_points(&mut k);
    let f = k.new_face();

    let none = PointHandle::invalid();
    let e0 = k.make_edge_pair(none, none, Some(f));
    let e1 = k.make_edge_pair(none, none, Some(f));
    let e2 = k.make_edge_pair(none, none, Some(f));
    assert_eq!(k.num_vertices(), 0);

    let v0 = k.connect_edges_at(e0, p1, e1);
    let v1 = k.connect_edges_at(e1, p2, e2);
    let v2 = k.connect_edges_at(e2, p0, e0);
    k.get_mut(f).root_edge = Opt::some(e0);

    assert_eq!(k.num_points(), 3);
    assert_eq!(k.num_edges(), 6);
    assert_eq!(k.num_vertices(), 3);
    assert_eq!(k.num_faces(), 1);

    assert_eq_set!(k.get(p0).vertices.iter().cloned(), [v2]);
    assert_eq_set!(k.get(p1).vertices.iter().cloned(), [v0]);
    assert_eq_set!(k.get(p2).vertices.iter().cloned(), [v1]);

    for &(e, p, n, v) in &[(e0, e2, e1, v2), (e1, e0, e2, v0), (e2, e1, e0, v1)] {
        let edge = k.get(e);
        assert_eq!(edge.prev.into_option(), Some(p));
        assert_eq!(edge.next.into_option(), Some(n));
        assert_eq!(edge.vertex.into_option(), Some(v));
        assert_eq!(edge.face.into_option(), Some(f));
    }
    k.check_integrity();

    assert_eq!(k.set_face(f, e0), Ok(3));
    assert_eq!(&k.get(f).triangles[..], &[FaceTriangle { v0: v2, v1: v0, v2: v1 }]);
}

#[test]
fn edge_pairs_are_symmetric() {
    let mut k = Kernel::new();
    let points = three_points(&mut k);
    let (_, edges) = triangle(&mut k, points);

    let (a, b) = k.new_edge_pair();
    for &e in edges.iter().chain(&[a, b]) {
        let twin = k.get(e).adjacent.into_option().unwrap();
        assert_eq!(k.get(twin).adjacent.into_option(), Some(e));
        assert_ne!(twin, e);
    }
    k.check_integrity();
}

#[test]
fn built_triangle_connectivity() {
    let mut k = Kernel::new();
    let [p0, p1, p2] = three_points(&mut k);
    let (f, [e0, e1, e2]) = triangle(&mut k, [p0, p1, p2]);

    assert_eq!(k.num_edges(), 6);
    assert_eq!(k.num_vertices(), 6);

    assert_eq!(next(&k, e0), Some(e1));
    assert_eq!(next(&k, e1), Some(e2));
    assert_eq!(next(&k, e2), Some(e0));
    assert_eq!(prev(&k, e0), Some(e2));

    assert_eq!(k.edge_start_point(e0), Some(p0));
    assert_eq!(k.edge_start_point(e1), Some(p1));
    assert_eq!(k.edge_start_point(e2), Some(p2));
    assert_eq!(k.edge_end_point(e2), Some(p0));

    // Each point carries the corner of the inner edge and of one twin.
    for &p in &[p0, p1, p2] {
        assert_eq!(k.get(p).vertices.len(), 2);
    }

    let l = k.edge_loop(e1);
    assert!(l.closed);
    assert_eq!(l.degenerate, None);
    assert_eq!(&l.edges[..], &[e1, e2, e0]);

    assert_eq!(k.get(f).root_edge.into_option(), Some(e0));
    assert_eq!(k.get(f).triangles.len(), 1);
    k.check_integrity();
}

#[test]
fn vertex_point_back_references() {
    let mut k = Kernel::new();
    let [p0, p1, _] = three_points(&mut k);

    let v = k.make_vertex(Some(p0), None);
    assert_eq!(k.get(v).point.into_option(), Some(p0));
    assert_eq_set!(k.get(p0).vertices.iter().cloned(), [v]);

    // Setting the same point twice changes nothing.
    k.set_vertex_point(v, p0);
    assert_eq!(k.get(p0).vertices.len(), 1);

    k.set_vertex_point(v, p1);
    assert!(k.get(p0).vertices.is_empty());
    assert_eq_set!(k.get(p1).vertices.iter().cloned(), [v]);

    k.set_vertex_point(v, PointHandle::invalid());
    assert!(k.get(p1).vertices.is_empty());
    assert!(k.get(v).point.is_none());

    k.set_vertex_point(v, p1);
    assert!(k.remove(v));
    assert!(k.get(p1).vertices.is_empty());
    k.check_integrity();
}

#[test]
fn removing_point_keeps_vertices() {
    let mut k = Kernel::new();
    let [p0, _, _] = three_points(&mut k);
    let a = k.make_vertex(Some(p0), None);
    let b = k.make_vertex(Some(p0), None);

    assert!(k.remove_point(p0));
    assert_eq!(k.num_vertices(), 2);
    assert!(k.get(a).point.is_none());
    assert!(k.get(b).point.is_none());
    k.check_integrity();
}

#[test]
fn vertex_edge_link_stays_one_to_one() {
    let mut k = Kernel::new();
    let e = k.new_edge();
    let f = k.new_edge();

    let a = k.make_vertex(None, Some(e));
    let b = k.make_vertex(None, Some(e));
    assert!(k.get(a).edge.is_none());
    assert_eq!(k.get(b).edge.into_option(), Some(e));
    assert_eq!(k.get(e).vertex.into_option(), Some(b));

    k.set_vertex_edge(b, f);
    assert!(k.get(e).vertex.is_none());
    assert_eq!(k.get(f).vertex.into_option(), Some(b));
    k.check_integrity();
}

#[test]
fn connect_edges_clears_old_links() {
    let mut k = Kernel::new();
    let a = k.new_edge();
    let b = k.new_edge();
    let c = k.new_edge();

    k.connect_edges(a, b);
    k.connect_edges(a, c);
    assert_eq!(next(&k, a), Some(c));
    assert_eq!(prev(&k, c), Some(a));
    assert_eq!(prev(&k, b), None);

    k.connect_edges(b, c);
    assert_eq!(next(&k, a), None);
    k.check_integrity();
}

#[test]
fn self_loop_is_degenerate() {
    let mut k = Kernel::new();
    let f = k.new_face();
    let e = k.new_edge();
    k.connect_edges(e, e);

    assert_eq!(k.set_face(f, e), Err(Error::DegenerateLoop { edge: e }));
    assert_eq!(k.get(e).face.into_option(), Some(f));
    assert_eq!(k.get(f).root_edge.into_option(), Some(e));

    let l = k.edge_loop(e);
    assert!(!l.closed);
    assert_eq!(l.len(), 1);
}

#[test]
fn open_loop_assigns_face() {
    let mut k = Kernel::new();
    let [p0, p1, p2] = three_points(&mut k);
    let f = k.new_face();
    let e0 = k.make_edge_pair(p0, p1, None);
    let e1 = k.extend_edge_pair(e0, p2, None);

    assert_eq!(k.set_face(f, e0), Ok(2));
    assert_eq!(k.get(e1).face.into_option(), Some(f));
    assert!(k.get(f).triangles.is_empty());
}

#[test]
fn quads_are_not_triangulated() {
    let mut k = Kernel::new();
    let [p0, p1, p2] = three_points(&mut k);
    let p3 = k.new_point(pos(1.0, 1.0, 0.0));
    let f = k.new_face();

    let e0 = k.make_edge_pair(p0, p1, None);
    let e1 = k.extend_edge_pair(e0, p3, None);
    let e2 = k.extend_edge_pair(e1, p2, None);
    k.close_edge_pair(e2, e0, None);

    assert_eq!(k.set_face(f, e0), Ok(4));
    assert!(k.get(f).triangles.is_empty());
    match k.triangulate_face(f) {
        Err(Error::Unimplemented(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}


// ===== Removal ================================================================================

#[test]
fn remove_edge_cascades() {
    let mut k = Kernel::new();
    let points = three_points(&mut k);
    let (f, [e0, e1, e2]) = triangle(&mut k, points);
    let twin = k.get(e0).adjacent.into_option().unwrap();
    let v = k.get(e0).vertex.into_option().unwrap();

    assert!(k.remove(e0));
    assert!(!k.is_valid_handle(e0));
    assert!(!k.is_valid_handle(twin));
    assert!(!k.is_valid_handle(v));
    assert_eq!(k.num_edges(), 4);
    assert_eq!(k.num_vertices(), 4);

    assert_eq!(k.get(f).root_edge.into_option(), Some(e1));
    assert!(k.get(f).triangles.is_empty());
    assert_eq!(prev(&k, e1), None);
    assert_eq!(next(&k, e2), None);
    assert!(!k.get(points[0]).vertices.contains(&v));
    k.check_integrity();

    assert!(!k.remove(twin));
}

#[test]
fn removing_all_edges_keeps_face_by_default() {
    let mut k = Kernel::new();
    let points = three_points(&mut k);
    let (f, edges) = triangle(&mut k, points);

    for &e in &edges {
        k.remove_edge(e);
    }
    assert_eq!(k.num_edges(), 0);
    assert_eq!(k.num_vertices(), 0);
    assert_eq!(k.num_faces(), 1);
    assert!(k.get(f).root_edge.is_none());
    k.check_integrity();
}

#[test]
fn removing_all_edges_prunes_face() {
    let mut k = MeshKernel::<PruneEmptyFaces>::new();
    let points = three_points(&mut k);
    let (f, [e0, e1, e2]) = triangle(&mut k, points);

    k.remove_edge(e0);
    k.remove_edge(e1);
    assert!(k.is_valid_handle(f));
    k.remove_edge(e2);
    assert!(!k.is_valid_handle(f));
    assert_eq!(k.num_faces(), 0);
    k.check_integrity();
}

/// Builds a quad and removes two opposite sides, leaving `e1` and `e3`
/// on the face without any link between them.
fn broken_quad<C: Config>(k: &mut MeshKernel<C>) -> (FaceHandle, [EdgeHandle; 4]) {
    let [p0, p1, p2] = three_points(k);
    let p3 = k.new_point(pos(0.0, 1.0, 1.0));
    let f = k.new_face();
    let e0 = k.make_edge_pair(p0, p1, Some(f));
    let e1 = k.extend_edge_pair(e0, p2, Some(f));
    let e2 = k.extend_edge_pair(e1, p3, Some(f));
    let e3 = k.close_edge_pair(e2, e0, Some(f));
    assert_eq!(k.set_face(f, e0), Ok(4));

    k.remove_edge(e0);
    k.remove_edge(e2);
    assert_eq!(k.get(f).root_edge.into_option(), Some(e1));
    (f, [e0, e1, e2, e3])
}

#[test]
fn root_moves_to_unlinked_edge_of_face() {
    let mut k = Kernel::new();
    let (f, [_, e1, _, e3]) = broken_quad(&mut k);

    k.remove_edge(e1);
    assert_eq!(k.get(f).root_edge.into_option(), Some(e3));
    assert_eq!(k.get(e3).face.into_option(), Some(f));
    k.check_integrity();

    k.remove_edge(e3);
    assert!(k.is_valid_handle(f));
    assert!(k.get(f).root_edge.is_none());
    k.check_integrity();
}

#[test]
fn face_with_unlinked_edge_is_not_pruned() {
    let mut k = MeshKernel::<PruneEmptyFaces>::new();
    let (f, [_, e1, _, e3]) = broken_quad(&mut k);

    k.remove_edge(e1);
    assert!(k.is_valid_handle(e3));
    assert!(k.is_valid_handle(f));
    assert_eq!(k.get(f).root_edge.into_option(), Some(e3));
    k.check_integrity();

    k.remove_edge(e3);
    assert!(!k.is_valid_handle(f));
    assert_eq!(k.num_faces(), 0);
    k.check_integrity();
}

#[test]
fn remove_face_keeps_edges() {
    let mut k = Kernel::new();
    let points = three_points(&mut k);
    let (f, edges) = triangle(&mut k, points);

    assert!(k.remove(f));
    assert_eq!(k.num_edges(), 6);
    for &e in &edges {
        assert!(k.get(e).face.is_none());
    }
    k.check_integrity();
}

#[test]
fn remove_face_without_root() {
    let mut k = Kernel::new();
    let [p0, p1, _] = three_points(&mut k);
    let f = k.new_face();
    let e = k.make_edge_pair(p0, p1, Some(f));

    // The edge is tagged, but the face has no loop to walk.
    assert!(k.remove(f));
    assert!(k.get(e).face.is_none());
    k.check_integrity();
}


// ===== Compaction =============================================================================

#[test]
fn defrag_with_gaps() {
    let mut k = Kernel::new();

    let p = [
        k.new_point(pos(-0.5, 0.0, 0.0)),
        k.new_point(pos(0.0, 1.0, 0.0)),
        k.new_point(pos(1.0, 1.0, 0.0)),
        k.new_point(pos(0.0, 1.0, 0.0)),
        k.new_point(pos(0.5, 0.0, 0.0)),
    ];
    k.remove(p[1]);
    k.remove(p[3]);
    assert_eq!([p[0].idx(), p[2].idx(), p[4].idx()], [0, 2, 4]);

    let f = [k.new_face(), k.new_face(), k.new_face()];
    k.remove(f[0]);
    k.remove(f[1]);
    let face = f[2];
    assert_eq!(face.idx(), 2);

    let none = PointHandle::invalid();
    let e = (0..5)
        .map(|_| k.make_edge_pair(none, none, Some(face)))
        .collect::<Vec<_>>();
    k.remove(e[1]);
    k.remove(e[2]);
    let (e0, e1, e2) = (e[0], e[3], e[4]);
    assert_eq!([e0.idx(), e1.idx(), e2.idx()], [0, 6, 8]);

    k.get_mut(face).root_edge = Opt::some(e0);
    k.connect_edges_at(e0, p[2], e1);
    k.connect_edges_at(e1, p[4], e2);
    k.connect_edges_at(e2, p[0], e0);

    assert_eq!(k.num_points(), 3);
    assert_eq!(k.num_edges(), 6);
    assert_eq!(k.num_faces(), 1);
    assert_eq!(k.num_vertices(), 3);

    let remap = k.defrag();

    for &h in &[p[0], p[2], p[4]] {
        assert!(!k.is_valid_handle(h));
    }
    assert!(!k.is_valid_handle(face));
    for &h in &[e0, e1, e2] {
        assert!(!k.is_valid_handle(h));
    }

    // Handles ignoring the generation are valid at the new dense indices.
    for i in 0..3 {
        assert!(k.is_valid_handle(PointHandle::from_idx(i)));
    }
    assert_eq!(k.get(PointHandle::from_idx(2)).position, pos(0.5, 0.0, 0.0));
    assert_eq!(remap.points.get(p[4]), Some(PointHandle::new(2, 2)));

    let new_e0 = EdgeHandle::new(0, 2);
    let new_e1 = EdgeHandle::new(2, 2);
    assert_eq!(remap.edges.get(e0), Some(new_e0));
    assert_eq!(remap.edges.get(e1), Some(new_e1));
    assert_eq!(remap.edges.get(e[1]), None);

    let next = k.get(new_e0).next.into_option().unwrap();
    assert_eq!(next.generation(), 2);
    assert_eq!(next, new_e1);
    assert_eq!(k.get(new_e1).prev.into_option(), Some(new_e0));

    let new_face = FaceHandle::new(0, 2);
    assert_eq!(remap.faces.get(face), Some(new_face));
    assert_eq!(k.get(new_face).root_edge.into_option(), Some(new_e0));
    assert_eq!(k.get(new_e0).face.into_option(), Some(new_face));

    assert_eq!(k.num_points(), 3);
    assert_eq!(k.num_edges(), 6);
    assert_eq!(k.num_faces(), 1);
    assert_eq!(k.num_vertices(), 3);
    k.check_integrity();
}

#[test]
fn defrag_rewrites_every_reference() {
    let mut k = Kernel::new();
    let junk = k.new_point(pos(9.0, 9.0, 9.0));
    let points = three_points(&mut k);
    let (first, _) = triangle(&mut k, points);
    let p3 = k.new_point(pos(1.0, 1.0, 0.0));
    let (second, [s0, _, _]) = triangle(&mut k, [points[1], p3, points[2]]);

    k.remove(junk);
    k.remove(first);
    k.remove(s0);

    let before = (k.num_points(), k.num_vertices(), k.num_edges(), k.num_faces());
    let remap = k.defrag();
    let after = (k.num_points(), k.num_vertices(), k.num_edges(), k.num_faces());
    assert_eq!(before, after);

    for e in k.edge_handles().collect::<Vec<_>>() {
        let edge = k.get(e);
        for &h in &[edge.next, edge.prev, edge.adjacent] {
            if let Some(h) = h.into_option() {
                assert!(k.is_valid_handle(h));
            }
        }
        if let Some(v) = edge.vertex.into_option() {
            assert!(k.is_valid_handle(v));
        }
    }
    for p in k.point_handles() {
        for &v in &k.get(p).vertices {
            assert!(k.is_valid_handle(v));
        }
    }

    let second = remap.faces.get(second).unwrap();
    assert_eq!(second.idx(), 0);
    assert!(k.get(second).root_edge.is_some());
    k.check_integrity();
}

#[test]
fn defrag_keeps_triangles() {
    let mut k = Kernel::new();
    let junk = k.new_vertex();
    let points = three_points(&mut k);
    let (f, _) = triangle(&mut k, points);
    let old = k.get(f).triangles[0];
    k.remove(junk);

    let remap = k.defrag();
    let f = remap.faces.get(f).unwrap();
    let tri = k.get(f).triangles[0];
    assert_eq!(tri.v0, remap.vertices.get(old.v0).unwrap());
    assert_eq!(tri.v1, remap.vertices.get(old.v1).unwrap());
    assert_eq!(tri.v2, remap.vertices.get(old.v2).unwrap());
    assert_eq!(tri.v0.idx(), old.v0.idx() - 1);
    k.check_integrity();
}
