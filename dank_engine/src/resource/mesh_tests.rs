//! Unit tests for mesh.rs
//!
//! Tests the built-in mesh sources, the library counter and the bake/rebase logic.

use super::*;

struct BrokenMesh;

impl Mesh for BrokenMesh {
    fn data(&self) -> MeshData {
        MeshData {
            vertices: vec![Vertex::new([0.0; 3], [0.0; 3], [0.0; 2])],
            indices: vec![0, 5],
        }
    }
}

struct FanMesh(u32);

impl Mesh for FanMesh {
    fn data(&self) -> MeshData {
        let vertices = (0..self.0)
            .map(|i| Vertex::new([i as f32, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]))
            .collect();
        let indices = (1..self.0.saturating_sub(1))
            .flat_map(|i| [0, i, i + 1])
            .collect();
        MeshData { vertices, indices }
    }
}

// ============================================================================
// BUILT-IN MESHES
// ============================================================================

#[test]
fn test_triangle_data() {
    let data = TriangleMesh.data();
    assert_eq!(data.vertices.len(), 3);
    assert_eq!(data.indices, vec![0, 1, 2]);
}

#[test]
fn test_rectangle_data() {
    let data = RectangleMesh.data();
    assert_eq!(data.vertices.len(), 4);
    assert_eq!(data.indices, vec![0, 1, 2, 2, 3, 0]);
}

#[test]
fn test_sprite_uvs_from_region() {
    let sprite = SpriteMesh::new(256, 128, TextureRegion::new(64.0, 32.0, 64.0, 32.0));
    let data = sprite.data();

    assert_eq!(data.vertices[0].uv, [0.25, 0.5]);
    assert_eq!(data.vertices[2].uv, [0.5, 0.25]);
    assert_eq!(data.vertices[1].position, [32.0, -16.0, 0.0]);
    assert_eq!(data.indices, vec![0, 1, 2, 2, 3, 0]);
}

#[test]
fn test_sprite_scale() {
    let mut region = TextureRegion::new(0.0, 0.0, 10.0, 20.0);
    region.scale = 2.0;
    let data = SpriteMesh::new(10, 20, region).data();
    assert_eq!(data.vertices[2].position, [10.0, 20.0, 0.0]);
}

#[test]
fn test_vertex_layout_size() {
    assert_eq!(std::mem::size_of::<Vertex>(), 32);
}

// ============================================================================
// LIBRARY COUNTER
// ============================================================================

#[test]
fn test_new_library_is_empty() {
    let library = MeshLibrary::new();
    assert!(library.is_empty());
    assert_eq!(library.last_modified(), 0);
}

#[test]
fn test_every_mutation_bumps_counter() {
    let mut library = MeshLibrary::new();
    let mut last = library.last_modified();

    library.add(MeshId(1), TriangleMesh);
    assert!(library.last_modified() > last);
    last = library.last_modified();

    library.add(MeshId(1), RectangleMesh);
    assert!(library.last_modified() > last);
    last = library.last_modified();

    assert!(library.remove(MeshId(1)));
    assert!(library.last_modified() > last);
    last = library.last_modified();

    library.clear();
    assert!(library.last_modified() > last);
}

#[test]
fn test_remove_missing_keeps_counter() {
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);
    let before = library.last_modified();
    assert!(!library.remove(MeshId(9)));
    assert_eq!(library.last_modified(), before);
}

#[test]
fn test_insert_uses_next_id() {
    let mut library = MeshLibrary::new();
    assert_eq!(library.insert(TriangleMesh), MeshId(1));
    library.add(MeshId(10), RectangleMesh);
    assert_eq!(library.insert(TriangleMesh), MeshId(11));
    assert_eq!(library.len(), 3);
}

// ============================================================================
// BAKE
// ============================================================================

#[test]
fn test_bake_triangle_then_rectangle() {
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);
    library.add(MeshId(2), RectangleMesh);

    let baked = library.bake();

    assert_eq!(baked.vertices.len(), 7);
    assert_eq!(baked.indices, vec![0, 1, 2, 3, 4, 5, 5, 6, 3]);

    let rect = baked.descriptors[&MeshId(2)];
    assert_eq!(rect.vertex_offset, 3);
    assert_eq!(rect.vertex_count, 4);
    assert_eq!(rect.index_offset, 3);
    assert_eq!(rect.index_count, 6);
}

#[test]
fn test_bake_follows_id_order_not_insertion_order() {
    let mut library = MeshLibrary::new();
    library.add(MeshId(5), RectangleMesh);
    library.add(MeshId(2), TriangleMesh);

    let baked = library.bake();
    assert_eq!(baked.indices, vec![0, 1, 2, 3, 4, 5, 5, 6, 3]);
    assert_eq!(baked.descriptors[&MeshId(5)].vertex_offset, 3);
}

#[test]
fn test_bake_offsets_increase_without_overlap() {
    let mut library = MeshLibrary::new();
    for i in 0..6 {
        library.insert(FanMesh(3 + i));
    }
    let baked = library.bake();

    let descriptors: Vec<_> = baked.descriptors.values().collect();
    for pair in descriptors.windows(2) {
        assert_eq!(pair[1].vertex_offset, pair[0].vertex_offset + pair[0].vertex_count);
        assert_eq!(pair[1].index_offset, pair[0].index_offset + pair[0].index_count);
        assert!(pair[1].vertex_offset > pair[0].vertex_offset);
    }
}

#[test]
fn test_bake_indices_stay_in_range_for_many_adds() {
    let mut library = MeshLibrary::new();
    for n in [3, 4, 9, 3, 17, 5] {
        library.insert(FanMesh(n));
        library.insert(RectangleMesh);

        let baked = library.bake();
        let vertex_count = baked.vertices.len() as u32;
        assert!(baked.indices.iter().all(|&i| i < vertex_count));
    }
}

#[test]
fn test_bake_skips_mesh_with_out_of_range_index() {
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), TriangleMesh);
    library.add(MeshId(2), BrokenMesh);
    library.add(MeshId(3), TriangleMesh);

    let baked = library.bake();
    assert!(!baked.descriptors.contains_key(&MeshId(2)));
    assert_eq!(baked.indices, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_bake_empty_library() {
    let baked = MeshLibrary::new().bake();
    assert!(baked.is_empty());
    assert!(baked.vertex_bytes().is_empty());
    assert!(baked.index_bytes().is_empty());
}

#[test]
fn test_baked_byte_lengths() {
    let mut library = MeshLibrary::new();
    library.add(MeshId(1), RectangleMesh);
    let baked = library.bake();
    assert_eq!(baked.vertex_bytes().len(), 4 * 32);
    assert_eq!(baked.index_bytes().len(), 6 * 4);
}
