//! Round-trip tests: encode then decode must reproduce every array bit-for-bit

use bakge_bmf::{
    FsStorage, MemoryStorage, MeshData, MeshFile, MeshView, encode, encode_to_writer, file_size,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::io::Cursor;
use tempfile::tempdir;

fn random_mesh(rng: &mut Pcg64, vertex_count: usize, index_count: usize) -> MeshData {
    let mut floats = |n: usize| -> Vec<f32> {
        (0..n).map(|_| rng.random_range(-1000.0f32..1000.0)).collect()
    };
    let positions = floats(vertex_count * 3);
    let normals = floats(vertex_count * 3);
    let tex_coords = floats(vertex_count * 2);
    let indices = (0..index_count)
        .map(|_| rng.random_range(0..vertex_count.max(1) as u32))
        .collect();
    MeshData {
        positions,
        normals,
        tex_coords,
        indices,
    }
}

fn bits(values: &[f32]) -> Vec<u32> {
    values.iter().map(|v| v.to_bits()).collect()
}

fn assert_bit_identical(a: &MeshData, b: &MeshData) {
    assert_eq!(bits(&a.positions), bits(&b.positions));
    assert_eq!(bits(&a.normals), bits(&b.normals));
    assert_eq!(bits(&a.tex_coords), bits(&b.tex_coords));
    assert_eq!(a.indices, b.indices);
}

#[test]
fn test_random_meshes_roundtrip() {
    let mut rng = Pcg64::seed_from_u64(0xBA6E);
    let storage = MemoryStorage::new();

    for round in 0..50 {
        let vertex_count = rng.random_range(0..200);
        let index_count = rng.random_range(0..300);
        let mesh = random_mesh(&mut rng, vertex_count, index_count);

        let path = format!("mesh_{round}.bmf");
        mesh.save(&storage, &path).unwrap();

        let bytes = storage.get(&path).unwrap();
        assert_eq!(
            bytes.len() as u64,
            file_size(vertex_count as u32, index_count as u32)
        );

        let loaded = MeshData::load(&storage, &path).unwrap();
        assert_bit_identical(&mesh, &loaded);
    }
}

#[test]
fn test_special_float_values_preserved() {
    let positions = [
        f32::MIN_POSITIVE,
        -0.0,
        f32::MAX,
        f32::MIN,
        f32::EPSILON,
        1.0e-40, // subnormal
    ];
    let normals = [0.0, -0.0, 1.0, -1.0, 0.5, -0.5];
    let tex_coords = [0.25, 0.75, 1.0e-30, 3.0e30];
    let mesh = MeshView {
        vertex_count: 2,
        positions: &positions,
        normals: &normals,
        tex_coords: &tex_coords,
        index_count: 0,
        indices: &[],
    };

    let mut bytes = Vec::new();
    encode_to_writer(&mut bytes, &mesh).unwrap();

    let mut file = MeshFile::from_stream(Cursor::new(bytes)).unwrap();
    let decoded = MeshData::read_from(&mut file).unwrap();
    assert_eq!(bits(&decoded.positions), bits(&positions));
    assert_eq!(bits(&decoded.normals), bits(&normals));
    assert_eq!(bits(&decoded.tex_coords), bits(&tex_coords));
    assert!(decoded.indices.is_empty());
}

#[test]
fn test_single_triangle_buffer() {
    let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let tex_coords = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices = [0, 1, 2];
    let mesh = MeshView {
        vertex_count: 3,
        positions: &positions,
        normals: &normals,
        tex_coords: &tex_coords,
        index_count: 3,
        indices: &indices,
    };

    let mut bytes = Vec::new();
    encode_to_writer(&mut bytes, &mesh).unwrap();
    assert_eq!(bytes.len(), 44 + 32 * 3 + 4 * 3);

    let mut file = MeshFile::from_stream(Cursor::new(bytes)).unwrap();
    assert_eq!(file.vertex_count(), 3);
    assert_eq!(file.index_count(), 3);

    let mut decoded = vec![0.0; 9];
    file.read_positions(&mut decoded).unwrap();
    assert_eq!(decoded, positions);
    file.close().unwrap();
}

#[test]
fn test_filesystem_roundtrip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let storage = FsStorage::with_root(dir.path());
    let mut rng = Pcg64::seed_from_u64(7);
    let mesh = random_mesh(&mut rng, 64, 96);

    encode(&storage, "cube.bmf", &mesh.as_view()).unwrap();
    assert!(dir.path().join("cube.bmf").exists());

    let loaded = MeshData::load(&storage, "cube.bmf").unwrap();
    assert_bit_identical(&mesh, &loaded);
}

#[test]
fn test_overwrite_replaces_file() {
    let storage = MemoryStorage::new();
    let mut rng = Pcg64::seed_from_u64(11);

    random_mesh(&mut rng, 100, 300)
        .save(&storage, "mesh.bmf")
        .unwrap();
    let small = random_mesh(&mut rng, 3, 3);
    small.save(&storage, "mesh.bmf").unwrap();

    assert_eq!(storage.get("mesh.bmf").unwrap().len(), 152);
    let loaded = MeshData::load(&storage, "mesh.bmf").unwrap();
    assert_bit_identical(&small, &loaded);
}
