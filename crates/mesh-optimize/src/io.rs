//! Mesh file I/O for STL, OBJ and GLB.
//!
//! Every loader flattens its input into a single [`Mesh`] and validates it
//! before returning, so malformed geometry never reaches the pipeline.

use std::borrow::Cow;
use std::io::{BufReader, Cursor, Write};
use std::path::Path;

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::{Mesh, Vertex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    Stl,
    Obj,
    #[default]
    Glb,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse a bare extension such as `"stl"` (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "stl" => Some(MeshFormat::Stl),
            "obj" => Some(MeshFormat::Obj),
            "glb" => Some(MeshFormat::Glb),
            _ => None,
        }
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Obj => "obj",
            MeshFormat::Glb => "glb",
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

fn unsupported(path: &Path) -> MeshError {
    MeshError::UnsupportedFormat {
        extension: path.extension().and_then(|e| e.to_str()).map(String::from),
    }
}

/// Load a mesh from file, auto-detecting format from extension.
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;

    info!("Loading mesh from {:?} (format: {:?})", path, format);

    let bytes = std::fs::read(path).map_err(|e| MeshError::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode(&bytes, format, path)
}

/// Decode an in-memory payload of a known format.
pub fn load_mesh_from_bytes(bytes: &[u8], format: MeshFormat) -> MeshResult<Mesh> {
    let origin = format!("<{} payload>", format);
    decode(bytes, format, Path::new(&origin))
}

fn decode(bytes: &[u8], format: MeshFormat, origin: &Path) -> MeshResult<Mesh> {
    let mesh = match format {
        MeshFormat::Stl => decode_stl(bytes, origin)?,
        MeshFormat::Obj => decode_obj(bytes, origin)?,
        MeshFormat::Glb => decode_glb(bytes, origin)?,
    };

    if let Some((min, max)) = mesh.bounds() {
        let dims = max - min;
        info!(
            "Loaded mesh: {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        );
        debug!(
            "Dimensions: {:.1} x {:.1} x {:.1}",
            dims.x, dims.y, dims.z
        );
    }

    mesh.check_geometry()?;
    Ok(mesh)
}

/// Decode binary or ASCII STL.
fn decode_stl(bytes: &[u8], origin: &Path) -> MeshResult<Mesh> {
    let mut reader = Cursor::new(bytes);

    // stl_io merges identical positions into an indexed mesh
    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| MeshError::parse_error(origin, e.to_string()))?;

    debug!(
        "STL contains {} vertices, {} triangles",
        stl.vertices.len(),
        stl.faces.len()
    );

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.vertices.push(Vertex::from_coords(
            v.0[0] as f64,
            v.0[1] as f64,
            v.0[2] as f64,
        ));
    }
    for face in &stl.faces {
        mesh.faces.push([
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        ]);
    }

    Ok(mesh)
}

/// Decode OBJ, concatenating every model. Materials are ignored.
fn decode_obj(bytes: &[u8], origin: &Path) -> MeshResult<Mesh> {
    let mut reader = BufReader::new(bytes);
    let (models, _materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .map_err(|e| MeshError::parse_error(origin, e.to_string()))?;

    if models.is_empty() {
        return Err(MeshError::empty_mesh("OBJ file contains no models"));
    }

    let parts: Vec<Mesh> = models
        .iter()
        .map(|model| {
            debug!("OBJ model '{}': loading", model.name);
            let obj_mesh = &model.mesh;
            Ok(Mesh {
                vertices: obj_mesh
                    .positions
                    .chunks_exact(3)
                    .map(|c| Vertex::from_coords(c[0] as f64, c[1] as f64, c[2] as f64))
                    .collect(),
                faces: triangles_from_indices(&obj_mesh.indices, false, origin)?,
            })
        })
        .collect::<MeshResult<_>>()?;

    debug!("OBJ loaded {} models", parts.len());
    Ok(Mesh::concatenate(&parts))
}

/// Decode GLB: every triangle primitive of every node in the scene, with node
/// transforms applied, flattened into one mesh.
fn decode_glb(bytes: &[u8], origin: &Path) -> MeshResult<Mesh> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| MeshError::parse_error(origin, e.to_string()))?;

    let mut parts = Vec::new();
    let scenes: Vec<gltf::Scene> = match document.default_scene() {
        Some(scene) => vec![scene],
        None => document.scenes().collect(),
    };

    if scenes.is_empty() {
        // A document without scenes still carries meshes
        for mesh in document.meshes() {
            collect_primitives(&mesh, &Matrix4::identity(), &buffers, origin, &mut parts)?;
        }
    } else {
        for scene in &scenes {
            for node in scene.nodes() {
                collect_node(&node, &Matrix4::identity(), &buffers, origin, &mut parts)?;
            }
        }
    }

    let mesh = Mesh::concatenate(&parts);
    if mesh.is_empty() {
        return Err(MeshError::empty_mesh("No mesh geometry found"));
    }

    debug!("GLB flattened {} primitives", parts.len());
    Ok(mesh)
}

fn collect_node(
    node: &gltf::Node,
    parent: &Matrix4<f64>,
    buffers: &[gltf::buffer::Data],
    origin: &Path,
    parts: &mut Vec<Mesh>,
) -> MeshResult<()> {
    let local: Matrix4<f64> = Matrix4::from(node.transform().matrix()).cast::<f64>();
    let world = parent * local;

    if let Some(mesh) = node.mesh() {
        collect_primitives(&mesh, &world, buffers, origin, parts)?;
    }
    for child in node.children() {
        collect_node(&child, &world, buffers, origin, parts)?;
    }
    Ok(())
}

fn collect_primitives(
    mesh: &gltf::Mesh,
    transform: &Matrix4<f64>,
    buffers: &[gltf::buffer::Data],
    origin: &Path,
    parts: &mut Vec<Mesh>,
) -> MeshResult<()> {
    // Mirroring transforms reverse the winding
    let mirrored = transform.determinant() < 0.0;

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!(
                "Skipping non-triangle primitive ({:?}) in mesh {}",
                primitive.mode(),
                mesh.index()
            );
            continue;
        }

        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let Some(positions) = reader.read_positions() else {
            return Err(MeshError::parse_error(
                origin,
                format!("primitive in mesh {} has no POSITION attribute", mesh.index()),
            ));
        };

        let vertices: Vec<Vertex> = positions
            .map(|[x, y, z]| {
                let p = Point3::new(x as f64, y as f64, z as f64);
                Vertex::new(transform.transform_point(&p))
            })
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let faces = triangles_from_indices(&indices, mirrored, origin)?;
        parts.push(Mesh { vertices, faces });
    }
    Ok(())
}

/// Group a flat index list into triangles. A trailing partial triangle means
/// the file is malformed.
fn triangles_from_indices(
    indices: &[u32],
    reversed: bool,
    origin: &Path,
) -> MeshResult<Vec<[u32; 3]>> {
    if indices.len() % 3 != 0 {
        return Err(MeshError::parse_error(
            origin,
            format!(
                "index count {} is not a multiple of 3 ({} trailing)",
                indices.len(),
                indices.len() % 3
            ),
        ));
    }

    Ok(indices
        .chunks_exact(3)
        .map(|c| {
            if reversed {
                [c[0], c[2], c[1]]
            } else {
                [c[0], c[1], c[2]]
            }
        })
        .collect())
}

/// Save mesh to file, choosing the format from the extension.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let format = MeshFormat::from_path(path).ok_or_else(|| unsupported(path))?;
    save_mesh_as(mesh, path, format)
}

/// Save mesh to file in an explicit format.
pub fn save_mesh_as(mesh: &Mesh, path: &Path, format: MeshFormat) -> MeshResult<()> {
    info!("Saving mesh to {:?} ({})", path, format);

    let bytes = encode(mesh, format, path)?;
    let mut file = std::fs::File::create(path).map_err(|e| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(&bytes).map_err(|e| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("Saved {} triangles to {:?}", mesh.face_count(), path);
    Ok(())
}

/// Encode a mesh into an in-memory payload.
pub fn encode_mesh(mesh: &Mesh, format: MeshFormat) -> MeshResult<Vec<u8>> {
    let origin = format!("<{} payload>", format);
    encode(mesh, format, Path::new(&origin))
}

fn encode(mesh: &Mesh, format: MeshFormat, target: &Path) -> MeshResult<Vec<u8>> {
    mesh.check_geometry()?;
    match format {
        MeshFormat::Stl => encode_stl(mesh, target),
        MeshFormat::Obj => Ok(encode_obj(mesh)),
        MeshFormat::Glb => encode_glb(mesh, target),
    }
}

/// Binary STL with per-face normals.
fn encode_stl(mesh: &Mesh, target: &Path) -> MeshResult<Vec<u8>> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| {
            let n = tri.normal().unwrap_or_else(nalgebra::Vector3::zeros);
            let vertex = |p: Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(tri.v0), vertex(tri.v1), vertex(tri.v2)],
            }
        })
        .collect();

    let mut out = Vec::with_capacity(84 + 50 * triangles.len());
    stl_io::write_stl(&mut out, triangles.iter()).map_err(|e| MeshError::IoWrite {
        path: target.to_path_buf(),
        source: e,
    })?;
    Ok(out)
}

/// ASCII OBJ with positions and faces only.
fn encode_obj(mesh: &Mesh) -> Vec<u8> {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(32 * (mesh.vertex_count() + mesh.face_count()));
    // Writing into a String cannot fail
    let _ = writeln!(out, "# Vertices: {}", mesh.vertex_count());
    let _ = writeln!(out, "# Faces: {}", mesh.face_count());
    for v in &mesh.vertices {
        let p = v.position;
        let _ = writeln!(out, "v {:.6} {:.6} {:.6}", p.x, p.y, p.z);
    }
    for [a, b, c] in &mesh.faces {
        let _ = writeln!(out, "f {} {} {}", a + 1, b + 1, c + 1);
    }
    out.into_bytes()
}

/// glTF 2.0 binary with one node, one triangle primitive, f32 positions and
/// u32 indices.
fn encode_glb(mesh: &Mesh, target: &Path) -> MeshResult<Vec<u8>> {
    use gltf::json;
    use json::validation::Checked::Valid;
    use json::validation::USize64;

    let write_error = |source: std::io::Error| MeshError::IoWrite {
        path: target.to_path_buf(),
        source,
    };

    let positions: Vec<[f32; 3]> = mesh
        .vertices
        .iter()
        .map(|v| {
            let p = v.position;
            [p.x as f32, p.y as f32, p.z as f32]
        })
        .collect();

    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for p in &positions {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }

    let mut bin: Vec<u8> = Vec::with_capacity(12 * positions.len() + 12 * mesh.face_count());
    for p in &positions {
        for c in p {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    let positions_len = bin.len();
    for face in &mesh.faces {
        for i in face {
            bin.extend_from_slice(&i.to_le_bytes());
        }
    }
    let indices_len = bin.len() - positions_len;

    let mut root = json::Root::default();
    root.asset.generator = Some(format!("mesh-optimize {}", env!("CARGO_PKG_VERSION")));

    let buffer = root.push(json::Buffer {
        byte_length: USize64::from(bin.len()),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    });
    let view = |offset: usize, length: usize, kind: json::buffer::Target| json::buffer::View {
        buffer,
        byte_length: USize64::from(length),
        byte_offset: Some(USize64::from(offset)),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(kind)),
    };
    let position_view = root.push(view(0, positions_len, json::buffer::Target::ArrayBuffer));
    let index_view = root.push(view(
        positions_len,
        indices_len,
        json::buffer::Target::ElementArrayBuffer,
    ));

    let position_accessor = root.push(json::Accessor {
        buffer_view: Some(position_view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(positions.len()),
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::F32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Vec3),
        min: Some(json::Value::from(Vec::from(min))),
        max: Some(json::Value::from(Vec::from(max))),
        name: None,
        normalized: false,
        sparse: None,
    });
    let index_accessor = root.push(json::Accessor {
        buffer_view: Some(index_view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(mesh.face_count() * 3),
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::U32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Scalar),
        min: None,
        max: None,
        name: None,
        normalized: false,
        sparse: None,
    });

    let primitive = json::mesh::Primitive {
        attributes: [(Valid(json::mesh::Semantic::Positions), position_accessor)]
            .into_iter()
            .collect(),
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(index_accessor),
        material: None,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    };
    let gltf_mesh = root.push(json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        primitives: vec![primitive],
        weights: None,
    });
    let node = root.push(json::Node {
        mesh: Some(gltf_mesh),
        ..Default::default()
    });
    let scene = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        nodes: vec![node],
    });
    root.scene = Some(scene);

    let json_bytes =
        json::serialize::to_vec(&root).map_err(|e| write_error(std::io::Error::other(e)))?;

    // The writer pads both chunks and computes the final length itself
    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: 0,
        },
        json: Cow::Owned(json_bytes),
        bin: Some(Cow::Owned(bin)),
    };
    glb.to_vec()
        .map_err(|e| write_error(std::io::Error::other(e.to_string())))
}
