//! Map loading and scene import.
//!
//! Two stages:
//!
//! 1. [`load_map`] validates the archive, runs the decoder and persists the
//!    decoded documents next to the output models, producing a [`LoadedMap`].
//! 2. [`Importer`] walks a loaded map depth-first, classifies every node and
//!    builds the hierarchy in a [`SceneGraph`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bm_math::scene_root_correction;
use serde_json::Value;
use thiserror::Error;

use crate::archive::{map_name, ArchiveError, ArchiveSections, SectionKind};
use crate::config::{ImportConfig, ImportSettings};
use crate::decoder::{
    extract_json_object, DecodeError, Decoder, MATERIAL_FILE, SCENE_FILE, TEXTURE_FILE,
};
use crate::exclusion::{classify, is_dynamic_container, Verdict};
use crate::graph::{GraphError, ObjectId, SceneGraph};
use crate::material::MaterialLibrary;
use crate::progress::ProgressScope;
use crate::scene::{SceneDocument, SceneNode};
use crate::session::ImportSession;

/// Errors that can occur while loading or importing a map.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Decoder error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Scene graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scene document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The root scene node for map {0} could not be found")]
    RootNotFound(String),

    #[error("Scene node {0} does not exist")]
    UnknownNode(u32),

    #[error("Scene node {0} has no model")]
    NotAModel(u32),

    #[error("Model {0} produced no geometry")]
    EmptyModel(i32),
}

pub type ImportResult<T> = Result<T, ImportError>;

/// A geometry-owning node offered for single-model import.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelEntry {
    /// `"{Parent} / {Name} ({Model Id})"`
    pub label: String,
    pub model_id: i32,
    pub scene_index: u32,
}

/// A decoded map ready for import.
#[derive(Clone, Debug)]
pub struct LoadedMap {
    pub name: String,
    /// `<output>/<name>`; models and textures are written below it
    pub map_dir: PathBuf,
    pub scene: SceneDocument,
    pub materials: MaterialLibrary,
    pub catalogue: Vec<ModelEntry>,
}

impl LoadedMap {
    pub fn new(
        name: impl Into<String>,
        map_dir: impl Into<PathBuf>,
        scene: SceneDocument,
        materials: MaterialLibrary,
    ) -> Self {
        let catalogue = build_catalogue(&scene);
        Self {
            name: name.into(),
            map_dir: map_dir.into(),
            scene,
            materials,
            catalogue,
        }
    }

    /// Reopen a map from the documents a previous [`load_map`] persisted.
    pub fn open_cached<P: AsRef<Path>>(map_dir: P) -> ImportResult<Self> {
        let map_dir = map_dir.as_ref();
        let name = map_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let scene = read_document(&map_dir.join(SCENE_FILE))?;
        let materials = read_document(&map_dir.join(MATERIAL_FILE))?;

        Ok(Self::new(
            name,
            map_dir,
            SceneDocument::from_value(scene)?,
            MaterialLibrary::from_value(&materials),
        ))
    }
}

fn build_catalogue(scene: &SceneDocument) -> Vec<ModelEntry> {
    scene
        .nodes
        .iter()
        .filter(|node| node.owns_meshes())
        .filter_map(|node| {
            let model_id = node.model_id?;
            Some(ModelEntry {
                label: model_label(node, model_id),
                model_id,
                scene_index: node.index,
            })
        })
        .collect()
}

/// `"{Parent} / {Name} ({Model Id})"`
fn model_label(node: &SceneNode, model_id: i32) -> String {
    format!(
        "{} / {} ({})",
        node.parent.as_deref().unwrap_or_default(),
        node.name,
        model_id
    )
}

fn read_document(path: &Path) -> ImportResult<Value> {
    let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn write_document(path: &Path, value: &Value) -> ImportResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate and decode a level archive.
///
/// Nothing is written unless all six sections are present. The decoded
/// documents are stored as `scene.json`, `mat.json` and `tex.json` in
/// `<output>/<map>/`.
pub fn load_map<D: Decoder + ?Sized>(
    decoder: &mut D,
    archive: &Path,
    config: &ImportConfig,
) -> ImportResult<LoadedMap> {
    let sections = ArchiveSections::open(archive)?;
    let name = map_name(archive);
    let map_dir = config.output_root(archive).join(&name);
    load_sections(decoder, &sections, &name, &map_dir)
}

/// Decode already-validated sections of map `name` into `map_dir`.
pub fn load_sections<D: Decoder + ?Sized>(
    decoder: &mut D,
    sections: &ArchiveSections,
    name: &str,
    map_dir: &Path,
) -> ImportResult<LoadedMap> {
    let start = Instant::now();

    let raw = decoder.decode_textures(sections.get(SectionKind::Tex))?;
    let texture_json = extract_json_object(&raw).ok_or(DecodeError::NoJsonObject)?;
    let textures: Value = serde_json::from_str(texture_json).map_err(DecodeError::from)?;

    let decoded = decoder.decode_archive(sections, texture_json)?;

    fs::create_dir_all(map_dir).map_err(|source| ImportError::Io {
        path: map_dir.to_path_buf(),
        source,
    })?;
    write_document(&map_dir.join(SCENE_FILE), &decoded.scene)?;
    write_document(&map_dir.join(MATERIAL_FILE), &decoded.materials)?;
    write_document(&map_dir.join(TEXTURE_FILE), &textures)?;

    let scene = SceneDocument::from_value(decoded.scene)?;
    let materials = MaterialLibrary::from_value(&decoded.materials);
    let map = LoadedMap::new(name, map_dir, scene, materials);

    log::info!(
        "Decoded map {}: {} nodes, {} materials, {} models in {:.2}s",
        map.name,
        map.scene.len(),
        map.materials.len(),
        map.catalogue.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(map)
}

/// Summary of a finished map import.
#[derive(Clone, Debug, Default)]
pub struct ImportReport {
    pub objects: usize,
    pub meshes: usize,
    pub placeholders: usize,
    pub textures: usize,
    pub root: Option<ObjectId>,
    pub elapsed: Duration,
}

/// A pending visit in the depth-first walk.
#[derive(Clone, Copy, Debug)]
struct Visit {
    index: u32,
    parent: Option<ObjectId>,
    meshless: bool,
}

/// Builds a loaded map into a scene graph.
pub struct Importer<D, G> {
    decoder: D,
    graph: G,
    settings: ImportSettings,
}

impl<D: Decoder, G: SceneGraph> Importer<D, G> {
    pub fn new(decoder: D, graph: G, settings: ImportSettings) -> Self {
        Self {
            decoder,
            graph,
            settings,
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }

    pub fn into_graph(self) -> G {
        self.graph
    }

    /// Import every node of `map`, starting from its root.
    pub fn import_map(&mut self, map: &LoadedMap) -> ImportResult<ImportReport> {
        let start = Instant::now();
        let Some(root) = map.scene.root() else {
            log::error!("The root scene node for map {} could not be found", map.name);
            return Err(ImportError::RootNotFound(map.name.clone()));
        };

        let mut session = ImportSession::new(map.scene.len());
        let mut report = ImportReport::default();
        {
            let mut graph = ProgressScope::begin(&mut self.graph);
            let mut walk = Walk {
                decoder: &mut self.decoder,
                graph: &mut *graph,
                settings: &self.settings,
                map,
                session: &mut session,
                report: &mut report,
            };
            walk.run(root.index)?;

            if let Some(root) = session.root {
                graph.set_local_transform(root, scene_root_correction())?;
            }
        }

        report.root = session.root;
        report.textures = session.textures.len();
        report.elapsed = start.elapsed();
        log::info!(
            "Loaded map {} in {:.2} seconds",
            map.name,
            report.elapsed.as_secs_f32()
        );
        Ok(report)
    }

    /// Import the model of a single node with all of its sub-meshes, placed
    /// at the scene origin with the root correction applied. The object is
    /// named after the node's catalogue label.
    pub fn import_model(&mut self, map: &LoadedMap, scene_index: u32) -> ImportResult<ObjectId> {
        let node = map
            .scene
            .get(scene_index)
            .ok_or(ImportError::UnknownNode(scene_index))?;
        let model_id = node
            .model_id
            .filter(|_| node.owns_meshes())
            .ok_or(ImportError::NotAModel(scene_index))?;

        let mut session = ImportSession::new(1);
        let mut report = ImportReport::default();
        let mut walk = Walk {
            decoder: &mut self.decoder,
            graph: &mut self.graph,
            settings: &self.settings,
            map,
            session: &mut session,
            report: &mut report,
        };
        let object = walk
            .materialize(node, &model_label(node, model_id), model_id, &[])?
            .ok_or(ImportError::EmptyModel(model_id))?;

        self.graph
            .set_local_transform(object, scene_root_correction())?;
        Ok(object)
    }
}

/// Borrowed state of one traversal.
struct Walk<'a, D: ?Sized, G: ?Sized> {
    decoder: &'a mut D,
    graph: &'a mut G,
    settings: &'a ImportSettings,
    map: &'a LoadedMap,
    session: &'a mut ImportSession,
    report: &'a mut ImportReport,
}

impl<D: Decoder + ?Sized, G: SceneGraph + ?Sized> Walk<'_, D, G> {
    /// Pre-order depth-first walk from `root`, children in listed order.
    fn run(&mut self, root: u32) -> ImportResult<()> {
        let mut stack = vec![Visit {
            index: root,
            parent: None,
            meshless: false,
        }];

        let map = self.map;
        while let Some(visit) = stack.pop() {
            if self.session.is_visited(visit.index) {
                log::warn!("Scene node {} is listed more than once; skipped", visit.index);
                continue;
            }
            let Some(node) = map.scene.get(visit.index) else {
                log::warn!("Child index {} is outside the scene; skipped", visit.index);
                continue;
            };

            let (object, meshless) = self.visit(node, visit)?;

            for child in node.children().iter().rev() {
                stack.push(Visit {
                    index: child.index,
                    parent: Some(object),
                    meshless,
                });
            }
        }
        Ok(())
    }

    fn visit(&mut self, node: &SceneNode, visit: Visit) -> ImportResult<(ObjectId, bool)> {
        if let Some(percent) = self.session.progress.tick() {
            self.graph.progress_update(percent);
        }

        let name = node.display_name();
        let meshless = visit.meshless || is_dynamic_container(&name, self.settings);

        let materialized = match classify(node, self.settings, meshless) {
            Verdict::Materialize { model_id, excluded } => {
                let object = self.materialize(node, &name, model_id, &excluded)?;
                if object.is_none() {
                    log::warn!("{}: model {} produced no object; using a placeholder", name, model_id);
                }
                object
            }
            Verdict::Placeholder(reason) => {
                log::debug!("{}: placeholder ({})", name, reason);
                None
            }
        };

        let object = match materialized {
            Some(object) => {
                self.report.meshes += 1;
                object
            }
            None => {
                self.report.placeholders += 1;
                self.graph.create_empty(&name)?
            }
        };
        self.report.objects += 1;

        if let Some(parent) = visit.parent {
            self.graph.set_parent(object, parent)?;
        }
        self.graph.set_local_transform(object, node.local_transform())?;
        self.session.record(visit.index, object);

        Ok((object, meshless))
    }

    /// Have the decoder write the node's model and textures, import the OBJ
    /// and apply material blend setups to the kept sub-meshes.
    fn materialize(
        &mut self,
        node: &SceneNode,
        name: &str,
        model_id: i32,
        excluded: &[u32],
    ) -> ImportResult<Option<ObjectId>> {
        let map = self.map;
        let map_dir = &map.map_dir;
        let path = self
            .decoder
            .materialize_model(map_dir, model_id, excluded)?;
        self.session
            .textures
            .emit_pending(self.decoder, map_dir, node.meshes())?;

        let Some(object) = self.graph.import_obj(&path, name)? else {
            return Ok(None);
        };

        for (index, mesh) in node.meshes().iter().enumerate() {
            if excluded.contains(&(index as u32)) {
                continue;
            }
            if let Some(setup) = map.materials.blend_setup(mesh.material_id) {
                self.graph
                    .apply_blend_setup(object, mesh.material_id, &setup)?;
            }
        }
        Ok(Some(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{model_path, DecodeResult, DecodedArchive};
    use crate::graph::{MemoryGraph, ProgressEvent};
    use crate::material::BlendMethod;
    use bm_math::{Mat4, Vec3};
    use serde_json::json;
    use std::io::Write;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bm_import_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Decoder stand-in that serves fixed documents and writes a one-triangle
    /// OBJ per requested model.
    struct MockDecoder {
        scene: Value,
        materials: Value,
        models: Vec<(i32, Vec<u32>)>,
        textures: Vec<i32>,
        empty_models: Vec<i32>,
        texture_output: String,
    }

    impl MockDecoder {
        fn new(scene: Value) -> Self {
            Self {
                scene,
                materials: json!({"Entries": []}),
                models: Vec::new(),
                textures: Vec::new(),
                empty_models: Vec::new(),
                texture_output: "b'{\"1\": \"wall.tga\", \"2\": \"floor.tga\"}'".to_string(),
            }
        }
    }

    impl Decoder for MockDecoder {
        fn decode_textures(&mut self, _tex: &[u8]) -> DecodeResult<String> {
            Ok(self.texture_output.clone())
        }

        fn decode_archive(
            &mut self,
            _sections: &ArchiveSections,
            texture_json: &str,
        ) -> DecodeResult<DecodedArchive> {
            assert!(texture_json.starts_with('{') && texture_json.ends_with('}'));
            Ok(DecodedArchive {
                scene: self.scene.clone(),
                materials: self.materials.clone(),
            })
        }

        fn materialize_model(
            &mut self,
            map_dir: &Path,
            model_id: i32,
            excluded: &[u32],
        ) -> DecodeResult<PathBuf> {
            self.models.push((model_id, excluded.to_vec()));
            let path = model_path(map_dir, model_id);
            fs::create_dir_all(path.parent().unwrap())?;
            let body = if self.empty_models.contains(&model_id) {
                String::new()
            } else {
                format!(
                    "mtllib {model_id}.mtl\no 0\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl 2-glass\nf 1 2 3\n"
                )
            };
            fs::write(&path, body)?;
            fs::write(
                path.with_extension("mtl"),
                "newmtl 2-glass\nmap_Kd Textures/glass.tga\n",
            )?;
            Ok(path)
        }

        fn emit_texture(&mut self, _dir: &Path, _file: &str, texture_id: i32) -> DecodeResult<bool> {
            self.textures.push(texture_id);
            Ok(true)
        }
    }

    fn sections() -> ArchiveSections {
        ArchiveSections::from_entries(
            ["m.BUF", "m.GMS", "m.MAT", "m.PRM", "m.PRP", "m.TEX"]
                .into_iter()
                .map(|name| (name, Vec::new())),
        )
        .unwrap()
    }

    fn rotation() -> Value {
        json!({
            "X Axis": {"X": 1.0, "Y": 0.0, "Z": 0.0},
            "Y Axis": {"X": 0.0, "Y": 1.0, "Z": 0.0},
            "Z Axis": {"X": 0.0, "Y": 0.0, "Z": 1.0}
        })
    }

    fn sub_mesh(material_id: i32, diffuse_id: i32, material_path: &str) -> Value {
        json!({
            "Material Id": material_id,
            "Material Path": material_path,
            "Material File": "file",
            "Diffuse Id": diffuse_id,
            "Diffuse Path": "Textures",
            "Diffuse File": format!("{diffuse_id}.tga"),
            "Normal Id": -1,
            "Specular Id": -1
        })
    }

    /// Root -> {Wall (geometry), equipment.Gun (geometry) -> Clip (geometry), Box (ZBound)}
    fn level() -> Value {
        json!({"Scene": [
            {"Index": 0, "Name": "Level", "Parent": null, "Type": "ZGROUP",
             "Children": [{"Index": 1, "Name": "Wall"}, {"Index": 2, "Name": "equipment.Gun"}, {"Index": 4, "Name": "Box"}],
             "Rotation": rotation(), "Position": {"X": 0.0, "Y": 0.0, "Z": 0.0}},
            {"Index": 1, "Name": "Wall", "Parent": "Level", "Type": "ZGEOM", "Model Id": 10,
             "Meshes": [sub_mesh(2, 5, "Props"), sub_mesh(2, 6, "_Glacier")],
             "Rotation": rotation(), "Position": {"X": 1.0, "Y": 2.0, "Z": 3.0}},
            {"Index": 2, "Name": "equipment.Gun", "Parent": "Level", "Type": "ZGEOM", "Model Id": 11,
             "Meshes": [sub_mesh(2, 7, "Props")],
             "Children": [{"Index": 3, "Name": "Clip"}],
             "Rotation": rotation(), "Position": {"X": 0.0, "Y": 0.0, "Z": 0.0}},
            {"Index": 3, "Name": "Clip", "Parent": "equipment.Gun", "Type": "ZGEOM", "Model Id": 12,
             "Meshes": [sub_mesh(2, 8, "Props")],
             "Rotation": rotation(), "Position": {"X": 0.0, "Y": 0.0, "Z": 0.0}},
            {"Index": 4, "Name": "Box", "Parent": "Level", "Type": "ZBound", "Model Id": 13,
             "Meshes": [sub_mesh(2, 9, "Props")],
             "Rotation": rotation(), "Position": {"X": 0.0, "Y": 0.0, "Z": 0.0}}
        ]})
    }

    fn load(decoder: &mut MockDecoder, dir: &Path) -> LoadedMap {
        load_sections(decoder, &sections(), "M01", &dir.join("M01")).unwrap()
    }

    #[test]
    fn test_three_placeholders_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = scratch_dir("three");
        let scene = json!({"Scene": [
            {"Index": 0, "Name": "Root", "Parent": null, "Type": "ZGROUP",
             "Children": [{"Index": 1, "Name": "A"}, {"Index": 2, "Name": "B"}],
             "Rotation": rotation(), "Position": {"X": 0.0, "Y": 0.0, "Z": 0.0}},
            {"Index": 1, "Name": "A", "Parent": "Root", "Type": "ZBound", "Model Id": 20,
             "Meshes": [sub_mesh(2, 5, "Props")],
             "Rotation": rotation(), "Position": {"X": 1.0, "Y": 0.0, "Z": 0.0}},
            {"Index": 2, "Name": "B", "Parent": "Root", "Type": "Mesh", "Model Id": 21,
             "Meshes": [sub_mesh(2, -1, "Props")],
             "Rotation": rotation(), "Position": {"X": 0.0, "Y": 1.0, "Z": 0.0}}
        ]});
        let mut decoder = MockDecoder::new(scene);
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        let report = importer.import_map(&map).unwrap();
        assert_eq!(report.objects, 3);
        assert_eq!(report.placeholders, 3);
        assert_eq!(report.meshes, 0);
        assert!(importer.decoder_mut().models.is_empty());
        assert!(importer.decoder_mut().textures.is_empty());

        let graph = importer.into_graph();
        let root = graph.find("0 - Root").unwrap();
        let a = graph.find("1 - A").unwrap();
        let b = graph.find("2 - B").unwrap();
        assert_eq!(report.root, Some(root));
        assert_eq!(graph.object(a).unwrap().parent, Some(root));
        assert_eq!(graph.object(b).unwrap().parent, Some(root));
        assert_eq!(graph.object(root).unwrap().local, scene_root_correction());

        let updates = graph
            .progress_events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Update(_)))
            .count();
        assert_eq!(updates, 3);
        assert_eq!(
            graph.progress_events().first(),
            Some(&ProgressEvent::Begin { min: 0.0, max: 100.0 })
        );
        assert_eq!(graph.progress_events().last(), Some(&ProgressEvent::End));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_texture_output_with_trailing_bytes() {
        let dir = scratch_dir("trailing");
        let mut decoder = MockDecoder::new(level());
        decoder.texture_output = "{\"1\":\"wall.tga\",\"2\":\"floor.tga\"}\u{7f}x}".to_string();
        let map = load(&mut decoder, &dir);
        assert_eq!(map.name, "M01");

        let textures = read_document(&map.map_dir.join(TEXTURE_FILE)).unwrap();
        assert_eq!(textures["2"], "floor.tga");
        assert_eq!(textures.as_object().unwrap().len(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_default_settings_filter_level() {
        let dir = scratch_dir("defaults");
        let mut decoder = MockDecoder::new(level());
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        let report = importer.import_map(&map).unwrap();
        assert_eq!(report.objects, 5);
        assert_eq!(report.meshes, 1);
        assert_eq!(report.placeholders, 4);

        // Only the wall is materialized, without its collision sub-mesh
        assert_eq!(importer.decoder_mut().models, vec![(10, vec![1])]);
        // Textures of every sub-mesh of the wall are emitted
        assert_eq!(importer.decoder_mut().textures, vec![5, 6]);

        let graph = importer.into_graph();
        let wall = graph.find("1 - Wall").unwrap();
        assert!(!graph.object(wall).unwrap().is_placeholder());
        let clip = graph.find("3 - Clip").unwrap();
        assert!(graph.object(clip).unwrap().is_placeholder());
        assert_eq!(
            graph.object(clip).unwrap().parent,
            graph.find("2 - equipment.Gun")
        );

        let wall_world = graph.world_transform(wall).unwrap();
        let expected = scene_root_correction() * map.scene.get(1).unwrap().local_transform();
        assert!(wall_world.abs_diff_eq(expected, 1e-6));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_all_flags_false_materializes_every_mesh_node() {
        let dir = scratch_dir("include_all");
        let mut decoder = MockDecoder::new(level());
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::include_all());
        let report = importer.import_map(&map).unwrap();
        assert_eq!(report.meshes, 4);
        assert_eq!(report.placeholders, 1);

        let models: Vec<i32> = importer.decoder_mut().models.iter().map(|(id, _)| *id).collect();
        assert_eq!(models, vec![10, 11, 12, 13]);
        assert!(importer.decoder_mut().models.iter().all(|(_, ex)| ex.is_empty()));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_children_visited_in_order() {
        let dir = scratch_dir("order");
        let mut decoder = MockDecoder::new(level());
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::include_all());
        importer.import_map(&map).unwrap();
        let names: Vec<String> = importer
            .graph()
            .objects()
            .map(|(_, o)| o.name.clone())
            .collect();
        assert_eq!(
            names,
            vec!["0 - Level", "1 - Wall", "2 - equipment.Gun", "3 - Clip", "4 - Box"]
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_duplicate_names_join_by_index() {
        let dir = scratch_dir("duplicates");
        let scene = json!({"Scene": [
            {"Index": 0, "Name": "Root", "Parent": null, "Type": "ZGROUP",
             "Children": [{"Index": 1, "Name": "Room"}, {"Index": 2, "Name": "Room"}]},
            {"Index": 1, "Name": "Room", "Parent": "Root", "Type": "ZGROUP",
             "Children": [{"Index": 3, "Name": "Lamp"}]},
            {"Index": 2, "Name": "Room", "Parent": "Root", "Type": "ZGROUP",
             "Children": [{"Index": 4, "Name": "Lamp"}]},
            {"Index": 3, "Name": "Lamp", "Parent": "Room", "Type": "ZGROUP"},
            {"Index": 4, "Name": "Lamp", "Parent": "Room", "Type": "ZGROUP"}
        ]});
        let mut decoder = MockDecoder::new(scene);
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        importer.import_map(&map).unwrap();
        let graph = importer.graph();
        let lamp = graph.find("4 - Lamp").unwrap();
        assert_eq!(graph.object(lamp).unwrap().parent, graph.find("2 - Room"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_revisited_node_skipped() {
        let dir = scratch_dir("revisit");
        let scene = json!({"Scene": [
            {"Index": 0, "Name": "Root", "Parent": null, "Type": "ZGROUP",
             "Children": [{"Index": 1, "Name": "A"}, {"Index": 1, "Name": "A"}, {"Index": 9, "Name": "Gone"}]},
            {"Index": 1, "Name": "A", "Parent": "Root", "Type": "ZGROUP",
             "Children": [{"Index": 0, "Name": "Root"}]}
        ]});
        let mut decoder = MockDecoder::new(scene);
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        let report = importer.import_map(&map).unwrap();
        assert_eq!(report.objects, 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_root_not_found() {
        let dir = scratch_dir("no_root");
        let scene = json!({"Scene": [
            {"Index": 0, "Name": "Orphan", "Parent": "Nowhere", "Type": "ZGROUP"}
        ]});
        let mut decoder = MockDecoder::new(scene);
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        let err = importer.import_map(&map).unwrap_err();
        assert!(matches!(err, ImportError::RootNotFound(_)));
        assert_eq!(importer.graph().object_count(), 0);
        assert!(importer.graph().progress_events().is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_obj_falls_back_to_placeholder() {
        let dir = scratch_dir("empty_obj");
        let mut decoder = MockDecoder::new(level());
        decoder.empty_models.push(10);
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        let report = importer.import_map(&map).unwrap();
        assert_eq!(report.meshes, 0);
        assert_eq!(report.placeholders, 5);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_blend_setup_applied() {
        let dir = scratch_dir("blend");
        let mut decoder = MockDecoder::new(level());
        decoder.materials = json!({"Entries": [
            {"Instance": [{"Binder": [{"Render State": [{}]}]}]},
            {"Instance": [{"Binder": [{"Render State": [{
                "Blend Enabled": 1, "Blend Mode": "TRANS", "Alpha Reference": 128,
                "Opacity": 1.0, "Culling Mode": "OneSided"
            }]}]}]}
        ]});
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        importer.import_map(&map).unwrap();
        let glass = importer.graph().material("2-glass").unwrap();
        assert_eq!(glass.blend, BlendMethod::Clip);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_persisted_documents_and_catalogue() {
        let dir = scratch_dir("persist");
        let mut decoder = MockDecoder::new(level());
        let map = load(&mut decoder, &dir);

        let map_dir = dir.join("M01");
        for file in [SCENE_FILE, MATERIAL_FILE, TEXTURE_FILE] {
            assert!(map_dir.join(file).is_file(), "{file} missing");
        }
        let textures = read_document(&map_dir.join(TEXTURE_FILE)).unwrap();
        assert_eq!(textures["1"], "wall.tga");

        assert_eq!(map.catalogue.len(), 4);
        assert_eq!(map.catalogue[0].label, "Level / Wall (10)");
        assert_eq!(map.catalogue[0].scene_index, 1);

        let reopened = LoadedMap::open_cached(&map_dir).unwrap();
        assert_eq!(reopened.name, "M01");
        assert_eq!(reopened.scene, map.scene);
        assert_eq!(reopened.catalogue, map.catalogue);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_import_single_model() {
        let dir = scratch_dir("single");
        let mut decoder = MockDecoder::new(level());
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        // ZBound node: excluded in a map import, but a single model has no exclusions
        let object = importer.import_model(&map, 4).unwrap();
        assert_eq!(importer.decoder_mut().models, vec![(13, vec![])]);

        let graph = importer.graph();
        let imported = graph.object(object).unwrap();
        assert_eq!(imported.name, "Level / Box (13)");
        assert!(map.catalogue.iter().any(|entry| entry.label == imported.name));
        assert!(imported.parent.is_none());
        assert_eq!(imported.local, scene_root_correction());

        assert!(matches!(
            importer.import_model(&map, 0),
            Err(ImportError::NotAModel(0))
        ));
        assert!(matches!(
            importer.import_model(&map, 40),
            Err(ImportError::UnknownNode(40))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_section_aborts_before_writing() {
        let dir = scratch_dir("missing_mat");
        let archive = dir.join("M02.zip");
        {
            let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            for name in ["M02.BUF", "M02.GMS", "M02.PRM", "M02.PRP", "M02.TEX"] {
                writer.start_file(name, options).unwrap();
                writer.write_all(b"data").unwrap();
            }
            writer.finish().unwrap();
        }

        let mut decoder = MockDecoder::new(level());
        let err = load_map(&mut decoder, &archive, &ImportConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Archive(ArchiveError::MissingSections(ref kinds)) if kinds == &[SectionKind::Mat]
        ));
        assert!(!dir.join("M02").exists());
        assert!(decoder.models.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_map_uses_archive_directory() {
        let dir = scratch_dir("archive_dir");
        let archive = dir.join("M03.backup.zip");
        {
            let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            for name in ["M03.BUF", "M03.GMS", "M03.MAT", "M03.PRM", "M03.PRP", "M03.TEX"] {
                writer.start_file(name, options).unwrap();
                writer.write_all(b"data").unwrap();
            }
            writer.finish().unwrap();
        }

        let mut decoder = MockDecoder::new(level());
        let map = load_map(&mut decoder, &archive, &ImportConfig::default()).unwrap();
        assert_eq!(map.name, "M03");
        assert_eq!(map.map_dir, dir.join("M03"));
        assert!(dir.join("M03").join(SCENE_FILE).is_file());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_transform_records_reach_graph() {
        let dir = scratch_dir("transform");
        let scene = json!({"Scene": [
            {"Index": 0, "Name": "Root", "Parent": null, "Type": "ZGROUP",
             "Children": [{"Index": 1, "Name": "Moved"}]},
            {"Index": 1, "Name": "Moved", "Parent": "Root", "Type": "ZGROUP",
             "Rotation": {
                "X Axis": {"X": 0.0, "Y": 1.0, "Z": 0.0},
                "Y Axis": {"X": 1.0, "Y": 0.0, "Z": 0.0},
                "Z Axis": {"X": 0.0, "Y": 0.0, "Z": 1.0}
             },
             "Position": {"X": 5.0, "Y": 6.0, "Z": 7.0}}
        ]});
        let mut decoder = MockDecoder::new(scene);
        let map = load(&mut decoder, &dir);

        let mut importer = Importer::new(decoder, MemoryGraph::new(), ImportSettings::default());
        importer.import_map(&map).unwrap();
        let graph = importer.graph();
        let moved = graph.object(graph.find("1 - Moved").unwrap()).unwrap();
        assert_eq!(moved.local.w_axis.truncate(), Vec3::new(5.0, 6.0, 7.0));
        assert_eq!(moved.local.x_axis.truncate(), Vec3::Z);
        assert_eq!(moved.local.z_axis.truncate(), Vec3::Y);
        assert_ne!(moved.local, Mat4::IDENTITY);

        fs::remove_dir_all(&dir).unwrap();
    }
}
