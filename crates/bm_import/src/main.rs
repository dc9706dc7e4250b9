use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bm_core::archive::map_name;
use bm_core::{load_map, CachedDecoder, Decoder, ImportConfig, Importer, LoadedMap, MemoryGraph};

const USAGE: &str = "\
Usage: bm_import <archive.zip> [options]

Options:
  --output DIR     Root directory for extracted maps (default: next to the archive)
  --config FILE    JSON import configuration
  --model INDEX    Import only the model of scene node INDEX
  --list           Print the model catalogue and exit
  --cached         Replay a previous extraction instead of running the decoder";

/// Command-line options
#[derive(Debug, Default, PartialEq)]
struct Options {
    archive: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    model: Option<u32>,
    list: bool,
    cached: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options> {
    let mut options = Options::default();
    let mut archive = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .with_context(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--output" => options.output = Some(value("--output")?.into()),
            "--config" => options.config = Some(value("--config")?.into()),
            "--model" => {
                let index = value("--model")?;
                options.model = Some(
                    index
                        .parse()
                        .with_context(|| format!("Invalid scene index: {}", index))?,
                );
            }
            "--list" => options.list = true,
            "--cached" => options.cached = true,
            flag if flag.starts_with("--") => bail!("Unknown option {}\n\n{}", flag, USAGE),
            _ if archive.is_some() => bail!("Unexpected argument {}\n\n{}", arg, USAGE),
            _ => archive = Some(PathBuf::from(&arg)),
        }
    }

    options.archive = archive.with_context(|| format!("Missing archive path\n\n{}", USAGE))?;
    Ok(options)
}

fn load_config(options: &Options) -> Result<ImportConfig> {
    let mut config = match &options.config {
        Some(path) => ImportConfig::load(path)?,
        None => ImportConfig::default(),
    };
    if let Some(output) = &options.output {
        config.output_path = Some(output.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let options = parse_args(args)?;
    let config = load_config(&options)?;

    if options.cached {
        let map_dir = config
            .output_root(&options.archive)
            .join(map_name(&options.archive));
        log::info!("Replaying extraction in {}", map_dir.display());
        return run(CachedDecoder::new(map_dir), &options, config);
    }

    #[cfg(feature = "native")]
    return run(bm_core::NativeDecoder::acquire()?, &options, config);

    #[cfg(not(feature = "native"))]
    bail!("Built without the native decoder; rebuild with --features native or pass --cached");
}

fn run<D: Decoder>(mut decoder: D, options: &Options, config: ImportConfig) -> Result<()> {
    let map = load_map(&mut decoder, &options.archive, &config)
        .with_context(|| format!("Failed to load {}", options.archive.display()))?;

    if options.list {
        print_catalogue(&map);
        return Ok(());
    }

    let mut importer = Importer::new(decoder, MemoryGraph::new(), config.settings);

    if let Some(index) = options.model {
        let object = importer
            .import_model(&map, index)
            .with_context(|| format!("Failed to import model of node {}", index))?;
        let name = importer
            .graph()
            .object(object)
            .map(|o| o.name.as_str())
            .unwrap_or_default();
        println!("Imported {} as object {}", name, object);
    } else {
        let report = importer
            .import_map(&map)
            .with_context(|| format!("Failed to import map {}", map.name))?;
        println!("\n=== Map: {} ===", map.name);
        println!("Objects: {}", report.objects);
        println!("Meshes: {}", report.meshes);
        println!("Placeholders: {}", report.placeholders);
        println!("Textures: {}", report.textures);
        println!("Time: {:.2}s", report.elapsed.as_secs_f32());
    }

    print_graph(importer.graph());
    Ok(())
}

fn print_catalogue(map: &LoadedMap) {
    println!("\n=== Models in {} ===", map.name);
    for entry in &map.catalogue {
        println!("  [{:>5}] {}", entry.scene_index, entry.label);
    }
    println!("{} model(s)", map.catalogue.len());
}

fn print_graph(graph: &MemoryGraph) {
    println!("\n--- Scene ---");
    println!("Mesh objects: {}", graph.mesh_count());
    println!("Empty objects: {}", graph.placeholder_count());
    let stats = graph.vertex_stats();
    println!("Total vertices: {}", stats.vertices);
    println!("Total triangles: {}", stats.triangles);
    println!(
        "Meshes with normals: {}, with UVs: {}",
        stats.with_normals, stats.with_uvs
    );
    println!("Materials: {}", graph.materials().len());

    let bounds = graph.world_bounds();
    if !bounds.is_empty() {
        println!(
            "World bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
        let size: bm_math::Vec3 = bounds.size();
        println!("Size: {:.2} x {:.2} x {:.2}", size.x, size.y, size.z);
    }
}
