//! Example: Inspect a previously decoded map directory.
//!
//! Run with: cargo run --example inspect_scene -- out/M01

use std::env;

use bm_core::exclusion::{classify, is_dynamic_container};
use bm_core::{ImportSettings, LoadedMap};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_scene <map-directory>");
        println!("\nThe directory must contain scene.json and mat.json from an earlier import.");
        return;
    }

    let path = &args[1];
    println!("Opening map directory: {}", path);

    let map = match LoadedMap::open_cached(path) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Error opening map: {}", e);
            return;
        }
    };

    println!("\n=== Map: {} ===", map.name);
    println!("Nodes: {}", map.scene.len());
    println!("Materials: {}", map.materials.len());
    println!("Models: {}", map.catalogue.len());

    println!("\n--- Models ---");
    for entry in &map.catalogue {
        println!("  [{}] {}", entry.scene_index, entry.label);
    }

    // Verdicts with default settings, ignoring subtree inheritance
    let settings = ImportSettings::default();
    let mut materialized = 0;
    println!("\n--- Default verdicts ---");
    for node in map.scene.nodes.iter().filter(|n| n.owns_meshes()) {
        let name = node.display_name();
        let meshless = is_dynamic_container(&name, &settings);
        let verdict = classify(node, &settings, meshless);
        if verdict.is_materialized() {
            materialized += 1;
        }
        println!("  {} -> {:?}", name, verdict);
    }
    println!(
        "\n{} of {} model nodes would be materialized",
        materialized,
        map.catalogue.len()
    );
}
