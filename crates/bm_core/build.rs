//! Build script for bm_core.
//!
//! With the `native` feature, points the linker at the prebuilt bmexport and
//! glaciertex libraries. Their directory comes from `BMEXPORT_LIB_DIR`.

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=BMEXPORT_LIB_DIR");

    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    match env::var("BMEXPORT_LIB_DIR") {
        Ok(dir) if Path::new(&dir).is_dir() => {
            println!("cargo:rustc-link-search=native={}", dir);
        }
        Ok(dir) => {
            println!("cargo:warning=BMEXPORT_LIB_DIR does not exist: {}", dir);
        }
        Err(_) => {
            println!("cargo:warning=BMEXPORT_LIB_DIR not set, relying on the default library path");
        }
    }
}
