// Build script that tries to generate a C header with `cbindgen`.
// If `cbindgen` is not available, it falls back to copying the
// checked-in `include/resynth.h` to $OUT_DIR.
//
// Either way, consumers can include the header from:
//   - <repo>/resynth-ffi/include/resynth.h   (checked-in)
//   - $OUT_DIR/resynth.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/resynth.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let header_repo = crate_dir.join("include").join("resynth.h");
    let header_out = out_dir.join("resynth.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let generated = Command::new("cbindgen")
            .args(["--crate", "resynth-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if generated {
            println!("cargo:warning=resynth-ffi: generated header with cbindgen -> {}", header_out.display());
            return;
        }
        println!("cargo:warning=resynth-ffi: cbindgen failed; using checked-in header");
    }

    fs::copy(&header_repo, &header_out).expect("failed to copy include/resynth.h to OUT_DIR");
}
