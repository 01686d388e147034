use std::env;
use std::path::PathBuf;

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Huegene ships for Windows; elsewhere pkg-config finds FFmpeg on its own.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match vcpkg_ffmpeg_dir() {
        None => println!(
            "cargo:warning=FFMPEG_DIR is not set. Install FFmpeg (e.g. via vcpkg) and point FFMPEG_DIR at it to build huegene-reel."
        ),
        Some(directory) if directory.exists() => {
            println!(
                "cargo:warning=Found vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} to make discovery explicit.",
                directory.display(),
            );
            if env::var_os("VCPKGRS_DYNAMIC").is_none() {
                println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg.");
            }
        }
        Some(directory) => println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not exist.",
            directory.display(),
        ),
    }
}

fn vcpkg_ffmpeg_dir() -> Option<PathBuf> {
    let root = env::var("VCPKG_ROOT").ok()?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    Some(PathBuf::from(root).join("installed").join(triplet))
}
