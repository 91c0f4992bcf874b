//! Build script that stamps the binary with a version and git SHA.
//!
//! Environment variables (set by CI, otherwise derived locally):
//! - MPDW_VERSION: version string (defaults to CARGO_PKG_VERSION)
//! - MPDW_GIT_SHA: short commit SHA (defaults to GITHUB_SHA, then `git rev-parse`)

use std::process::Command;

fn main() {
    let version = std::env::var("MPDW_VERSION").unwrap_or_else(|_| {
        std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".into())
    });
    println!("cargo:rustc-env=MPDW_VERSION={}", version);

    let git_sha = std::env::var("MPDW_GIT_SHA")
        .ok()
        .or_else(|| {
            std::env::var("GITHUB_SHA")
                .ok()
                .map(|s| s.get(..7).unwrap_or(&s).to_string())
        })
        .unwrap_or_else(local_git_sha);
    println!("cargo:rustc-env=MPDW_GIT_SHA={}", git_sha);

    println!("cargo:rerun-if-env-changed=MPDW_VERSION");
    println!("cargo:rerun-if-env-changed=MPDW_GIT_SHA");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
}

fn local_git_sha() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".into())
}
