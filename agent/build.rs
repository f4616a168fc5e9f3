//! Build script for the signage agent
//!
//! Stamps the binary with the source revision and build time reported by
//! `--version` and `/version`. Kiosk images built outside a git checkout
//! pass `SIGNAGE_GIT_HASH` instead.

use std::env;
use std::process::Command;

use chrono::Utc;

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    Some(revision.trim().to_string()).filter(|r| !r.is_empty())
}

fn main() {
    let git_hash = env::var("SIGNAGE_GIT_HASH")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());

    let build_time = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-env-changed=SIGNAGE_GIT_HASH");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
