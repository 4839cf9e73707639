//! Build script for the newsdesk CLI
//!
//! Writes `built.rs` and the `BUILT_*` variables `newsdesk --version` prints.

use std::env;

/// Build-time variables read by `LONG_VERSION`, with the env var each one comes from
const VERSION_VARS: [(&str, &str); 2] = [
    ("BUILT_HOST", "HOST"),
    ("BUILT_GIT_COMMIT_HASH", "GIT_COMMIT_HASH"),
];

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    for (name, source) in VERSION_VARS {
        println!("cargo:rerun-if-env-changed={}", source);
        let value = env::var(source)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        println!("cargo:rustc-env={}={}", name, value);
    }
    println!(
        "cargo:rustc-env=BUILT_TIME_UTC={}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
}
