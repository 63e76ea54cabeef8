use std::env;

// Embeds the crate version for the /version endpoint. Release pipelines can
// stamp the patch segment through SEO_AGENT_PATCH_VERSION.
fn main() {
    let version = env::var("CARGO_PKG_VERSION").expect("CARGO_PKG_VERSION not set");
    let Some((major_minor, patch)) = version.rsplit_once('.') else {
        panic!("unexpected version format in Cargo.toml: {version}");
    };

    let patch = env::var("SEO_AGENT_PATCH_VERSION").unwrap_or_else(|_| patch.to_string());
    println!("cargo:rustc-env=SEO_AGENT_VERSION={major_minor}.{patch}");

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=SEO_AGENT_PATCH_VERSION");
}
