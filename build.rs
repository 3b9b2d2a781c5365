//! Records build information (git commit, rustc version, build time) for `metadata.toml`.
fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");
}
