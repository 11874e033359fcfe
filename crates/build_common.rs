// Shared build script helper that turns a crate README into its rustdoc front page.
// Include this in build.rs files with: include!("../build_common.rs");
//
// Required imports in the including file:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Rewrite a crate's README.md so rustdoc can resolve its links, then write
/// it to `$OUT_DIR/README_GENERATED.md` for `include_str!`.
///
/// Links of the form `](src/registry.rs)` or `](src/ports/mod.rs)` become
/// `](registry)` and `](ports)` so they point at modules. Links to the workspace README become absolute repository URLs.
fn render_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("README_GENERATED.md");

    let readme_path = Path::new(crate_dir).join("README.md");
    let content = fs::read_to_string(&readme_path).unwrap_or_default();

    let mut rendered = content
        .replace("](src/", "](")
        .replace("/mod.rs)", ")")
        .replace(".rs)", ")");
    if let Some(url) = workspace_repository_url(crate_dir) {
        rendered = rendered.replace("](../../README.md", &format!("]({url}"));
    }

    fs::write(dest_path, rendered).expect("README_GENERATED.md is writable");
}

/// Read `repository = "..."` from the workspace Cargo.toml.
fn workspace_repository_url(crate_dir: &str) -> Option<String> {
    let workspace_toml = Path::new(crate_dir).parent()?.parent()?.join("Cargo.toml");
    let content = fs::read_to_string(workspace_toml).ok()?;

    content.lines().map(str::trim).find_map(|line| {
        if !line.starts_with("repository") {
            return None;
        }
        let start = line.find('"')?;
        let end = line.rfind('"')?;
        (start < end).then(|| line[start + 1..end].to_string())
    })
}
