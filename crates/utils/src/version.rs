use std::sync::LazyLock;

/// Defines the application version.
///
/// Git metadata is optional so builds from a source tarball still get a
/// version string.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    render(
        env!("IMAGE_VERSION"),
        option_env!("VERGEN_GIT_SHA"),
        option_env!("VERGEN_GIT_DIRTY"),
    )
});

fn render(image_version: &str, sha: Option<&str>, dirty: Option<&str>) -> String {
    let sha = sha
        .filter(|sha| !sha.is_empty())
        .map(|sha| &sha[..sha.len().min(8)])
        .unwrap_or("unknown");
    let dirty = if dirty == Some("true") { "-dirty" } else { "" };
    format!("{image_version}-{sha}{dirty}")
}
