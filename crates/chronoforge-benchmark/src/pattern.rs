//! Output filename patterns.

const PLACEHOLDERS: [&str; 3] = ["{name}", "{flat_name}", "{seed}"];

/// Expands an output pattern for one run.
///
/// `{name}` is the run name as is, `{flat_name}` the same name with every
/// `/` and `\` replaced by `_`, and `{seed}` the seed, or nothing when the
/// benchmark runs a single seed.
pub fn expand_pattern(pattern: &str, name: &str, seed: Option<u64>) -> String {
    let flat_name = name.replace(['/', '\\'], "_");
    let seed = seed.map(|s| s.to_string()).unwrap_or_default();
    pattern
        .replace("{flat_name}", &flat_name)
        .replace("{name}", name)
        .replace("{seed}", &seed)
}

/// Whether `pattern` varies from run to run.
pub(crate) fn has_placeholder(pattern: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| pattern.contains(p))
}
