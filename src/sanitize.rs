//! Filename sanitisation for user-supplied names.
//!
//! Applied to uploaded document names before they touch the filesystem and to
//! the filename typed during the custom-name dialogue. The rules:
//!
//! 1. split off the extension (last dot of the basename, ignoring leading dots)
//! 2. replace every character that is not alphanumeric or one of
//!    `space - _ . ( ) [ ]` with `_`
//! 3. turn runs of two or more dots into `_` (no `..` survives)
//! 4. collapse runs of underscores/whitespace into a single `_`
//! 5. trim leading/trailing `_` and `.`
//! 6. substitute [`PLACEHOLDER`] when nothing is left
//! 7. truncate to the length limit and re-attach the (alphanumeric) extension
//!
//! Sanitising an already-sanitised name returns it unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

/// Returned when sanitisation leaves nothing usable.
pub const PLACEHOLDER: &str = "unnamed_file";

/// Length limit used by [`sanitize_filename`] and [`sanitize_stem`].
pub const DEFAULT_MAX_LEN: usize = 100;

const EXTRA_ALLOWED: &str = " -_.()[]";

static RE_DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());
static RE_SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\s]+").unwrap());

/// Sanitise a full filename, preserving its extension, with the default limit.
pub fn sanitize_filename(filename: &str) -> String {
    sanitize_filename_with_limit(filename, DEFAULT_MAX_LEN)
}

/// Sanitise a full filename, truncating the name part to `max_len` characters.
pub fn sanitize_filename_with_limit(filename: &str, max_len: usize) -> String {
    if filename.trim().is_empty() {
        return PLACEHOLDER.to_string();
    }
    let (stem, ext) = split_extension(filename.trim());
    let stem = sanitize_stem_with_limit(stem, max_len);
    let ext: String = ext.chars().filter(|c| c.is_alphanumeric()).collect();
    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

/// Sanitise a bare name (no extension handling) with the default limit.
pub fn sanitize_stem(stem: &str) -> String {
    sanitize_stem_with_limit(stem, DEFAULT_MAX_LEN)
}

/// Sanitise a bare name, truncating to `max_len` characters.
pub fn sanitize_stem_with_limit(stem: &str, max_len: usize) -> String {
    let replaced: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || EXTRA_ALLOWED.contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    let without_dot_runs = RE_DOT_RUNS.replace_all(&replaced, "_");
    let collapsed = RE_SEPARATOR_RUNS.replace_all(&without_dot_runs, "_");

    let trimmed = trim_edges(&collapsed);
    if trimmed.is_empty() {
        return PLACEHOLDER.to_string();
    }

    let truncated: String = trimmed.chars().take(max_len.max(1)).collect();
    match trim_edges(&truncated) {
        "" => PLACEHOLDER.to_string(),
        name => name.to_string(),
    }
}

/// Cheap check that a name cannot escape its directory or confuse a shell.
pub fn is_safe_filename(filename: &str) -> bool {
    const DANGEROUS: [&str; 10] = ["..", "/", "\\", ":", "*", "?", "\"", "<", ">", "|"];
    !filename.is_empty() && !DANGEROUS.iter().any(|d| filename.contains(d))
}

/// Split `path` into `(stem, ".ext")` using the last dot of the basename.
///
/// A basename made only of leading dots has no extension (`.bashrc`).
fn split_extension(path: &str) -> (&str, &str) {
    let base_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let base = &path[base_start..];
    match base.rfind('.') {
        Some(dot) if base[..dot].chars().any(|c| c != '.') => {
            let split = base_start + dot;
            (&path[..split], &path[split..])
        }
        _ => (path, ""),
    }
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c| c == '_' || c == '.')
}
