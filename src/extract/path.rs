//! Mapping stored entry names to paths below the destination root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ExtractError, Result};

/// Strip `strip_components` leading segments from a stored entry name.
///
/// Returns `Ok(None)` when nothing is left, which means the entry is skipped.
/// Empty and `.` segments are ignored before counting, so `proj/` and
/// `./proj` both count as one segment.
///
/// Absolute names, drive prefixes, and `..` in the kept segments are rejected,
/// so the result always stays below whatever root it is joined to. A `..`
/// inside the stripped prefix is dropped along with it.
pub fn stripped_relative_path(name: &str, strip_components: usize) -> Result<Option<PathBuf>> {
    if is_absolute_name(name) {
        return Err(unsafe_path(name));
    }

    let segments: Vec<&str> = name
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    let Some(kept) = segments.get(strip_components..) else {
        return Ok(None);
    };
    if kept.is_empty() {
        return Ok(None);
    }

    let mut relative = PathBuf::new();
    for segment in kept {
        // On Windows a segment like `a\..\b` holds several components
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => relative.push(part),
            _ => return Err(unsafe_path(name)),
        }
    }

    Ok(Some(relative))
}

/// Drive prefixes such as `C:` only mean something on Windows, where a kept
/// segment carrying one fails the single-component check.
fn is_absolute_name(name: &str) -> bool {
    name.starts_with('/') || name.starts_with('\\') || Path::new(name).has_root()
}

fn unsafe_path(name: &str) -> ExtractError {
    ExtractError::UnsafePath {
        name: name.to_string(),
    }
}
