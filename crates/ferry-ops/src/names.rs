//! Target name synthesis: duplicates, auto-renames and FAT-safe names.

use std::path::{Path, PathBuf};

/// Split a file name into stem and extension.
///
/// Dotfiles and names without a dot keep the whole name as stem.
fn split_name(name: &str, is_dir: bool) -> (&str, Option<&str>) {
    if is_dir {
        return (name, None);
    }
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}

fn numbered_sibling(path: &Path, label: impl Fn(&str) -> String) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let is_dir = path.is_dir();

    let (stem, extension) = split_name(&name, is_dir);
    let new_name = match extension {
        Some(ext) => format!("{}.{}", label(stem), ext),
        None => label(stem),
    };
    parent.join(new_name)
}

/// The `n`th duplicate of `path` in its own folder: `name (copy n).ext`.
pub fn duplicate_path(path: &Path, n: u32) -> PathBuf {
    numbered_sibling(path, |stem| format!("{stem} (copy {n})"))
}

/// The `n`th auto-renamed sibling of `path`: `name (n).ext`.
pub fn renamed_path(path: &Path, n: u32) -> PathBuf {
    numbered_sibling(path, |stem| format!("{stem} ({n})"))
}

/// First free `name (n).ext` sibling of `path`, starting at `n = 1`.
pub fn next_free_renamed_path(path: &Path) -> PathBuf {
    let mut n = 1;
    loop {
        let candidate = renamed_path(path, n);
        if fs_entry_missing(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn fs_entry_missing(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_err()
}

const FAT_INVALID: &[char] = &['/', ':', '*', '?', '"', '<', '>', '\\', '|'];

const FAT_RESERVED: &[&str] = &["CON", "PRN", "AUX", "NUL"];

fn is_reserved_device(name: &str) -> bool {
    let base = name.split('.').next().unwrap_or(name).to_ascii_uppercase();
    if FAT_RESERVED.contains(&base.as_str()) {
        return true;
    }

    ["COM", "LPT"].iter().any(|prefix| {
        base.strip_prefix(prefix)
            .is_some_and(|rest| rest.len() == 1 && rest.as_bytes()[0].is_ascii_digit())
    })
}

/// Rewrite `name` so FAT-like filesystems accept it.
pub fn fat_safe_name(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| {
            if FAT_INVALID.contains(&c) || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    safe.truncate(safe.trim_end().len());

    if is_reserved_device(&safe) {
        safe.insert_str(0, "__");
    }
    if safe.ends_with('.') {
        safe.push_str("___");
    }
    safe
}
