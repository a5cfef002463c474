use std::path::{Component, Path};

use crate::TransferError;

/// Validates a file name sent to the server as the upload's name.
///
/// Rejects empty names and anything that is more than a single normal
/// path component (separators, `..`, absolute paths, drive prefixes).
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(TransferError::InvalidName(format!(
            "not a plain file name: {name}"
        ))),
    }
}

/// Returns `name`, or the first `stem (n).ext` variant (n >= 2) that
/// `is_taken` rejects.
pub fn disambiguate_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(name) {
        return name.to_string();
    }

    let (stem, ext) = split_extension(name);
    let mut n: u32 = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Splits `game.iso` into (`game`, `.iso`). Dot-files have no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
