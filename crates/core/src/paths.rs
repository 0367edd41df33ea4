//! Path resolution for the storage tree.
//!
//! Canonical layout:
//!
//! ```text
//! storage/
//!   <subject>/
//!     notes/
//!       <unit>/
//!         <stored file>
//!     practice-tests/
//!       <stored file>
//!     practicals/
//!       <stored file>
//! ```
//!
//! Historical uploads were made against directories whose names drifted
//! between spaces, underscores, hyphens, and case. Reads and deletes
//! therefore fall back to a fixed sequence of name variants when the
//! canonical path is absent: unit with whitespace runs replaced by
//! underscores, then hyphens, then the unit lower-cased (notes only),
//! followed by the subject with whitespace runs replaced by underscores,
//! then hyphens (all kinds). The first existing variant wins. This is a
//! best-effort shim for legacy data, not a general normalization scheme.

use crate::{StorageError, StorageResult};
use sncop_types::ResourceKind;
use std::path::{Path, PathBuf};

/// Directory that holds files for `(subject, kind, unit?)`.
///
/// # Errors
///
/// Returns `StorageError::UnitRequired` for notes without a unit.
pub fn resource_dir(
    storage_dir: &Path,
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
) -> StorageResult<PathBuf> {
    let kind_dir = storage_dir.join(subject).join(kind.dir_name());
    if kind.has_units() {
        let unit = unit.filter(|u| !u.is_empty()).ok_or(StorageError::UnitRequired)?;
        Ok(kind_dir.join(unit))
    } else {
        Ok(kind_dir)
    }
}

/// Canonical on-disk location of a stored file.
pub fn canonical_file_path(
    storage_dir: &Path,
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
    filename: &str,
) -> StorageResult<PathBuf> {
    Ok(resource_dir(storage_dir, subject, kind, unit)?.join(filename))
}

/// Alternative locations tried when the canonical path does not exist.
///
/// Variants are returned in the order they must be probed. For notes the
/// unit segment is substituted first; the subject substitutions keep the
/// requested unit in place.
pub fn fallback_file_paths(
    storage_dir: &Path,
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
    filename: &str,
) -> StorageResult<Vec<PathBuf>> {
    let mut alternatives = Vec::new();

    if kind.has_units() {
        let unit = unit.filter(|u| !u.is_empty()).ok_or(StorageError::UnitRequired)?;
        for variant in [
            replace_whitespace_runs(unit, '_'),
            replace_whitespace_runs(unit, '-'),
            unit.to_lowercase(),
        ] {
            alternatives.push(
                storage_dir
                    .join(subject)
                    .join(kind.dir_name())
                    .join(&variant)
                    .join(filename),
            );
        }
    }

    for subject_variant in [
        replace_whitespace_runs(subject, '_'),
        replace_whitespace_runs(subject, '-'),
    ] {
        let mut path = storage_dir.join(&subject_variant).join(kind.dir_name());
        if let Some(unit) = unit.filter(|u| !u.is_empty()) {
            path = path.join(unit);
        }
        alternatives.push(path.join(filename));
    }

    Ok(alternatives)
}

/// Finds the existing location of a stored file, canonical path first.
///
/// Returns `Ok(None)` when neither the canonical path nor any fallback
/// variant points at a regular file.
pub fn resolve_existing_file(
    storage_dir: &Path,
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
    filename: &str,
) -> StorageResult<Option<PathBuf>> {
    let canonical = canonical_file_path(storage_dir, subject, kind, unit, filename)?;
    if canonical.is_file() {
        return Ok(Some(canonical));
    }

    for alternative in fallback_file_paths(storage_dir, subject, kind, unit, filename)? {
        if alternative.is_file() {
            return Ok(Some(alternative));
        }
    }

    Ok(None)
}

/// Replaces every run of whitespace with a single `replacement` character.
fn replace_whitespace_runs(input: &str, replacement: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_whitespace = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(replacement);
                in_whitespace = true;
            }
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn canonical_path_for_notes_includes_unit() {
        let path = canonical_file_path(
            Path::new("storage"),
            "Pharmacology",
            ResourceKind::Notes,
            Some("Unit 1"),
            "intro.pdf",
        )
        .expect("path should build");

        assert_eq!(
            path,
            Path::new("storage/Pharmacology/notes/Unit 1/intro.pdf")
        );
    }

    #[test]
    fn canonical_path_for_practice_tests_has_no_unit_segment() {
        let path = canonical_file_path(
            Path::new("storage"),
            "Anatomy",
            ResourceKind::PracticeTests,
            None,
            "mock.pdf",
        )
        .expect("path should build");

        assert_eq!(path, Path::new("storage/Anatomy/practice-tests/mock.pdf"));
    }

    #[test]
    fn notes_without_unit_is_an_input_error() {
        let err = canonical_file_path(
            Path::new("storage"),
            "Anatomy",
            ResourceKind::Notes,
            None,
            "intro.pdf",
        )
        .expect_err("notes require a unit");

        assert!(matches!(err, StorageError::UnitRequired));
    }

    #[test]
    fn fallback_order_substitutes_unit_then_subject() {
        let alternatives = fallback_file_paths(
            Path::new("storage"),
            "Human Anatomy",
            ResourceKind::Notes,
            Some("Unit 1"),
            "f.pdf",
        )
        .expect("fallbacks should build");

        let rendered: Vec<String> = alternatives
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "storage/Human Anatomy/notes/Unit_1/f.pdf",
                "storage/Human Anatomy/notes/Unit-1/f.pdf",
                "storage/Human Anatomy/notes/unit 1/f.pdf",
                "storage/Human_Anatomy/notes/Unit 1/f.pdf",
                "storage/Human-Anatomy/notes/Unit 1/f.pdf",
            ]
        );
    }

    #[test]
    fn fallback_for_non_notes_only_substitutes_subject() {
        let alternatives = fallback_file_paths(
            Path::new("storage"),
            "Human Anatomy",
            ResourceKind::Practicals,
            None,
            "f.pdf",
        )
        .expect("fallbacks should build");

        let rendered: Vec<String> = alternatives
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "storage/Human_Anatomy/practicals/f.pdf",
                "storage/Human-Anatomy/practicals/f.pdf",
            ]
        );
    }

    #[test]
    fn resolve_finds_underscored_unit_directory() {
        let temp = TempDir::new().expect("temp dir");
        let unit_dir = temp.path().join("Pharmacology/notes/Unit_1");
        fs::create_dir_all(&unit_dir).expect("create unit dir");
        fs::write(unit_dir.join("intro.pdf"), b"pdf").expect("write file");

        let found = resolve_existing_file(
            temp.path(),
            "Pharmacology",
            ResourceKind::Notes,
            Some("Unit 1"),
            "intro.pdf",
        )
        .expect("resolution should not error")
        .expect("file should be found via fallback");

        assert_eq!(found, unit_dir.join("intro.pdf"));
    }

    #[test]
    fn resolve_finds_underscored_subject_directory() {
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("Human_Anatomy/practice-tests");
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("mock.pdf"), b"pdf").expect("write file");

        let found = resolve_existing_file(
            temp.path(),
            "Human Anatomy",
            ResourceKind::PracticeTests,
            None,
            "mock.pdf",
        )
        .expect("resolution should not error")
        .expect("file should be found via fallback");

        assert_eq!(found, dir.join("mock.pdf"));
    }

    #[test]
    fn resolve_prefers_the_canonical_path() {
        let temp = TempDir::new().expect("temp dir");
        let canonical = temp.path().join("Anatomy/notes/Unit 1");
        let variant = temp.path().join("Anatomy/notes/Unit_1");
        fs::create_dir_all(&canonical).expect("create canonical");
        fs::create_dir_all(&variant).expect("create variant");
        fs::write(canonical.join("f.pdf"), b"canonical").expect("write");
        fs::write(variant.join("f.pdf"), b"variant").expect("write");

        let found = resolve_existing_file(
            temp.path(),
            "Anatomy",
            ResourceKind::Notes,
            Some("Unit 1"),
            "f.pdf",
        )
        .expect("resolution should not error")
        .expect("file should be found");

        assert_eq!(found, canonical.join("f.pdf"));
    }

    #[test]
    fn resolve_reports_missing_files_as_none() {
        let temp = TempDir::new().expect("temp dir");
        let found = resolve_existing_file(
            temp.path(),
            "Ghost",
            ResourceKind::Practicals,
            None,
            "nothing.pdf",
        )
        .expect("resolution should not error");

        assert!(found.is_none());
    }

    #[test]
    fn whitespace_runs_collapse_to_one_replacement() {
        assert_eq!(replace_whitespace_runs("Unit  1", '_'), "Unit_1");
        assert_eq!(replace_whitespace_runs("Unit\t 2", '-'), "Unit-2");
        assert_eq!(replace_whitespace_runs("NoSpaces", '_'), "NoSpaces");
    }
}
