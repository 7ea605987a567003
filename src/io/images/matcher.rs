//! Re-associates imported items with image files.
//!
//! Item ids are reassigned on import, so the `<id>_<basename>` names written
//! on export rarely line up exactly. Resolution tries, in order:
//!
//! | Strategy | Rule |
//! |----------|------|
//! | `Exact` | a file named exactly like the hint |
//! | `StrippedPrefix` | the hint minus everything through its first `_` |
//! | `Fuzzy` | the hint's lower-cased last `_` segment and a file's stem contain one another |
//! | `SoleFile` | the folder holds exactly one image |
//!
//! The fuzzy and sole-file rules can attach the wrong image to an item.
//! Each match records its strategy so callers can surface that risk.

use super::IMAGE_EXTENSIONS;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How a hint was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Exact file name.
    Exact,
    /// File name after stripping the id prefix.
    StrippedPrefix,
    /// Case-insensitive containment on the last name segment.
    Fuzzy,
    /// The only image in the folder.
    SoleFile,
}

impl MatchStrategy {
    /// Returns the strategy as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::StrippedPrefix => "stripped_prefix",
            Self::Fuzzy => "fuzzy",
            Self::SoleFile => "sole_file",
        }
    }

    /// Returns true for strategies that may pick an unrelated image.
    #[must_use]
    pub const fn is_heuristic(&self) -> bool {
        matches!(self, Self::Fuzzy | Self::SoleFile)
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMatch {
    /// File name within the folder.
    pub file_name: String,
    /// Rule that produced the match.
    pub strategy: MatchStrategy,
}

/// Resolves `hint` against `files`, which should be sorted for stable results.
#[must_use]
pub fn resolve_image(files: &[String], hint: &str) -> Option<ImageMatch> {
    let hint = hint.trim();
    if hint.is_empty() {
        return None;
    }
    let found = |name: &str, strategy| ImageMatch {
        file_name: name.to_string(),
        strategy,
    };

    if let Some(name) = files.iter().find(|f| *f == hint) {
        return Some(found(name, MatchStrategy::Exact));
    }

    if let Some((_, rest)) = hint.split_once('_')
        && !rest.is_empty()
        && let Some(name) = files.iter().find(|f| *f == rest)
    {
        return Some(found(name, MatchStrategy::StrippedPrefix));
    }

    let needle = hint.rsplit('_').next().unwrap_or(hint).trim().to_lowercase();
    if !needle.is_empty()
        && let Some(name) = files.iter().find(|f| {
            let stem = comparable_stem(f);
            !stem.is_empty() && (stem.contains(&needle) || needle.contains(&stem))
        })
    {
        return Some(found(name, MatchStrategy::Fuzzy));
    }

    match files {
        [only] => Some(found(only, MatchStrategy::SoleFile)),
        _ => None,
    }
}

/// Lowercases a candidate file name and strips a known image extension.
fn comparable_stem(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.rsplit_once('.') {
        Some((stem, ext)) if IMAGE_EXTENSIONS.contains(&ext) => stem.to_string(),
        _ => lower,
    }
}

/// A sorted listing of the image files in an import's `images/` folder.
#[derive(Debug, Clone, Default)]
pub struct ImageFolder {
    dir: PathBuf,
    files: Vec<String>,
    present: bool,
}

impl ImageFolder {
    /// Lists `dir`. A missing or unreadable folder yields an empty listing.
    ///
    /// Hidden files and subdirectories are ignored.
    #[must_use]
    pub fn scan(dir: &Path) -> Self {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(dir = %dir.display(), error = %e, "Cannot list images folder");
                }
                return Self {
                    dir: dir.to_path_buf(),
                    ..Self::default()
                };
            },
        };

        let mut files: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.'))
            .collect();
        files.sort();

        Self {
            dir: dir.to_path_buf(),
            files,
            present: true,
        }
    }

    /// Returns true if the folder exists.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.present
    }

    /// Returns the number of image files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there are no image files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the full path of a listed file.
    #[must_use]
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Resolves `hint` against this folder.
    #[must_use]
    pub fn resolve(&self, hint: &str) -> Option<ImageMatch> {
        resolve_image(&self.files, hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn files(names: &[&str]) -> Vec<String> {
        let mut files: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        files.sort();
        files
    }

    #[test_case(&["7_shoe.png", "shoe.png"], "7_shoe.png", "7_shoe.png", MatchStrategy::Exact ; "exact wins")]
    #[test_case(&["9_shoe.png", "shoe.png"], "7_shoe.png", "shoe.png", MatchStrategy::StrippedPrefix ; "prefix stripped")]
    #[test_case(&["1_boot.jpg", "shoe.jpg"], "7_red_shoe.png", "shoe.jpg", MatchStrategy::Fuzzy ; "fuzzy tail")]
    #[test_case(&["Shoe.JPG", "boot.png"], "7_shoe.png", "Shoe.JPG", MatchStrategy::Fuzzy ; "case and extension ignored")]
    #[test_case(&["anything.png"], "7_unrelated.jpg", "anything.png", MatchStrategy::SoleFile ; "sole file")]
    fn test_resolution_order(names: &[&str], hint: &str, expected: &str, strategy: MatchStrategy) {
        let found = resolve_image(&files(names), hint).unwrap();
        assert_eq!(found.file_name, expected);
        assert_eq!(found.strategy, strategy);
    }

    #[test_case(&["a.png", "b.png"], "7_zzz.png" ; "no candidate among many")]
    #[test_case(&[], "7_shoe.png" ; "empty folder")]
    #[test_case(&["a.png"], "   " ; "blank hint")]
    #[test_case(&["box.jpg", "y.jpg"], "7_x.png" ; "hint extension kept")]
    #[test_case(&["a_b.jpg", "zzz.jpg"], "7_a.png" ; "short tail does not match longer stem")]
    #[test_case(&["9_red_shoe.png", "boot.png"], "7_red_shoe.png" ; "tail with extension is not inside stem")]
    fn test_no_match(names: &[&str], hint: &str) {
        assert!(resolve_image(&files(names), hint).is_none());
    }

    #[test]
    fn test_empty_stem_never_matches() {
        let listing = files(&["b.png", "c.png"]);
        assert!(resolve_image(&listing, "7_.png").is_none());

        let listing = files(&[".png", "b.png"]);
        assert!(resolve_image(&listing, "7_x.png").is_none());
    }

    #[test]
    fn test_fuzzy_is_heuristic() {
        assert!(MatchStrategy::Fuzzy.is_heuristic());
        assert!(MatchStrategy::SoleFile.is_heuristic());
        assert!(!MatchStrategy::Exact.is_heuristic());
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", ".DS_Store"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();

        let folder = ImageFolder::scan(dir.path());
        assert!(folder.is_present());
        assert_eq!(folder.len(), 2);
        assert_eq!(folder.resolve("3_a.png").unwrap().file_name, "a.png");
        assert_eq!(folder.path_of("a.png"), dir.path().join("a.png"));
    }

    #[test]
    fn test_scan_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = ImageFolder::scan(&dir.path().join("images"));
        assert!(!folder.is_present());
        assert!(folder.is_empty());
    }
}
