use std::path::{Path, PathBuf};

use super::{expand_path, AppPaths};

/// Turns a stored asset reference (usually `company.logo`) into an existing file.
///
/// Absolute paths are taken as-is. Relative ones are tried against the
/// config directory, the logo store and the bundled assets, in that order.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    paths: &'a AppPaths,
}

impl<'a> PathResolver<'a> {
    pub fn new(paths: &'a AppPaths) -> Self {
        Self { paths }
    }

    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let reference = reference.strip_prefix("file://").unwrap_or(reference);

        let path = expand_path(reference);
        if path.is_absolute() {
            return path.is_file().then_some(path);
        }

        self.candidates(&path).into_iter().find(|p| p.is_file())
    }

    /// Whether `reference` already names a file inside the logo store.
    pub fn is_internal_logo(&self, reference: &str) -> bool {
        !has_separator(reference)
            && !reference.is_empty()
            && self.paths.logos_dir().join(reference).is_file()
    }

    fn candidates(&self, relative: &Path) -> Vec<PathBuf> {
        let mut out = vec![
            self.paths.config_dir().join(relative),
            self.paths.logos_dir().join(relative),
        ];
        if let Some(assets) = self.paths.assets_dir() {
            out.push(assets.join(relative));
        }
        out
    }
}

pub(crate) fn has_separator(reference: &str) -> bool {
    reference.contains('/') || reference.contains('\\')
}
