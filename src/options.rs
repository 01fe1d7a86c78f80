use std::path::{Path, PathBuf};

/// User-supplied extraction settings. Unset fields fall back to defaults in
/// [`ExtractOptions::resolve`].
///
/// ```
/// use zipstrip::ExtractOptions;
///
/// let config = ExtractOptions::default()
///     .strip_components(1)
///     .resolve("downloads/tool-1.2.zip");
/// assert_eq!(config.destination(), std::path::Path::new("downloads/tool-1.2"));
/// assert_eq!(config.strip_components(), 1);
/// assert!(!config.delete_source());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Output directory; defaults to the source path without its extension
    pub destination: Option<PathBuf>,
    /// Leading path segments dropped from every entry (like `tar --strip-components`)
    pub strip_components: usize,
    /// Remove the archive once every entry was extracted
    pub delete_source: bool,
}

impl ExtractOptions {
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn strip_components(mut self, count: usize) -> Self {
        self.strip_components = count;
        self
    }

    pub fn delete_source(mut self, delete: bool) -> Self {
        self.delete_source = delete;
        self
    }

    /// Fill in defaults for `source`. Nothing is validated here; a bad
    /// destination shows up as an extraction error.
    pub fn resolve(self, source: impl AsRef<Path>) -> ExtractConfig {
        let source = source.as_ref();
        let destination = self
            .destination
            .unwrap_or_else(|| default_destination(source));

        ExtractConfig {
            destination,
            strip_components: self.strip_components,
            delete_source: self.delete_source,
        }
    }
}

/// `~/work/file.zip` extracts into `~/work/file`
fn default_destination(source: &Path) -> PathBuf {
    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    match source.file_stem() {
        Some(stem) => parent.join(stem),
        None => parent.to_path_buf(),
    }
}

/// Resolved settings for one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    destination: PathBuf,
    strip_components: usize,
    delete_source: bool,
}

impl ExtractConfig {
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn strip_components(&self) -> usize {
        self.strip_components
    }

    pub fn delete_source(&self) -> bool {
        self.delete_source
    }
}
