use std::path::Path;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

/// Where a behavior document is read from
#[cfg_attr(test, automock)]
pub trait DocumentSource: Send + Sync {
    /// Identifies the document in logs and errors; the watcher observes it
    fn location(&self) -> &Path;

    fn read(&self) -> std::io::Result<String>;
}

/// Document stored in a single file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for FileSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}
