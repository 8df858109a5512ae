//! Project references taken from the trigger event.

/// A path handed to the publisher by the editor.
///
/// Paths look like `/projA/index.html` (a file inside a project) or
/// `/projA` (a project directory). The project folder is always the first
/// path segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectReference {
    raw_path: String,
    is_directory: bool,
}

impl ProjectReference {
    pub fn new(raw_path: impl Into<String>, is_directory: bool) -> Self {
        Self {
            raw_path: raw_path.into(),
            is_directory,
        }
    }

    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// The path without its leading separator.
    pub fn normalized_path(&self) -> &str {
        self.raw_path.strip_prefix('/').unwrap_or(&self.raw_path)
    }

    /// First path segment, or `None` when no folder can be derived.
    ///
    /// A bare file name (`index.html`) has no folder; a bare directory name
    /// (`projA` with `is_directory`) is its own folder.
    pub fn folder_path(&self) -> Option<&str> {
        let normalized = self.normalized_path();
        let mut parts = normalized.split('/');
        let first = parts.next().filter(|segment| !segment.is_empty())?;
        if parts.next().is_none() && !self.is_directory {
            return None;
        }
        Some(first)
    }

    /// Last segment of the folder path.
    pub fn display_name(&self) -> Option<&str> {
        self.folder_path()
            .map(|folder| folder.rsplit('/').next().unwrap_or(folder))
    }

    /// Resolve into the project a session works on.
    pub fn resolve(&self) -> Option<ResolvedProject> {
        let folder = self.folder_path()?;
        Some(ResolvedProject {
            folder: folder.to_string(),
            name: self.display_name().unwrap_or(folder).to_string(),
            preview_path: self.normalized_path().to_string(),
        })
    }
}

/// A project whose folder is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedProject {
    /// Folder submitted to the backend (`projA`).
    pub folder: String,
    /// Human readable name; default title and new repository name.
    pub name: String,
    /// Path used to look up a preview for screenshots.
    pub preview_path: String,
}

impl ResolvedProject {
    /// Project re-entered through OAuth resumption, where only the folder
    /// survived the redirect.
    pub fn from_folder(folder: impl Into<String>) -> Self {
        let folder = folder.into();
        let folder = folder.trim_start_matches('/').to_string();
        let name = folder.rsplit('/').next().unwrap_or(&folder).to_string();
        Self {
            preview_path: folder.clone(),
            name,
            folder,
        }
    }
}
