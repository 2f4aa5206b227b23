//! yaml documents of a project directory
//!
//! [ProjectDocuments] reads documents relative to the project root and remembers every path it loaded, so errors
//! and nodes can point back at their source.
use crate::error::{Error, Result};
use crate::value::{self, Value};
use std::path::{Path, PathBuf};

/// A parsed document and where it came from
#[derive(Debug, Clone)]
pub struct Document {
    /// file name without extension, e.g. `master` for `Accounts/master.yaml`
    pub stem: String,
    pub path: PathBuf,
    pub value: Value,
}

#[derive(Debug)]
pub struct ProjectDocuments {
    root: PathBuf,
    sources: Vec<PathBuf>,
}

impl ProjectDocuments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sources: vec![],
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every document loaded so far, in load order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// `<name>.yaml` or `<name>.yml` below the project root, if present
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        ["yaml", "yml"]
            .iter()
            .map(|extension| self.root.join(format!("{name}.{extension}")))
            .find(|path| path.is_file())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<Document> {
        tracing::info!(path = %path.display(), "loading file");

        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let value = value::from_yaml_str(&contents).map_err(|source| Error::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        self.sources.push(path.to_path_buf());
        Ok(Document {
            stem: stem(path),
            path: path.to_path_buf(),
            value,
        })
    }

    /// All `.yaml`/`.yml` files of a directory below the root, sorted by file name
    ///
    /// A missing directory has no documents.
    pub fn load_directory(&mut self, dir: &str) -> Result<Vec<Document>> {
        let dir_path = self.root.join(dir);
        if !dir_path.is_dir() {
            tracing::debug!(path = %dir_path.display(), "no such directory");
            return Ok(vec![]);
        }

        let mut paths = vec![];
        let read_dir = std::fs::read_dir(&dir_path).map_err(|e| Error::io(&dir_path, e))?;
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| Error::io(&dir_path, e))?;
            let path = dir_entry.path();
            if !path.is_file() {
                continue;
            }

            let is_yaml = path
                .extension()
                .is_some_and(|extension| extension == "yaml" || extension == "yml");
            if is_yaml {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| self.load_file(path)).collect()
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn directory_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = dir.path().join("Accounts");
        std::fs::create_dir(&accounts).unwrap();
        std::fs::write(accounts.join("prod.yaml"), "name: prod").unwrap();
        std::fs::write(accounts.join("dev.yml"), "name: dev").unwrap();
        std::fs::write(accounts.join("notes.txt"), "ignored").unwrap();

        let mut documents = ProjectDocuments::new(dir.path());
        let loaded = documents.load_directory("Accounts").unwrap();
        let stems: Vec<_> = loaded.iter().map(|d| d.stem.as_str()).collect();
        assert_eq!(stems, vec!["dev", "prod"]);
        assert_eq!(documents.sources().len(), 2);
        assert_eq!(loaded[1].value.get("name"), Some(&Value::from("prod")));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut documents = ProjectDocuments::new(dir.path());
        assert!(documents.load_directory("Services").unwrap().is_empty());
        assert_eq!(documents.find("project"), None);
    }

    #[test]
    fn invalid_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("project.yaml"), "a: [").unwrap();
        let mut documents = ProjectDocuments::new(dir.path());
        let path = documents.find("project").unwrap();
        let err = documents.load_file(&path).unwrap_err();
        assert!(matches!(err, Error::Yaml { .. }));
        assert!(err.to_string().contains("project.yaml"));
    }
}
