//! File lookup across prioritized search roots
//!
//! Roots are consulted in order and the first root holding a candidate wins.
//! Within a root, candidate names are tried in order.

use std::path::{Path, PathBuf};

use crate::domain::Stack;

use super::Project;

/// Base compose file names, in preference order
pub const BASE_FRAGMENT_NAMES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Static variable file names, in preference order
pub const VARS_FILE_NAMES: [&str; 2] = ["vars.yml", "vars.yaml"];

/// Extension of plugin files evaluated by the interpreter
pub const PLUGIN_EXTENSION: &str = "jsonnet";

/// Candidate fragment names for a tag: `docker-compose.<tag>.yml|yaml`
pub fn tag_fragment_names(tag: &str) -> Vec<String> {
    vec![
        format!("docker-compose.{}.yml", tag),
        format!("docker-compose.{}.yaml", tag),
    ]
}

/// Candidate plugin name for a tag: `<tag>.jsonnet`
pub fn tag_plugin_names(tag: &str) -> Vec<String> {
    vec![format!("{}.{}", tag, PLUGIN_EXTENSION)]
}

/// Returns the first candidate that exists as a file in `dir`
pub fn find_in<S: AsRef<str>>(dir: &Path, names: &[S]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name.as_ref()))
        .find(|path| path.is_file())
}

/// Returns every candidate that exists, directory by directory
pub fn find_all<S: AsRef<str>>(dirs: &[PathBuf], names: &[S]) -> Vec<PathBuf> {
    dirs.iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name.as_ref())))
        .filter(|path| path.is_file())
        .collect()
}

/// Ordered directories searched for tag files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoots {
    dirs: Vec<PathBuf>,
}

impl SearchRoots {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Stack dir, app dir, project plugin dir, collection tag dir.
    /// The app roots are skipped for stacks without an app.
    pub fn for_stack(project: &Project, stack: &Stack) -> Self {
        let mut dirs = vec![stack.dir().to_path_buf()];
        if let Some(app) = stack.app() {
            dirs.push(app.dir());
        }
        dirs.push(project.plugins_dir());
        if let Some(app) = stack.app() {
            dirs.push(app.tags_dir());
        }
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First match in the first root that has one
    pub fn find_first<S: AsRef<str>>(&self, names: &[S]) -> Option<PathBuf> {
        self.dirs.iter().find_map(|dir| find_in(dir, names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_root_wins() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("docker-compose.db.yaml"), "").unwrap();
        fs::write(b.join("docker-compose.db.yml"), "").unwrap();

        let roots = SearchRoots::new(vec![a.clone(), b]);
        // The .yaml in the first root beats the preferred .yml in the second
        assert_eq!(
            roots.find_first(&tag_fragment_names("db")),
            Some(a.join("docker-compose.db.yaml"))
        );
    }

    #[test]
    fn preferred_name_within_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "").unwrap();
        fs::write(dir.path().join("docker-compose.yaml"), "").unwrap();

        assert_eq!(
            find_in(dir.path(), &BASE_FRAGMENT_NAMES),
            Some(dir.path().join("docker-compose.yml"))
        );
    }

    #[test]
    fn missing_roots_are_skipped() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present");
        fs::create_dir_all(&present).unwrap();
        fs::write(present.join("proxy.jsonnet"), "{}").unwrap();

        let roots = SearchRoots::new(vec![dir.path().join("absent"), present.clone()]);
        assert_eq!(
            roots.find_first(&tag_plugin_names("proxy")),
            Some(present.join("proxy.jsonnet"))
        );
        assert_eq!(roots.find_first(&tag_plugin_names("other")), None);
    }

    #[test]
    fn find_all_keeps_directory_order() {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app");
        let stack = dir.path().join("stack");
        fs::create_dir_all(&app).unwrap();
        fs::create_dir_all(&stack).unwrap();
        fs::write(app.join("vars.yaml"), "").unwrap();
        fs::write(stack.join("vars.yml"), "").unwrap();
        fs::write(stack.join("vars.yaml"), "").unwrap();

        let found = find_all(&[app.clone(), stack.clone()], &VARS_FILE_NAMES);
        assert_eq!(
            found,
            vec![
                app.join("vars.yaml"),
                stack.join("vars.yml"),
                stack.join("vars.yaml")
            ]
        );
    }
}
