//! Tag resolution: builds the overlay plan of a stack

use std::path::PathBuf;

use tracing::debug;

use super::error::AssembleError;
use crate::domain::{Plan, PlanEntry, Stack};
use crate::storage::lookup::{find_in, tag_fragment_names, tag_plugin_names, BASE_FRAGMENT_NAMES};
use crate::storage::{Project, SearchRoots};

/// Finds the base fragment and the per-tag fragment and plugin files
pub struct TagResolver<'a> {
    project: &'a Project,
}

impl<'a> TagResolver<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Returns one entry for the base plus one per tag, in tag order
    pub fn resolve(&self, stack: &Stack) -> Result<Plan, AssembleError> {
        let base = self.resolve_base(stack)?;
        debug!("Base fragment for '{}': {}", stack.name(), base.display());

        let roots = SearchRoots::for_stack(self.project, stack);
        let mut plan = Plan::new(base);

        for tag in stack.tags() {
            let fragment = roots.find_first(&tag_fragment_names(tag.name()));
            let plugin = roots.find_first(&tag_plugin_names(tag.name()));

            match (&fragment, &plugin) {
                (None, None) => debug!("Tag '{}' has no files, keeping a placeholder", tag),
                _ => debug!(
                    "Tag '{}': fragment={:?} plugin={:?}",
                    tag,
                    fragment.as_ref().map(|p| p.display().to_string()),
                    plugin.as_ref().map(|p| p.display().to_string())
                ),
            }

            plan.push(PlanEntry::for_tag(tag.clone(), fragment, plugin));
        }

        Ok(plan)
    }

    /// Stack directory first, then the app directory
    fn resolve_base(&self, stack: &Stack) -> Result<PathBuf, AssembleError> {
        let mut searched = vec![stack.dir().to_path_buf()];
        if let Some(app) = stack.app() {
            searched.push(app.dir());
        }

        searched
            .iter()
            .find_map(|dir| find_in(dir, &BASE_FRAGMENT_NAMES))
            .ok_or_else(|| AssembleError::MissingBaseFragment {
                stack: stack.name().to_string(),
                searched,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(dir: &Path, yaml: &str) -> Project {
        fs::write(dir.join("stackweave.yml"), yaml).unwrap();
        Project::load(dir).unwrap()
    }

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "services: {}\n").unwrap();
    }

    #[test]
    fn plan_has_one_entry_per_tag_plus_base() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), "stacks:\n  - path: web\n    tags: [db, proxy, empty]\n");
        touch(dir.path().join("web/docker-compose.yml"));
        touch(dir.path().join("web/docker-compose.db.yml"));
        touch(dir.path().join(".stackweave/plugins/db.jsonnet"));
        touch(dir.path().join(".stackweave/plugins/proxy.jsonnet"));

        let stack = project.stack("web").unwrap();
        let plan = TagResolver::new(&project).resolve(stack).unwrap();

        assert_eq!(plan.len(), 4);
        let entries = plan.entries();
        assert!(entries[0].tag.is_none());
        assert_eq!(entries[1].label(), "db");
        assert!(entries[1].fragment.is_some());
        assert!(entries[1].plugin.is_some());
        assert_eq!(entries[2].label(), "proxy");
        assert!(entries[2].is_pure_override());
        assert_eq!(entries[3].label(), "empty");
        assert!(entries[3].fragment.is_none() && entries[3].plugin.is_none());
    }

    #[test]
    fn base_falls_back_to_app_dir() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), "stacks:\n  - app: community:blog\n");
        let app_base = dir
            .path()
            .join(".stackweave/collections/community/blog/docker-compose.yml");
        touch(app_base.clone());

        let stack = project.stack("blog").unwrap();
        let plan = TagResolver::new(&project).resolve(stack).unwrap();

        assert_eq!(plan.base_fragment(), Some(app_base.as_path()));
    }

    #[test]
    fn stack_dir_beats_app_dir() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), "stacks:\n  - app: blog\n    tags: [db]\n");
        let app_dir = dir.path().join(".stackweave/collections/default/blog");
        touch(app_dir.join("docker-compose.yml"));
        touch(app_dir.join("docker-compose.db.yml"));
        touch(dir.path().join("blog/docker-compose.yml"));
        touch(dir.path().join("blog/docker-compose.db.yml"));

        let stack = project.stack("blog").unwrap();
        let plan = TagResolver::new(&project).resolve(stack).unwrap();

        assert_eq!(
            plan.base_fragment(),
            Some(dir.path().join("blog/docker-compose.yml").as_path())
        );
        assert_eq!(
            plan.entries()[1].fragment,
            Some(dir.path().join("blog/docker-compose.db.yml"))
        );
    }

    #[test]
    fn collection_plugins_are_last_resort() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), "stacks:\n  - app: blog\n    tags: [mail, db]\n");
        let collection = dir.path().join(".stackweave/collections/default");
        touch(collection.join("blog/docker-compose.yml"));
        touch(collection.join(".stackweave/plugins/mail.jsonnet"));
        touch(collection.join(".stackweave/plugins/db.jsonnet"));
        touch(dir.path().join(".stackweave/plugins/db.jsonnet"));

        let stack = project.stack("blog").unwrap();
        let plan = TagResolver::new(&project).resolve(stack).unwrap();

        assert_eq!(
            plan.entries()[1].plugin,
            Some(collection.join(".stackweave/plugins/mail.jsonnet"))
        );
        assert_eq!(
            plan.entries()[2].plugin,
            Some(dir.path().join(".stackweave/plugins/db.jsonnet"))
        );
    }

    #[test]
    fn missing_base_is_fatal() {
        let dir = TempDir::new().unwrap();
        let project = project(dir.path(), "stacks:\n  - app: blog\n");

        let stack = project.stack("blog").unwrap();
        let err = TagResolver::new(&project).resolve(stack).unwrap_err();

        match err {
            AssembleError::MissingBaseFragment { stack, searched } => {
                assert_eq!(stack, "blog");
                assert_eq!(searched.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
