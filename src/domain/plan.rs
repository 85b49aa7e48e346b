//! The overlay plan of a stack
//!
//! Entry 0 is always the untagged base; entries 1..N follow the stack's tags
//! in declared order. Tags without any file keep a placeholder entry so
//! positions stay stable in diagnostics.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::stack::Tag;

/// One step of the overlay plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// `None` for the base entry
    pub tag: Option<Tag>,

    /// Compose fragment merged by the engine
    pub fragment: Option<PathBuf>,

    /// Transform plugin evaluated by the interpreter
    pub plugin: Option<PathBuf>,
}

impl PlanEntry {
    pub fn base(fragment: PathBuf) -> Self {
        Self {
            tag: None,
            fragment: Some(fragment),
            plugin: None,
        }
    }

    pub fn for_tag(tag: Tag, fragment: Option<PathBuf>, plugin: Option<PathBuf>) -> Self {
        Self {
            tag: Some(tag),
            fragment,
            plugin,
        }
    }

    pub fn is_base(&self) -> bool {
        self.tag.is_none()
    }

    /// A plugin-only entry rewrites the merged document
    pub fn is_pure_override(&self) -> bool {
        self.fragment.is_none() && self.plugin.is_some()
    }

    /// Label used in logs: the tag name or `<base>`
    pub fn label(&self) -> &str {
        self.tag.as_ref().map(Tag::name).unwrap_or("<base>")
    }
}

/// Ordered list of plan entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    entries: Vec<PlanEntry>,
}

impl Plan {
    /// Starts a plan with its base entry
    pub fn new(base_fragment: PathBuf) -> Self {
        Self {
            entries: vec![PlanEntry::base(base_fragment)],
        }
    }

    pub fn push(&mut self, entry: PlanEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn base_fragment(&self) -> Option<&Path> {
        self.entries.first().and_then(|e| e.fragment.as_deref())
    }

    /// Fragment files in plan order
    pub fn fragments(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|e| e.fragment.clone())
            .collect()
    }

    /// Plugin files in plan order
    pub fn plugins(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|e| e.plugin.as_deref())
    }

    /// Entries whose plugin rewrites the document after the engine merge
    pub fn overrides(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_pure_override())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VarList;

    fn tag(name: &str, position: usize) -> Tag {
        Tag::new(name, position, VarList::default())
    }

    fn sample_plan() -> Plan {
        let mut plan = Plan::new(PathBuf::from("base.yml"));
        plan.push(PlanEntry::for_tag(tag("db", 1), Some("db.yml".into()), Some("db.jsonnet".into())));
        plan.push(PlanEntry::for_tag(tag("none", 2), None, None));
        plan.push(PlanEntry::for_tag(tag("proxy", 3), None, Some("proxy.jsonnet".into())));
        plan
    }

    #[test]
    fn base_entry_first() {
        let plan = sample_plan();
        assert_eq!(plan.len(), 4);
        assert!(plan.entries()[0].is_base());
        assert_eq!(plan.entries()[0].label(), "<base>");
        assert_eq!(plan.base_fragment(), Some(Path::new("base.yml")));
    }

    #[test]
    fn fragments_and_plugins_in_order() {
        let plan = sample_plan();
        assert_eq!(
            plan.fragments(),
            vec![PathBuf::from("base.yml"), PathBuf::from("db.yml")]
        );
        let plugins: Vec<_> = plan.plugins().collect();
        assert_eq!(plugins, vec![Path::new("db.jsonnet"), Path::new("proxy.jsonnet")]);
    }

    #[test]
    fn only_plugin_only_entries_override() {
        let plan = sample_plan();
        let labels: Vec<_> = plan.overrides().map(PlanEntry::label).collect();
        assert_eq!(labels, vec!["proxy"]);
    }
}
