//! Scenario suites: the single source of groups a run draws from.

use crate::result::{VitrineError, VitrineResult};
use crate::scenario::ScenarioGroup;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::with::singleton_map_recursive;
use std::path::Path;

/// Ordered collection of scenario groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    /// Suite name
    #[serde(default)]
    pub name: String,
    /// Groups, in run order
    #[serde(default)]
    pub groups: Vec<ScenarioGroup>,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Append a group
    #[must_use]
    pub fn group(mut self, group: ScenarioGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Parse a suite from YAML.
    ///
    /// Steps are written as single-key maps (`- click: { target: "#go" }`)
    /// and unit steps as bare names (`- go_back`).
    pub fn from_yaml(yaml: &str) -> VitrineResult<Self> {
        let suite: Self =
            singleton_map_recursive::deserialize(serde_yaml_ng::Deserializer::from_str(yaml))?;
        suite.check()?;
        Ok(suite)
    }

    /// Load a suite file
    pub fn from_file(path: &Path) -> VitrineResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Serialize to YAML in the same map form [`Suite::from_yaml`] reads
    pub fn to_yaml(&self) -> VitrineResult<String> {
        let mut out = Vec::new();
        {
            let mut serializer = serde_yaml_ng::Serializer::new(&mut out);
            singleton_map_recursive::serialize(self, &mut serializer)?;
        }
        String::from_utf8(out).map_err(|e| VitrineError::config(format!("suite export: {e}")))
    }

    /// Group names, in order
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Find a group by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ScenarioGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Restrict to one group, or keep all when `name` is `None`
    pub fn select(self, name: Option<&str>) -> VitrineResult<Self> {
        let Some(name) = name else {
            return Ok(self);
        };
        let available = self.group_names().iter().map(ToString::to_string).collect();
        let Self { name: suite, groups } = self;
        let groups: Vec<ScenarioGroup> = groups.into_iter().filter(|g| g.name == name).collect();
        if groups.is_empty() {
            return Err(VitrineError::UnknownGroup {
                name: name.to_string(),
                available,
            });
        }
        Ok(Self {
            name: suite,
            groups,
        })
    }

    /// Number of scenarios
    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.groups.iter().map(|g| g.scenarios.len()).sum()
    }

    /// Number of placeholder scenarios
    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| &g.scenarios)
            .filter(|s| s.is_empty())
            .count()
    }

    fn check(&self) -> VitrineResult<()> {
        let mut seen = Vec::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(VitrineError::config("group without a name"));
            }
            if seen.contains(&group.name.as_str()) {
                return Err(VitrineError::config(format!(
                    "duplicate group name {:?}",
                    group.name
                )));
            }
            seen.push(&group.name);
        }
        Ok(())
    }
}
