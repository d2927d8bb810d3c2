//! Skills directory provider.
//!
//! Scans a filesystem root once at startup for `*/SKILL.md` descriptor
//! files and exposes them as read-only MCP resources. A missing root yields
//! an empty catalog, not an error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::protocol::{ResourceContents, ResourceDefinition};

/// URI scheme skills are exposed under.
const URI_SCHEME: &str = "skill://";

/// One discovered skill.
#[derive(Debug, Clone)]
pub struct Skill {
    /// Directory name, used as the skill's identifier.
    pub name: String,
    /// Title from the first markdown heading, falling back to the name.
    pub title: String,
    /// Path of the SKILL.md descriptor.
    pub path: PathBuf,
    /// Descriptor modification time, when the filesystem reports one.
    pub modified: Option<DateTime<Utc>>,
}

impl Skill {
    /// The skill's resource URI.
    pub fn uri(&self) -> String {
        format!("{URI_SCHEME}{}", self.name)
    }
}

/// Read-only catalog of skills, populated once at startup.
#[derive(Debug, Default)]
pub struct SkillsCatalog {
    skills: Vec<Skill>,
}

impl SkillsCatalog {
    /// Scan `root` for skill directories containing a `SKILL.md`.
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            tracing::info!(root = %root.display(), "skills root absent; catalog is empty");
            return Ok(Self::default());
        }

        let mut skills = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let descriptor = entry.path().join("SKILL.md");
            if !descriptor.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let contents = std::fs::read_to_string(&descriptor)?;
            let title = first_heading(&contents).unwrap_or_else(|| name.clone());
            let modified = std::fs::metadata(&descriptor)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            tracing::debug!(skill = %name, modified = ?modified, "discovered skill");
            skills.push(Skill {
                name,
                title,
                path: descriptor,
                modified,
            });
        }

        skills.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!(count = skills.len(), "skills catalog scanned");
        Ok(Self { skills })
    }

    /// Number of skills in the catalog.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Resource listing for `resources/list`.
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        self.skills
            .iter()
            .map(|skill| ResourceDefinition {
                uri: skill.uri(),
                name: skill.name.clone(),
                description: Some(skill.title.clone()),
                mime_type: Some("text/markdown".into()),
            })
            .collect()
    }

    /// Read one skill's descriptor content for `resources/read`.
    pub async fn read(&self, uri: &str) -> Result<ResourceContents> {
        let skill = self
            .skills
            .iter()
            .find(|skill| skill.uri() == uri)
            .ok_or_else(|| Error::InvalidParams(format!("unknown resource: {uri}")))?;

        let text = tokio::fs::read_to_string(&skill.path).await?;
        Ok(ResourceContents {
            uri: skill.uri(),
            mime_type: Some("text/markdown".into()),
            text: Some(text),
        })
    }
}

/// First `# ` heading of a markdown document.
fn first_heading(markdown: &str) -> Option<String> {
    markdown.lines().find_map(|line| {
        line.strip_prefix("# ")
            .map(|rest| rest.trim().to_string())
            .filter(|title| !title.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(root: &Path, name: &str, body: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SKILL.md"), body).unwrap();
    }

    #[test]
    fn missing_root_yields_empty_catalog() {
        let catalog = SkillsCatalog::scan(Path::new("/nonexistent/skills")).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.resources().is_empty());
    }

    #[test]
    fn scan_discovers_skill_directories() {
        let root = tempfile::tempdir().unwrap();
        write_skill(root.path(), "schedule-export", "# Schedule Export\n\nSteps.");
        write_skill(root.path(), "inventory-count", "no heading here");
        // A directory without a descriptor is not a skill.
        std::fs::create_dir_all(root.path().join("notes")).unwrap();

        let catalog = SkillsCatalog::scan(root.path()).unwrap();
        assert_eq!(catalog.len(), 2);

        let resources = catalog.resources();
        assert_eq!(resources[0].uri, "skill://inventory-count");
        assert_eq!(resources[0].description.as_deref(), Some("inventory-count"));
        assert_eq!(resources[1].uri, "skill://schedule-export");
        assert_eq!(resources[1].description.as_deref(), Some("Schedule Export"));
    }

    #[tokio::test]
    async fn read_returns_descriptor_content() {
        let root = tempfile::tempdir().unwrap();
        write_skill(root.path(), "labor-report", "# Labor Report\n\nHow to pull it.");

        let catalog = SkillsCatalog::scan(root.path()).unwrap();
        let contents = catalog.read("skill://labor-report").await.unwrap();
        assert_eq!(contents.mime_type.as_deref(), Some("text/markdown"));
        assert!(contents.text.unwrap().contains("How to pull it."));

        let err = catalog.read("skill://missing").await.unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }
}
