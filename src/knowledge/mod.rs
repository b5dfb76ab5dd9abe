//! Knowledge store — the owner profile every answer is drawn from.
//!
//! Loaded once at startup from a TOML file (default `config/knowledge.toml`)
//! and shared read-only as `Arc<KnowledgeBase>`. Nothing in the crate mutates
//! a `KnowledgeBase` after [`load`] returns, so it is shared across sessions
//! and tasks without locks.
//!
//! Field order inside each list is significant: the intent resolver breaks
//! score ties by position, and every formatted reply lists entries in file
//! order.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;

/// Who the knowledge base describes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Owner {
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A labelled external profile link (LinkedIn, GitHub…).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contact {
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub links: Vec<ContactLink>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub link_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExperienceEntry {
    pub role: String,
    pub company: String,
    pub period: String,
    #[serde(default)]
    pub points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub school: String,
    pub period: String,
    #[serde(default)]
    pub extra: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
}

/// One skills category. Stored as a list rather than a map so the author's
/// ordering survives deserialization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkillGroup {
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Optional hand-written replacements for generated quick-reply answers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuickAnswers {
    #[serde(default)]
    pub work: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

/// The full knowledge store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeBase {
    pub owner: Owner,
    pub summary: String,
    pub contact: Contact,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Vec<SkillGroup>,
    #[serde(default)]
    pub quick_answers: QuickAnswers,
}

impl KnowledgeBase {
    /// Parse a knowledge base from TOML text and validate it.
    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        let kb: KnowledgeBase =
            toml::from_str(text).map_err(|e| AppError::Knowledge(format!("parse error: {e}")))?;
        kb.validate()?;
        Ok(kb)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.owner.name.trim().is_empty() {
            return Err(AppError::Knowledge("owner.name must not be empty".into()));
        }
        if let Some((i, _)) = self
            .projects
            .iter()
            .enumerate()
            .find(|(_, p)| p.title.trim().is_empty())
        {
            return Err(AppError::Knowledge(format!("projects[{i}] has an empty title")));
        }
        if let Some((i, _)) = self
            .experience
            .iter()
            .enumerate()
            .find(|(_, e)| e.role.trim().is_empty() || e.company.trim().is_empty())
        {
            return Err(AppError::Knowledge(format!(
                "experience[{i}] needs both role and company"
            )));
        }
        Ok(())
    }
}

/// Read and validate the knowledge file at `path`.
pub fn load(path: &Path) -> Result<KnowledgeBase, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("cannot read {}: {e}", path.display())))?;
    let kb = KnowledgeBase::from_toml(&text)
        .map_err(|e| AppError::Knowledge(format!("{}: {e}", path.display())))?;
    debug!(
        path = %path.display(),
        projects = kb.projects.len(),
        experience = kb.experience.len(),
        education = kb.education.len(),
        skill_groups = kb.skills.len(),
        "knowledge base loaded"
    );
    Ok(kb)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Small self-contained knowledge base for unit tests.
#[cfg(test)]
impl KnowledgeBase {
    pub fn test_default() -> Self {
        const TOML: &str = r#"
summary = "Engineer who builds small, reliable tools."

[owner]
name = "Ada Example"
location = "Mumbai"

[contact]
email = "ada@example.com"
phone = "5550100"
links = [
  { label = "LinkedIn", url = "https://www.linkedin.com/in/ada-example/" },
  { label = "GitHub", url = "https://github.com/ada-example" },
]

[[projects]]
title = "Lane Detection System"
subtitle = "ML Implementation based on IEEE Paper"
description = "Tiny U-Net lane segmentation."
tags = ["ML", "PyTorch", "Computer Vision"]

[[projects]]
title = "E-Waste Locator"
subtitle = "Location-based disposal facilities"
description = "Finds the nearest authorized disposal facility."
tags = ["Web", "Maps"]
link = "https://ewaste.example.vercel.app"
link_label = "Live demo"

[[experience]]
role = "Web Development Head"
company = "Somaiya Voices"
period = "April 2024 – April 2025"
points = ["Led the web team.", "Ran recruitment."]

[[experience]]
role = "User Acceptance Testing Intern"
company = "MAIDC"
period = "Jan 2024 – May 2024"
points = ["Tested the public website."]

[[education]]
degree = "Bachelor of Technology"
school = "KJ Somaiya College of Engineering"
period = "2023 – present"
extra = "Honours in AI for Cyber Security"
score = "SGPA: 9.5"

[[education]]
degree = "HSC, Science"
school = "Junior College"
period = "2021 – 2023"

[[skills]]
category = "Languages"
items = ["C/C++", "Python", "Java"]

[[skills]]
category = "Web & DB"
items = ["React.js", "MySQL"]
"#;
        KnowledgeBase::from_toml(TOML).expect("test knowledge base must parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_parses_in_order() {
        let kb = KnowledgeBase::test_default();
        assert_eq!(kb.owner.name, "Ada Example");
        assert_eq!(kb.projects.len(), 2);
        assert_eq!(kb.projects[0].title, "Lane Detection System");
        assert_eq!(kb.projects[1].link_label.as_deref(), Some("Live demo"));
        assert_eq!(kb.skills[0].category, "Languages");
        assert_eq!(kb.contact.links.len(), 2);
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let kb = KnowledgeBase::from_toml(
            r#"
summary = "s"
[owner]
name = "N"
[contact]
email = "n@example.com"
phone = "1"
"#,
        )
        .unwrap();
        assert!(kb.projects.is_empty());
        assert!(kb.experience.is_empty());
        assert!(kb.contact.links.is_empty());
        assert_eq!(kb.quick_answers, QuickAnswers::default());
    }

    #[test]
    fn empty_project_title_rejected() {
        let err = KnowledgeBase::from_toml(
            r#"
summary = "s"
[owner]
name = "N"
[contact]
email = "n@example.com"
phone = "1"
[[projects]]
title = "  "
subtitle = "x"
description = "y"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("projects[0]"));
    }

    #[test]
    fn malformed_toml_is_knowledge_error() {
        let err = KnowledgeBase::from_toml("summary = [").unwrap_err();
        assert!(matches!(err, AppError::Knowledge(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(
            br#"
summary = "s"
[owner]
name = "File Owner"
[contact]
email = "f@example.com"
phone = "2"
"#,
        )
        .unwrap();
        let kb = load(f.path()).unwrap();
        assert_eq!(kb.owner.name, "File Owner");
    }

    #[test]
    fn load_missing_file_errors() {
        let err = load(Path::new("/nonexistent/knowledge.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
