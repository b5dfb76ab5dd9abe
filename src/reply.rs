//! Reply formatting — turns a [`MatchResult`] or [`Category`] into the text
//! shown to the user.
//!
//! Output uses a small token grammar understood by every channel (see
//! [`crate::markup`]):
//!
//! ```text
//! **label**                     emphasis (names, roles, titles, section labels)
//! https://…  mailto:…  tel:…    bare link tokens, never wrapped in [text](url)
//! ```
//!
//! Category answers are precomputed once per knowledge base in
//! [`CannedAnswers`]; entity answers are rendered per turn.

use crate::intent::{Category, MatchResult, MatchedEntity};
use crate::knowledge::{ExperienceEntry, KnowledgeBase, Project};

/// Exhaustive `Category → text` mapping built from a knowledge base.
#[derive(Debug, Clone)]
pub struct CannedAnswers {
    projects: String,
    work: String,
    about: String,
    skills: String,
    contact: String,
    education: String,
    unknown: String,
}

impl CannedAnswers {
    /// Build every category answer. Non-blank `quick_answers` in the
    /// knowledge base replace the generated text for their category. No
    /// answer is ever empty.
    pub fn build(kb: &KnowledgeBase) -> Self {
        let overrides = &kb.quick_answers;
        let pick = |o: &Option<String>| o.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            projects: format_project_list(kb),
            work: pick(&overrides.work).unwrap_or_else(|| format_work(kb)),
            about: pick(&overrides.about).unwrap_or_else(|| format_about(kb)),
            skills: pick(&overrides.skills).unwrap_or_else(|| format_skills(kb)),
            contact: pick(&overrides.contact).unwrap_or_else(|| format_contact(kb)),
            education: format_education(kb),
            unknown: format_help(kb),
        }
    }

    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Projects => &self.projects,
            Category::Work => &self.work,
            Category::About => &self.about,
            Category::Skills => &self.skills,
            Category::Contact => &self.contact,
            Category::Education => &self.education,
            Category::Unknown => &self.unknown,
        }
    }
}

/// Render the reply for a resolver result.
pub fn format(result: &MatchResult<'_>, canned: &CannedAnswers) -> String {
    match result.entity {
        Some(MatchedEntity::Project(project)) => format_project(project),
        Some(MatchedEntity::Experience(entry)) => format_experience(entry),
        None => canned.get(result.category).to_string(),
    }
}

pub fn format_project(project: &Project) -> String {
    let mut out = format!(
        "**{}** - {}\n\n{}",
        project.title, project.subtitle, project.description
    );
    if !project.tags.is_empty() {
        out.push_str(&format!("\n\nTech: {}", project.tags.join(", ")));
    }
    if let Some(link) = &project.link {
        let label = project.link_label.as_deref().unwrap_or("Link");
        out.push_str(&format!("\n\n{label}: {link}"));
    }
    out
}

pub fn format_experience(entry: &ExperienceEntry) -> String {
    let mut out = format!(
        "**{}** at **{}** ({})\n\n",
        entry.role, entry.company, entry.period
    );
    for point in &entry.points {
        out.push_str(&format!("• {point}\n"));
    }
    out.trim().to_string()
}

fn format_project_list(kb: &KnowledgeBase) -> String {
    if kb.projects.is_empty() {
        return format!("{} has no projects listed yet.", kb.owner.name);
    }
    let list: Vec<String> = kb
        .projects
        .iter()
        .map(|p| format!("• **{}** - {}", p.title, p.subtitle))
        .collect();
    format!(
        "Here are {}'s projects:\n\n{}\n\nAsk about any one for full details, e.g. \"Tell me about {}\".",
        kb.owner.name,
        list.join("\n"),
        kb.projects[0].title
    )
}

fn format_work(kb: &KnowledgeBase) -> String {
    if kb.experience.is_empty() {
        return format!("{} has no work history listed yet.", kb.owner.name);
    }
    let list: Vec<String> = kb
        .experience
        .iter()
        .map(|e| format!("• **{}** at **{}** ({})", e.role, e.company, e.period))
        .collect();
    format!(
        "{}'s work history:\n\n{}\n\nAsk about any role by company name for details.",
        kb.owner.name,
        list.join("\n")
    )
}

fn format_about(kb: &KnowledgeBase) -> String {
    let summary = kb.summary.trim();
    if !summary.is_empty() {
        return summary.to_string();
    }
    match kb.owner.tagline.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(tagline) => format!("**{}** - {tagline}", kb.owner.name),
        None => format!("{} has no summary listed yet.", kb.owner.name),
    }
}

fn format_education(kb: &KnowledgeBase) -> String {
    if kb.education.is_empty() {
        return format!("{} has no education listed yet.", kb.owner.name);
    }
    kb.education
        .iter()
        .map(|e| {
            let mut line = format!("**{}** - {} ({})", e.degree, e.school, e.period);
            if let Some(extra) = &e.extra {
                line.push_str(&format!(" - {extra}"));
            }
            if let Some(score) = &e.score {
                line.push_str(&format!(" · {score}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_skills(kb: &KnowledgeBase) -> String {
    let groups: Vec<String> = kb
        .skills
        .iter()
        .filter(|group| !group.items.is_empty())
        .map(|group| format!("**{}:** {}", group.category, group.items.join(", ")))
        .collect();
    if groups.is_empty() {
        return format!("{} has no skills listed yet.", kb.owner.name);
    }
    groups.join("\n\n")
}

fn format_contact(kb: &KnowledgeBase) -> String {
    let contact = &kb.contact;
    let mut out = format!(
        "You can reach {} at mailto:{} or tel:{}.",
        kb.owner.name, contact.email, contact.phone
    );
    if let Some(location) = &kb.owner.location {
        out.push_str(&format!(" Based in {location}."));
    }
    if !contact.links.is_empty() {
        let links: Vec<String> = contact
            .links
            .iter()
            .map(|l| format!("{}: {}", l.label, l.url))
            .collect();
        out.push_str("\n\n");
        out.push_str(&links.join(" · "));
    }
    out
}

fn format_help(kb: &KnowledgeBase) -> String {
    let titles: Vec<&str> = kb.projects.iter().map(|p| p.title.as_str()).collect();
    let specific = if titles.is_empty() {
        String::new()
    } else {
        format!("a **specific project** ({}), ", titles.join(", "))
    };
    format!(
        "I can tell you about {specific}the full list of **projects**, {}'s **work**, **education**, **skills**, or **contact**. Try asking for one by name or use the quick replies.",
        kb.owner.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::IntentResolver;

    fn setup() -> (KnowledgeBase, CannedAnswers) {
        let kb = KnowledgeBase::test_default();
        let canned = CannedAnswers::build(&kb);
        (kb, canned)
    }

    #[test]
    fn every_category_has_an_answer() {
        let (_, canned) = setup();
        for c in Category::ALL {
            assert!(!canned.get(c).trim().is_empty(), "{c:?} answer is empty");
        }
    }

    const SPARSE_KB: &str = r#"
summary = "  "

[owner]
name = "Bo Sparse"

[contact]
email = "bo@example.com"
phone = "555"

[[projects]]
title = "Alpha Tracker"
subtitle = "Tracks alphas"
description = "A tracker."

[[skills]]
category = "Languages"
items = []

[quick_answers]
about = "   "
"#;

    #[test]
    fn sparse_knowledge_base_still_answers_every_category() {
        let kb = KnowledgeBase::from_toml(SPARSE_KB).unwrap();
        let canned = CannedAnswers::build(&kb);
        for c in Category::ALL {
            assert!(!canned.get(c).trim().is_empty(), "{c:?} answer is empty");
        }
        assert_eq!(canned.get(Category::Education), "Bo Sparse has no education listed yet.");
        assert_eq!(canned.get(Category::Skills), "Bo Sparse has no skills listed yet.");
        assert_eq!(canned.get(Category::About), "Bo Sparse has no summary listed yet.");

        let result = IntentResolver::new(&kb).resolve("which college");
        assert_eq!(result.category, Category::Education);
        assert!(!format(&result, &canned).is_empty());
    }

    #[test]
    fn project_reply_has_title_tags_and_raw_link() {
        let (kb, _) = setup();
        let text = format_project(&kb.projects[1]);
        assert!(text.starts_with("**E-Waste Locator**"));
        assert!(text.contains("Tech: Web, Maps"));
        assert!(text.contains("Live demo: https://ewaste.example.vercel.app"));
        assert!(!text.contains("]("));
    }

    #[test]
    fn project_without_link_has_no_link_line() {
        let (kb, _) = setup();
        let text = format_project(&kb.projects[0]);
        assert!(!text.contains("Link:"));
        assert!(!text.contains("https://"));
    }

    #[test]
    fn resolved_titles_format_with_all_tags() {
        let (kb, canned) = setup();
        let resolver = IntentResolver::new(&kb);
        for p in &kb.projects {
            let text = format(&resolver.resolve(&p.title), &canned);
            assert!(text.contains(&p.title));
            for tag in &p.tags {
                assert!(text.contains(tag.as_str()), "missing tag {tag}");
            }
        }
    }

    #[test]
    fn experience_reply_lists_points() {
        let (kb, _) = setup();
        let text = format_experience(&kb.experience[0]);
        assert_eq!(
            text,
            "**Web Development Head** at **Somaiya Voices** (April 2024 – April 2025)\n\n\
             • Led the web team.\n• Ran recruitment."
        );
    }

    #[test]
    fn project_list_one_line_per_project_in_order() {
        let (kb, canned) = setup();
        let text = canned.get(Category::Projects);
        let bullets: Vec<&str> = text.lines().filter(|l| l.starts_with("• ")).collect();
        assert_eq!(bullets.len(), kb.projects.len());
        for (line, p) in bullets.iter().zip(&kb.projects) {
            assert!(line.contains(&p.title));
        }
    }

    #[test]
    fn education_one_paragraph_per_entry() {
        let (_, canned) = setup();
        let text = canned.get(Category::Education);
        let paras: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(paras.len(), 2);
        assert_eq!(
            paras[0],
            "**Bachelor of Technology** - KJ Somaiya College of Engineering (2023 – present) - Honours in AI for Cyber Security · SGPA: 9.5"
        );
        assert_eq!(paras[1], "**HSC, Science** - Junior College (2021 – 2023)");
    }

    #[test]
    fn skills_keep_group_order() {
        let (_, canned) = setup();
        assert_eq!(
            canned.get(Category::Skills),
            "**Languages:** C/C++, Python, Java\n\n**Web & DB:** React.js, MySQL"
        );
    }

    #[test]
    fn contact_uses_bare_scheme_links() {
        let (kb, canned) = setup();
        let text = canned.get(Category::Contact);
        assert!(text.contains("mailto:ada@example.com"));
        assert!(text.contains("tel:5550100"));
        for link in &kb.contact.links {
            assert!(text.contains(&link.url));
        }
        assert!(!text.contains("]("));
    }

    #[test]
    fn help_lists_categories_and_titles() {
        let (_, canned) = setup();
        let text = canned.get(Category::Unknown);
        for word in ["projects", "work", "education", "skills", "contact"] {
            assert!(text.contains(word), "help text missing {word}");
        }
        assert!(text.contains("Lane Detection System"));
    }

    #[test]
    fn quick_answer_override_wins() {
        let mut kb = KnowledgeBase::test_default();
        kb.quick_answers.work = Some("Open to opportunities.".into());
        let canned = CannedAnswers::build(&kb);
        assert_eq!(canned.get(Category::Work), "Open to opportunities.");
        assert!(canned.get(Category::About).contains("reliable tools"));
    }

    #[test]
    fn no_bracket_links_anywhere() {
        let (kb, canned) = setup();
        for c in Category::ALL {
            assert!(!canned.get(c).contains("]("));
        }
        for e in &kb.experience {
            assert!(!format_experience(e).contains("]("));
        }
    }
}
