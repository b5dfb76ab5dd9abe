//! Context bundle sent alongside the conversation to a remote provider.
//!
//! Flattens the knowledge base into a fixed set of text fields. The bundle is
//! computed once per engine and never shown to the end user.

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeBase;

/// Text-only projection of a [`KnowledgeBase`]. Field order is part of the
/// wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub summary: String,
    pub contact: String,
    pub projects: String,
    pub experience: String,
    pub education: String,
    pub skills: String,
}

/// Pure projection: equal input always yields identical output.
pub fn serialize(kb: &KnowledgeBase) -> ContextBundle {
    let mut contact = format!("Email: {}. Phone: {}.", kb.contact.email, kb.contact.phone);
    for link in &kb.contact.links {
        contact.push_str(&format!(" {}: {}.", link.label, link.url));
    }
    if let Some(location) = &kb.owner.location {
        contact.push_str(&format!(" Location: {location}."));
    }

    let projects = kb
        .projects
        .iter()
        .map(|p| {
            let mut line = format!(
                "Project: {}. Subtitle: {}. Description: {}. Tags: {}.",
                p.title,
                p.subtitle,
                p.description,
                p.tags.join(", ")
            );
            if let Some(link) = &p.link {
                line.push_str(&format!(" Link: {link}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let experience = kb
        .experience
        .iter()
        .map(|e| {
            format!(
                "Role: {}. Company: {}. Period: {}. Points: {}",
                e.role,
                e.company,
                e.period,
                e.points.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let education = kb
        .education
        .iter()
        .map(|e| {
            let mut line = format!("{} at {} ({})", e.degree, e.school, e.period);
            if let Some(extra) = &e.extra {
                line.push_str(&format!("; {extra}"));
            }
            if let Some(score) = &e.score {
                line.push_str(&format!("; {score}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    let skills = kb
        .skills
        .iter()
        .map(|g| format!("{}: {}", g.category, g.items.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    ContextBundle {
        summary: kb.summary.trim().to_string(),
        contact,
        projects,
        experience,
        education,
        skills,
    }
}
