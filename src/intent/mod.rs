//! Intent resolution — maps a free-text query to one knowledge entity or a
//! category.
//!
//! Classification runs in a fixed priority order; the first step that
//! produces a result wins:
//!
//! ```text
//! 1. project scoring        (best score > 0, ties → earliest project)
//! 2. experience presence    (first entry whose company/role word appears)
//! 3. "list all projects"    (LIST_PROJECTS_PATTERNS)
//! 4. category rule table    (CATEGORY_RULES, in table order)
//! 5. Unknown
//! ```
//!
//! Specific entities come first because an entity answer is strictly more
//! informative than a category answer. All weights and keyword sets live in
//! [`rules`].

pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::knowledge::{ExperienceEntry, KnowledgeBase, Project};
use rules::{
    CATEGORY_RES, LIST_PROJECTS_RES, NICKNAME_BONUS, PROJECT_NICKNAMES, SUBTITLE_WORD_WEIGHT,
    TAG_WEIGHT, TITLE_WORD_WEIGHT, significant_words,
};

// ── Category ──────────────────────────────────────────────────────────────────

/// Fixed set of answer topics used when no specific entity matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Projects,
    Work,
    About,
    Skills,
    Contact,
    Education,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Projects,
        Category::Work,
        Category::About,
        Category::Skills,
        Category::Contact,
        Category::Education,
        Category::Unknown,
    ];

    /// Categories offered as quick-reply buttons, in display order.
    pub const QUICK_REPLIES: [Category; 4] =
        [Category::Work, Category::About, Category::Skills, Category::Contact];

    /// Stable identifier used by quick-reply selections and the HTTP API.
    pub fn id(self) -> &'static str {
        match self {
            Category::Projects => "projects",
            Category::Work => "work",
            Category::About => "about",
            Category::Skills => "skills",
            Category::Contact => "contact",
            Category::Education => "education",
            Category::Unknown => "unknown",
        }
    }

    /// Human label for a quick-reply button.
    pub fn label(self) -> &'static str {
        match self {
            Category::Projects => "Projects",
            Category::Work => "Work",
            Category::About => "About me",
            Category::Skills => "Skills",
            Category::Contact => "Contact",
            Category::Education => "Education",
            Category::Unknown => "Help",
        }
    }

    /// Look up a category by its [`id`](Self::id), ignoring case and
    /// surrounding whitespace.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(id))
    }
}

// ── MatchResult ───────────────────────────────────────────────────────────────

/// A knowledge entity picked by the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchedEntity<'k> {
    Project(&'k Project),
    Experience(&'k ExperienceEntry),
}

/// Outcome of [`IntentResolver::resolve`].
///
/// `entity` is only ever `Some` with `score > 0`. With no entity, `category`
/// says which canned answer applies (`Projects` means the full list).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'k> {
    pub entity: Option<MatchedEntity<'k>>,
    pub score: u32,
    pub category: Category,
}

impl<'k> MatchResult<'k> {
    fn for_category(category: Category) -> Self {
        Self { entity: None, score: 0, category }
    }
}

// ── IntentResolver ────────────────────────────────────────────────────────────

/// Rule-based resolver over a borrowed knowledge base.
pub struct IntentResolver<'k> {
    knowledge: &'k KnowledgeBase,
}

impl<'k> IntentResolver<'k> {
    pub fn new(knowledge: &'k KnowledgeBase) -> Self {
        Self { knowledge }
    }

    /// Classify `query`. Never fails: blank or unmatched input yields
    /// [`Category::Unknown`].
    pub fn resolve(&self, query: &str) -> MatchResult<'k> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return MatchResult::for_category(Category::Unknown);
        }

        if let Some((project, score)) = self.best_project(&q) {
            trace!(title = %project.title, score, "project match");
            return MatchResult {
                entity: Some(MatchedEntity::Project(project)),
                score,
                category: Category::Projects,
            };
        }

        if let Some(entry) = self.first_experience(&q) {
            trace!(company = %entry.company, "experience match");
            return MatchResult {
                entity: Some(MatchedEntity::Experience(entry)),
                score: 1,
                category: Category::Work,
            };
        }

        if LIST_PROJECTS_RES.iter().any(|re| re.is_match(&q)) {
            return MatchResult::for_category(Category::Projects);
        }

        for (category, re) in CATEGORY_RES.iter() {
            if re.is_match(&q) {
                return MatchResult::for_category(*category);
            }
        }

        MatchResult::for_category(Category::Unknown)
    }

    /// Highest-scoring project with a positive score. The comparison is
    /// strict, so the earliest project keeps a tie.
    fn best_project(&self, q: &str) -> Option<(&'k Project, u32)> {
        let mut best: Option<(&'k Project, u32)> = None;
        for project in &self.knowledge.projects {
            let score = score_project(project, q);
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((project, score));
            }
        }
        best
    }

    fn first_experience(&self, q: &str) -> Option<&'k ExperienceEntry> {
        self.knowledge.experience.iter().find(|entry| {
            significant_words(&entry.company)
                .chain(significant_words(&entry.role))
                .any(|w| q.contains(&w))
        })
    }
}

/// Score one project against a lowercased query.
///
/// ```text
/// score = TITLE_WORD_WEIGHT    × title words in query
///       + SUBTITLE_WORD_WEIGHT × subtitle words in query
///       + TAG_WEIGHT           × tags in query
///       + NICKNAME_BONUS       × nicknames in both query and title
/// ```
///
/// Containment is substring-based, as the query is free text.
pub fn score_project(project: &Project, q: &str) -> u32 {
    let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);

    let title_hits = count(significant_words(&project.title).filter(|w| q.contains(w)).count());
    let subtitle_hits =
        count(significant_words(&project.subtitle).filter(|w| q.contains(w)).count());
    let tag_hits = count(
        project
            .tags
            .iter()
            .filter(|tag| q.contains(&tag.to_lowercase()))
            .count(),
    );
    let title = project.title.to_lowercase();
    let nickname_hits = count(
        PROJECT_NICKNAMES
            .iter()
            .filter(|nick| q.contains(*nick) && title.contains(*nick))
            .count(),
    );

    title_hits * TITLE_WORD_WEIGHT
        + subtitle_hits * SUBTITLE_WORD_WEIGHT
        + tag_hits * TAG_WEIGHT
        + nickname_hits * NICKNAME_BONUS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::test_default()
    }

    fn project_title<'k>(m: &MatchResult<'k>) -> Option<&'k str> {
        match m.entity {
            Some(MatchedEntity::Project(p)) => Some(p.title.as_str()),
            _ => None,
        }
    }

    #[test]
    fn every_title_resolves_to_its_project() {
        let kb = kb();
        let resolver = IntentResolver::new(&kb);
        for project in &kb.projects {
            let m = resolver.resolve(&project.title);
            assert!(m.score > 0, "{} scored zero", project.title);
            assert_eq!(project_title(&m), Some(project.title.as_str()));
        }
    }

    #[test]
    fn nickname_bonus_applies() {
        let kb = kb();
        let p = &kb.projects[0];
        // "lane" title word (2) + nickname (3)
        assert_eq!(score_project(p, "lane"), 5);
    }

    #[test]
    fn nickname_needs_title_match() {
        let kb = kb();
        // "e-waste" is a nickname but not in the lane project's title.
        assert_eq!(score_project(&kb.projects[0], "e-waste"), 0);
    }

    #[test]
    fn tags_and_subtitle_add_up() {
        let kb = kb();
        let p = &kb.projects[0];
        // tags: "pytorch" (1); subtitle words: "paper" (1)
        assert_eq!(score_project(p, "pytorch paper"), 2);
    }

    #[test]
    fn ties_resolve_to_first_project() {
        let kb = KnowledgeBase::from_toml(
            r#"
summary = "s"
[owner]
name = "N"
[contact]
email = "n@example.com"
phone = "1"
[[projects]]
title = "Alpha Tracker"
subtitle = "one"
description = "d"
[[projects]]
title = "Beta Tracker"
subtitle = "two"
description = "d"
"#,
        )
        .unwrap();
        let resolver = IntentResolver::new(&kb);
        let m = resolver.resolve("which tracker?");
        assert_eq!(m.score, TITLE_WORD_WEIGHT);
        assert_eq!(project_title(&m), Some("Alpha Tracker"));

        // A later project wins only with a strictly higher score.
        let m = resolver.resolve("beta tracker");
        assert_eq!(project_title(&m), Some("Beta Tracker"));
    }

    #[test]
    fn experience_matches_company_word() {
        let kb = kb();
        let m = IntentResolver::new(&kb).resolve("what did he do at maidc");
        match m.entity {
            Some(MatchedEntity::Experience(e)) => assert_eq!(e.company, "MAIDC"),
            other => panic!("expected experience, got {other:?}"),
        }
        assert_eq!(m.category, Category::Work);
        assert!(m.score > 0);
    }

    #[test]
    fn experience_in_list_order() {
        let kb = kb();
        // "head" only appears in the first entry's role; "intern" in the second.
        let m = IntentResolver::new(&kb).resolve("was he ever an intern or head");
        match m.entity {
            Some(MatchedEntity::Experience(e)) => assert_eq!(e.company, "Somaiya Voices"),
            other => panic!("expected experience, got {other:?}"),
        }
    }

    #[test]
    fn list_projects_beats_about() {
        let kb = kb();
        let m = IntentResolver::new(&kb).resolve("tell me about all projects");
        assert_eq!(m.entity, None);
        assert_eq!(m.category, Category::Projects);
    }

    #[test]
    fn category_priority_work_before_about() {
        let kb = kb();
        let m = IntentResolver::new(&kb).resolve("who do you work for");
        assert_eq!(m.category, Category::Work);
    }

    #[test]
    fn category_rules() {
        let kb = kb();
        let r = IntentResolver::new(&kb);
        assert_eq!(r.resolve("who is she").category, Category::About);
        assert_eq!(r.resolve("which language").category, Category::Skills);
        assert_eq!(r.resolve("how can I reach her").category, Category::Contact);
        assert_eq!(r.resolve("which college").category, Category::Education);
    }

    #[test]
    fn blank_and_gibberish_are_unknown() {
        let kb = kb();
        let r = IntentResolver::new(&kb);
        for q in ["", "   ", "zzqqxx"] {
            let m = r.resolve(q);
            assert_eq!(m.category, Category::Unknown, "query {q:?}");
            assert_eq!(m.entity, None);
            assert_eq!(m.score, 0);
        }
    }

    #[test]
    fn category_ids_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_id(c.id()), Some(c));
        }
        assert_eq!(Category::from_id(" Contact "), Some(Category::Contact));
        assert_eq!(Category::from_id("hobbies"), None);
    }
}
