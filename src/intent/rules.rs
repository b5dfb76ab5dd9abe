//! Scoring weights and keyword tables for intent resolution.
//!
//! Everything that decides *which* answer a query gets lives here as data,
//! so the priority order is visible in one place and tests can assert on it.
//! The tables are compiled once into regexes and reused across calls.

use std::sync::LazyLock;

use regex::Regex;

use super::Category;

// =============================================================================
// Project scoring
// =============================================================================

/// Points per project-title word found in the query.
pub const TITLE_WORD_WEIGHT: u32 = 2;
/// Points per project-subtitle word found in the query.
pub const SUBTITLE_WORD_WEIGHT: u32 = 1;
/// Points per project tag found in the query.
pub const TAG_WEIGHT: u32 = 1;
/// Points per curated nickname shared by the query and the project title.
pub const NICKNAME_BONUS: u32 = 3;
/// Title, subtitle, role and company words shorter than this are ignored.
pub const MIN_WORD_CHARS: usize = 3;

/// Short names people use for individual projects.
///
/// A nickname only earns [`NICKNAME_BONUS`] for a project whose title
/// contains it, so an entry for a project that does not exist is inert.
pub const PROJECT_NICKNAMES: &[&str] = &[
    "lane", "e-waste", "traffic", "maze", "balloon", "campus", "plant",
];

/// Short names for employers and organisations in the work history.
pub const COMPANY_NICKNAMES: &[&str] = &[
    "buildup", "somaiya", "alumni", "maidc", "fresa", "suhani",
];

// =============================================================================
// Category keyword table
// =============================================================================

/// Patterns that ask for the whole project list. Checked before
/// [`CATEGORY_RULES`] so "tell me about all projects" is not an `About` query.
pub const LIST_PROJECTS_PATTERNS: &[&str] = &[
    r"(?i)\b(?:project|projects|built|what.*build)\b",
    r"(?i)\ball\s*project",
];

/// Ordered (category, keywords) rules. The first rule with a whole-word hit
/// wins. Keywords match whole words exactly; plurals are not folded.
pub const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (Category::Work, &["work", "job", "experience", "intern", "role", "company"]),
    (Category::About, &["about", "who", "summary", "intro", "yourself"]),
    (Category::Skills, &["skill", "tech", "language", "code", "react", "python"]),
    (Category::Contact, &["contact", "email", "phone", "reach", "linkedin", "github"]),
    (Category::Education, &["education", "college", "degree", "sgpa", "kjsce"]),
];

// =============================================================================
// Compiled patterns
// =============================================================================

pub(crate) static LIST_PROJECTS_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LIST_PROJECTS_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("invalid list-projects regex"))
        .collect()
});

pub(crate) static CATEGORY_RES: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    CATEGORY_RULES
        .iter()
        .map(|(category, keywords)| (*category, keyword_regex(keywords)))
        .collect()
});

/// High-confidence queries that the local resolver answers well on its own:
/// project and company nicknames plus "projects" / "all projects".
pub(crate) static SHORTCUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let nicknames: Vec<String> = PROJECT_NICKNAMES
        .iter()
        .chain(COMPANY_NICKNAMES)
        .map(|n| regex::escape(n))
        .collect();
    Regex::new(&format!(
        r"(?i)\b(?:all\s*)?projects?\b|\b(?:{})\b",
        nicknames.join("|")
    ))
    .expect("invalid shortcut regex")
});

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alts: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).expect("invalid category regex")
}

/// Lowercased words of `text` long enough to count toward a match.
pub(crate) fn significant_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_WORD_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_rules_keep_fixed_priority() {
        let order: Vec<Category> = CATEGORY_RULES.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![
                Category::Work,
                Category::About,
                Category::Skills,
                Category::Contact,
                Category::Education,
            ]
        );
    }

    #[test]
    fn every_rule_compiles() {
        assert_eq!(CATEGORY_RES.len(), CATEGORY_RULES.len());
        assert_eq!(LIST_PROJECTS_RES.len(), LIST_PROJECTS_PATTERNS.len());
    }

    #[test]
    fn keyword_regex_is_exact_whole_word() {
        let re = keyword_regex(&["skill", "role"]);
        assert!(re.is_match("one skill he has"));
        assert!(re.is_match("SKILL"));
        assert!(re.is_match("what role"));
        assert!(!re.is_match("what skills does he have"));
        assert!(!re.is_match("past roles"));
        assert!(!re.is_match("skillet"));
    }

    #[test]
    fn plural_keywords_do_not_change_priority() {
        let first = |q: &str| {
            CATEGORY_RES.iter().find(|(_, re)| re.is_match(q)).map(|(c, _)| *c)
        };
        assert_eq!(first("any jobs? who to contact"), Some(Category::About));
        assert_eq!(first("what are your skills"), None);
        assert_eq!(first("any job openings"), Some(Category::Work));
    }

    #[test]
    fn list_projects_patterns() {
        let hit = |q: &str| LIST_PROJECTS_RES.iter().any(|re| re.is_match(q));
        assert!(hit("show me his projects"));
        assert!(hit("what did he build"));
        assert!(hit("tell me about allprojects"));
        assert!(hit("anything he built?"));
        assert!(!hit("who is he"));
    }

    #[test]
    fn shortcut_matches_nicknames() {
        assert!(SHORTCUT_RE.is_match("Lane?"));
        assert!(SHORTCUT_RE.is_match("the e-waste thing"));
        assert!(SHORTCUT_RE.is_match("all projects"));
        assert!(SHORTCUT_RE.is_match("project"));
        assert!(SHORTCUT_RE.is_match("time at MAIDC"));
        assert!(!SHORTCUT_RE.is_match("how are you"));
        assert!(!SHORTCUT_RE.is_match("airplane"));
    }

    #[test]
    fn significant_words_drops_short_tokens() {
        let words: Vec<String> = significant_words("An IoT Plant of Mine").collect();
        assert_eq!(words, vec!["iot", "plant", "mine"]);
    }
}
