//! Rulebooks: declarative, prioritized rule tables
//!
//! A rulebook is a TOML document with a site name, welcome texts, an ordered
//! list of rules and a set of fallbacks. Rules carry an explicit `priority`;
//! evaluation order is descending priority, then declaration order.
//!
//! ```toml
//! site = "CivicSphere"
//!
//! [welcome]
//! home = "Welcome to {site}."
//! department = "How can I help you with {name}?"
//!
//! [[rules]]
//! id = "vehicle-fees"
//! scope = "vehicle"
//! priority = 40
//! any = ["fee"]
//! text = "The standard renewal fee is $75.00 [1]."
//! citations = [{ id = 1, source = "State Statute 45.2" }]
//!
//! [fallbacks.home]
//! text = "Please select a department."
//!
//! [fallbacks.default]
//! text = "Please be more specific."
//! ```
//!
//! Every text is validated at load time: citation ids are unique and
//! non-zero, and every `[n]` marker resolves.

use crate::render::unresolved_markers;
use crate::RulebookError;
use civic_domain::{Citation, Department, Response};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::debug;

const PORTAL: &str = include_str!("../rulebooks/portal.toml");
const INLINE: &str = include_str!("../rulebooks/inline.toml");

/// Rulebooks compiled into the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinRulebook {
    /// Greetings, home routing and per-department intents
    #[default]
    Portal,

    /// Compact inline-citation variant
    Inline,
}

impl BuiltinRulebook {
    /// Every built-in rulebook
    pub const ALL: [BuiltinRulebook; 2] = [BuiltinRulebook::Portal, BuiltinRulebook::Inline];

    /// Get the rulebook name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinRulebook::Portal => "portal",
            BuiltinRulebook::Inline => "inline",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            BuiltinRulebook::Portal => PORTAL,
            BuiltinRulebook::Inline => INLINE,
        }
    }
}

impl fmt::Display for BuiltinRulebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which departments a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every context, home included
    Any,
    /// Every context except home
    Departments,
    /// One context
    Only(Department),
}

impl Scope {
    /// Parse a scope as written in a rulebook
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "any" => Some(Scope::Any),
            "departments" => Some(Scope::Departments),
            other => Department::parse(other).map(Scope::Only),
        }
    }

    /// Whether a rule with this scope is consulted under `department`
    pub fn applies_to(&self, department: Department) -> bool {
        match self {
            Scope::Any => true,
            Scope::Departments => !department.is_home(),
            Scope::Only(d) => *d == department,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Any => f.write_str("any"),
            Scope::Departments => f.write_str("departments"),
            Scope::Only(d) => write!(f, "{}", d),
        }
    }
}

/// Keyword conditions a rule fires on
///
/// All matching is on lowercased input.
#[derive(Debug, Clone)]
pub struct Trigger {
    any: Vec<String>,
    all: Vec<Vec<String>>,
    words: Vec<String>,
    words_pattern: Option<Regex>,
    require: Vec<String>,
}

impl Trigger {
    /// Whether the normalized input satisfies this trigger
    ///
    /// Every `require` keyword must be present; then at least one of the
    /// `any`, `all` and `words` branches must match. A trigger with no
    /// branches matches whenever the requirements hold.
    pub fn matches(&self, normalized: &str) -> bool {
        if !self.require.iter().all(|k| normalized.contains(k.as_str())) {
            return false;
        }

        if self.any.is_empty() && self.all.is_empty() && self.words_pattern.is_none() {
            return true;
        }

        self.any.iter().any(|k| normalized.contains(k.as_str()))
            || self
                .all
                .iter()
                .any(|group| group.iter().all(|k| normalized.contains(k.as_str())))
            || self
                .words_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(normalized))
    }

    /// Human-readable summary of the trigger
    pub fn describe(&self) -> String {
        let mut branches = Vec::new();
        if !self.any.is_empty() {
            branches.push(format!("any of {}", quote_all(&self.any)));
        }
        for group in &self.all {
            branches.push(format!("all of {}", quote_all(group)));
        }
        if !self.words.is_empty() {
            branches.push(format!("word {}", quote_all(&self.words)));
        }

        let condition = if branches.is_empty() {
            "always".to_string()
        } else {
            branches.join(" | ")
        };

        if self.require.is_empty() {
            condition
        } else {
            format!("requires {} and {}", quote_all(&self.require), condition)
        }
    }
}

fn quote_all(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique identifier
    pub id: String,

    /// Contexts the rule applies to
    pub scope: Scope,

    /// Higher fires first
    pub priority: i32,

    /// Firing condition
    pub trigger: Trigger,

    /// Response template (`{site}`, `{name}`, `{brand}` not yet filled)
    pub response: Response,
}

/// A validated, evaluation-ordered rule table
#[derive(Debug, Clone)]
pub struct Rulebook {
    name: String,
    site: String,
    rules: Vec<Rule>,
    welcome_home: String,
    welcome_department: String,
    home_fallback: Response,
    default_fallback: Response,
    department_fallbacks: HashMap<Department, Response>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulebookFile {
    #[serde(default = "default_site")]
    site: String,
    welcome: WelcomeFile,
    #[serde(default)]
    rules: Vec<RuleFile>,
    #[serde(default)]
    fallbacks: BTreeMap<String, ResponseFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WelcomeFile {
    home: String,
    department: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    id: String,
    scope: String,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    any: Vec<String>,
    #[serde(default)]
    all: Vec<Vec<String>>,
    #[serde(default)]
    words: Vec<String>,
    #[serde(default)]
    require: Vec<String>,
    text: String,
    #[serde(default)]
    citations: Vec<CitationFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResponseFile {
    text: String,
    #[serde(default)]
    citations: Vec<CitationFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CitationFile {
    id: u32,
    source: String,
    #[serde(default = "default_url")]
    url: String,
}

fn default_site() -> String {
    "CivicSphere".to_string()
}

fn default_url() -> String {
    "#".to_string()
}

fn to_response(text: String, citations: Vec<CitationFile>) -> Response {
    Response::new(
        text,
        citations
            .into_iter()
            .map(|c| Citation::new(c.id, c.source, c.url))
            .collect(),
    )
}

/// Trim and lowercase; a blank keyword would otherwise drop out and widen the trigger
fn normalize_keywords(
    rule: &str,
    field: &'static str,
    keywords: Vec<String>,
) -> Result<Vec<String>, RulebookError> {
    keywords
        .into_iter()
        .map(|k| {
            let k = k.trim().to_lowercase();
            if k.is_empty() {
                Err(RulebookError::BlankKeyword {
                    rule: rule.to_string(),
                    field,
                })
            } else {
                Ok(k)
            }
        })
        .collect()
}

fn check_response(context: &str, response: &Response) -> Result<(), RulebookError> {
    if response.citations.iter().any(|c| c.id == 0) {
        return Err(RulebookError::ZeroCitation {
            context: context.to_string(),
        });
    }
    if let Some(&id) = response.duplicate_citation_ids().first() {
        return Err(RulebookError::DuplicateCitation {
            context: context.to_string(),
            id,
        });
    }
    if let Some(&id) = unresolved_markers(response).first() {
        return Err(RulebookError::UnresolvedMarker {
            context: context.to_string(),
            id,
        });
    }
    Ok(())
}

impl Rulebook {
    /// Load a built-in rulebook
    pub fn builtin(which: BuiltinRulebook) -> Result<Self, RulebookError> {
        Self::from_toml_str(which.as_str(), which.source())
    }

    /// Load a rulebook from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RulebookError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());
        Self::from_toml_str(&name, &contents)
    }

    /// Parse and validate a rulebook from TOML text
    pub fn from_toml_str(name: &str, contents: &str) -> Result<Self, RulebookError> {
        let file: RulebookFile = toml::from_str(contents)?;

        // `{site}` is filled after validation, so the site name must carry no markers
        if let Some(&id) = unresolved_markers(&Response::plain(file.site.clone())).first() {
            return Err(RulebookError::UnresolvedMarker {
                context: "site".to_string(),
                id,
            });
        }

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(file.rules.len());
        for raw in file.rules {
            if !seen.insert(raw.id.clone()) {
                return Err(RulebookError::DuplicateRule(raw.id));
            }

            let scope = Scope::parse(&raw.scope).ok_or_else(|| RulebookError::UnknownScope {
                rule: raw.id.clone(),
                scope: raw.scope.clone(),
            })?;

            let any = normalize_keywords(&raw.id, "any", raw.any)?;
            let all = raw
                .all
                .into_iter()
                .map(|group| {
                    if group.is_empty() {
                        return Err(RulebookError::BlankKeyword {
                            rule: raw.id.clone(),
                            field: "all",
                        });
                    }
                    normalize_keywords(&raw.id, "all", group)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let require = normalize_keywords(&raw.id, "require", raw.require)?;
            let words = normalize_keywords(&raw.id, "words", raw.words)?;
            let words_pattern = if words.is_empty() {
                None
            } else {
                let alternatives: Vec<_> = words.iter().map(|w| regex::escape(w)).collect();
                let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
                Some(Regex::new(&pattern).map_err(|source| RulebookError::InvalidWords {
                    rule: raw.id.clone(),
                    source,
                })?)
            };

            let response = to_response(raw.text, raw.citations);
            check_response(&raw.id, &response)?;

            rules.push(Rule {
                id: raw.id,
                scope,
                priority: raw.priority,
                trigger: Trigger {
                    any,
                    all,
                    words,
                    words_pattern,
                    require,
                },
                response,
            });
        }

        // Stable: equal priorities keep declaration order
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut fallbacks = file.fallbacks;
        let home_fallback = fallbacks
            .remove("home")
            .map(|f| to_response(f.text, f.citations))
            .ok_or(RulebookError::MissingFallback("home"))?;
        check_response("fallbacks.home", &home_fallback)?;

        let default_fallback = fallbacks
            .remove("default")
            .map(|f| to_response(f.text, f.citations))
            .ok_or(RulebookError::MissingFallback("default"))?;
        check_response("fallbacks.default", &default_fallback)?;

        let mut department_fallbacks = HashMap::new();
        for (key, raw) in fallbacks {
            let department = Department::parse(&key)
                .filter(|d| !d.is_home())
                .ok_or_else(|| RulebookError::UnknownFallback(key.clone()))?;
            let response = to_response(raw.text, raw.citations);
            check_response(&format!("fallbacks.{}", key), &response)?;
            department_fallbacks.insert(department, response);
        }

        check_response("welcome.home", &Response::plain(file.welcome.home.clone()))?;
        check_response("welcome.department", &Response::plain(file.welcome.department.clone()))?;

        debug!("Loaded rulebook '{}' with {} rules", name, rules.len());

        Ok(Self {
            name: name.to_string(),
            site: file.site,
            rules,
            welcome_home: file.welcome.home,
            welcome_department: file.welcome.department,
            home_fallback,
            default_fallback,
            department_fallbacks,
        })
    }

    /// Rulebook name (built-in name or file stem)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Site name substituted for `{site}`
    pub fn site(&self) -> &str {
        &self.site
    }

    /// All rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules consulted under `department`, in evaluation order
    pub fn rules_for(&self, department: Department) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.scope.applies_to(department))
    }

    /// Response used when no rule fires (template form)
    pub fn fallback_for(&self, department: Department) -> &Response {
        if department.is_home() {
            return &self.home_fallback;
        }
        self.department_fallbacks
            .get(&department)
            .unwrap_or(&self.default_fallback)
    }

    /// Welcome text template for a fresh partition
    pub fn welcome_for(&self, department: Department) -> &str {
        if department.is_home() {
            &self.welcome_home
        } else {
            &self.welcome_department
        }
    }

    /// Substitute `{site}`, `{name}` and `{brand}` for `department`
    pub fn fill(&self, template: &str, department: Department) -> String {
        let profile = department.profile();
        template
            .replace("{site}", &self.site)
            .replace("{name}", profile.name)
            .replace("{brand}", profile.brand)
    }

    /// Fill every template field of a response
    pub fn fill_response(&self, template: &Response, department: Department) -> Response {
        Response::new(
            self.fill(&template.text, department),
            template
                .citations
                .iter()
                .map(|c| {
                    Citation::new(
                        c.id,
                        self.fill(&c.source, department),
                        self.fill(&c.url, department),
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [welcome]
        home = "Welcome to {site}."
        department = "How can I help you with {name}?"

        [[rules]]
        id = "low"
        scope = "any"
        priority = 1
        any = ["fee"]
        text = "low"

        [[rules]]
        id = "high"
        scope = "vehicle"
        priority = 9
        any = ["fee"]
        text = "high"

        [[rules]]
        id = "low-twin"
        scope = "any"
        priority = 1
        any = ["fee"]
        text = "twin"

        [fallbacks.home]
        text = "home fallback"

        [fallbacks.default]
        text = "default fallback"

        [fallbacks.tax]
        text = "tax fallback [1]"
        citations = [{ id = 1, source = "FAQ" }]
    "#;

    #[test]
    fn test_builtins_load() {
        for which in BuiltinRulebook::ALL {
            let rulebook = Rulebook::builtin(which).unwrap();
            assert_eq!(rulebook.name(), which.as_str());
            assert!(!rulebook.rules().is_empty());
        }
    }

    #[test]
    fn test_priority_then_declaration_order() {
        let rulebook = Rulebook::from_toml_str("t", MINIMAL).unwrap();
        let ids: Vec<_> = rulebook.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low", "low-twin"]);

        let home: Vec<_> = rulebook.rules_for(Department::Home).map(|r| r.id.as_str()).collect();
        assert_eq!(home, vec!["low", "low-twin"]);
    }

    #[test]
    fn test_fallback_selection() {
        let rulebook = Rulebook::from_toml_str("t", MINIMAL).unwrap();
        assert_eq!(rulebook.fallback_for(Department::Home).text, "home fallback");
        assert_eq!(rulebook.fallback_for(Department::Tax).text, "tax fallback [1]");
        assert_eq!(rulebook.fallback_for(Department::Housing).text, "default fallback");
    }

    #[test]
    fn test_templates() {
        let rulebook = Rulebook::from_toml_str("t", MINIMAL).unwrap();
        assert_eq!(
            rulebook.fill(rulebook.welcome_for(Department::Home), Department::Home),
            "Welcome to CivicSphere."
        );
        assert_eq!(
            rulebook.fill(rulebook.welcome_for(Department::Vehicle), Department::Vehicle),
            "How can I help you with Vehicle Services?"
        );
        assert_eq!(rulebook.fill("{brand} User Guide", Department::Tax), "TaxCentral User Guide");
    }

    #[test]
    fn test_trigger_branches() {
        let rulebook = Rulebook::from_toml_str(
            "t",
            r#"
            [welcome]
            home = "w"
            department = "w"

            [[rules]]
            id = "docs"
            scope = "tax"
            any = ["document"]
            all = [["what", "need"]]
            text = "docs"

            [[rules]]
            id = "hello"
            scope = "any"
            words = ["hi", "good morning"]
            text = "hello"

            [[rules]]
            id = "file-tax"
            scope = "home"
            require = ["tax"]
            any = ["file", "how to"]
            text = "file"

            [[rules]]
            id = "always"
            scope = "housing"
            text = "always"

            [fallbacks.home]
            text = "h"

            [fallbacks.default]
            text = "d"
            "#,
        )
        .unwrap();

        let trigger = |id: &str| {
            rulebook
                .rules()
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.trigger.clone())
                .unwrap()
        };

        assert!(trigger("docs").matches("which documents?"));
        assert!(trigger("docs").matches("what do i need?"));
        assert!(!trigger("docs").matches("what now?"));

        assert!(trigger("hello").matches("hi there"));
        assert!(trigger("hello").matches("well, good morning!"));
        assert!(!trigger("hello").matches("this is chipped"));

        assert!(trigger("file-tax").matches("how to pay tax"));
        assert!(!trigger("file-tax").matches("how to file"));

        assert!(trigger("always").matches(""));
        assert_eq!(trigger("always").describe(), "always");
        assert_eq!(
            trigger("file-tax").describe(),
            "requires \"tax\" and any of \"file\", \"how to\""
        );
    }

    #[test]
    fn test_keywords_are_lowercased() {
        let rulebook = Rulebook::from_toml_str(
            "t",
            r#"
            [welcome]
            home = "w"
            department = "w"

            [[rules]]
            id = "upper"
            scope = "any"
            any = ["  Waitlist "]
            text = "x"

            [fallbacks.home]
            text = "h"

            [fallbacks.default]
            text = "d"
            "#,
        )
        .unwrap();
        assert!(rulebook.rules()[0].trigger.matches("is the waitlist open"));
    }

    fn with_rule(rule: &str) -> String {
        format!(
            r#"
            [welcome]
            home = "w"
            department = "w"

            {}

            [fallbacks.home]
            text = "h"

            [fallbacks.default]
            text = "d"
            "#,
            rule
        )
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = with_rule(
            r#"
            [[rules]]
            id = "a"
            scope = "any"
            text = "x"

            [[rules]]
            id = "a"
            scope = "any"
            text = "y"
            "#,
        );
        assert!(matches!(
            Rulebook::from_toml_str("t", &duplicate),
            Err(RulebookError::DuplicateRule(id)) if id == "a"
        ));

        let scope = with_rule(
            r#"
            [[rules]]
            id = "a"
            scope = "parks"
            text = "x"
            "#,
        );
        assert!(matches!(
            Rulebook::from_toml_str("t", &scope),
            Err(RulebookError::UnknownScope { .. })
        ));

        let dangling = with_rule(
            r#"
            [[rules]]
            id = "a"
            scope = "any"
            text = "see [2]"
            citations = [{ id = 1, source = "A" }]
            "#,
        );
        assert!(matches!(
            Rulebook::from_toml_str("t", &dangling),
            Err(RulebookError::UnresolvedMarker { id: 2, .. })
        ));

        let repeated = with_rule(
            r#"
            [[rules]]
            id = "a"
            scope = "any"
            text = "see [1]"
            citations = [{ id = 1, source = "A" }, { id = 1, source = "B" }]
            "#,
        );
        assert!(matches!(
            Rulebook::from_toml_str("t", &repeated),
            Err(RulebookError::DuplicateCitation { id: 1, .. })
        ));

        let zero = with_rule(
            r#"
            [[rules]]
            id = "a"
            scope = "any"
            text = "x"
            citations = [{ id = 0, source = "A" }]
            "#,
        );
        assert!(matches!(
            Rulebook::from_toml_str("t", &zero),
            Err(RulebookError::ZeroCitation { .. })
        ));

        for (field, trigger) in [
            ("any", r#"any = [" "]"#),
            ("all", r#"all = [["what", ""]]"#),
            ("all", "all = [[]]"),
            ("words", r#"words = ["	"]"#),
            ("require", r#"require = ["fee", "  "]"#),
        ] {
            let blank = with_rule(&format!(
                r#"
            [[rules]]
            id = "blank"
            scope = "any"
            priority = 99
            {}
            text = "x"
            "#,
                trigger
            ));
            match Rulebook::from_toml_str("t", &blank) {
                Err(RulebookError::BlankKeyword { rule, field: f }) => {
                    assert_eq!(rule, "blank");
                    assert_eq!(f, field);
                }
                other => panic!("expected blank keyword error for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_filing_answers_share_citations() {
        let rulebook = Rulebook::builtin(BuiltinRulebook::Portal).unwrap();
        let response = |id: &str| {
            rulebook
                .rules()
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.response.clone())
                .unwrap()
        };

        let home = response("home-filing");
        let tax = response("tax-filing");
        assert_eq!(home.text, tax.text);
        assert_eq!(home.citations, tax.citations);
    }

    #[test]
    fn test_site_with_marker_rejected() {
        let contents = r#"
            site = "Portal [7]"

            [welcome]
            home = "w"
            department = "w"

            [[rules]]
            id = "hi"
            scope = "home"
            any = ["hi"]
            text = "Welcome to {site}"

            [fallbacks.home]
            text = "h"

            [fallbacks.default]
            text = "d"
        "#;
        assert!(matches!(
            Rulebook::from_toml_str("t", contents),
            Err(RulebookError::UnresolvedMarker { id: 7, context }) if context == "site"
        ));

        // Bracketed text that is not a marker is fine
        let plain = contents.replace("Portal [7]", "Portal [beta]");
        let rulebook = Rulebook::from_toml_str("t", &plain).unwrap();
        assert_eq!(rulebook.site(), "Portal [beta]");
    }

    #[test]
    fn test_missing_fallbacks() {
        let no_default = r#"
            [welcome]
            home = "w"
            department = "w"

            [fallbacks.home]
            text = "h"
        "#;
        assert!(matches!(
            Rulebook::from_toml_str("t", no_default),
            Err(RulebookError::MissingFallback("default"))
        ));

        let unknown = with_rule("[fallbacks.parks]\ntext = \"p\"");
        assert!(matches!(
            Rulebook::from_toml_str("t", &unknown),
            Err(RulebookError::UnknownFallback(key)) if key == "parks"
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parks.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let rulebook = Rulebook::from_file(&path).unwrap();
        assert_eq!(rulebook.name(), "parks");
        assert_eq!(rulebook.site(), "CivicSphere");

        assert!(matches!(
            Rulebook::from_file(dir.path().join("missing.toml")),
            Err(RulebookError::FileRead(_))
        ));
    }
}
