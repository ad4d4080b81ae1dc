//! Intent matcher over a rulebook

use crate::rulebook::Rulebook;
use civic_domain::traits::Responder;
use civic_domain::{Department, Response};
use std::sync::Arc;
use tracing::debug;

/// Outcome of matching one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    /// Id of the rule that fired; `None` when the fallback answered
    pub rule: Option<String>,

    /// Response with templates filled for the department
    pub response: Response,
}

/// First-match-wins responder over a [`Rulebook`]
///
/// Cloning is cheap; clones share the compiled rulebook.
///
/// # Examples
///
/// ```
/// use civic_assistant::{BuiltinRulebook, RuleMatcher, Rulebook};
/// use civic_domain::Department;
///
/// let matcher = RuleMatcher::new(Rulebook::builtin(BuiltinRulebook::Portal).unwrap());
/// let matched = matcher.match_input("What documents do I need to file?", Department::Tax);
///
/// assert_eq!(matched.rule.as_deref(), Some("tax-documents"));
/// assert!(matched.response.text.contains("W-2s"));
/// ```
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rulebook: Arc<Rulebook>,
}

impl RuleMatcher {
    /// Create a matcher over a validated rulebook
    pub fn new(rulebook: Rulebook) -> Self {
        Self {
            rulebook: Arc::new(rulebook),
        }
    }

    /// The underlying rulebook
    pub fn rulebook(&self) -> &Rulebook {
        &self.rulebook
    }

    /// Select the response for `input` under `department`
    ///
    /// Input is trimmed and lowercased, then rules applicable to the
    /// department are tried in evaluation order. Never fails: when nothing
    /// fires, the department's fallback is returned.
    pub fn match_input(&self, input: &str, department: Department) -> Matched {
        let normalized = input.trim().to_lowercase();

        match self
            .rulebook
            .rules_for(department)
            .find(|rule| rule.trigger.matches(&normalized))
        {
            Some(rule) => {
                debug!("Rule '{}' matched under {}", rule.id, department);
                Matched {
                    rule: Some(rule.id.clone()),
                    response: self.rulebook.fill_response(&rule.response, department),
                }
            }
            None => {
                debug!("No rule matched under {}, using fallback", department);
                Matched {
                    rule: None,
                    response: self
                        .rulebook
                        .fill_response(self.rulebook.fallback_for(department), department),
                }
            }
        }
    }

    /// Welcome text for a fresh partition
    pub fn welcome(&self, department: Department) -> String {
        self.rulebook
            .fill(self.rulebook.welcome_for(department), department)
    }
}

impl Responder for RuleMatcher {
    fn respond(&self, input: &str, department: Department) -> Response {
        self.match_input(input, department).response
    }
}
