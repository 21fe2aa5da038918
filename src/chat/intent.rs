//! Intent classification for user messages.
//!
//! The default classifier is an ordered keyword rule table. Rules are
//! evaluated top to bottom and the first match wins, so a message that
//! mentions both "skill gap" and "resume" is a skill-gap question.
//!
//! Order (highest priority first):
//! 1. SkillGap: ("skill" and "gap") or ("missing" and "skill")
//! 2. Resume: resume, cv, application, ats
//! 3. CareerJob: job, career, position, role, salary, pay
//! 4. LearningPlan: learning, roadmap, plan, study, course, training
//! 5. Interview: interview, prepare, technical, coding
//! 6. ImpactGoals: sdg, impact, sustainable, goal
//! 7. Help: help, what, how, "can you"
//!
//! Anything else is `General`. Matching is plain substring containment on
//! the lowercased, trimmed text.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// The closed set of intents a user message can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    SkillGap,
    Resume,
    CareerJob,
    LearningPlan,
    Interview,
    ImpactGoals,
    Help,
    General,
}

impl IntentCategory {
    /// Every category, in rule priority order with the default last.
    pub const ALL: [IntentCategory; 8] = [
        Self::SkillGap,
        Self::Resume,
        Self::CareerJob,
        Self::LearningPlan,
        Self::Interview,
        Self::ImpactGoals,
        Self::Help,
        Self::General,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SkillGap => "skill_gap",
            Self::Resume => "resume",
            Self::CareerJob => "career_job",
            Self::LearningPlan => "learning_plan",
            Self::Interview => "interview",
            Self::ImpactGoals => "impact_goals",
            Self::Help => "help",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps free text to exactly one intent. Implementations must be total.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> IntentCategory;
}

/// Keyword containment test against normalized (lowercased, trimmed) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordPredicate {
    /// At least one keyword is present.
    AnyOf(Vec<String>),
    /// Every keyword is present.
    AllOf(Vec<String>),
    /// At least one nested predicate matches.
    Either(Vec<KeywordPredicate>),
}

impl KeywordPredicate {
    pub fn any_of(words: &[&str]) -> Self {
        Self::AnyOf(lowercase_all(words))
    }

    pub fn all_of(words: &[&str]) -> Self {
        Self::AllOf(lowercase_all(words))
    }

    /// Evaluate against text that is already normalized.
    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Self::AnyOf(words) => words.iter().any(|w| normalized.contains(w.as_str())),
            Self::AllOf(words) => words.iter().all(|w| normalized.contains(w.as_str())),
            Self::Either(preds) => preds.iter().any(|p| p.matches(normalized)),
        }
    }
}

fn lowercase_all(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

/// One row of the rule table.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub category: IntentCategory,
    pub predicate: KeywordPredicate,
}

impl IntentRule {
    pub fn new(category: IntentCategory, predicate: KeywordPredicate) -> Self {
        Self {
            category,
            predicate,
        }
    }
}

/// Ordered keyword rule table. First matching rule wins.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<IntentRule>,
    fallback: IntentCategory,
}

impl KeywordClassifier {
    /// The career-guidance rule table.
    pub fn default_rules() -> Self {
        use IntentCategory::*;

        let rules = vec![
            IntentRule::new(
                SkillGap,
                KeywordPredicate::Either(vec![
                    KeywordPredicate::all_of(&["skill", "gap"]),
                    KeywordPredicate::all_of(&["missing", "skill"]),
                ]),
            ),
            IntentRule::new(
                Resume,
                KeywordPredicate::any_of(&["resume", "cv", "application", "ats"]),
            ),
            IntentRule::new(
                CareerJob,
                KeywordPredicate::any_of(&["job", "career", "position", "role", "salary", "pay"]),
            ),
            IntentRule::new(
                LearningPlan,
                KeywordPredicate::any_of(&[
                    "learning", "roadmap", "plan", "study", "course", "training",
                ]),
            ),
            IntentRule::new(
                Interview,
                KeywordPredicate::any_of(&["interview", "prepare", "technical", "coding"]),
            ),
            IntentRule::new(
                ImpactGoals,
                KeywordPredicate::any_of(&["sdg", "impact", "sustainable", "goal"]),
            ),
            IntentRule::new(
                Help,
                KeywordPredicate::any_of(&["help", "what", "how", "can you"]),
            ),
        ];

        Self {
            rules,
            fallback: General,
        }
    }

    /// A classifier with no rules; everything falls back to `General`.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            fallback: IntentCategory::General,
        }
    }

    /// Insert a rule at `priority` (0 = checked first). Clamped to the end of the table.
    pub fn insert_rule(&mut self, priority: usize, rule: IntentRule) {
        let at = priority.min(self.rules.len());
        self.rules.insert(at, rule);
    }

    /// Append a rule with the lowest priority.
    pub fn push_rule(&mut self, rule: IntentRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::default_rules()
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> IntentCategory {
        let normalized = text.trim().to_lowercase();

        let category = self
            .rules
            .iter()
            .find(|rule| rule.predicate.matches(&normalized))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback);

        debug!(category = %category, "Classified message");
        category
    }
}
