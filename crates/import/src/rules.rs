use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tally_core::{CategoryId, Statement};

use crate::error::{ImportError, Result};
use crate::util::{normalize_identifier, normalize_text, present};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub field: RuleField,
    #[serde(default)]
    pub match_type: MatchType,
    pub pattern: String,
    pub category: CategoryId,
}

/// Statement field a rule is tested against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    Purpose,
    RemoteAccount,
    /// Always compared for equality, whatever the match type says.
    RemoteIban,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Contains,
    Prefix,
    Exact,
    Regex,
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchType::Contains),
            "prefix" | "starts_with" => Ok(MatchType::Prefix),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<ClassificationRule>,
}

/// Internal pairing of a rule with its precompiled regex (if applicable).
#[derive(Debug)]
struct CompiledRule {
    rule: ClassificationRule,
    compiled_regex: Option<regex::Regex>,
}

/// An immutable, ordered rule set. Replace the whole context to change rules;
/// callers holding the old one keep a consistent view.
#[derive(Debug, Default)]
pub struct ClassificationContext {
    rules: Vec<CompiledRule>,
}

impl ClassificationContext {
    pub fn new(rules: Vec<ClassificationRule>) -> Result<Self> {
        let mut compiled = rules
            .into_iter()
            .map(|rule| -> Result<CompiledRule> {
                let compiled_regex = match rule.match_type {
                    // Fingerprint text is folded, so regexes ignore case.
                    MatchType::Regex if rule.field != RuleField::RemoteIban => Some(
                        regex::RegexBuilder::new(&rule.pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| ImportError::Rules(format!("rule '{}': {e}", rule.name)))?,
                    ),
                    _ => None,
                };
                Ok(CompiledRule {
                    rule,
                    compiled_regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        // Highest priority first; the stable sort keeps registration order
        // among equal priorities.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Ok(Self { rules: compiled })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(toml_content)
            .map_err(|e| ImportError::Rules(format!("Failed to parse TOML: {e}")))?;
        Self::new(file.rules)
    }

    pub fn rules(&self) -> impl Iterator<Item = &ClassificationRule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    /// Suggests a category for `statement`, consulting and populating
    /// `cache`. A cached "no match" is returned as `None` without evaluating
    /// the rules again.
    pub fn classify(&self, statement: &Statement, cache: &CategoryCache) -> Option<CategoryId> {
        let key = cache.fingerprint(statement);
        if let Some(hit) = cache.lookup(&key) {
            return hit;
        }
        let resolved = self.find_matching_rule(&key).map(|r| r.category);
        tracing::debug!(
            "classified {:?} -> {:?}",
            key,
            resolved.map(|c| c.0)
        );
        cache.store(key, resolved);
        resolved
    }

    /// First matching rule in priority order, bypassing the cache.
    ///
    /// Rules only ever see the fingerprint, so every statement sharing a
    /// cache key gets the same answer.
    pub fn find_matching_rule(&self, key: &Fingerprint) -> Option<&ClassificationRule> {
        self.rules
            .iter()
            .find(|cr| rule_matches(cr, key))
            .map(|cr| &cr.rule)
    }
}

fn rule_matches(cr: &CompiledRule, key: &Fingerprint) -> bool {
    let rule = &cr.rule;
    let (text, pattern) = match rule.field {
        RuleField::Purpose => (key.purpose.as_str(), normalize_text(&rule.pattern)),
        RuleField::RemoteAccount => (key.remote_account.as_str(), normalize_identifier(&rule.pattern)),
        RuleField::RemoteIban => {
            return !key.remote_iban.is_empty()
                && key.remote_iban == normalize_identifier(&rule.pattern);
        }
    };
    if text.is_empty() {
        return false;
    }

    match rule.match_type {
        MatchType::Contains => text.contains(&pattern),
        MatchType::Prefix => text.starts_with(&pattern),
        MatchType::Exact => text == pattern,
        MatchType::Regex => cr
            .compiled_regex
            .as_ref()
            .is_some_and(|re| re.is_match(text)),
    }
}

/// Normalized cache key and the only input rules are evaluated on: remote
/// account, IBAN and a prefix of the normalized purpose. Absent fields are
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    remote_account: String,
    remote_iban: String,
    purpose: String,
}

impl Fingerprint {
    pub fn of(statement: &Statement, purpose_prefix_len: usize) -> Self {
        Self {
            remote_account: present(&statement.remote_account)
                .map(normalize_identifier)
                .unwrap_or_default(),
            remote_iban: present(&statement.remote_iban)
                .map(normalize_identifier)
                .unwrap_or_default(),
            purpose: present(&statement.purpose)
                .map(normalize_text)
                .unwrap_or_default()
                .chars()
                .take(purpose_prefix_len)
                .collect(),
        }
    }
}

pub const DEFAULT_PURPOSE_PREFIX_LEN: usize = 64;

/// Shared fingerprint -> category map. Concurrent writers for one key always
/// store the same value, so last writer wins.
#[derive(Debug)]
pub struct CategoryCache {
    entries: DashMap<Fingerprint, Option<CategoryId>>,
    purpose_prefix_len: usize,
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_PURPOSE_PREFIX_LEN)
    }
}

impl CategoryCache {
    pub fn new(purpose_prefix_len: usize) -> Self {
        Self {
            entries: DashMap::new(),
            purpose_prefix_len,
        }
    }

    pub fn fingerprint(&self, statement: &Statement) -> Fingerprint {
        Fingerprint::of(statement, self.purpose_prefix_len)
    }

    /// `None` on a miss, `Some(None)` for a cached "no match".
    pub fn lookup(&self, key: &Fingerprint) -> Option<Option<CategoryId>> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    pub fn store(&self, key: Fingerprint, category: Option<CategoryId>) {
        self.entries.insert(key, category);
    }

    /// Drops every cached resolution. Required whenever categories are
    /// renamed or removed.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
