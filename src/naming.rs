//! Filename <-> entity naming conventions.
//!
//! Data files are named after the plural of the entity they hold
//! (`users.json` holds `user` records). [`PluralNaming`] implements that
//! convention with suffix rules for regular English nouns. Irregular nouns
//! (`people`, `children`) and uncountables (`sheep`, `equipment`) are not
//! special-cased: they go through the same suffix rules and may come out
//! wrong. The same goes for singular nouns ending in a single `s` beyond the
//! listed ones (`alias`, `status`, `canvas`, `atlas`, `lens`) and the
//! `-ss`/`-us`/`-is` endings: `chaos` comes back as `chao`.
//! Deployments with such files should provide their own [`NamingConvention`].

use std::sync::LazyLock;

use regex::Regex;

/// Bidirectional mapping between a data file's name and its entity.
pub trait NamingConvention: Send + Sync {
    /// Entity name for a filename stem (the basename without its extension).
    fn to_entity(&self, stem: &str) -> String;

    /// Filename (with extension) that backs `entity`.
    fn to_filename(&self, entity: &str) -> String;
}

/// `users.json` <-> `user`.
#[derive(Debug, Clone)]
pub struct PluralNaming {
    extension: String,
}

impl PluralNaming {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Default for PluralNaming {
    fn default() -> Self {
        Self::new("json")
    }
}

impl NamingConvention for PluralNaming {
    fn to_entity(&self, stem: &str) -> String {
        singularize(stem)
    }

    fn to_filename(&self, entity: &str) -> String {
        if self.extension.is_empty() {
            pluralize(entity)
        } else {
            format!("{}.{}", pluralize(entity), self.extension)
        }
    }
}

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn compile(rules: &[(&str, &'static str)]) -> Vec<Rule> {
    rules
        .iter()
        .map(|(pattern, replacement)| Rule {
            // Patterns are literals in this file; a typo is a programming error.
            pattern: Regex::new(pattern).expect("invalid inflection rule"),
            replacement,
        })
        .collect()
}

// First match wins.
static PLURAL_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)(quiz)$", "${1}zes"),
        (r"(?i)^(ox)$", "${1}en"),
        (r"(?i)([ml])ouse$", "${1}ice"),
        (r"(?i)(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
        (r"(?i)(x|ch|ss|sh)$", "${1}es"),
        (r"(?i)([^aeiouy]|qu)y$", "${1}ies"),
        (r"(?i)(hive)$", "${1}s"),
        (r"(?i)(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
        (r"(?i)sis$", "ses"),
        (r"(?i)(buffal|tomat|potat)o$", "${1}oes"),
        (r"(?i)(alias|status|canvas|atlas|lens)$", "${1}es"),
        (r"(?i)(bu)s$", "${1}ses"),
        (r"(?i)(octop|vir)us$", "${1}i"),
        (r"(?i)s$", "s"),
        (r"$", "s"),
    ])
});

static SINGULAR_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)(quiz)zes$", "${1}"),
        (r"(?i)(matr)ices$", "${1}ix"),
        (r"(?i)(vert|ind)ices$", "${1}ex"),
        (r"(?i)^(ox)en$", "${1}"),
        (r"(?i)(alias|status|canvas|atlas|lens)(es)?$", "${1}"),
        (r"(?i)(octop|vir)i$", "${1}us"),
        (r"(?i)(cris)es$", "${1}is"),
        (r"(?i)(shoe)s$", "${1}"),
        (r"(?i)(o)es$", "${1}"),
        (r"(?i)(bus)es$", "${1}"),
        (r"(?i)([ml])ice$", "${1}ouse"),
        (r"(?i)(x|ch|ss|sh)es$", "${1}"),
        (r"(?i)(m)ovies$", "${1}ovie"),
        (r"(?i)(s)eries$", "${1}eries"),
        (r"(?i)([^aeiouy]|qu)ies$", "${1}y"),
        (r"(?i)([lr])ves$", "${1}f"),
        (r"(?i)(tive)s$", "${1}"),
        (r"(?i)(hive)s$", "${1}"),
        (r"(?i)([^f])ves$", "${1}fe"),
        (r"(?i)(analy|diagno|parenthe|progno|synop|the)ses$", "${1}sis"),
        (r"(?i)(n)ews$", "${1}ews"),
        (r"(?i)(ss|us|is)$", "${1}"),
        (r"(?i)s$", ""),
    ])
});

fn apply(rules: &[Rule], word: &str) -> String {
    for rule in rules {
        if rule.pattern.is_match(word) {
            return rule.pattern.replace(word, rule.replacement).into_owned();
        }
    }
    word.to_string()
}

/// Plural form of `word` using regular English suffix rules.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    apply(&PLURAL_RULES, word)
}

/// Singular form of `word`. Words with no recognised plural suffix come back unchanged.
pub fn singularize(word: &str) -> String {
    apply(&SINGULAR_RULES, word)
}
