//! Name grammar
//!
//! Every tier kind below the root owns a [`NamePart`]: a template with one
//! `{}` placeholder that renders its identifier into a name segment, and a
//! pattern with one capture group that recovers it. A tier's full name is
//! the concatenation of its ancestors' segments and its own.
//!
//! Parsing is greedy per level with no lookahead across levels, so a
//! permissive pattern can swallow text meant for a deeper level. Such names
//! fail the round-trip check at construction instead of resolving wrongly.

use crate::error::HierarchyError;
use regex::Regex;

const PLACEHOLDER: &str = "{}";

/// Template and pattern for one level of the name
#[derive(Debug, Clone)]
pub struct NamePart {
    template: String,
    pattern: String,
    regex: Regex,
}

impl NamePart {
    /// Build from an explicit pattern
    ///
    /// The pattern is matched at the start of the remaining name only.
    ///
    /// # Errors
    /// `HierarchyError::Template` if `template` does not contain exactly one
    /// `{}`; `Pattern` / `CaptureGroups` for bad patterns.
    pub fn new(template: impl Into<String>, pattern: impl Into<String>) -> Result<Self, HierarchyError> {
        let template = template.into();
        let pattern = pattern.into();
        if template.matches(PLACEHOLDER).count() != 1 {
            return Err(HierarchyError::Template { template });
        }
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            HierarchyError::Pattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(HierarchyError::CaptureGroups {
                pattern,
                found: groups,
            });
        }
        Ok(Self {
            template,
            pattern,
            regex,
        })
    }

    /// Build the default pattern: the template's literal text escaped, with
    /// `{}` replaced by `id_regex`
    ///
    /// # Errors
    /// As [`NamePart::new`].
    pub fn from_id_regex(template: impl Into<String>, id_regex: &str) -> Result<Self, HierarchyError> {
        let template = template.into();
        let pattern = template
            .split(PLACEHOLDER)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(id_regex);
        Self::new(template, pattern)
    }

    /// Name template
    #[inline]
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Name pattern as declared (unanchored)
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render `id` into a name segment
    #[inline]
    #[must_use]
    pub fn compose(&self, id: &str) -> String {
        self.template.replacen(PLACEHOLDER, id, 1)
    }

    /// Match at the start of `rest`
    ///
    /// Returns the captured identifier and the number of bytes consumed.
    #[must_use]
    pub fn match_prefix<'a>(&self, rest: &'a str) -> Option<(&'a str, usize)> {
        let caps = self.regex.captures(rest)?;
        let id = caps.get(1)?;
        let consumed = caps.get(0).map_or(0, |m| m.end());
        Some((id.as_str(), consumed))
    }
}

/// Compose a full name from per-level parts and identifiers
///
/// Extra identifiers beyond `parts` are ignored.
#[must_use]
pub fn compose<'a, I>(parts: &[&NamePart], ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .iter()
        .zip(ids)
        .map(|(part, id)| part.compose(id))
        .collect()
}

/// Parse a full name level by level
///
/// Stops at the first level that does not match. Any unconsumed remainder
/// rejects the whole name, giving an empty result.
#[must_use]
pub fn parse(parts: &[&NamePart], name: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = name;
    for part in parts {
        let Some((id, consumed)) = part.match_prefix(rest) else {
            break;
        };
        ids.push(id.to_owned());
        rest = &rest[consumed..];
        if rest.is_empty() {
            break;
        }
    }
    if rest.is_empty() {
        ids
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> Vec<NamePart> {
        vec![
            NamePart::from_id_regex("WP{}", r"(\d+)").unwrap(),
            NamePart::from_id_regex(".{}", r"(\d+)").unwrap(),
            NamePart::from_id_regex("{}", r"([^0-9^-][^-]*)").unwrap(),
            NamePart::from_id_regex("-{}", r"(.+)").unwrap(),
        ]
    }

    #[test]
    fn default_patterns_escape_literals() {
        let p = parts();
        assert_eq!(p[0].pattern(), r"WP(\d+)");
        assert_eq!(p[1].pattern(), r"\.(\d+)");
        assert_eq!(p[2].pattern(), r"([^0-9^-][^-]*)");
        assert_eq!(p[3].pattern(), r"\-(.+)");
    }

    #[test]
    fn parse_full_name() {
        let owned = parts();
        let p: Vec<&NamePart> = owned.iter().collect();
        assert_eq!(parse(&p, "WP1.2c-meas"), vec!["1", "2", "c", "meas"]);
        assert_eq!(parse(&p, "WP2.3"), vec!["2", "3"]);
    }

    #[test]
    fn parse_rejects_unconsumed_remainder() {
        let owned = parts();
        let p: Vec<&NamePart> = owned.iter().collect();
        assert!(parse(&p, "P572.573foo-bar").is_empty());
        assert!(parse(&p, "WP1x").is_empty());
        assert!(parse(&p, "").is_empty());
    }

    #[test]
    fn compose_concatenates_segments() {
        let owned = parts();
        let p: Vec<&NamePart> = owned.iter().collect();
        assert_eq!(compose(&p, ["2", "3", "c", "data"]), "WP2.3c-data");
        assert_eq!(compose(&p[..1], ["7"]), "WP7");
    }

    #[test]
    fn template_needs_one_placeholder() {
        assert!(matches!(
            NamePart::new("WP", r"WP(\d+)"),
            Err(HierarchyError::Template { .. })
        ));
        assert!(matches!(
            NamePart::new("{}{}", r"(\d+)"),
            Err(HierarchyError::Template { .. })
        ));
    }

    #[test]
    fn pattern_needs_one_group() {
        assert!(matches!(
            NamePart::new("WP{}", r"WP\d+"),
            Err(HierarchyError::CaptureGroups { found: 0, .. })
        ));
        assert!(matches!(
            NamePart::new("WP{}", r"(W)P(\d+)"),
            Err(HierarchyError::CaptureGroups { found: 2, .. })
        ));
        assert!(matches!(
            NamePart::new("WP{}", r"WP(\d+"),
            Err(HierarchyError::Pattern { .. })
        ));
    }

    #[test]
    fn custom_literal_template() {
        let chapter = NamePart::from_id_regex("Chapter {}", r"(\d+)").unwrap();
        let page = NamePart::from_id_regex("pg. {}", r"(\d+)").unwrap();
        let p = [&chapter, &page];
        let name = compose(&p, ["3", "14"]);
        assert_eq!(name, "Chapter 3pg. 14");
        assert_eq!(parse(&p, &name), vec!["3", "14"]);
        assert!(parse(&p, "Chapter 3pgX 14").is_empty());
    }
}
