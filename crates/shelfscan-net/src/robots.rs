//! robots.txt parsing and path matching.
//!
//! Rules are grouped by the `User-agent` lines that precede them. A crawler
//! uses the groups naming its token (case-insensitive) and falls back to the
//! `*` groups. Among the matching rules the longest pattern wins, with `Allow`
//! winning ties. `*` matches any run of characters and a trailing `$` anchors
//! the pattern at the end of the path.

use crate::error::{NetError, Result};
use regex::Regex;

#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    pattern: String,
    regex: Option<Regex>,
}

impl Rule {
    fn new(allow: bool, pattern: &str) -> Self {
        Self {
            allow,
            pattern: pattern.to_string(),
            regex: wildcard_regex(pattern),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => path.starts_with(&self.pattern),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Parsed contents of one site's robots.txt.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    groups: Vec<Group>,
}

impl RobotsRules {
    /// Rules that permit every path.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse robots.txt content.
    ///
    /// Fails when the body is an HTML page, which sites commonly serve with a
    /// 200 status in place of a missing or blocked robots file.
    pub fn parse(content: &str) -> Result<Self> {
        let head = content.trim_start().to_ascii_lowercase();
        if head.starts_with("<!doctype html") || head.starts_with("<html") {
            return Err(NetError::MalformedRobots(
                "received an HTML document".to_string(),
            ));
        }

        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if !current.rules.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(value.to_ascii_lowercase());
                }
                "disallow" if !current.agents.is_empty() => {
                    if !value.is_empty() {
                        current.rules.push(Rule::new(false, value));
                    }
                }
                "allow" if !current.agents.is_empty() => {
                    if !value.is_empty() {
                        current.rules.push(Rule::new(true, value));
                    }
                }
                _ => {}
            }
        }

        if !current.agents.is_empty() {
            groups.push(current);
        }

        Ok(Self { groups })
    }

    /// Whether `agent` may fetch `path` (path plus optional query).
    #[must_use]
    pub fn is_allowed(&self, agent: &str, path: &str) -> bool {
        if path == "/robots.txt" {
            return true;
        }

        let agent = agent.to_ascii_lowercase();
        let named = self
            .groups
            .iter()
            .any(|group| group.agents.iter().any(|a| *a == agent));
        let wanted = if named { agent.as_str() } else { "*" };

        let applicable = self
            .groups
            .iter()
            .filter(|group| group.agents.iter().any(|a| a == wanted))
            .flat_map(|group| group.rules.iter());

        let mut best: Option<&Rule> = None;
        for rule in applicable.filter(|rule| rule.matches(path)) {
            best = match best {
                None => Some(rule),
                Some(current) if rule.pattern.len() > current.pattern.len() => Some(rule),
                Some(current)
                    if rule.pattern.len() == current.pattern.len() && rule.allow =>
                {
                    Some(rule)
                }
                Some(current) => Some(current),
            };
        }

        best.map_or(true, |rule| rule.allow)
    }

    /// Number of user-agent groups parsed.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    if !pattern.contains('*') && !pattern.ends_with('$') {
        return None;
    }

    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    let mut expr = format!("^{}", regex::escape(body).replace("\\*", ".*"));
    if anchored {
        expr.push('$');
    }
    Regex::new(&expr).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET_ROBOTS: &str = r"
# robots for a retail site
User-agent: *
Disallow: /checkout
Disallow: /account/
Allow: /account/help
Disallow: /*.pdf$
Disallow: /s?*sort=

User-agent: BadBot
User-agent: OtherBot
Disallow: /

User-agent: shelfscan
Disallow: /cart
";

    #[test]
    fn test_wildcard_group_applies_to_unknown_agent() {
        let rules = RobotsRules::parse(TARGET_ROBOTS).unwrap();
        assert!(rules.is_allowed("somecrawler", "/s?searchTerm=mouse"));
        assert!(!rules.is_allowed("somecrawler", "/checkout/step1"));
        assert!(!rules.is_allowed("somecrawler", "/account/orders"));
    }

    #[test]
    fn test_longest_match_wins() {
        let rules = RobotsRules::parse(TARGET_ROBOTS).unwrap();
        assert!(rules.is_allowed("somecrawler", "/account/help/returns"));
    }

    #[test]
    fn test_wildcard_and_anchor() {
        let rules = RobotsRules::parse(TARGET_ROBOTS).unwrap();
        assert!(!rules.is_allowed("somecrawler", "/manuals/mouse.pdf"));
        assert!(rules.is_allowed("somecrawler", "/manuals/mouse.pdf.html"));
        assert!(!rules.is_allowed("somecrawler", "/s?searchTerm=mouse&sort=price"));
    }

    #[test]
    fn test_specific_group_replaces_wildcard() {
        let rules = RobotsRules::parse(TARGET_ROBOTS).unwrap();
        assert!(!rules.is_allowed("ShelfScan", "/cart"));
        // Only the named group applies, so /checkout is open to it
        assert!(rules.is_allowed("shelfscan", "/checkout"));
    }

    #[test]
    fn test_multiple_agents_share_group() {
        let rules = RobotsRules::parse(TARGET_ROBOTS).unwrap();
        assert!(!rules.is_allowed("badbot", "/anything"));
        assert!(!rules.is_allowed("otherbot", "/"));
        assert_eq!(rules.group_count(), 3);
    }

    #[test]
    fn test_allow_wins_tie() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /page\nAllow: /page\n").unwrap();
        assert!(rules.is_allowed("shelfscan", "/page"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow:\n").unwrap();
        assert!(rules.is_allowed("shelfscan", "/anything"));
    }

    #[test]
    fn test_robots_file_always_allowed() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /\n").unwrap();
        assert!(!rules.is_allowed("shelfscan", "/"));
        assert!(rules.is_allowed("shelfscan", "/robots.txt"));
    }

    #[test]
    fn test_html_body_rejected() {
        let err = RobotsRules::parse("<!DOCTYPE html><html><body>Access Denied</body></html>")
            .unwrap_err();
        assert!(matches!(err, NetError::MalformedRobots(_)));
    }

    #[test]
    fn test_allow_all() {
        let rules = RobotsRules::allow_all();
        assert!(rules.is_allowed("shelfscan", "/checkout"));
        assert_eq!(rules.group_count(), 0);
    }
}
