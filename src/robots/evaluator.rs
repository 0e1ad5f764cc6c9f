//! Access decisions over a parsed robots.txt document
//!
//! The evaluator holds no document state; every query takes the document as an
//! argument, so a policy can be swapped by replacing the `PolicyDocument` value.

use crate::robots::parser::{AgentGroup, PolicyDocument, Rule, RuleKind};
use crate::url::matchable_path;

/// Answers allow/deny and crawl-delay questions for a [`PolicyDocument`]
///
/// # Precedence
///
/// Among all rules of the selected group(s) that match a path, the one with the
/// longest pattern decides. When an Allow and a Disallow of equal length both
/// match, the Allow wins. No matching rule means the path is allowed.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    default_crawl_delay: f64,
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self {
            default_crawl_delay: crate::DEFAULT_CRAWL_DELAY.as_secs_f64(),
        }
    }
}

impl PolicyEvaluator {
    /// Creates an evaluator that reports `default_crawl_delay` seconds for
    /// documents that declare no Crawl-delay
    pub fn new(default_crawl_delay: f64) -> Self {
        Self {
            default_crawl_delay,
        }
    }

    pub fn default_crawl_delay(&self) -> f64 {
        self.default_crawl_delay
    }

    /// Selects the group governing `agent`
    ///
    /// A group applies when its token is `*` or a case-insensitive substring of
    /// `agent`; the longest applicable token wins, and the first such group in
    /// document order is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_crawl::robots::{PolicyDocument, PolicyEvaluator};
    ///
    /// let doc = PolicyDocument::parse("User-agent: *\nDisallow: /\n\nUser-agent: TestBot\nAllow: /");
    /// let evaluator = PolicyEvaluator::default();
    /// let group = evaluator.best_group_for(&doc, "TestBot/1.0").unwrap();
    /// assert_eq!(group.agent(), "TestBot");
    /// ```
    pub fn best_group_for<'d>(&self, doc: &'d PolicyDocument, agent: &str) -> Option<&'d AgentGroup> {
        let agent = agent.to_lowercase();
        let mut best: Option<&AgentGroup> = None;

        for group in doc.groups() {
            let token = group.agent().to_lowercase();
            if token != "*" && !agent.contains(&token) {
                continue;
            }
            let longer = match best {
                Some(current) => token.len() > current.agent().len(),
                None => true,
            };
            if longer {
                best = Some(group);
            }
        }

        best.or_else(|| doc.groups().iter().find(|g| g.is_wildcard()))
    }

    /// All groups sharing the winning token, in document order
    ///
    /// Later blocks for the same token continue the first one, so their rules
    /// are evaluated together.
    fn groups_for<'d>(&self, doc: &'d PolicyDocument, agent: &str) -> Vec<&'d AgentGroup> {
        match self.best_group_for(doc, agent) {
            Some(best) => doc
                .groups()
                .iter()
                .filter(|g| g.agent().eq_ignore_ascii_case(best.agent()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns the rule that decides access for `path`, if any rule matches
    ///
    /// `path` may be a bare path (`/homes?x=1`) or a full URL.
    pub fn deciding_rule<'d>(
        &self,
        doc: &'d PolicyDocument,
        agent: &str,
        path: &str,
    ) -> Option<&'d Rule> {
        let groups = self.groups_for(doc, agent);
        if groups.iter().all(|g| g.rules().is_empty()) {
            return None;
        }

        let path = matchable_path(path);
        let mut decided: Option<&Rule> = None;

        for rule in groups.iter().flat_map(|g| g.rules()) {
            if !rule.matches(&path) {
                continue;
            }
            decided = match decided {
                None => Some(rule),
                Some(current) => {
                    let (new_len, cur_len) = (rule.specificity(), current.specificity());
                    let allow_breaks_tie = new_len == cur_len
                        && rule.kind() == RuleKind::Allow
                        && current.kind() == RuleKind::Disallow;
                    if new_len > cur_len || allow_breaks_tie {
                        Some(rule)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        decided
    }

    /// Checks whether `agent` may fetch `path`
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_crawl::robots::{PolicyDocument, PolicyEvaluator};
    ///
    /// let doc = PolicyDocument::parse("User-agent: *\nDisallow: /private/");
    /// let evaluator = PolicyEvaluator::default();
    /// assert!(!evaluator.is_allowed(&doc, "*", "/private/secret"));
    /// assert!(evaluator.is_allowed(&doc, "*", "/public"));
    /// ```
    pub fn is_allowed(&self, doc: &PolicyDocument, agent: &str, path: &str) -> bool {
        match self.deciding_rule(doc, agent, path) {
            Some(rule) => rule.kind() == RuleKind::Allow,
            None => true,
        }
    }

    /// Exact complement of [`is_allowed`](Self::is_allowed)
    pub fn is_disallowed(&self, doc: &PolicyDocument, agent: &str, path: &str) -> bool {
        !self.is_allowed(doc, agent, path)
    }

    /// Crawl delay in seconds for `agent`
    ///
    /// Returns the delay declared by the governing group, or the evaluator's
    /// default when the document declares none for this agent (including
    /// documents with no groups at all).
    pub fn crawl_delay_seconds_for(&self, doc: &PolicyDocument, agent: &str) -> f64 {
        self.groups_for(doc, agent)
            .iter()
            .find_map(|g| g.crawl_delay())
            .unwrap_or(self.default_crawl_delay)
    }

    /// Document-wide sitemap URLs
    pub fn sitemaps<'d>(&self, doc: &'d PolicyDocument) -> &'d [String] {
        doc.sitemaps()
    }
}
