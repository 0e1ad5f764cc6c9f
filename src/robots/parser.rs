//! Robots.txt parser implementation
//!
//! Turns raw robots.txt text into a [`PolicyDocument`]: an ordered list of per-agent
//! groups plus a document-wide sitemap list. Parsing never fails on malformed
//! lines; anything unusable is skipped with a warning.

use crate::robots::pattern::{normalize_pattern, PathPattern, PatternError};
use thiserror::Error;
use url::Url;

/// Default cap on the document-wide sitemap list
pub const DEFAULT_MAX_SITEMAPS: usize = 50;

/// Default cap on rules kept per user-agent group
pub const DEFAULT_MAX_RULES_PER_AGENT: usize = 1000;

/// Errors that make a policy body unusable as a whole
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("robots.txt is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidEncoding { valid_up_to: usize },
}

/// Whether a rule grants or denies access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Allow,
    Disallow,
}

/// A single Allow/Disallow directive
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    kind: RuleKind,
    matcher: PathPattern,
}

impl Rule {
    /// Builds a rule from a raw directive value
    pub fn new(kind: RuleKind, raw_pattern: &str) -> Result<Self, PatternError> {
        let pattern = normalize_pattern(raw_pattern)?;
        let matcher = PathPattern::compile(&pattern)?;
        Ok(Self {
            pattern,
            kind,
            matcher,
        })
    }

    /// The normalized pattern, always starting with `/`
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Pattern length in characters; longer patterns take precedence
    pub fn specificity(&self) -> usize {
        self.pattern.chars().count()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Directives declared for one user-agent token
#[derive(Debug, Clone)]
pub struct AgentGroup {
    agent: String,
    rules: Vec<Rule>,
    crawl_delay: Option<f64>,
    sitemaps: Vec<String>,
}

impl AgentGroup {
    fn new(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            rules: Vec::new(),
            crawl_delay: None,
            sitemaps: Vec::new(),
        }
    }

    /// The user-agent token as written in the document
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// True for the `*` default group
    pub fn is_wildcard(&self) -> bool {
        self.agent == "*"
    }

    /// Rules in document order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Declared Crawl-delay in seconds
    pub fn crawl_delay(&self) -> Option<f64> {
        self.crawl_delay
    }

    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

/// Bounds applied while parsing
#[derive(Debug, Clone, Copy)]
pub struct ParseLimits {
    pub max_sitemaps: usize,
    pub max_rules_per_agent: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_sitemaps: DEFAULT_MAX_SITEMAPS,
            max_rules_per_agent: DEFAULT_MAX_RULES_PER_AGENT,
        }
    }
}

/// Summary counts for a parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyStats {
    pub user_agents: usize,
    pub total_rules: usize,
    pub sitemaps: usize,
    pub user_agents_with_crawl_delay: usize,
}

/// A parsed robots.txt document
///
/// Built once per parse and never mutated afterwards. A document without groups
/// or rules allows everything.
#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    groups: Vec<AgentGroup>,
    sitemaps: Vec<String>,
}

impl PolicyDocument {
    /// Parses robots.txt content with the default limits
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_crawl::robots::PolicyDocument;
    ///
    /// let doc = PolicyDocument::parse("User-agent: *\nDisallow: /private/\nCrawl-delay: 2");
    /// assert_eq!(doc.groups().len(), 1);
    /// assert_eq!(doc.groups()[0].crawl_delay(), Some(2.0));
    /// ```
    pub fn parse(content: &str) -> Self {
        Self::parse_with_limits(content, &ParseLimits::default())
    }

    /// Parses a raw response body, rejecting bodies that are not UTF-8
    pub fn from_bytes(body: &[u8], limits: &ParseLimits) -> Result<Self, PolicyError> {
        let content = std::str::from_utf8(body).map_err(|e| PolicyError::InvalidEncoding {
            valid_up_to: e.valid_up_to(),
        })?;
        // A leading byte-order mark would otherwise glue itself to the first field name
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Ok(Self::parse_with_limits(content, limits))
    }

    /// Parses robots.txt content
    ///
    /// Rules, delays and sitemaps that follow consecutive `User-agent` lines apply
    /// to every token in that run; each token still becomes its own group.
    pub fn parse_with_limits(content: &str, limits: &ParseLimits) -> Self {
        let mut builder = DocumentBuilder::new(limits);

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;

            // Strip comments, whole-line or trailing
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((field, value)) = line.split_once(':') else {
                tracing::warn!("robots.txt line {}: not a directive, skipping: {}", line_no, line);
                continue;
            };

            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();
            if field.is_empty() || value.is_empty() {
                tracing::debug!("robots.txt line {}: empty field or value, skipping", line_no);
                continue;
            }

            match field.as_str() {
                "user-agent" => builder.start_agent(value),
                "allow" => builder.add_rule(line_no, RuleKind::Allow, value),
                "disallow" => builder.add_rule(line_no, RuleKind::Disallow, value),
                "crawl-delay" => builder.set_crawl_delay(line_no, value),
                "sitemap" => builder.add_sitemap(line_no, value),
                other => {
                    tracing::debug!("robots.txt line {}: ignoring directive '{}'", line_no, other);
                }
            }
        }

        builder.finish()
    }

    /// Groups in document order
    pub fn groups(&self) -> &[AgentGroup] {
        &self.groups
    }

    /// Deduplicated sitemap URLs declared anywhere in the document
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    /// True when no group declares any rule
    pub fn has_no_rules(&self) -> bool {
        self.groups.iter().all(|g| g.rules.is_empty())
    }

    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            user_agents: self.groups.len(),
            total_rules: self.groups.iter().map(|g| g.rules.len()).sum(),
            sitemaps: self.sitemaps.len(),
            user_agents_with_crawl_delay: self
                .groups
                .iter()
                .filter(|g| g.crawl_delay.is_some())
                .count(),
        }
    }
}

/// Accumulates groups while walking the document
struct DocumentBuilder<'a> {
    limits: &'a ParseLimits,
    groups: Vec<AgentGroup>,
    sitemaps: Vec<String>,
    /// Groups opened by the current run of `User-agent` lines
    current: Vec<AgentGroup>,
    /// Whether any directive has been applied to `current`
    current_has_directives: bool,
}

impl<'a> DocumentBuilder<'a> {
    fn new(limits: &'a ParseLimits) -> Self {
        Self {
            limits,
            groups: Vec::new(),
            sitemaps: Vec::new(),
            current: Vec::new(),
            current_has_directives: false,
        }
    }

    fn start_agent(&mut self, agent: &str) {
        if self.current_has_directives {
            self.flush();
        }
        self.current.push(AgentGroup::new(agent));
    }

    fn flush(&mut self) {
        self.groups.append(&mut self.current);
        self.current_has_directives = false;
    }

    fn add_rule(&mut self, line_no: usize, kind: RuleKind, value: &str) {
        if self.current.is_empty() {
            tracing::warn!(
                "robots.txt line {}: {:?} outside of a User-agent group, skipping",
                line_no,
                kind
            );
            return;
        }

        let rule = match Rule::new(kind, value) {
            Ok(rule) => rule,
            Err(e) => {
                tracing::warn!(
                    "robots.txt line {}: invalid pattern '{}' in {:?} directive: {}",
                    line_no,
                    value,
                    kind,
                    e
                );
                return;
            }
        };

        let max_rules = self.limits.max_rules_per_agent;
        for group in &mut self.current {
            if group.rules.len() >= max_rules {
                tracing::warn!(
                    "robots.txt line {}: user-agent '{}' exceeds {} rules, skipping",
                    line_no,
                    group.agent,
                    max_rules
                );
                continue;
            }
            group.rules.push(rule.clone());
        }
        self.current_has_directives = true;
    }

    fn set_crawl_delay(&mut self, line_no: usize, value: &str) {
        if self.current.is_empty() {
            tracing::warn!(
                "robots.txt line {}: Crawl-delay outside of a User-agent group, skipping",
                line_no
            );
            return;
        }

        match value.parse::<f64>() {
            Ok(delay) if delay.is_finite() && delay >= 0.0 => {
                for group in &mut self.current {
                    group.crawl_delay = Some(delay);
                }
                self.current_has_directives = true;
            }
            _ => {
                tracing::warn!("robots.txt line {}: invalid crawl delay value: {}", line_no, value);
            }
        }
    }

    fn add_sitemap(&mut self, line_no: usize, value: &str) {
        if Url::parse(value).is_err() {
            tracing::warn!("robots.txt line {}: invalid sitemap URL: {}", line_no, value);
            return;
        }

        if !self.sitemaps.iter().any(|s| s == value) {
            if self.sitemaps.len() >= self.limits.max_sitemaps {
                tracing::warn!(
                    "robots.txt line {}: maximum number of sitemaps ({}) reached, skipping {}",
                    line_no,
                    self.limits.max_sitemaps,
                    value
                );
                return;
            }
            self.sitemaps.push(value.to_string());
        }

        for group in &mut self.current {
            if !group.sitemaps.iter().any(|s| s == value) {
                group.sitemaps.push(value.to_string());
            }
        }
        if !self.current.is_empty() {
            self.current_has_directives = true;
        }
    }

    fn finish(mut self) -> PolicyDocument {
        self.flush();
        PolicyDocument {
            groups: self.groups,
            sitemaps: self.sitemaps,
        }
    }
}
