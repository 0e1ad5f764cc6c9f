//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, caching and evaluating
//! robots.txt files. Parsing produces an immutable [`PolicyDocument`]; the stateless
//! [`PolicyEvaluator`] answers questions about it; the [`RobotsProvider`] fetches
//! documents per origin and falls back to "allow everything" whenever a document
//! cannot be obtained.

mod evaluator;
mod parser;
mod pattern;
mod provider;

pub use evaluator::PolicyEvaluator;
pub use parser::{
    AgentGroup, ParseLimits, PolicyDocument, PolicyError, PolicyStats, Rule, RuleKind,
    DEFAULT_MAX_RULES_PER_AGENT, DEFAULT_MAX_SITEMAPS,
};
pub use pattern::{PathPattern, PatternError};
pub use provider::RobotsProvider;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Longest crawl delay honored, in seconds
const MAX_CRAWL_DELAY_SECS: f64 = 86_400.0;

/// Outcome of looking up the policy for an origin
///
/// `Unavailable` is an ordinary value rather than an error: callers must handle
/// "no policy" distinctly from "the policy disallows this".
#[derive(Debug, Clone)]
pub enum RobotsPolicy {
    /// A document was retrieved and parsed
    Fetched {
        document: Arc<PolicyDocument>,
        fetched_at: DateTime<Utc>,
    },

    /// No document could be obtained; everything is allowed with no delay
    Unavailable { reason: String },
}

impl RobotsPolicy {
    /// Wraps a freshly parsed document
    pub fn fetched(document: PolicyDocument) -> Self {
        Self::Fetched {
            document: Arc::new(document),
            fetched_at: Utc::now(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// The parsed document, if one was fetched
    pub fn document(&self) -> Option<&PolicyDocument> {
        match self {
            Self::Fetched { document, .. } => Some(document),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }

    /// Checks whether `agent` may fetch `path`
    ///
    /// An unavailable policy allows everything.
    pub fn is_allowed(&self, evaluator: &PolicyEvaluator, agent: &str, path: &str) -> bool {
        match self.document() {
            Some(doc) => evaluator.is_allowed(doc, agent, path),
            None => true,
        }
    }

    /// Returns the minimum spacing between requests for `agent`
    ///
    /// `None` means there is no policy and therefore no delay. A fetched document
    /// always yields a delay: the declared one or the evaluator's default.
    /// Delays are capped at one day.
    pub fn crawl_delay(&self, evaluator: &PolicyEvaluator, agent: &str) -> Option<Duration> {
        let secs = evaluator.crawl_delay_seconds_for(self.document()?, agent);
        if !secs.is_finite() || secs <= 0.0 {
            return Some(Duration::ZERO);
        }
        Some(Duration::from_secs_f64(secs.min(MAX_CRAWL_DELAY_SECS)))
    }

    /// Document-wide sitemap URLs; empty when no document was fetched
    pub fn sitemaps(&self) -> &[String] {
        match self.document() {
            Some(doc) => doc.sitemaps(),
            None => &[],
        }
    }

    /// How long ago the document was fetched
    pub fn age(&self) -> Option<chrono::Duration> {
        match self {
            Self::Fetched { fetched_at, .. } => Some(Utc::now() - *fetched_at),
            Self::Unavailable { .. } => None,
        }
    }
}
