use async_trait::async_trait;

use crate::domain::review::{ActivityEvent, Comment, PullRequestSummary, RepoId};

pub mod error;
pub mod github;
pub mod memory;

pub use error::FetchError;

/// Where to look for review requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Organization(String),
    Repository(RepoId),
}

impl Scope {
    /// `owner/repo` selects a repository, anything else an organization.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Some(Self::Repository(RepoId::new(owner, name)))
            }
            Some(_) => None,
            None => Some(Self::Organization(raw.to_string())),
        }
    }

    /// Search qualifier, e.g. `org:acme` or `repo:acme/widgets`.
    pub fn qualifier(&self) -> String {
        match self {
            Self::Organization(org) => format!("org:{org}"),
            Self::Repository(repo) => format!("repo:{repo}"),
        }
    }
}

/// The one search this tool runs: open PRs awaiting `login`'s review.
pub fn review_requested_query(login: &str, scope: &Scope) -> String {
    format!(
        "is:open is:pr review-requested:{login} {}",
        scope.qualifier()
    )
}

/// Browser page listing the viewer's pending reviews.
pub fn review_queue_url(web_base: &str, login: &str, scope: &Scope) -> String {
    format!(
        "{}/pulls?q=is%3Aopen+is%3Apr+review-requested%3A{login}+{}+sort%3Aupdated-desc",
        web_base.trim_end_matches('/'),
        scope.qualifier().replace(':', "%3A")
    )
}

/// The REST calls the review fetcher depends on.
#[async_trait]
pub trait ReviewApi: Send + Sync {
    async fn current_login(&self) -> Result<String, FetchError>;

    /// Search hits sorted by update time, newest first.
    async fn search_pull_requests(&self, query: &str)
    -> Result<Vec<PullRequestSummary>, FetchError>;

    async fn activity_events(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<ActivityEvent>, FetchError>;

    /// Comments left on the diff.
    async fn review_comments(&self, repo: &RepoId, number: u64) -> Result<Vec<Comment>, FetchError>;

    /// Comments left on the conversation tab.
    async fn issue_comments(&self, repo: &RepoId, number: u64) -> Result<Vec<Comment>, FetchError>;
}
