use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// Repository a pull request lives in, as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse the repository out of a REST resource URL such as
    /// `https://api.github.com/repos/{owner}/{name}/pulls/{number}`.
    ///
    /// Works for GitHub Enterprise bases (`/api/v3/repos/...`) too, since only
    /// the segments following `repos` are inspected.
    pub fn from_api_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next()?;
        let mut segments = path.split('/').skip_while(|s| *s != "repos").skip(1);
        let owner = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A search hit: an open PR where the viewer is a requested reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// The PR's own REST URL; the repository is derived from it.
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    ReviewRequested,
    Other(String),
}

impl ActivityKind {
    pub fn from_event_name(name: &str) -> Self {
        match name {
            "review_requested" => Self::ReviewRequested,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub kind: ActivityKind,
    /// Absent for team review requests.
    pub requested_reviewer: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Absent when the author account was deleted.
    pub author: Option<String>,
    pub updated_at: OffsetDateTime,
}

/// A pending review, decorated with the timestamps the scorer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub number: u64,
    pub title: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// `UNIX_EPOCH` when no matching review request event exists.
    #[serde(with = "time::serde::rfc3339")]
    pub review_requested_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub my_last_comment_at: Option<OffsetDateTime>,
    pub repo: RepoId,
}

impl ReviewRecord {
    pub fn web_url(&self, web_base: &str) -> String {
        format!(
            "{}/{}/{}/pull/{}",
            web_base.trim_end_matches('/'),
            self.repo.owner,
            self.repo.name,
            self.number
        )
    }
}

/// Latest review request addressed to `login`, or the epoch sentinel.
pub fn review_requested_at(events: &[ActivityEvent], login: &str) -> OffsetDateTime {
    events
        .iter()
        .filter(|e| e.kind == ActivityKind::ReviewRequested)
        .filter(|e| {
            e.requested_reviewer
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(login))
        })
        .map(|e| e.created_at)
        .max()
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Latest update among comments written by `login`.
pub fn my_last_comment_at(comments: &[Comment], login: &str) -> Option<OffsetDateTime> {
    comments
        .iter()
        .filter(|c| {
            c.author
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(login))
        })
        .map(|c| c.updated_at)
        .max()
}
