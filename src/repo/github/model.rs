use time::OffsetDateTime;

use crate::domain::review::{ActivityEvent, ActivityKind, Comment, PullRequestSummary};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiUser {
    pub login: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
}

#[derive(Debug, serde::Deserialize)]
pub struct PullRequestLink {
    pub url: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchItem {
    pub number: u64,
    pub title: String,
    /// Issue flavoured URL (`.../issues/{n}`).
    pub url: String,
    pub user: Option<ApiUser>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub pull_request: Option<PullRequestLink>,
}

impl From<SearchItem> for PullRequestSummary {
    fn from(item: SearchItem) -> Self {
        let api_url = item
            .pull_request
            .and_then(|pr| pr.url)
            .unwrap_or(item.url);
        Self {
            number: item.number,
            title: item.title,
            author: item
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "ghost".to_string()),
            created_at: item.created_at,
            updated_at: item.updated_at,
            api_url,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiIssueEvent {
    pub event: String,
    pub requested_reviewer: Option<ApiUser>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ApiIssueEvent> for ActivityEvent {
    fn from(event: ApiIssueEvent) -> Self {
        Self {
            kind: ActivityKind::from_event_name(&event.event),
            requested_reviewer: event.requested_reviewer.map(|u| u.login),
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiComment {
    pub user: Option<ApiUser>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ApiComment> for Comment {
    fn from(comment: ApiComment) -> Self {
        Self {
            author: comment.user.map(|u| u.login),
            updated_at: comment.updated_at,
        }
    }
}
