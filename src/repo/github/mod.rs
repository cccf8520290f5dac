pub mod auth;
pub mod model;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use model::{ApiComment, ApiIssueEvent, ApiUser, SearchResponse};
use octocrab::{Octocrab, Page};
use tracing::{debug, instrument};

use super::{FetchError, ReviewApi};
use crate::domain::review::{ActivityEvent, Comment, PullRequestSummary, RepoId};

const PER_PAGE: u8 = 100;

/// The search API never returns more than 1000 results.
const MAX_SEARCH_PAGES: u32 = 10;

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: String,
    pub api_base: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    sort: &'static str,
    order: &'static str,
    per_page: u8,
    page: u32,
}

#[derive(Debug, serde::Serialize)]
struct ListParams {
    per_page: u8,
}

fn map_octocrab_error(context: &str, error: &octocrab::Error) -> FetchError {
    match error {
        octocrab::Error::GitHub { source, .. } => FetchError::api(context, source.message.clone()),
        octocrab::Error::Serde { source, .. } => FetchError::MalformedPayload {
            context: context.to_string(),
            message: source.to_string(),
        },
        octocrab::Error::Json { source, .. } => FetchError::MalformedPayload {
            context: context.to_string(),
            message: source.to_string(),
        },
        other => FetchError::network(context, other.to_string()),
    }
}

/// `ReviewApi` backed by the GitHub REST API.
pub struct OctocrabReviewApi {
    octo: Octocrab,
}

impl OctocrabReviewApi {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(config.token.clone());
        if let Some(api) = config.api_base.clone() {
            builder = builder
                .base_uri(api)
                .map_err(|e| anyhow!("invalid GITHUB_API_URL: {e}"))?;
        }
        let octo = builder
            .build()
            .map_err(|e| anyhow!("failed to init GitHub client: {e}"))?;
        Ok(Self { octo })
    }

    async fn list_all<T>(&self, context: &str, route: String) -> Result<Vec<T>, FetchError>
    where
        T: serde::de::DeserializeOwned,
    {
        let page: Page<T> = self
            .octo
            .get(&route, Some(&ListParams { per_page: PER_PAGE }))
            .await
            .map_err(|e| map_octocrab_error(context, &e))?;
        self.octo
            .all_pages(page)
            .await
            .map_err(|e| map_octocrab_error(context, &e))
    }
}

#[async_trait]
impl ReviewApi for OctocrabReviewApi {
    async fn current_login(&self) -> Result<String, FetchError> {
        let user: ApiUser = self
            .octo
            .get("/user", None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("user lookup", &e))?;
        Ok(user.login)
    }

    #[instrument(skip(self))]
    async fn search_pull_requests(
        &self,
        query: &str,
    ) -> Result<Vec<PullRequestSummary>, FetchError> {
        let mut out = Vec::new();
        for page in 1..=MAX_SEARCH_PAGES {
            let params = SearchParams {
                q: query,
                sort: "updated",
                order: "desc",
                per_page: PER_PAGE,
                page,
            };
            let resp: SearchResponse = self
                .octo
                .get("/search/issues", Some(&params))
                .await
                .map_err(|e| map_octocrab_error("search", &e))?;
            let count = resp.items.len();
            out.extend(resp.items.into_iter().map(PullRequestSummary::from));
            if count < PER_PAGE as usize {
                break;
            }
        }
        debug!(count = out.len(), "search returned pull requests");
        Ok(out)
    }

    async fn activity_events(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<ActivityEvent>, FetchError> {
        let route = format!("/repos/{}/{}/issues/{number}/events", repo.owner, repo.name);
        let events: Vec<ApiIssueEvent> = self.list_all("issue events", route).await?;
        Ok(events.into_iter().map(Into::into).collect())
    }

    async fn review_comments(&self, repo: &RepoId, number: u64) -> Result<Vec<Comment>, FetchError> {
        let route = format!("/repos/{}/{}/pulls/{number}/comments", repo.owner, repo.name);
        let comments: Vec<ApiComment> = self.list_all("review comments", route).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn issue_comments(&self, repo: &RepoId, number: u64) -> Result<Vec<Comment>, FetchError> {
        let route = format!("/repos/{}/{}/issues/{number}/comments", repo.owner, repo.name);
        let comments: Vec<ApiComment> = self.list_all("issue comments", route).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::review::ActivityKind;

    async fn api_for(server: &MockServer) -> OctocrabReviewApi {
        OctocrabReviewApi::new(&GithubConfig {
            token: "test-token".to_string(),
            api_base: Some(server.uri()),
        })
        .expect("client should build")
    }

    fn search_item(number: u64) -> serde_json::Value {
        json!({
            "number": number,
            "title": format!("PR {number}"),
            "url": format!("https://api.github.com/repos/acme/widgets/issues/{number}"),
            "user": { "login": "bob" },
            "created_at": "2024-01-02T10:00:00Z",
            "updated_at": "2024-01-03T10:00:00Z",
            "pull_request": {
                "url": format!("https://api.github.com/repos/acme/widgets/pulls/{number}")
            }
        })
    }

    #[tokio::test]
    async fn search_reads_pages_until_a_short_one() {
        let server = MockServer::start().await;
        let full: Vec<_> = (1..=100).map(search_item).collect();
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("per_page", "100"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 101,
                "incomplete_results": false,
                "items": full
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 101,
                "incomplete_results": false,
                "items": [search_item(101)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let prs = api
            .search_pull_requests("is:open is:pr review-requested:alice org:acme")
            .await
            .expect("search should succeed");

        assert_eq!(prs.len(), 101);
        assert_eq!(prs[100].number, 101);
    }

    #[tokio::test]
    async fn search_stops_at_page_limit() {
        let server = MockServer::start().await;
        let full: Vec<_> = (1..=100).map(search_item).collect();
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 5000,
                "incomplete_results": false,
                "items": full
            })))
            .expect(u64::from(MAX_SEARCH_PAGES))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let prs = api
            .search_pull_requests("is:open is:pr review-requested:alice org:acme")
            .await
            .expect("search should succeed");

        assert_eq!(prs.len(), 100 * MAX_SEARCH_PAGES as usize);
    }

    #[tokio::test]
    async fn listings_follow_link_header() {
        let server = MockServer::start().await;
        let next = format!(
            "<{}/repos/acme/widgets/issues/5/events?per_page=100&page=2>; rel=\"next\"",
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/5/events"))
            .and(query_param_is_missing("page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", next.as_str())
                    .set_body_json(json!([{
                        "event": "review_requested",
                        "requested_reviewer": { "login": "alice" },
                        "created_at": "2024-01-02T11:00:00Z"
                    }])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/5/events"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "event": "review_requested",
                "requested_reviewer": { "login": "alice" },
                "created_at": "2024-01-04T11:00:00Z"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let events = api
            .activity_events(&RepoId::new("acme", "widgets"), 5)
            .await
            .expect("events should load");

        let times: Vec<_> = events.iter().map(|e| e.created_at).collect();
        assert_eq!(
            times,
            vec![
                datetime!(2024-01-02 11:00 UTC),
                datetime!(2024-01-04 11:00 UTC)
            ]
        );
    }

    #[tokio::test]
    async fn search_sends_review_requested_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/issues"))
            .and(query_param("q", "is:open is:pr review-requested:alice org:acme"))
            .and(query_param("sort", "updated"))
            .and(query_param("order", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "incomplete_results": false,
                "items": [{
                    "number": 5,
                    "title": "Speed up parser",
                    "url": "https://api.github.com/repos/acme/widgets/issues/5",
                    "user": { "login": "bob" },
                    "created_at": "2024-01-02T10:00:00Z",
                    "updated_at": "2024-01-03T10:00:00Z",
                    "pull_request": { "url": "https://api.github.com/repos/acme/widgets/pulls/5" }
                }]
            })))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let prs = api
            .search_pull_requests("is:open is:pr review-requested:alice org:acme")
            .await
            .expect("search should succeed");

        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].number, 5);
        assert_eq!(prs[0].author, "bob");
        assert_eq!(
            RepoId::from_api_url(&prs[0].api_url),
            Some(RepoId::new("acme", "widgets"))
        );
    }

    #[tokio::test]
    async fn activity_events_are_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/5/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "event": "review_requested",
                    "requested_reviewer": { "login": "alice" },
                    "created_at": "2024-01-02T11:00:00Z"
                },
                {
                    "event": "labeled",
                    "created_at": "2024-01-02T12:00:00Z"
                }
            ])))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let events = api
            .activity_events(&RepoId::new("acme", "widgets"), 5)
            .await
            .expect("events should load");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ActivityKind::ReviewRequested);
        assert_eq!(events[0].requested_reviewer.as_deref(), Some("alice"));
        assert_eq!(events[0].created_at, datetime!(2024-01-02 11:00 UTC));
    }

    #[tokio::test]
    async fn both_comment_endpoints_are_used() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/5/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user": { "login": "alice" }, "updated_at": "2024-01-04T09:00:00Z" }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/5/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "user": { "login": "carol" }, "updated_at": "2024-01-05T09:00:00Z" },
                { "user": null, "updated_at": "2024-01-06T09:00:00Z" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let repo = RepoId::new("acme", "widgets");
        let review = api.review_comments(&repo, 5).await.expect("review comments");
        let issue = api.issue_comments(&repo, 5).await.expect("issue comments");

        assert_eq!(review.len(), 1);
        assert_eq!(review[0].author.as_deref(), Some("alice"));
        assert_eq!(issue.len(), 2);
        assert_eq!(issue[1].author, None);
    }

    #[tokio::test]
    async fn current_login_reads_user_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": "Alice" })))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        assert_eq!(api.current_login().await.expect("login"), "Alice");
    }

    #[tokio::test]
    async fn missing_resource_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/issues/9/events"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let result = api.activity_events(&RepoId::new("acme", "widgets"), 9).await;
        assert!(result.is_err());
    }
}
