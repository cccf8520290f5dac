use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use super::{FetchError, ReviewApi};
use crate::domain::review::{ActivityEvent, ActivityKind, Comment, PullRequestSummary, RepoId};

#[derive(Default)]
struct Seed {
    prs: Vec<PullRequestSummary>,
    events: HashMap<u64, Vec<ActivityEvent>>,
    review_comments: HashMap<u64, Vec<Comment>>,
    issue_comments: HashMap<u64, Vec<Comment>>,
    failing: HashSet<u64>,
}

/// Canned API answers keyed by PR number. Counts per-PR calls so callers
/// can tell cached cycles from fetching ones.
pub struct InMemoryReviewApi {
    login: String,
    seed: Mutex<Seed>,
    detail_calls: AtomicUsize,
}

impl InMemoryReviewApi {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            seed: Mutex::new(Seed::default()),
            detail_calls: AtomicUsize::new(0),
        }
    }

    fn with_seed<T>(&self, f: impl FnOnce(&mut Seed) -> T) -> T {
        let mut seed = self.seed.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut seed)
    }

    /// Adds or replaces a search hit with the same URL.
    pub fn put_pr(&self, pr: PullRequestSummary) {
        self.with_seed(|s| {
            s.prs.retain(|p| p.api_url != pr.api_url);
            s.prs.push(pr);
        });
    }

    pub fn put_events(&self, number: u64, events: Vec<ActivityEvent>) {
        self.with_seed(|s| {
            s.events.insert(number, events);
        });
    }

    pub fn put_review_comments(&self, number: u64, comments: Vec<Comment>) {
        self.with_seed(|s| {
            s.review_comments.insert(number, comments);
        });
    }

    pub fn put_issue_comments(&self, number: u64, comments: Vec<Comment>) {
        self.with_seed(|s| {
            s.issue_comments.insert(number, comments);
        });
    }

    /// Makes every per-PR call for `number` fail.
    #[cfg(test)]
    pub fn fail_pr(&self, number: u64) {
        self.with_seed(|s| {
            s.failing.insert(number);
        });
    }

    #[cfg(test)]
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    fn detail<T: Clone>(
        &self,
        number: u64,
        pick: impl FnOnce(&Seed) -> Option<&Vec<T>>,
    ) -> Result<Vec<T>, FetchError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.with_seed(|s| {
            if s.failing.contains(&number) {
                return Err(FetchError::network(
                    "in-memory",
                    format!("PR #{number} is set to fail"),
                ));
            }
            Ok(pick(s).cloned().unwrap_or_default())
        })
    }

    /// A small queue of reviews at various ages, for `--demo`.
    pub fn demo(now: OffsetDateTime) -> Self {
        let api = Self::new("you");
        let repo_url = |n: u64| format!("https://api.github.com/repos/acme/widgets/pulls/{n}");
        let seeds = [
            (101, "Add retry budget to uploader", "mia", Duration::hours(2)),
            (102, "Refactor config loader", "leo", Duration::days(1)),
            (103, "Bump dependencies", "dependabot", Duration::days(3)),
            (104, "Document release process", "ana", Duration::days(6)),
        ];
        for (number, title, author, age) in seeds {
            let requested = now - age;
            api.put_pr(PullRequestSummary {
                number,
                title: title.to_string(),
                author: author.to_string(),
                created_at: requested - Duration::hours(1),
                updated_at: requested,
                api_url: repo_url(number),
            });
            api.put_events(
                number,
                vec![ActivityEvent {
                    kind: ActivityKind::ReviewRequested,
                    requested_reviewer: Some("you".to_string()),
                    created_at: requested,
                }],
            );
        }
        api.put_review_comments(
            103,
            vec![Comment {
                author: Some("leo".to_string()),
                updated_at: now - Duration::days(2),
            }],
        );
        api.put_issue_comments(
            102,
            vec![Comment {
                author: Some("You".to_string()),
                updated_at: now - Duration::hours(3),
            }],
        );
        api
    }
}

#[async_trait]
impl ReviewApi for InMemoryReviewApi {
    async fn current_login(&self) -> Result<String, FetchError> {
        Ok(self.login.clone())
    }

    async fn search_pull_requests(
        &self,
        _query: &str,
    ) -> Result<Vec<PullRequestSummary>, FetchError> {
        let mut prs = self.with_seed(|s| s.prs.clone());
        prs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(prs)
    }

    async fn activity_events(
        &self,
        _repo: &RepoId,
        number: u64,
    ) -> Result<Vec<ActivityEvent>, FetchError> {
        self.detail(number, |s| s.events.get(&number))
    }

    async fn review_comments(&self, _repo: &RepoId, number: u64) -> Result<Vec<Comment>, FetchError> {
        self.detail(number, |s| s.review_comments.get(&number))
    }

    async fn issue_comments(&self, _repo: &RepoId, number: u64) -> Result<Vec<Comment>, FetchError> {
        self.detail(number, |s| s.issue_comments.get(&number))
    }
}
