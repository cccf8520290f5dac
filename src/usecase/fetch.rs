use std::collections::HashMap;

use futures::{StreamExt, stream};
use tracing::{debug, instrument, warn};

use crate::domain::review::{
    PullRequestSummary, RepoId, ReviewRecord, my_last_comment_at, review_requested_at,
};
use crate::repo::{FetchError, ReviewApi, Scope, review_requested_query};

/// How a single PR made it into the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoration {
    /// `updated_at` was unchanged; derived fields were reused.
    Cached(ReviewRecord),
    /// Derived fields were recomputed from fresh API data.
    Fetched(ReviewRecord),
}

/// A PR that was dropped from the cycle, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationFailure {
    pub number: u64,
    pub error: FetchError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Order is unspecified.
    pub reviews: Vec<ReviewRecord>,
    pub failures: Vec<DecorationFailure>,
    pub cache_hits: usize,
}

/// Runs one search and decorates every hit, reusing `previous` records whose
/// `updated_at` has not moved.
///
/// Only a failed search fails the whole call; per-PR problems end up in
/// `FetchOutcome::failures`.
#[instrument(skip(api, previous), fields(previous = previous.len()))]
pub async fn fetch_reviews(
    api: &dyn ReviewApi,
    login: &str,
    scope: &Scope,
    previous: &[ReviewRecord],
    concurrency: usize,
) -> Result<FetchOutcome, FetchError> {
    let query = review_requested_query(login, scope);
    let prs = api.search_pull_requests(&query).await?;

    // Numbers repeat across repositories under an organization scope.
    let cache: HashMap<(RepoId, u64), &ReviewRecord> = previous
        .iter()
        .map(|r| ((r.repo.clone(), r.number), r))
        .collect();

    let results: Vec<Result<Decoration, DecorationFailure>> = stream::iter(prs)
        .map(|pr| {
            let cached = RepoId::from_api_url(&pr.api_url)
                .and_then(|repo| cache.get(&(repo, pr.number)).copied());
            decorate(api, login, pr, cached)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = FetchOutcome::default();
    for result in results {
        match result {
            Ok(Decoration::Cached(record)) => {
                outcome.cache_hits += 1;
                outcome.reviews.push(record);
            }
            Ok(Decoration::Fetched(record)) => outcome.reviews.push(record),
            Err(failure) => {
                warn!(pr = failure.number, error = %failure.error, "dropping pull request");
                outcome.failures.push(failure);
            }
        }
    }
    Ok(outcome)
}

/// Decorates one search hit, from the cache when possible.
pub async fn decorate(
    api: &dyn ReviewApi,
    login: &str,
    pr: PullRequestSummary,
    cached: Option<&ReviewRecord>,
) -> Result<Decoration, DecorationFailure> {
    if let Some(prev) = cached
        && prev.updated_at == pr.updated_at
    {
        debug!(pr = pr.number, "cache hit");
        return Ok(Decoration::Cached(ReviewRecord {
            number: pr.number,
            title: pr.title,
            author: pr.author,
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            review_requested_at: prev.review_requested_at,
            my_last_comment_at: prev.my_last_comment_at,
            repo: prev.repo.clone(),
        }));
    }

    let number = pr.number;
    fetch_decoration(api, login, pr)
        .await
        .map(Decoration::Fetched)
        .map_err(|error| DecorationFailure { number, error })
}

async fn fetch_decoration(
    api: &dyn ReviewApi,
    login: &str,
    pr: PullRequestSummary,
) -> Result<ReviewRecord, FetchError> {
    let repo = RepoId::from_api_url(&pr.api_url).ok_or_else(|| {
        FetchError::UnparseableRepository {
            url: pr.api_url.clone(),
        }
    })?;

    let (events, mut comments, issue_comments) = futures::try_join!(
        api.activity_events(&repo, pr.number),
        api.review_comments(&repo, pr.number),
        api.issue_comments(&repo, pr.number),
    )?;
    comments.extend(issue_comments);

    Ok(ReviewRecord {
        number: pr.number,
        title: pr.title,
        author: pr.author,
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        review_requested_at: review_requested_at(&events, login),
        my_last_comment_at: my_last_comment_at(&comments, login),
        repo,
    })
}
