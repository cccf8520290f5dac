use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use time::OffsetDateTime;
use tokio::runtime::Runtime;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use crate::domain::calendar::WorkCalendar;
use crate::domain::review::ReviewRecord;
use crate::repo::{FetchError, ReviewApi, Scope};
use crate::usecase::badness::badness_score;
use crate::usecase::fetch::fetch_reviews;

/// Result of one successful poll cycle.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CycleReport {
    pub login: String,
    pub score: u8,
    pub reviews: Vec<ReviewRecord>,
    pub failures: usize,
    pub cache_hits: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum PollEvent {
    Started,
    Updated(CycleReport),
    Failed(String),
}

/// Owns everything that survives between cycles: the viewer's login
/// (looked up once) and the previous cycle's records.
pub struct Poller {
    api: Box<dyn ReviewApi>,
    scope: Scope,
    calendar: WorkCalendar,
    concurrency: usize,
    login: Option<String>,
    previous: Vec<ReviewRecord>,
}

impl Poller {
    pub fn new(
        api: Box<dyn ReviewApi>,
        scope: Scope,
        calendar: WorkCalendar,
        concurrency: usize,
    ) -> Self {
        Self {
            api,
            scope,
            calendar,
            concurrency,
            login: None,
            previous: Vec::new(),
        }
    }

    async fn login(&mut self) -> Result<String, FetchError> {
        if let Some(login) = &self.login {
            return Ok(login.clone());
        }
        let login = self.api.current_login().await?;
        info!(%login, "resolved GitHub login");
        self.login = Some(login.clone());
        Ok(login)
    }

    /// Runs one cycle. On failure the previous records are kept as the cache.
    #[instrument(skip(self))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport, FetchError> {
        let login = self.login().await?;
        let outcome = fetch_reviews(
            self.api.as_ref(),
            &login,
            &self.scope,
            &self.previous,
            self.concurrency,
        )
        .await?;

        let finished_at = OffsetDateTime::now_utc();
        let score = badness_score(&outcome.reviews, finished_at, &self.calendar);
        info!(
            reviews = outcome.reviews.len(),
            cache_hits = outcome.cache_hits,
            failures = outcome.failures.len(),
            score,
            "poll cycle finished"
        );

        self.previous = outcome.reviews.clone();
        Ok(CycleReport {
            login,
            score,
            reviews: outcome.reviews,
            failures: outcome.failures.len(),
            cache_hits: outcome.cache_hits,
            finished_at,
        })
    }
}

/// The UI side of a running poller.
pub struct PollerHandle {
    events: mpsc::Receiver<PollEvent>,
    refresh: tokio::sync::mpsc::UnboundedSender<()>,
}

impl PollerHandle {
    pub fn new(
        events: mpsc::Receiver<PollEvent>,
        refresh: tokio::sync::mpsc::UnboundedSender<()>,
    ) -> Self {
        Self { events, refresh }
    }

    /// Next pending event, if any. Never blocks.
    pub fn try_next(&self) -> Option<PollEvent> {
        self.events.try_recv().ok()
    }

    /// Asks for a cycle now instead of at the next tick.
    pub fn refresh(&self) {
        let _ = self.refresh.send(());
    }
}

pub fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to build tokio runtime: {e}"))
}

/// Runs cycles on a dedicated thread: one immediately, then every `interval`
/// or on refresh. Cycles never overlap since one loop drives them all.
pub fn spawn(rt: Runtime, poller: Poller, interval: Duration) -> Result<PollerHandle> {
    let (tx, rx) = mpsc::channel();
    let (refresh_tx, refresh_rx) = tokio::sync::mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("revwatch-poller".into())
        .spawn(move || rt.block_on(run_loop(poller, interval, tx, refresh_rx)))
        .map_err(|e| anyhow!("failed to start poller thread: {e}"))?;
    Ok(PollerHandle::new(rx, refresh_tx))
}

async fn run_loop(
    mut poller: Poller,
    interval: Duration,
    tx: mpsc::Sender<PollEvent>,
    mut refresh_rx: tokio::sync::mpsc::UnboundedReceiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            msg = refresh_rx.recv() => {
                if msg.is_none() {
                    break;
                }
                ticker.reset();
            }
        }

        if tx.send(PollEvent::Started).is_err() {
            break;
        }
        let event = match poller.run_cycle().await {
            Ok(report) => PollEvent::Updated(report),
            Err(e) => {
                error!(error = %e, "poll cycle failed");
                PollEvent::Failed(e.to_string())
            }
        };
        if tx.send(event).is_err() {
            break;
        }
        // Refreshes requested during the cycle are already satisfied by it.
        while refresh_rx.try_recv().is_ok() {}
    }
}
