use time::OffsetDateTime;
use tracing::warn;

use crate::domain::calendar::WorkCalendar;
use crate::domain::review::ReviewRecord;
use crate::poller::{CycleReport, PollEvent, PollerHandle};
use crate::repo::{Scope, review_queue_url};
use crate::usecase::badness::{badness_score, by_last_activity};

pub struct App {
    poller: PollerHandle,
    pub scope: Scope,
    pub web_base: String,
    pub calendar: WorkCalendar,
    /// Oldest activity first.
    pub reviews: Vec<ReviewRecord>,
    /// `None` until the first cycle lands.
    pub score: Option<u8>,
    pub login: Option<String>,
    pub selected: usize,
    pub status: Option<String>,
    pub is_syncing: bool,
    pub last_synced: Option<OffsetDateTime>,
    pending_count: Option<usize>,
    alert: bool,
}

impl App {
    pub fn new(
        poller: PollerHandle,
        scope: Scope,
        web_base: impl Into<String>,
        calendar: WorkCalendar,
    ) -> Self {
        Self {
            poller,
            scope,
            web_base: web_base.into(),
            calendar,
            reviews: Vec::new(),
            score: None,
            login: None,
            selected: 0,
            status: None,
            is_syncing: false,
            last_synced: None,
            pending_count: None,
            alert: false,
        }
    }

    /// Drains whatever the poller has published since the last frame.
    pub fn poll_sync(&mut self) {
        while let Some(event) = self.poller.try_next() {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: PollEvent) {
        match event {
            PollEvent::Started => self.is_syncing = true,
            PollEvent::Updated(report) => {
                self.is_syncing = false;
                self.apply_report(report);
            }
            PollEvent::Failed(message) => {
                self.is_syncing = false;
                self.set_status(&format!("Sync failed, keeping last results: {message}"));
            }
        }
    }

    fn apply_report(&mut self, report: CycleReport) {
        let count = report.reviews.len();
        let grew = self.pending_count.is_some_and(|before| count > before);
        self.pending_count = Some(count);

        self.reviews = by_last_activity(&report.reviews)
            .into_iter()
            .cloned()
            .collect();
        self.score = Some(report.score);
        self.login = Some(report.login);
        self.last_synced = Some(report.finished_at);
        if self.selected >= self.reviews.len() {
            self.selected = self.reviews.len().saturating_sub(1);
        }

        self.status = None;
        if grew {
            self.alert = true;
            self.set_status("New review request!");
        } else if report.failures > 0 {
            self.set_status(&format!(
                "{} pull request(s) could not be loaded; see log",
                report.failures
            ));
        }
    }

    /// Aggregate score as of `now`, matching the per-row scores on screen.
    /// `None` until the first cycle lands.
    pub fn current_score(&self, now: OffsetDateTime) -> Option<u8> {
        self.score.map(|_| badness_score(&self.reviews, now, &self.calendar))
    }

    /// True once per increase in the number of pending reviews.
    pub fn take_alert(&mut self) -> bool {
        std::mem::take(&mut self.alert)
    }

    pub fn select_next(&mut self) {
        if !self.reviews.is_empty() {
            self.selected = (self.selected + 1).min(self.reviews.len() - 1);
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn selected_url(&self) -> Option<String> {
        self.reviews
            .get(self.selected)
            .map(|r| r.web_url(&self.web_base))
    }

    pub fn queue_url(&self) -> Option<String> {
        let login = self.login.as_deref()?;
        Some(review_queue_url(&self.web_base, login, &self.scope))
    }

    pub fn open_selected(&mut self) {
        if let Some(url) = self.selected_url() {
            self.open_url(&url);
        }
    }

    pub fn open_queue(&mut self) {
        match self.queue_url() {
            Some(url) => self.open_url(&url),
            None => self.set_status("Review queue not loaded yet"),
        }
    }

    fn open_url(&mut self, url: &str) {
        match open::that(url) {
            Ok(()) => self.set_status(&format!("Opened {url}")),
            Err(e) => {
                warn!(%url, error = %e, "failed to open browser");
                self.set_status(&format!("Could not open {url}: {e}"));
            }
        }
    }

    pub fn refresh(&mut self) {
        self.poller.refresh();
        self.set_status("Refreshing...");
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status = Some(msg.to_string());
    }
}
