//! Scrape orchestration
//!
//! Drives discovery, parsing, de-duplication and scrolling as a small state
//! machine until the list stops yielding new spending:
//!
//! ```text
//! Discovering{attempt} -> ProcessingBatch -> Scrolling -> Discovering{1}
//!        |                      |
//!        v                      v
//!   Done(DiscoveryExhausted)  Done(NoNewContent | BatchOverlap)
//! ```
//!
//! Element-level failures are absorbed and logged. A lost session aborts the
//! run with an error.

use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{IdentityStrategy, Locators, ScrapeSettings};
use crate::domain::result::Result;
use crate::domain::{RecordParser, Transaction, TransactionKey};
use crate::ports::{ElementAttributes, UiTreeAccessor};
use crate::services::dates::{SectionDates, SectionHeader};
use crate::services::dedup::{Boundary, DeduplicationTracker, Identity};
use crate::services::detail::DetailReader;
use crate::services::scroll::{ScrollDriver, ScrollOutcome};
use crate::services::visibility::{Candidate, VisibilityFilter};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `max_no_new` consecutive batches added no spending
    NoNewContent,
    /// A batch ended on the same reference as the previous one
    BatchOverlap,
    /// No visible transaction rows after every discovery attempt
    DiscoveryExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoNewContent => write!(f, "no new content"),
            Self::BatchOverlap => write!(f, "batch overlap"),
            Self::DiscoveryExhausted => write!(f, "discovery exhausted"),
        }
    }
}

/// Result of one scrape run
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    /// Novel spending transactions in discovery order
    pub transactions: Vec<Transaction>,
    pub stop_reason: StopReason,
    /// Batches that reached processing
    pub batches: usize,
    /// Candidates whose text did not parse
    pub skipped: usize,
}

enum State<E> {
    Discovering { attempt: u32 },
    ProcessingBatch { batch: Vec<Candidate<E>> },
    Scrolling { visible: Vec<Candidate<E>> },
    Done(StopReason),
}

enum BatchResult {
    New(usize),
    Overlap,
}

/// One inspected row: what it parsed to and what it is recognised by
struct Inspected {
    transaction: Option<Transaction>,
    identity: Option<Identity>,
    /// Tuple key under the section date, before any detail-view date
    key: Option<TransactionKey>,
}

/// Run-scoped accumulators
#[derive(Default)]
struct RunState {
    transactions: Vec<Transaction>,
    batches: usize,
    skipped: usize,
    no_new: u32,
}

pub struct ScrapeService {
    settings: ScrapeSettings,
    locators: Locators,
    filter: VisibilityFilter,
    parser: RecordParser,
    scroller: ScrollDriver,
    details: DetailReader,
    tracker: DeduplicationTracker,
    dates: SectionDates,
}

impl ScrapeService {
    pub fn new(settings: ScrapeSettings, locators: Locators) -> Self {
        Self {
            filter: VisibilityFilter::new(settings.currency.clone()),
            parser: RecordParser::new(settings.currency.clone(), settings.foreign_currencies.clone()),
            scroller: ScrollDriver::new(&settings),
            details: DetailReader::new(&locators, &settings),
            tracker: DeduplicationTracker::new(),
            dates: SectionDates::new(),
            settings,
            locators,
        }
    }

    /// Scrape the list from where it currently stands until it stops yielding
    /// new spending. Each run starts with empty seen state.
    pub fn run<A: UiTreeAccessor>(&mut self, accessor: &A) -> Result<ScrapeOutcome> {
        self.tracker.reset();
        self.dates.reset();

        info!(
            identity = ?self.settings.identity,
            scroll = ?self.settings.scroll_mode,
            "Starting scrape"
        );

        let mut run = RunState::default();
        let mut state = State::Discovering { attempt: 1 };

        let stop_reason = loop {
            state = match state {
                State::Discovering { attempt } => self.discovering(accessor, attempt)?,
                State::ProcessingBatch { batch } => self.processing(accessor, batch, &mut run)?,
                State::Scrolling { visible } => {
                    if self.scroller.advance(accessor, &visible)? == ScrollOutcome::Unchanged {
                        debug!("Scroll gesture not delivered, rediscovering in place");
                    }
                    State::Discovering { attempt: 1 }
                }
                State::Done(reason) => break reason,
            };
        };

        info!(
            transactions = run.transactions.len(),
            batches = run.batches,
            skipped = run.skipped,
            reason = %stop_reason,
            "Scrape finished"
        );

        Ok(ScrapeOutcome {
            transactions: run.transactions,
            stop_reason,
            batches: run.batches,
            skipped: run.skipped,
        })
    }

    fn discovering<A: UiTreeAccessor>(
        &self,
        accessor: &A,
        attempt: u32,
    ) -> Result<State<A::Element>> {
        let batch = self.discover(accessor)?;
        if !batch.is_empty() {
            info!("Found {} visible transactions", batch.len());
            return Ok(State::ProcessingBatch { batch });
        }

        let attempts = self.settings.discovery_attempts;
        if attempt >= attempts {
            warn!(attempts, "No visible transactions found, giving up");
            return Ok(State::Done(StopReason::DiscoveryExhausted));
        }

        debug!(attempt, attempts, "No visible transactions, retrying");
        let delay = self.settings.retry_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        Ok(State::Discovering { attempt: attempt + 1 })
    }

    fn discover<A: UiTreeAccessor>(&self, accessor: &A) -> Result<Vec<Candidate<A::Element>>> {
        let found = accessor
            .find_all(&self.locators.transaction_xpath)
            .and_then(|elements| Ok((elements, accessor.viewport_size()?)));

        match found {
            Ok((elements, viewport)) => Ok(self.filter.filter(elements, viewport)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "Discovery query failed");
                Ok(Vec::new())
            }
        }
    }

    fn processing<A: UiTreeAccessor>(
        &mut self,
        accessor: &A,
        batch: Vec<Candidate<A::Element>>,
        run: &mut RunState,
    ) -> Result<State<A::Element>> {
        run.batches += 1;

        let new = match self.process_batch(accessor, &batch, run)? {
            BatchResult::Overlap => {
                info!("Batch ends where the previous one did, list exhausted");
                return Ok(State::Done(StopReason::BatchOverlap));
            }
            BatchResult::New(new) => new,
        };

        if new > 0 {
            run.no_new = 0;
            return Ok(State::Scrolling { visible: batch });
        }

        run.no_new += 1;
        info!("No new transactions. Attempt {}/{}", run.no_new, self.settings.max_no_new);
        if run.no_new >= self.settings.max_no_new {
            return Ok(State::Done(StopReason::NoNewContent));
        }
        Ok(State::Scrolling { visible: batch })
    }

    fn process_batch<A: UiTreeAccessor>(
        &mut self,
        accessor: &A,
        batch: &[Candidate<A::Element>],
        run: &mut RunState,
    ) -> Result<BatchResult> {
        let dates = self.batch_dates(accessor, batch)?;
        let mut inspected: Vec<Option<Inspected>> = batch.iter().map(|_| None).collect();

        // Reference strategies can tell a stuck list from the last row alone
        if self.uses_references() {
            if let Some(last_idx) = batch.len().checked_sub(1) {
                let last = self.inspect(accessor, &batch[last_idx], &dates[last_idx])?;
                if let Some(identity) = &last.identity {
                    if self.tracker.check_boundary(identity) == Boundary::Overlap {
                        return Ok(BatchResult::Overlap);
                    }
                }
                inspected[last_idx] = Some(last);
            }
        }

        let mut new = 0;
        for (idx, candidate) in batch.iter().enumerate() {
            let item = match inspected[idx].take() {
                Some(item) => item,
                None => self.inspect(accessor, candidate, &dates[idx])?,
            };

            let Some(identity) = item.identity else {
                run.skipped += 1;
                continue;
            };
            if !self.tracker.admit(identity, item.key.as_ref()) {
                continue;
            }

            match item.transaction {
                Some(tx) if tx.is_spending() => {
                    info!(
                        date = tx.date(),
                        description = tx.description(),
                        amount = %tx.amount(),
                        "New transaction"
                    );
                    run.transactions.push(tx);
                    new += 1;
                }
                Some(tx) => debug!(description = tx.description(), "Not spending, ignored"),
                None => run.skipped += 1,
            }
        }

        Ok(BatchResult::New(new))
    }

    fn uses_references(&self) -> bool {
        !matches!(self.settings.identity, IdentityStrategy::Tuple)
    }

    /// Section date for each candidate, from the headers attached right now
    fn batch_dates<A: UiTreeAccessor>(
        &mut self,
        accessor: &A,
        batch: &[Candidate<A::Element>],
    ) -> Result<Vec<String>> {
        let headers = if self.locators.date_header_xpath.is_empty() {
            Vec::new()
        } else {
            match absorb(accessor.find_all(&self.locators.date_header_xpath), "date headers")? {
                Some(elements) => elements.iter().filter_map(read_header).collect(),
                None => Vec::new(),
            }
        };

        let rows = batch.iter().map(|c| (c.rect.y, c.text.as_str()));
        Ok(self.dates.assign(&headers, rows))
    }

    fn inspect<A: UiTreeAccessor>(
        &self,
        accessor: &A,
        candidate: &Candidate<A::Element>,
        date: &str,
    ) -> Result<Inspected> {
        let mut transaction = match self.parser.parse(&candidate.text, date) {
            Ok(tx) => Some(tx),
            Err(reason) => {
                debug!(%reason, text = %candidate.text, "Skipping row");
                None
            }
        };
        let key = transaction.as_ref().map(Transaction::key);

        let reference = match &self.settings.identity {
            IdentityStrategy::Tuple => None,
            IdentityStrategy::Attribute { name } => {
                absorb(candidate.element.attribute(name), "identity attribute")?
                    .flatten()
                    .filter(|value| !value.trim().is_empty())
            }
            IdentityStrategy::Detail => {
                match absorb(self.details.read(accessor, &candidate.element), "detail view")? {
                    Some(view) => {
                        if let Some(booked) = view.date {
                            transaction = transaction.map(|tx| tx.with_date(booked));
                        }
                        view.reference
                    }
                    None => None,
                }
            }
        };

        if let Some(reference) = &reference {
            transaction = transaction.map(|tx| tx.with_reference(reference.clone()));
        } else if self.uses_references() {
            debug!(text = %candidate.text, "No reference, falling back to tuple identity");
        }

        let identity = reference
            .map(Identity::Reference)
            .or_else(|| key.clone().map(Identity::Tuple));

        Ok(Inspected {
            transaction,
            identity,
            key,
        })
    }
}

/// Keep fatal errors, log and drop the rest
fn absorb<T>(result: Result<T>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(error = %e, "{what} unavailable");
            Ok(None)
        }
    }
}

fn read_header<E: ElementAttributes>(element: &E) -> Option<SectionHeader> {
    let text = element.text().ok()?;
    let title = text.lines().map(str::trim).find(|l| !l.is_empty())?.to_string();
    let y = element.rect().ok()?.y;
    Some(SectionHeader { y, title })
}
