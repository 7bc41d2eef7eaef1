//! Refresh cycles
//!
//! A cycle reads one payload from a [`Source`] and builds a [`Dashboard`] from
//! it. The [`Refresher`] starts a cycle on a fixed period and publishes each
//! result as a [`Snapshot`] on a watch channel.
//!
//! Starting a cycle cancels the previous one if it is still running. Every
//! cycle carries a generation number and a snapshot is only published when
//! its generation is newer than the one on the board, so a late result never
//! replaces a fresher one.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tallyboard_engine::{Dashboard, ViewOptions};
use tokio::{sync::watch, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    fetch::{self, Fetcher},
    source::Source,
};

/// Errors produced by a refresh cycle
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The payload could not be read
    #[error(transparent)]
    Fetch(#[from] fetch::Error),
    /// The payload could not be turned into a dashboard
    #[error(transparent)]
    Engine(#[from] tallyboard_engine::Error),
}

impl Error {
    /// See [`fetch::Error::is_timeout`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Fetch(err) if err.is_timeout())
    }
}

/// The product of one successful cycle
#[derive(Debug, Clone)]
pub struct Cycle {
    /// The payload exactly as read
    pub raw: String,
    /// Every view built from `raw`
    pub dashboard: Dashboard,
    /// When the payload was read
    pub fetched_at: DateTime<Utc>,
}

/// The outcome of one cycle, tagged with its generation
#[derive(Debug)]
pub struct Snapshot {
    /// Sequence number of the cycle, starting at 1
    pub generation: u64,
    /// What the cycle produced
    pub outcome: Result<Cycle, Error>,
}

/// Everything a cycle needs
#[derive(Debug, Clone)]
pub struct Pipeline {
    fetcher: Fetcher,
    source: Source,
    options: ViewOptions,
}

impl Pipeline {
    /// Create a new [`Pipeline`]
    #[must_use]
    pub fn new(fetcher: Fetcher, source: Source, options: ViewOptions) -> Self {
        Self {
            fetcher,
            source,
            options,
        }
    }

    /// The source payloads are read from.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Run one cycle to completion.
    ///
    /// # Errors
    ///
    /// Fails if the payload cannot be read or is empty.
    pub async fn run(&self) -> Result<Cycle, Error> {
        let raw = self.source.read(&self.fetcher).await?;
        let fetched_at = Utc::now();
        let dashboard = Dashboard::build(&raw, &self.options).inspect_err(|err| {
            warn!("payload from {} is unusable: {err}", self.source);
        })?;
        gauge!("tallyboard.samples").set(dashboard.samples as f64);
        gauge!("tallyboard.samples.classified").set(dashboard.classified.len() as f64);
        Ok(Cycle {
            raw,
            dashboard,
            fetched_at,
        })
    }
}

/// Put `snapshot` on the board unless the board already holds a snapshot of
/// the same or a later generation. Returns whether the board changed.
pub fn publish(board: &watch::Sender<Option<Snapshot>>, snapshot: Snapshot) -> bool {
    board.send_if_modified(|current| {
        if current
            .as_ref()
            .is_some_and(|c| c.generation >= snapshot.generation)
        {
            debug!(
                generation = snapshot.generation,
                "discarding stale refresh result"
            );
            return false;
        }
        *current = Some(snapshot);
        true
    })
}

/// Periodic refresher
#[derive(Debug)]
pub struct Refresher {
    pipeline: Arc<Pipeline>,
    period: Duration,
    board: Arc<watch::Sender<Option<Snapshot>>>,
}

impl Refresher {
    /// Create a new [`Refresher`] and the receiving end of its board.
    #[must_use]
    pub fn new(pipeline: Pipeline, period: Duration) -> (Self, watch::Receiver<Option<Snapshot>>) {
        let (board, rx) = watch::channel(None);
        let refresher = Self {
            pipeline: Arc::new(pipeline),
            period,
            board: Arc::new(board),
        };
        (refresher, rx)
    }

    /// Run cycles every `period` until `shutdown` is cancelled.
    ///
    /// The first cycle starts immediately. Cancelling `shutdown` also cancels
    /// the cycle in flight.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "refreshing {} every {:?}",
            self.pipeline.source(),
            self.period
        );
        let mut tick = tokio::time::interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut generation: u64 = 0;
        let mut inflight: Option<CancellationToken> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Some(previous) = inflight.take() {
                        previous.cancel();
                    }
                    generation += 1;
                    let token = shutdown.child_token();
                    inflight = Some(token.clone());
                    tokio::spawn(cycle(
                        generation,
                        Arc::clone(&self.pipeline),
                        Arc::clone(&self.board),
                        token,
                    ));
                }
                () = shutdown.cancelled() => {
                    info!("shutdown signal received");
                    return;
                }
            }
        }
    }
}

async fn cycle(
    generation: u64,
    pipeline: Arc<Pipeline>,
    board: Arc<watch::Sender<Option<Snapshot>>>,
    token: CancellationToken,
) {
    tokio::select! {
        () = token.cancelled() => {
            debug!(generation, "refresh cycle cancelled");
            counter!("tallyboard.cycles", "outcome" => "cancelled").increment(1);
        }
        outcome = pipeline.run() => {
            let label = if outcome.is_ok() { "success" } else { "failure" };
            counter!("tallyboard.cycles", "outcome" => label).increment(1);
            publish(&board, Snapshot { generation, outcome });
        }
    }
}
