//! The three ways of consuming the weather source: once, periodically, and
//! as a joined pair.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    error::TransportError,
    fetcher::WeatherSource,
    model::WeatherQuery,
    scope::{Scope, Surface},
};

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Longest polling period; longer ones are clamped to it.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Fetch once and emit on [`Surface::Once`].
pub fn fetch_once(
    scope: &Scope,
    source: Arc<dyn WeatherSource>,
    query: WeatherQuery,
) -> JoinHandle<()> {
    let emitter = scope.emitter(Surface::Once);

    scope.spawn(async move {
        let token = emitter.token().clone();
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(location = %query.location, "single fetch cancelled");
            }
            res = source.fetch(&query) => {
                emitter.emit(res.map(|result| result.line()));
            }
        }
    })
}

/// Fetch every `period`, starting one period from now, and emit each result
/// on [`Surface::Interval`] until the scope is paused.
///
/// Fetches run one after another, so results arrive in issue order. A fetch
/// slower than `period` pushes the next tick back instead of bunching ticks.
/// `period` is clamped to at most [`MAX_POLL_INTERVAL`].
pub fn fetch_every(
    scope: &Scope,
    source: Arc<dyn WeatherSource>,
    query: WeatherQuery,
    period: Duration,
) -> JoinHandle<()> {
    let emitter = scope.emitter(Surface::Interval);
    let clamped = period.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
    if clamped != period {
        tracing::warn!(?period, ?clamped, "polling period out of range, clamped");
    }
    let period = clamped;

    scope.spawn(async move {
        let token = emitter.token().clone();
        let now = time::Instant::now();
        let start = now.checked_add(period).unwrap_or(now);
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tracing::debug!(tick, location = %query.location, "polling weather");
            tick += 1;

            let res = tokio::select! {
                _ = token.cancelled() => break,
                res = source.fetch(&query) => res,
            };

            if !emitter.emit(res.map(|result| result.line())) {
                break;
            }
        }

        tracing::debug!(ticks = tick, "polling stopped");
    })
}

/// Fetch `left` and `right` concurrently and emit their lines joined, left
/// first, on [`Surface::Pair`]. Either transport failure fails the pair.
pub fn fetch_pair(
    scope: &Scope,
    source: Arc<dyn WeatherSource>,
    left: WeatherQuery,
    right: WeatherQuery,
) -> JoinHandle<()> {
    let emitter = scope.emitter(Surface::Pair);

    scope.spawn(async move {
        let token = emitter.token().clone();
        let joined = async {
            let (l, r) = tokio::try_join!(source.fetch(&left), source.fetch(&right))?;
            Ok::<_, TransportError>(format!("{}{}", l.line(), r.line()))
        };

        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("paired fetch cancelled");
            }
            outcome = joined => {
                emitter.emit(outcome);
            }
        }
    })
}
