//! Usage ledger backed by a durable key-value store

use super::types::{
    CooldownEntry, UsageEvent, UsageKind, UsageReport, UsageSnapshot, UsageWindow,
};
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::storage::{self, KvStore};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type CooldownMap = BTreeMap<String, DateTime<Utc>>;

/// Sliding-window usage accounting and cooldown bookkeeping
///
/// The ledger holds no state of its own: every call reads or atomically
/// updates the backing store, so any number of ledgers (and routers) sharing
/// a store observe the same usage.
#[derive(Debug, Clone)]
pub struct UsageLedger {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl UsageLedger {
    /// Create a ledger over `store` using the system clock
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config: LedgerConfig::default(),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use different storage keys
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Current time according to the ledger's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record a consumption event
    ///
    /// Prunes events older than the longest window and appends the new one
    /// in a single atomic store update. Zero counts are recorded as well.
    pub async fn consume(
        &self,
        backend_id: &str,
        kind: UsageKind,
        count: u64,
    ) -> SwitchyardResult<()> {
        if backend_id.trim().is_empty() {
            return Err(SwitchyardError::config("Backend id must not be empty"));
        }

        let now = self.clock.now();
        let cutoff = now - UsageWindow::longest().time_delta();
        let event = UsageEvent {
            timestamp: now,
            backend_id: backend_id.to_string(),
            kind,
            count,
        };

        let retained = storage::update_json(
            self.store.as_ref(),
            &self.config.events_key,
            |events: &mut Vec<UsageEvent>| {
                events.retain(|e| e.timestamp >= cutoff);
                events.push(event.clone());
                events.len()
            },
        )
        .await?;

        debug!(backend_id, %kind, count, retained, "Recorded usage");
        Ok(())
    }

    /// Usage of `backend_id` within `window`, measured back from now
    pub async fn get_usage(
        &self,
        backend_id: &str,
        window: UsageWindow,
    ) -> SwitchyardResult<UsageSnapshot> {
        let events = self.load_events().await?;
        Ok(summarize(&events, backend_id, window, self.clock.now()))
    }

    /// Usage for every window plus cooldown state, from a single read of each key
    pub async fn report(&self, backend_id: &str) -> SwitchyardResult<UsageReport> {
        let events = self.load_events().await?;
        let now = self.clock.now();
        let cooldown_until = self.cooldown_until(backend_id).await?;
        Ok(UsageReport {
            backend_id: backend_id.to_string(),
            minute: summarize(&events, backend_id, UsageWindow::Minute, now),
            hour: summarize(&events, backend_id, UsageWindow::Hour, now),
            day: summarize(&events, backend_id, UsageWindow::Day, now),
            cooldown_until,
        })
    }

    /// Put a backend in cooldown for `duration` from now
    ///
    /// Last write wins: a shorter duration shortens an existing cooldown.
    pub async fn set_cooldown(&self, backend_id: &str, duration: Duration) -> SwitchyardResult<()> {
        let now = self.clock.now();
        let until = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        storage::update_json(
            self.store.as_ref(),
            &self.config.cooldowns_key,
            |cooldowns: &mut CooldownMap| {
                cooldowns.retain(|_, expiry| *expiry > now);
                cooldowns.insert(backend_id.to_string(), until);
            },
        )
        .await?;

        debug!(backend_id, until = %until, "Set cooldown");
        Ok(())
    }

    /// Whether `backend_id` has an unexpired cooldown
    pub async fn is_under_cooldown(&self, backend_id: &str) -> SwitchyardResult<bool> {
        Ok(self.cooldown_until(backend_id).await?.is_some())
    }

    /// End of the active cooldown for `backend_id`, if any
    ///
    /// Finding an expired entry prunes every expired entry from the store.
    pub async fn cooldown_until(&self, backend_id: &str) -> SwitchyardResult<Option<DateTime<Utc>>> {
        let cooldowns = self.load_cooldowns().await?;
        let now = self.clock.now();
        match cooldowns.get(backend_id) {
            Some(until) if now < *until => Ok(Some(*until)),
            Some(_) => {
                self.prune_cooldowns(now).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Remove any cooldown for `backend_id`, returning whether one was active
    pub async fn clear_cooldown(&self, backend_id: &str) -> SwitchyardResult<bool> {
        let now = self.clock.now();
        storage::update_json(
            self.store.as_ref(),
            &self.config.cooldowns_key,
            |cooldowns: &mut CooldownMap| {
                let removed = cooldowns.remove(backend_id);
                cooldowns.retain(|_, expiry| *expiry > now);
                removed.is_some_and(|expiry| expiry > now)
            },
        )
        .await
    }

    /// All active cooldowns
    pub async fn cooldowns(&self) -> SwitchyardResult<Vec<CooldownEntry>> {
        let now = self.clock.now();
        Ok(self
            .load_cooldowns()
            .await?
            .into_iter()
            .filter(|(_, until)| now < *until)
            .map(|(backend_id, until)| CooldownEntry { backend_id, until })
            .collect())
    }

    /// Every backend id with recorded usage or an active cooldown
    pub async fn known_backends(&self) -> SwitchyardResult<BTreeSet<String>> {
        let mut ids: BTreeSet<String> = self
            .load_events()
            .await?
            .into_iter()
            .map(|e| e.backend_id)
            .collect();
        ids.extend(self.cooldowns().await?.into_iter().map(|c| c.backend_id));
        Ok(ids)
    }

    /// Erase the event log and every cooldown
    pub async fn clear_all(&self) -> SwitchyardResult<()> {
        storage::write_json(
            self.store.as_ref(),
            &self.config.events_key,
            &Vec::<UsageEvent>::new(),
        )
        .await?;
        storage::write_json(
            self.store.as_ref(),
            &self.config.cooldowns_key,
            &CooldownMap::new(),
        )
        .await?;
        debug!("Cleared usage ledger");
        Ok(())
    }

    async fn load_events(&self) -> SwitchyardResult<Vec<UsageEvent>> {
        storage::read_json(self.store.as_ref(), &self.config.events_key).await
    }

    async fn load_cooldowns(&self) -> SwitchyardResult<CooldownMap> {
        storage::read_json(self.store.as_ref(), &self.config.cooldowns_key).await
    }

    async fn prune_cooldowns(&self, now: DateTime<Utc>) -> SwitchyardResult<()> {
        storage::update_json(
            self.store.as_ref(),
            &self.config.cooldowns_key,
            |cooldowns: &mut CooldownMap| cooldowns.retain(|_, until| *until > now),
        )
        .await
    }
}

/// Sum matching events whose timestamp falls within `window` of `now`
fn summarize(
    events: &[UsageEvent],
    backend_id: &str,
    window: UsageWindow,
    now: DateTime<Utc>,
) -> UsageSnapshot {
    let start = now - window.time_delta();
    events
        .iter()
        .filter(|e| e.backend_id == backend_id && e.timestamp >= start)
        .fold(UsageSnapshot::default(), |mut snapshot, e| {
            snapshot.add(e.kind, e.count);
            snapshot
        })
}
