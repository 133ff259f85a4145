use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::{ConversionPolicy, EngineError, Group, Ledger, NoRates, RateSource, ResultEngine, SplitRule};

mod expenses;
mod groups;
mod reports;

/// In-memory settlement engine holding every group it manages.
///
/// Writes take `&mut self`, so one engine has a single writer at a time;
/// reads take `&self` and can be shared behind a reader lock.
pub struct Engine {
    groups: HashMap<Uuid, Group>,
    rates: Arc<dyn RateSource + Send + Sync>,
    policy: ConversionPolicy,
    default_split: SplitRule,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Which date's rate values foreign-currency entries.
    #[must_use]
    pub fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    fn require_group(&self, group_id: Uuid) -> ResultEngine<&Group> {
        self.groups
            .get(&group_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("group {group_id}")))
    }

    fn require_group_mut(&mut self, group_id: Uuid) -> ResultEngine<&mut Group> {
        self.groups
            .get_mut(&group_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("group {group_id}")))
    }

    fn ledger(&self, group_id: Uuid) -> ResultEngine<Ledger<'_>> {
        let group = self.require_group(group_id)?;
        Ok(Ledger::new(group, &*self.rates, self.policy))
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("groups", &self.groups.len())
            .field("policy", &self.policy)
            .field("default_split", &self.default_split)
            .finish_non_exhaustive()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    rates: Option<Arc<dyn RateSource + Send + Sync>>,
    policy: ConversionPolicy,
    default_split: SplitRule,
    groups: Vec<Group>,
}

impl EngineBuilder {
    /// Exchange rates used for conversion. Without one only home-currency
    /// and rate-pinned expenses are accepted.
    #[must_use]
    pub fn rate_source<R>(mut self, rates: R) -> EngineBuilder
    where
        R: RateSource + Send + Sync + 'static,
    {
        self.rates = Some(Arc::new(rates));
        self
    }

    /// Like [`rate_source`](Self::rate_source), for a source already shared
    /// with other owners.
    #[must_use]
    pub fn shared_rate_source(mut self, rates: Arc<dyn RateSource + Send + Sync>) -> EngineBuilder {
        self.rates = Some(rates);
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: ConversionPolicy) -> EngineBuilder {
        self.policy = policy;
        self
    }

    /// Split rule given to groups created by the engine.
    #[must_use]
    pub fn default_split(mut self, split: SplitRule) -> EngineBuilder {
        self.default_split = split;
        self
    }

    /// Previously persisted groups to load.
    #[must_use]
    pub fn groups(mut self, groups: impl IntoIterator<Item = Group>) -> EngineBuilder {
        self.groups.extend(groups);
        self
    }

    /// Construct `Engine`
    #[must_use]
    pub fn build(self) -> Engine {
        let groups: HashMap<Uuid, Group> = self.groups.into_iter().map(|g| (g.id, g)).collect();
        tracing::debug!(groups = groups.len(), policy = ?self.policy, "engine built");
        Engine {
            groups,
            rates: self.rates.unwrap_or_else(|| Arc::new(NoRates)),
            policy: self.policy,
            default_split: self.default_split,
        }
    }
}
