//! Tool-Budget Accountant (§3, §4.1) — authoritative bookkeeping for tool
//! usage within one agent session. Not shared between sessions; each
//! engine constructs its own (design §9).

use std::collections::HashMap;

use crate::key::ToolKey;

/// A single tool's call ceiling and floor. `max_calls == 0` means
/// unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolLimit {
    pub min_calls: u32,
    pub max_calls: u32,
}

/// Mapping from tool key to `{min_calls, max_calls}` (§3 — ToolConstraints).
#[derive(Debug, Clone, Default)]
pub struct ToolConstraints {
    limits: HashMap<ToolKey, ToolLimit>,
}

impl ToolConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, key: ToolKey, limit: ToolLimit) -> Self {
        self.limits.insert(key, limit);
        self
    }

    pub fn limit(&self, key: &ToolKey) -> ToolLimit {
        self.limits.get(key).copied().unwrap_or_default()
    }

    /// Keys with a non-zero `min_calls`.
    pub fn required_tools(&self) -> Vec<ToolKey> {
        self.limits
            .iter()
            .filter(|(_, limit)| limit.min_calls != 0)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Per-tool call counters for one session (§4.1).
///
/// Invariants: `counter[k] >= 0`; `has_credits(k)` iff
/// `max_calls(k) == 0 || counter[k] < max_calls(k)`; `unused_required(k)`
/// iff `k` is required, `counter[k] < min_calls(k)`, and `has_credits(k)`
/// holds.
#[derive(Debug, Clone)]
pub struct ToolBudget {
    constraints: ToolConstraints,
    counters: HashMap<ToolKey, u64>,
}

impl ToolBudget {
    pub fn new(constraints: ToolConstraints) -> Self {
        Self { constraints, counters: HashMap::new() }
    }

    fn counter(&self, key: &ToolKey) -> u64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// True iff `max_calls(key) == 0` or `counter[key] < max_calls(key)`.
    pub fn has_credits(&self, key: &ToolKey) -> bool {
        let limit = self.constraints.limit(key);
        limit.max_calls == 0 || self.counter(key) < limit.max_calls as u64
    }

    /// Adds one. Must be called *after* successful tool execution.
    /// Incrementing past the maximum is allowed — stored as-is — but
    /// `has_credits` then returns false.
    pub fn increment(&mut self, key: &ToolKey) {
        *self.counters.entry(key.clone()).or_insert(0) += 1;
    }

    /// For every key with a configured maximum, `max(0, max_calls(key) -
    /// counter[key])`. Keys with no configured max are absent.
    pub fn remaining(&self) -> HashMap<ToolKey, u64> {
        self.constraints
            .limits
            .iter()
            .filter(|(_, limit)| limit.max_calls != 0)
            .map(|(key, limit)| {
                let used = self.counter(key);
                let remaining = (limit.max_calls as u64).saturating_sub(used);
                (key.clone(), remaining)
            })
            .collect()
    }

    /// Keys `k` where `k` is required, `counter[k] < min_calls(k)`, and
    /// `has_credits(k)` holds.
    pub fn unused_required(&self) -> Vec<ToolKey> {
        self.constraints
            .required_tools()
            .into_iter()
            .filter(|key| {
                let limit = self.constraints.limit(key);
                self.counter(key) < limit.min_calls as u64 && self.has_credits(key)
            })
            .collect()
    }

    /// Zero all counters.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
