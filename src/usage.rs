//! Token usage counters per tenant. Process lifetime only.

use std::collections::BTreeMap;
use std::sync::Mutex;

use docbot_core::models::TokenUsage;

#[derive(Default)]
pub struct UsageTracker {
    totals: Mutex<BTreeMap<String, TokenUsage>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, tenant_id: &str, usage: &TokenUsage) {
        self.totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(tenant_id.to_string())
            .or_default()
            .add(usage);
    }

    pub fn usage(&self, tenant_id: &str) -> TokenUsage {
        self.totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(tenant_id)
            .copied()
            .unwrap_or_default()
    }

    /// Every tenant's totals, sorted by tenant id.
    pub fn all(&self) -> Vec<(String, TokenUsage)> {
        self.totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_per_tenant() {
        let tracker = UsageTracker::new();
        let call = TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
            requests: 1,
        };
        tracker.record("p1", &call);
        tracker.record("p1", &call);
        tracker.record("p2", &call);

        let p1 = tracker.usage("p1");
        assert_eq!(p1.input_tokens, 200);
        assert_eq!(p1.requests, 2);
        assert_eq!(tracker.usage("p3"), TokenUsage::default());
        assert_eq!(tracker.all().len(), 2);
    }
}
