//! Validation, change detection and rate limiting of routing policy updates.

use std::collections::HashSet;

use torq_types::prelude::{Channel, RoutingPolicy, RoutingPolicyEvent};

use crate::{
    backend::PolicySubmission,
    errors::{RequestError, Result},
    messages::RoutingPolicyUpdateRequest,
};

/// Smallest time lock delta accepted for an update.
pub const MIN_TIME_LOCK_DELTA: u32 = 18;

/// Checks the request on its own, before looking at the channel.
///
/// A request without any field is not an error, callers answer it with "Nothing changed".
pub fn validate(request: &RoutingPolicyUpdateRequest) -> Result<()> {
    if request.channel_id == 0 {
        return Err(RequestError::Validation("channel id is required".into()));
    }
    if let Some(delta) = request.time_lock_delta {
        if delta < MIN_TIME_LOCK_DELTA {
            return Err(RequestError::Validation(format!(
                "time lock delta must be at least {MIN_TIME_LOCK_DELTA}, got {delta}"
            )));
        }
    }
    if request.fee_rate_milli_msat.is_some_and(|v| v < 0) || request.fee_base_msat.is_some_and(|v| v < 0) {
        return Err(RequestError::Validation("fees must not be negative".into()));
    }
    if let (Some(min), Some(max)) = (request.min_htlc_msat, request.max_htlc_msat) {
        if min > max {
            return Err(RequestError::Validation(format!(
                "min htlc {min} msat exceeds max htlc {max} msat"
            )));
        }
    }
    Ok(())
}

/// Policy field that can be changed by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyField {
    FeeRate,
    FeeBase,
    MaxHtlc,
    MinHtlc,
    TimeLockDelta,
}

impl PolicyField {
    fn value(&self, policy: &RoutingPolicy) -> i128 {
        match self {
            PolicyField::FeeRate => policy.fee_rate_milli_msat.into(),
            PolicyField::FeeBase => policy.fee_base_msat.into(),
            PolicyField::MaxHtlc => policy.max_htlc_msat.into(),
            PolicyField::MinHtlc => policy.min_htlc_msat.into(),
            PolicyField::TimeLockDelta => policy.time_lock_delta.into(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PolicyField::FeeRate => "fee rate",
            PolicyField::FeeBase => "base fee",
            PolicyField::MaxHtlc => "max htlc",
            PolicyField::MinHtlc => "min htlc",
            PolicyField::TimeLockDelta => "time lock delta",
        }
    }
}

/// Returns the policy after applying the request on top of `current`.
pub fn apply(current: &RoutingPolicy, request: &RoutingPolicyUpdateRequest) -> RoutingPolicy {
    RoutingPolicy {
        disabled: current.disabled,
        time_lock_delta: request.time_lock_delta.unwrap_or(current.time_lock_delta),
        min_htlc_msat: request.min_htlc_msat.unwrap_or(current.min_htlc_msat),
        max_htlc_msat: request.max_htlc_msat.unwrap_or(current.max_htlc_msat),
        fee_base_msat: request.fee_base_msat.unwrap_or(current.fee_base_msat),
        fee_rate_milli_msat: request.fee_rate_milli_msat.unwrap_or(current.fee_rate_milli_msat),
    }
}

/// Fields the request would change compared to the current policy.
pub fn changed_fields(current: &RoutingPolicy, request: &RoutingPolicyUpdateRequest) -> Vec<PolicyField> {
    let mut changed = Vec::new();
    if request.fee_rate_milli_msat.is_some_and(|v| v != current.fee_rate_milli_msat) {
        changed.push(PolicyField::FeeRate);
    }
    if request.fee_base_msat.is_some_and(|v| v != current.fee_base_msat) {
        changed.push(PolicyField::FeeBase);
    }
    if request.max_htlc_msat.is_some_and(|v| v != current.max_htlc_msat) {
        changed.push(PolicyField::MaxHtlc);
    }
    if request.min_htlc_msat.is_some_and(|v| v != current.min_htlc_msat) {
        changed.push(PolicyField::MinHtlc);
    }
    if request.time_lock_delta.is_some_and(|v| v != current.time_lock_delta) {
        changed.push(PolicyField::TimeLockDelta);
    }
    changed
}

/// Refuses the update when a field to be changed already took `limit` distinct values
/// within the recent `history`.
pub fn check_rate_limit(
    history: &[RoutingPolicyEvent],
    changed: &[PolicyField],
    limit: u32,
    window_seconds: u32,
) -> Result<()> {
    for field in changed {
        let distinct = history
            .iter()
            .map(|e| field.value(&e.policy))
            .collect::<HashSet<_>>()
            .len();

        if distinct >= limit as usize {
            return Err(RequestError::RateLimited(format!(
                "{} changed {distinct} times within the last {window_seconds} seconds",
                field.name()
            )));
        }
    }
    Ok(())
}

pub fn submission(channel: &Channel, current: &RoutingPolicy, request: &RoutingPolicyUpdateRequest) -> PolicySubmission {
    PolicySubmission {
        channel_id: channel.channel_id,
        channel_point: channel.channel_point(),
        short_channel_id: channel.short_channel_id.clone(),
        policy: apply(current, request),
        time_lock_delta_changed: request.time_lock_delta.is_some_and(|v| v != current.time_lock_delta),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn current() -> RoutingPolicy {
        RoutingPolicy {
            disabled: false,
            time_lock_delta: 40,
            min_htlc_msat: 1000,
            max_htlc_msat: 990_000_000,
            fee_base_msat: 1000,
            fee_rate_milli_msat: 300,
        }
    }

    fn event(fee_rate_milli_msat: i64) -> RoutingPolicyEvent {
        RoutingPolicyEvent {
            channel_id: 7,
            announcing_node_id: 1,
            connecting_node_id: 2,
            node_id: 1,
            policy: RoutingPolicy {
                fee_rate_milli_msat,
                ..current()
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case(RoutingPolicyUpdateRequest { channel_id: 0, fee_rate_milli_msat: Some(1), ..Default::default() }, false)]
    #[case(RoutingPolicyUpdateRequest { channel_id: 7, time_lock_delta: Some(17), ..Default::default() }, false)]
    #[case(RoutingPolicyUpdateRequest { channel_id: 7, time_lock_delta: Some(18), ..Default::default() }, true)]
    #[case(RoutingPolicyUpdateRequest { channel_id: 7, fee_base_msat: Some(-1), ..Default::default() }, false)]
    #[case(RoutingPolicyUpdateRequest { channel_id: 7, min_htlc_msat: Some(10), max_htlc_msat: Some(5), ..Default::default() }, false)]
    #[case(RoutingPolicyUpdateRequest { channel_id: 7, ..Default::default() }, true)]
    fn test_validation(#[case] request: RoutingPolicyUpdateRequest, #[case] valid: bool) {
        assert_eq!(validate(&request).is_ok(), valid);
    }

    #[test]
    fn test_only_differing_fields_count_as_changes() {
        let request = RoutingPolicyUpdateRequest {
            channel_id: 7,
            fee_rate_milli_msat: Some(300),
            fee_base_msat: Some(2000),
            ..Default::default()
        };
        assert_eq!(changed_fields(&current(), &request), vec![PolicyField::FeeBase]);

        let unchanged = RoutingPolicyUpdateRequest {
            channel_id: 7,
            fee_rate_milli_msat: Some(300),
            time_lock_delta: Some(40),
            ..Default::default()
        };
        assert!(changed_fields(&current(), &unchanged).is_empty());
    }

    #[test]
    fn test_rate_limiter_counts_distinct_values_per_field() {
        let history = vec![event(100), event(200), event(300)];

        let refused = check_rate_limit(&history, &[PolicyField::FeeRate], 2, 300);
        assert!(matches!(refused, Err(RequestError::RateLimited(_))));
        assert!(refused.unwrap_err().to_string().contains("rate limiter"));

        assert!(check_rate_limit(&history, &[PolicyField::FeeBase], 2, 300).is_ok());
    }

    #[test]
    fn test_third_distinct_value_is_refused() {
        assert!(check_rate_limit(&[event(100)], &[PolicyField::FeeRate], 2, 300).is_ok());
        assert!(check_rate_limit(&[event(100), event(200)], &[PolicyField::FeeRate], 2, 300).is_err());
        assert!(check_rate_limit(&[], &[PolicyField::FeeRate], 2, 300).is_ok());
    }

    #[test]
    fn test_missing_fields_are_filled_from_current_policy() {
        let request = RoutingPolicyUpdateRequest {
            channel_id: 7,
            fee_rate_milli_msat: Some(10),
            ..Default::default()
        };
        let applied = apply(&current(), &request);

        assert_eq!(applied.fee_rate_milli_msat, 10);
        assert_eq!(applied.fee_base_msat, 1000);
        assert_eq!(applied.time_lock_delta, 40);
        assert_eq!(applied.max_htlc_msat, 990_000_000);
    }
}
