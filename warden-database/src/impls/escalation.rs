//! Escalation ladder evaluation.
//!
//! Pure functions over an already resolved ladder; no I/O happens here.

use std::collections::HashSet;

use crate::model::config::{EscalationAction, EscalationRule};

/// Pick the rule that fires for the `trigger_count`-th case.
///
/// Rules are walked in ascending threshold order and only an exact match
/// fires, so a rule triggers once when the count reaches it and never again
/// for later cases above it. With duplicate thresholds the earlier rule in
/// the ladder wins.
pub fn evaluate(rules: &[EscalationRule], trigger_count: u64) -> Option<&EscalationRule> {
    let mut ordered: Vec<&EscalationRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| rule.threshold);

    ordered
        .into_iter()
        .find(|rule| rule.threshold == trigger_count)
}

/// Reject ladders that could never fire or would fire ambiguously.
pub fn validate_ladder(rules: &[EscalationRule]) -> anyhow::Result<()> {
    let mut seen_ids = HashSet::new();

    for rule in rules {
        if rule.id.trim().is_empty() {
            anyhow::bail!("escalation rule ids must not be empty");
        }
        if !seen_ids.insert(rule.id.as_str()) {
            anyhow::bail!("duplicate escalation rule id `{}`", rule.id);
        }
        if rule.threshold == 0 {
            anyhow::bail!("escalation rule `{}` needs a threshold above zero", rule.id);
        }
        if let EscalationAction::Timeout { duration_ms: 0, .. } = rule.action {
            anyhow::bail!("escalation rule `{}` has a zero-length timeout", rule.id);
        }
    }

    Ok(())
}

/// Short lowercase summary such as `timeout (3600000 ms)` or `ban`.
pub fn describe_action(action: &EscalationAction) -> String {
    match action {
        EscalationAction::Timeout { duration_ms, .. } => format!("timeout ({duration_ms} ms)"),
        EscalationAction::Ban { .. } => "ban".to_owned(),
        EscalationAction::Kick { .. } => "kick".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{describe_action, evaluate, validate_ladder};
    use crate::model::config::{EscalationAction, EscalationLadders, EscalationRule};

    fn rule(id: &str, threshold: u64) -> EscalationRule {
        EscalationRule {
            id: id.to_owned(),
            threshold,
            action: EscalationAction::Kick {
                reason: "test".to_owned(),
            },
            note: String::new(),
        }
    }

    #[test]
    fn fires_only_on_exact_thresholds() {
        let rules = EscalationLadders::default().warn;

        assert!(evaluate(&rules, 1).is_none());
        assert!(evaluate(&rules, 2).is_none());
        assert_eq!(
            evaluate(&rules, 3).map(|rule| rule.id.as_str()),
            Some("warn-3-timeout-1h")
        );
        assert!(evaluate(&rules, 4).is_none());
        assert_eq!(
            evaluate(&rules, 5).map(|rule| rule.id.as_str()),
            Some("warn-5-ban")
        );
        assert!(evaluate(&rules, 6).is_none());
    }

    #[test]
    fn ladder_order_in_storage_does_not_matter() {
        let rules = vec![rule("high", 5), rule("low", 2)];
        assert_eq!(evaluate(&rules, 2).map(|r| r.id.as_str()), Some("low"));
        assert_eq!(evaluate(&rules, 5).map(|r| r.id.as_str()), Some("high"));
    }

    #[test]
    fn duplicate_thresholds_pick_the_first_rule() {
        let rules = vec![rule("first", 2), rule("second", 2)];
        assert_eq!(evaluate(&rules, 2).map(|r| r.id.as_str()), Some("first"));
    }

    #[test]
    fn empty_ladder_never_fires() {
        assert!(evaluate(&[], 3).is_none());
    }

    #[test]
    fn validation_rejects_broken_ladders() {
        assert!(validate_ladder(&EscalationLadders::default().warn).is_ok());
        assert!(validate_ladder(&[]).is_ok());
        assert!(validate_ladder(&[rule("a", 0)]).is_err());
        assert!(validate_ladder(&[rule("a", 1), rule("a", 2)]).is_err());
        assert!(validate_ladder(&[rule(" ", 1)]).is_err());

        let zero_timeout = EscalationRule {
            action: EscalationAction::Timeout {
                duration_ms: 0,
                reason: "x".to_owned(),
            },
            ..rule("t", 1)
        };
        assert!(validate_ladder(&[zero_timeout]).is_err());
    }

    #[test]
    fn actions_have_short_descriptions() {
        let rules = EscalationLadders::default().warn;
        assert_eq!(describe_action(&rules[0].action), "timeout (3600000 ms)");
        assert_eq!(describe_action(&rules[1].action), "ban");
    }
}
