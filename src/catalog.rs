// Pattern catalog - classification rules as data.
//
// The catalog is a fixed ordered list: one entry per transaction type,
// each with its patterns in declared order. The first pattern that
// matches anywhere in the catalog decides the type, so BOTH orders are
// part of the classification contract. In particular, the generic
// BankTransfer entry is listed last as the fallback for bank-related
// text that no specific template claimed; reordering entries changes
// classification outcomes and is a breaking change.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::classify::ClassifyError;
use crate::model::{TransactionRecord, TransactionType};

/// How a pattern's captured groups map onto record fields.
///
/// One tagged variant per capture shape, so a pattern whose group count
/// changes fails to bind loudly instead of silently misbinding by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binder {
    /// Group 1 = amount, group 2 = sender name.
    AmountSender,
    /// Group 1 = amount, group 2 = receiver name.
    AmountReceiver,
    /// Group 1 = amount; receiver is a fixed counterparty name.
    FixedReceiver(&'static str),
    /// Long form: groups 1-4 = actor, agent name, agent phone, amount.
    /// Short form: group 1 = amount only; agent fields stay absent.
    AgentWithdrawal,
    /// Group 1 = amount, nothing else.
    AmountOnly,
}

impl Binder {
    /// Populate `record` from the captures of a matched pattern.
    pub fn bind(
        &self,
        caps: &Captures<'_>,
        record: &mut TransactionRecord,
    ) -> Result<(), ClassifyError> {
        match self {
            Binder::AmountSender => {
                record.amount = parse_amount(&caps[1])?;
                record.sender_name = Some(caps[2].trim().to_string());
            }
            Binder::AmountReceiver => {
                record.amount = parse_amount(&caps[1])?;
                record.receiver_name = Some(caps[2].trim().to_string());
            }
            Binder::FixedReceiver(name) => {
                record.amount = parse_amount(&caps[1])?;
                record.receiver_name = Some((*name).to_string());
            }
            Binder::AgentWithdrawal => {
                if caps.len() >= 5 {
                    // Long form: all four fields populated together.
                    record.sender_name = Some(caps[1].trim().to_string());
                    record.agent_name = Some(caps[2].trim().to_string());
                    record.agent_phone = Some(caps[3].to_string());
                    record.amount = parse_amount(&caps[4])?;
                } else {
                    // Short form fallback: amount only, agent unknown.
                    record.amount = parse_amount(&caps[1])?;
                }
            }
            Binder::AmountOnly => {
                record.amount = parse_amount(&caps[1])?;
            }
        }
        Ok(())
    }
}

fn parse_amount(raw: &str) -> Result<f64, ClassifyError> {
    raw.parse::<f64>()
        .ok()
        .filter(|a| a.is_finite() && *a >= 0.0)
        .ok_or(ClassifyError::InvalidAmount)
}

/// One transaction type with its compiled patterns and binding rule.
pub struct PatternRule {
    pub transaction_type: TransactionType,
    pub patterns: Vec<Regex>,
    pub binder: Binder,
}

struct RuleSpec {
    transaction_type: TransactionType,
    patterns: &'static [&'static str],
    binder: Binder,
}

// Declared catalog order. Within each entry, patterns go from the full
// provider template down to looser fallbacks.
const RULE_SPECS: &[RuleSpec] = &[
    RuleSpec {
        transaction_type: TransactionType::IncomingMoney,
        patterns: &[
            r"You have received (\d+(?:\.\d+)?) RWF from (.+?)\.",
            r"received (\d+(?:\.\d+)?) RWF from (.+?)[\.\s]",
        ],
        binder: Binder::AmountSender,
    },
    RuleSpec {
        transaction_type: TransactionType::PaymentCompleted,
        patterns: &[
            r"Your payment of (\d+(?:\.\d+)?) RWF to (.+?) has been completed",
            r"payment of (\d+(?:\.\d+)?) RWF to (.+?) has been completed",
        ],
        binder: Binder::AmountReceiver,
    },
    RuleSpec {
        transaction_type: TransactionType::AirtimePayment,
        patterns: &[
            r"payment of (\d+(?:\.\d+)?) RWF to Airtime",
            r"(\d+(?:\.\d+)?) RWF.*?Airtime.*?completed",
        ],
        binder: Binder::FixedReceiver("Airtime"),
    },
    RuleSpec {
        transaction_type: TransactionType::AgentWithdrawal,
        patterns: &[
            r"You (.+?) have via agent: (.+?) \((\d+)\), withdrawn (\d+(?:\.\d+)?) RWF",
            r"withdrawn (\d+(?:\.\d+)?) RWF.*?agent",
        ],
        binder: Binder::AgentWithdrawal,
    },
    RuleSpec {
        transaction_type: TransactionType::InternetBundle,
        patterns: &[
            r"purchased an internet bundle.*?(\d+(?:\.\d+)?) RWF",
            r"internet bundle.*?(\d+(?:\.\d+)?) RWF",
        ],
        binder: Binder::FixedReceiver("Internet Bundle"),
    },
    RuleSpec {
        transaction_type: TransactionType::BankTransfer,
        patterns: &[
            r"bank.*?(\d+(?:\.\d+)?) RWF",
            r"(\d+(?:\.\d+)?) RWF.*?bank",
        ],
        binder: Binder::AmountOnly,
    },
];

/// The compiled catalog, in declared order. All matching is
/// case-insensitive, searching anywhere in the text.
pub static CATALOG: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    RULE_SPECS
        .iter()
        .map(|spec| PatternRule {
            transaction_type: spec.transaction_type,
            patterns: spec
                .patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
                .collect(),
            binder: spec.binder,
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_declared_order() {
        let order: Vec<TransactionType> =
            CATALOG.iter().map(|r| r.transaction_type).collect();
        assert_eq!(order, TransactionType::ALL);
    }

    #[test]
    fn test_every_type_has_patterns() {
        for rule in CATALOG.iter() {
            assert!(
                !rule.patterns.is_empty(),
                "{:?} has no patterns",
                rule.transaction_type
            );
        }
    }

    #[test]
    fn test_incoming_money_full_template() {
        let rule = &CATALOG[0];
        let caps = rule.patterns[0]
            .captures("You have received 5000 RWF from John Doe.")
            .expect("full template should match");
        assert_eq!(&caps[1], "5000");
        assert_eq!(&caps[2], "John Doe");
    }

    #[test]
    fn test_agent_withdrawal_long_form_groups() {
        let rule = &CATALOG[3];
        assert_eq!(rule.transaction_type, TransactionType::AgentWithdrawal);

        let caps = rule.patterns[0]
            .captures("You Jane Doe have via agent: Agent Bob (250788123456), withdrawn 20000 RWF")
            .expect("long form should match");
        assert_eq!(caps.len(), 5);
        assert_eq!(&caps[1], "Jane Doe");
        assert_eq!(&caps[2], "Agent Bob");
        assert_eq!(&caps[3], "250788123456");
        assert_eq!(&caps[4], "20000");
    }

    #[test]
    fn test_agent_withdrawal_short_form_single_group() {
        let rule = &CATALOG[3];
        let caps = rule.patterns[1]
            .captures("You have withdrawn 5000 RWF via agent")
            .expect("short form should match");
        assert_eq!(caps.len(), 2);
        assert_eq!(&caps[1], "5000");
    }

    #[test]
    fn test_binder_rejects_unparseable_amount() {
        // Shape check only; the classifier never reaches bind() with a
        // non-numeric group because the patterns capture digits.
        assert_eq!(parse_amount("not-a-number"), Err(ClassifyError::InvalidAmount));
        assert_eq!(parse_amount("5000"), Ok(5000.0));
        assert_eq!(parse_amount("12.5"), Ok(12.5));
    }
}
