// 🏷️ Classification Rules - Rules as Data
// Priority-ordered predicates over bank transactions that recommend which
// entry type to create. The engine only evaluates rules: persistence,
// reordering and priority editing belong to the surrounding application.

use crate::matching::BankTransaction;
use anyhow::{bail, Context as AnyhowContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionTypeFilter {
    Any,
    Withdrawal,
    Deposit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionCheck {
    Contains,
    #[serde(rename = "Starts With")]
    StartsWith,
    #[serde(rename = "Ends With")]
    EndsWith,
    Regex,
}

/// One description predicate; a rule matches when any of its description
/// rules match. Checks are case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionRule {
    pub check: DescriptionCheck,
    pub value: String,
}

impl DescriptionRule {
    pub fn matches(&self, description: &str) -> bool {
        match self.check {
            DescriptionCheck::Contains => description.contains(&self.value),
            DescriptionCheck::StartsWith => description.starts_with(&self.value),
            DescriptionCheck::EndsWith => description.ends_with(&self.value),
            DescriptionCheck::Regex => match Regex::new(&self.value) {
                Ok(pattern) => pattern.is_match(description),
                Err(_) => false,
            },
        }
    }
}

/// Which creation form the UI should recommend for a matched transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifyAs {
    #[serde(rename = "Bank Entry")]
    BankEntry,
    #[serde(rename = "Payment Entry")]
    PaymentEntry,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankEntryType {
    #[serde(rename = "Single Account")]
    SingleAccount,
    #[serde(rename = "Multiple Accounts")]
    MultipleAccounts,
}

/// Account row for a multi-account bank entry rule. Amounts are opaque to
/// the engine; the last row must stay empty (computed by formula when the
/// entry is built).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAccount {
    pub account: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRule {
    /// Rule ID for tracking
    pub name: String,

    pub rule_name: String,

    pub company: String,

    /// Evaluation order: lower number = higher priority = evaluated first
    #[serde(default)]
    pub priority: i32,

    pub transaction_type: TransactionTypeFilter,

    /// Amount bounds; `None` means the bound is not set
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,

    pub description_rules: Vec<DescriptionRule>,

    pub classify_as: ClassifyAs,

    #[serde(default)]
    pub bank_entry_type: Option<BankEntryType>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub accounts: Vec<RuleAccount>,

    #[serde(default)]
    pub party_type: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
}

impl TransactionRule {
    /// Check whether this rule matches the given transaction: company,
    /// direction filter and amount bounds must all pass, and at least one
    /// description rule must match.
    pub fn matches(&self, transaction: &BankTransaction) -> bool {
        if self.company != transaction.company {
            return false;
        }

        match self.transaction_type {
            TransactionTypeFilter::Any => {}
            TransactionTypeFilter::Withdrawal => {
                if transaction.withdrawal == 0.0 {
                    return false;
                }
            }
            TransactionTypeFilter::Deposit => {
                if transaction.deposit == 0.0 {
                    return false;
                }
            }
        }

        let amount = transaction.amount();
        if let Some(min_amount) = self.min_amount {
            if amount < min_amount {
                return false;
            }
        }
        if let Some(max_amount) = self.max_amount {
            if amount > max_amount {
                return false;
            }
        }

        self.description_rules
            .iter()
            .any(|rule| rule.matches(&transaction.description))
    }

    /// Validate the rule definition before it is stored or evaluated.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min_amount), Some(max_amount)) = (self.min_amount, self.max_amount) {
            if min_amount > max_amount {
                bail!("Min amount cannot be greater than max amount");
            }
        }

        if self.classify_as == ClassifyAs::PaymentEntry {
            if self.party_type.is_none() {
                bail!("Party type is required to create a payment entry");
            }
            if self.party.is_none() {
                bail!("Party is required to create a payment entry");
            }
            if self.account.is_none() {
                bail!("Party account is required to create a payment entry");
            }
        }

        if self.classify_as == ClassifyAs::BankEntry {
            match self.bank_entry_type {
                None | Some(BankEntryType::SingleAccount) => {
                    if self.account.is_none() {
                        bail!("Please add an account for the Bank Entry rule");
                    }
                }
                Some(BankEntryType::MultipleAccounts) => {
                    if self.accounts.is_empty() {
                        bail!("Please configure accounts for the Bank Entry rule");
                    }
                    // The last row is computed by formula downstream and
                    // must not carry amounts of its own.
                    if let Some(last) = self.accounts.last() {
                        if last.debit != 0.0 || last.credit != 0.0 {
                            bail!("The last account row must not have any debit or credit amounts set");
                        }
                    }
                }
            }
        }

        for rule in &self.description_rules {
            if rule.check == DescriptionCheck::Regex {
                Regex::new(&rule.value)
                    .with_context(|| format!("Invalid regex pattern: {}", rule.value))?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

pub struct RuleEngine {
    rules: Vec<TransactionRule>,
}

impl RuleEngine {
    /// Create a new empty rule engine
    pub fn new() -> Self {
        RuleEngine { rules: Vec::new() }
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<TransactionRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(RuleEngine::from_rules(rules))
    }

    /// Create engine from a list of rules
    pub fn from_rules(mut rules: Vec<TransactionRule>) -> Self {
        // Sort by priority (lower number evaluated first)
        rules.sort_by(|a, b| a.priority.cmp(&b.priority));
        RuleEngine { rules }
    }

    /// Add a single rule
    pub fn add_rule(&mut self, rule: TransactionRule) {
        self.rules.push(rule);
        // Re-sort by priority
        self.rules.sort_by(|a, b| a.priority.cmp(&b.priority));
    }

    /// Find the first rule matching the transaction: a linear scan in
    /// priority order, not a conflict resolver. Returns `None` when no rule
    /// matches.
    pub fn match_transaction(&self, transaction: &BankTransaction) -> Option<&TransactionRule> {
        self.rules.iter().find(|rule| rule.matches(transaction))
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_test_transaction(withdrawal: f64, deposit: f64, description: &str) -> BankTransaction {
        BankTransaction {
            name: "BT-0001".to_string(),
            bank_account: "Checking - TC".to_string(),
            company: "Test Company".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5),
            withdrawal,
            deposit,
            allocated_amount: 0.0,
            unallocated_amount: withdrawal.max(deposit),
            description: description.to_string(),
            reference_number: String::new(),
            currency: "USD".to_string(),
            transaction_type: None,
            matched_rule: None,
        }
    }

    fn create_test_rule(name: &str, priority: i32) -> TransactionRule {
        TransactionRule {
            name: name.to_string(),
            rule_name: format!("Rule {}", name),
            company: "Test Company".to_string(),
            priority,
            transaction_type: TransactionTypeFilter::Any,
            min_amount: None,
            max_amount: None,
            description_rules: vec![DescriptionRule {
                check: DescriptionCheck::Contains,
                value: "STRIPE".to_string(),
            }],
            classify_as: ClassifyAs::BankEntry,
            bank_entry_type: Some(BankEntryType::SingleAccount),
            account: Some("Fees - TC".to_string()),
            accounts: Vec::new(),
            party_type: None,
            party: None,
        }
    }

    #[test]
    fn test_description_checks() {
        let description = "STRIPE PAYOUT 123";

        let contains = DescriptionRule {
            check: DescriptionCheck::Contains,
            value: "PAYOUT".to_string(),
        };
        let starts = DescriptionRule {
            check: DescriptionCheck::StartsWith,
            value: "STRIPE".to_string(),
        };
        let ends = DescriptionRule {
            check: DescriptionCheck::EndsWith,
            value: "123".to_string(),
        };
        let pattern = DescriptionRule {
            check: DescriptionCheck::Regex,
            value: r"PAYOUT \d+".to_string(),
        };

        assert!(contains.matches(description));
        assert!(starts.matches(description));
        assert!(ends.matches(description));
        assert!(pattern.matches(description));
    }

    #[test]
    fn test_description_checks_are_case_sensitive() {
        let rule = DescriptionRule {
            check: DescriptionCheck::Contains,
            value: "stripe".to_string(),
        };
        assert!(!rule.matches("STRIPE PAYOUT"));
    }

    #[test]
    fn test_invalid_regex_never_matches() {
        let rule = DescriptionRule {
            check: DescriptionCheck::Regex,
            value: "(".to_string(),
        };
        assert!(!rule.matches("anything"));
    }

    #[test]
    fn test_transaction_type_filter() {
        let mut rule = create_test_rule("withdrawals", 1);
        rule.transaction_type = TransactionTypeFilter::Withdrawal;

        let withdrawal = create_test_transaction(50.0, 0.0, "STRIPE FEE");
        let deposit = create_test_transaction(0.0, 50.0, "STRIPE PAYOUT");

        assert!(rule.matches(&withdrawal));
        assert!(!rule.matches(&deposit));
    }

    #[test]
    fn test_amount_bounds() {
        let mut rule = create_test_rule("bounded", 1);
        rule.min_amount = Some(10.0);
        rule.max_amount = Some(100.0);

        assert!(rule.matches(&create_test_transaction(50.0, 0.0, "STRIPE")));
        assert!(!rule.matches(&create_test_transaction(5.0, 0.0, "STRIPE")));
        assert!(!rule.matches(&create_test_transaction(500.0, 0.0, "STRIPE")));
    }

    #[test]
    fn test_unset_bounds_do_not_filter() {
        let rule = create_test_rule("unbounded", 1);
        assert!(rule.matches(&create_test_transaction(0.01, 0.0, "STRIPE")));
        assert!(rule.matches(&create_test_transaction(1_000_000.0, 0.0, "STRIPE")));
    }

    #[test]
    fn test_company_must_match() {
        let rule = create_test_rule("other-company", 1);
        let mut transaction = create_test_transaction(50.0, 0.0, "STRIPE");
        transaction.company = "Another Company".to_string();

        assert!(!rule.matches(&transaction));
    }

    #[test]
    fn test_rule_without_description_rules_never_matches() {
        let mut rule = create_test_rule("empty", 1);
        rule.description_rules.clear();

        assert!(!rule.matches(&create_test_transaction(50.0, 0.0, "STRIPE")));
    }

    #[test]
    fn test_rule_priority_first_match_wins() {
        let engine = RuleEngine::from_rules(vec![
            create_test_rule("second", 2),
            create_test_rule("first", 1),
        ]);

        let transaction = create_test_transaction(50.0, 0.0, "STRIPE PAYOUT");
        let matched = engine.match_transaction(&transaction);

        assert_eq!(matched.map(|r| r.name.as_str()), Some("first"));
    }

    #[test]
    fn test_no_rule_matches() {
        let engine = RuleEngine::from_rules(vec![create_test_rule("stripe", 1)]);
        let transaction = create_test_transaction(50.0, 0.0, "AMAZON PURCHASE");

        assert!(engine.match_transaction(&transaction).is_none());
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_validate_amount_bounds() {
        let mut rule = create_test_rule("bad-bounds", 1);
        rule.min_amount = Some(100.0);
        rule.max_amount = Some(10.0);

        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_regex() {
        let mut rule = create_test_rule("bad-regex", 1);
        rule.description_rules = vec![DescriptionRule {
            check: DescriptionCheck::Regex,
            value: "[unclosed".to_string(),
        }];

        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_payment_entry_requirements() {
        let mut rule = create_test_rule("payment", 1);
        rule.classify_as = ClassifyAs::PaymentEntry;

        assert!(rule.validate().is_err());

        rule.party_type = Some("Supplier".to_string());
        rule.party = Some("ACME Corp".to_string());
        rule.account = Some("Creditors - TC".to_string());
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_multi_account_last_row() {
        let mut rule = create_test_rule("multi", 1);
        rule.bank_entry_type = Some(BankEntryType::MultipleAccounts);
        rule.accounts = vec![
            RuleAccount {
                account: "Fees - TC".to_string(),
                debit: 10.0,
                credit: 0.0,
            },
            RuleAccount {
                account: "Taxes - TC".to_string(),
                debit: 2.0,
                credit: 0.0,
            },
        ];

        // Last row carries an amount - rejected
        assert!(rule.validate().is_err());

        rule.accounts[1].debit = 0.0;
        assert!(rule.validate().is_ok());
    }
}
