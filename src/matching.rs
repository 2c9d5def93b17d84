// 🔍 Match Scorer - Annotate candidate vouchers against a bank transaction
// The scorer never re-ranks: candidates arrive pre-sorted by relevance from
// the external voucher lookup, and only position 0 can ever be suggested.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// BANK TRANSACTION
// ============================================================================

/// A bank statement line, consumed read-only from the external store.
/// Exactly one of withdrawal/deposit is positive in the domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub name: String,
    pub bank_account: String,
    pub company: String,
    pub date: Option<NaiveDate>,
    pub withdrawal: f64,
    pub deposit: f64,
    pub allocated_amount: f64,
    pub unallocated_amount: f64,
    pub description: String,
    pub reference_number: String,
    pub currency: String,
    pub transaction_type: Option<String>,
    pub matched_rule: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionDirection {
    Withdrawal,
    Deposit,
}

impl BankTransaction {
    /// Direction of money movement, from whichever side is positive.
    pub fn direction(&self) -> Option<TransactionDirection> {
        if self.withdrawal > 0.0 {
            Some(TransactionDirection::Withdrawal)
        } else if self.deposit > 0.0 {
            Some(TransactionDirection::Deposit)
        } else {
            None
        }
    }

    /// The transaction amount: the withdrawal when positive, else the deposit.
    pub fn amount(&self) -> f64 {
        if self.withdrawal > 0.0 {
            self.withdrawal
        } else {
            self.deposit
        }
    }
}

// ============================================================================
// CANDIDATE VOUCHER
// ============================================================================

/// A voucher (payment entry, journal entry) returned by the external lookup
/// as a potential counterpart for a bank transaction. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateVoucher {
    pub doctype: String,
    pub name: String,

    /// Pre-sorted position from the external lookup (lower = more relevant)
    pub rank: i64,

    pub paid_amount: f64,
    pub posting_date: NaiveDate,
    pub reference_date: Option<NaiveDate>,
    pub reference_no: String,
    pub party_type: Option<String>,
    pub party: Option<String>,
    pub currency: String,
}

// ============================================================================
// MATCH ANNOTATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceMatch {
    /// Voucher reference equals the transaction's reference number or its
    /// full description
    Full,

    /// Voucher reference appears inside the reference number or description
    Partial,

    /// No overlap
    None,
}

/// Computed per candidate, ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAnnotation {
    pub amount_matches: bool,
    pub posting_date_matches: bool,
    pub reference_date_matches: bool,
    pub reference_match: ReferenceMatch,
    pub is_suggested: bool,
}

// ============================================================================
// SCORING
// ============================================================================

/// Annotate one candidate against the selected transaction.
///
/// Amount comparison is exact equality against the transaction's
/// unallocated amount - both values come from the same store, so no
/// tolerance is applied. Reference containment is case-sensitive and
/// unanchored; normalizing it would be a product decision, not a fix.
pub fn score_candidate(
    transaction: &BankTransaction,
    candidate: &CandidateVoucher,
    index: usize,
) -> MatchAnnotation {
    let amount_matches = candidate.paid_amount == transaction.unallocated_amount;

    let posting_date_matches = transaction.date == Some(candidate.posting_date);

    let reference_date_matches = match (transaction.date, candidate.reference_date) {
        (Some(date), Some(reference_date)) => date == reference_date,
        _ => false,
    };

    // An empty voucher reference matches nothing; without this guard the
    // containment test below would be trivially true for every transaction.
    let reference_no = candidate.reference_no.as_str();
    let (full, contained) = if reference_no.is_empty() {
        (false, false)
    } else {
        let full = reference_no == transaction.reference_number
            || reference_no == transaction.description;
        let contained = transaction.reference_number.contains(reference_no)
            || transaction.description.contains(reference_no);
        (full, contained)
    };

    let reference_match = if full {
        ReferenceMatch::Full
    } else if contained {
        ReferenceMatch::Partial
    } else {
        ReferenceMatch::None
    };

    // Only the top-ranked candidate can be highlighted, and only when the
    // amount matches plus at least one secondary signal (either date, or
    // the reference appearing in the transaction).
    let is_suggested = amount_matches
        && (posting_date_matches || reference_date_matches || contained)
        && index == 0;

    MatchAnnotation {
        amount_matches,
        posting_date_matches,
        reference_date_matches,
        reference_match,
        is_suggested,
    }
}

/// Annotate a full candidate list in lookup order.
pub fn score_candidates(
    transaction: &BankTransaction,
    candidates: &[CandidateVoucher],
) -> Vec<MatchAnnotation> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| score_candidate(transaction, candidate, index))
        .collect()
}

// ============================================================================
// MIRROR TRANSACTIONS
// ============================================================================

/// Find the mirror of a transaction for an internal-transfer suggestion:
/// the first transaction in another bank account of the same company with
/// the opposite direction, the same amount and the same date.
pub fn find_mirror_transaction<'a>(
    transaction: &BankTransaction,
    candidates: &'a [BankTransaction],
) -> Option<&'a BankTransaction> {
    let direction = transaction.direction()?;
    let date = transaction.date?;
    let amount = transaction.amount();

    candidates.iter().find(|other| {
        other.name != transaction.name
            && other.company == transaction.company
            && other.bank_account != transaction.bank_account
            && other.date == Some(date)
            && match direction {
                TransactionDirection::Withdrawal => other.deposit == amount,
                TransactionDirection::Deposit => other.withdrawal == amount,
            }
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn create_test_transaction() -> BankTransaction {
        BankTransaction {
            name: "BT-0001".to_string(),
            bank_account: "Checking - TC".to_string(),
            company: "Test Company".to_string(),
            date: Some(date("2024-01-05")),
            withdrawal: 0.0,
            deposit: 100.0,
            allocated_amount: 0.0,
            unallocated_amount: 100.0,
            description: "Payment received INV-1".to_string(),
            reference_number: "INV-1".to_string(),
            currency: "USD".to_string(),
            transaction_type: None,
            matched_rule: None,
        }
    }

    fn create_test_voucher(paid_amount: f64, reference_no: &str) -> CandidateVoucher {
        CandidateVoucher {
            doctype: "Payment Entry".to_string(),
            name: "PE-0001".to_string(),
            rank: 1,
            paid_amount,
            posting_date: date("2024-01-05"),
            reference_date: None,
            reference_no: reference_no.to_string(),
            party_type: Some("Customer".to_string()),
            party: Some("Test Party".to_string()),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_full_match_is_suggested() {
        let transaction = create_test_transaction();
        let voucher = create_test_voucher(100.0, "INV-1");

        let annotation = score_candidate(&transaction, &voucher, 0);

        assert!(annotation.amount_matches);
        assert!(annotation.posting_date_matches);
        assert_eq!(annotation.reference_match, ReferenceMatch::Full);
        assert!(annotation.is_suggested);
    }

    #[test]
    fn test_partial_reference_wrong_amount_not_suggested() {
        let transaction = create_test_transaction();
        let voucher = create_test_voucher(50.0, "INV");

        let annotation = score_candidate(&transaction, &voucher, 0);

        assert!(!annotation.amount_matches);
        assert_eq!(annotation.reference_match, ReferenceMatch::Partial);
        // The amount gate fails regardless of reference/date signals.
        assert!(!annotation.is_suggested);
    }

    #[test]
    fn test_only_index_zero_can_be_suggested() {
        let transaction = create_test_transaction();
        let voucher = create_test_voucher(100.0, "INV-1");

        assert!(score_candidate(&transaction, &voucher, 0).is_suggested);
        assert!(!score_candidate(&transaction, &voucher, 1).is_suggested);
        assert!(!score_candidate(&transaction, &voucher, 7).is_suggested);
    }

    #[test]
    fn test_scoring_is_deterministic_under_swaps() {
        let transaction = create_test_transaction();
        let a = create_test_voucher(100.0, "INV-1");
        let b = create_test_voucher(100.0, "INV-1");

        let forward = score_candidates(&transaction, &[a.clone(), b.clone()]);
        let swapped = score_candidates(&transaction, &[b, a]);

        // Swapping non-zero-index candidates never promotes one: suggestion
        // is a property of position 0 only.
        assert!(forward[0].is_suggested && !forward[1].is_suggested);
        assert!(swapped[0].is_suggested && !swapped[1].is_suggested);
    }

    #[test]
    fn test_reference_date_match() {
        let transaction = create_test_transaction();
        let mut voucher = create_test_voucher(100.0, "");
        voucher.posting_date = date("2024-01-02");
        voucher.reference_date = Some(date("2024-01-05"));

        let annotation = score_candidate(&transaction, &voucher, 0);

        assert!(!annotation.posting_date_matches);
        assert!(annotation.reference_date_matches);
        assert!(annotation.is_suggested);
    }

    #[test]
    fn test_reference_match_is_case_sensitive() {
        let transaction = create_test_transaction();
        let voucher = create_test_voucher(100.0, "inv-1");

        let annotation = score_candidate(&transaction, &voucher, 0);

        assert_eq!(annotation.reference_match, ReferenceMatch::None);
    }

    #[test]
    fn test_empty_counterpart_fields_yield_all_false() {
        let mut transaction = create_test_transaction();
        transaction.date = None;
        transaction.reference_number = String::new();
        transaction.description = String::new();
        let mut voucher = create_test_voucher(50.0, "");
        voucher.reference_date = None;

        let annotation = score_candidate(&transaction, &voucher, 0);

        assert!(!annotation.amount_matches);
        assert!(!annotation.posting_date_matches);
        assert!(!annotation.reference_date_matches);
        assert_eq!(annotation.reference_match, ReferenceMatch::None);
        assert!(!annotation.is_suggested);
    }

    #[test]
    fn test_description_equality_is_full_match() {
        let transaction = create_test_transaction();
        let voucher = create_test_voucher(100.0, "Payment received INV-1");

        let annotation = score_candidate(&transaction, &voucher, 0);

        assert_eq!(annotation.reference_match, ReferenceMatch::Full);
        assert!(annotation.is_suggested);
    }

    #[test]
    fn test_find_mirror_transaction() {
        let transaction = create_test_transaction();

        let mut mirror = create_test_transaction();
        mirror.name = "BT-0002".to_string();
        mirror.bank_account = "Savings - TC".to_string();
        mirror.deposit = 0.0;
        mirror.withdrawal = 100.0;

        let mut same_account = create_test_transaction();
        same_account.name = "BT-0003".to_string();
        same_account.deposit = 0.0;
        same_account.withdrawal = 100.0;

        let mut wrong_amount = mirror.clone();
        wrong_amount.name = "BT-0004".to_string();
        wrong_amount.withdrawal = 99.0;

        let candidates = vec![same_account, wrong_amount, mirror.clone()];
        let found = find_mirror_transaction(&transaction, &candidates);

        assert_eq!(found.map(|t| t.name.as_str()), Some("BT-0002"));
    }

    #[test]
    fn test_mirror_requires_date_and_direction() {
        let mut transaction = create_test_transaction();
        transaction.date = None;

        let mirror = create_test_transaction();
        assert!(find_mirror_transaction(&transaction, &[mirror]).is_none());
    }
}
