// 📄 Voucher Drafts - Payloads for the external reconciliation command
// Pure construction only: the functions here compute the exact field values
// the external store expects for bank entries, internal transfers and
// reconcile calls. Inserting, submitting and clearing documents stays with
// the caller, which must also keep at most one reconcile request in flight
// per bank transaction.

use crate::allocation::PaymentType;
use crate::matching::{BankTransaction, CandidateVoucher};
use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Check numbers are capped by the external store
const CHECK_NUMBER_MAX_LEN: usize = 140;

// ============================================================================
// COMPANY DEFAULTS
// ============================================================================

/// Ambient company state made explicit: callers thread these into every
/// build instead of the core reading global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDefaults {
    pub company: String,
    pub default_currency: String,
    pub default_cost_center: Option<String>,
}

// ============================================================================
// RECONCILE PAYLOAD
// ============================================================================

/// One row of a reconcile payload: which voucher satisfies the transaction
/// and for how much.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherRef {
    pub payment_doctype: String,
    pub payment_name: String,
    pub amount: f64,
}

impl VoucherRef {
    pub fn new(payment_doctype: &str, payment_name: &str, amount: f64) -> Self {
        VoucherRef {
            payment_doctype: payment_doctype.to_string(),
            payment_name: payment_name.to_string(),
            amount,
        }
    }
}

/// Guard before any reconcile call is issued.
pub fn ensure_reconcilable(transaction: &BankTransaction) -> Result<()> {
    if transaction.unallocated_amount <= 0.0 {
        bail!(
            "Bank Transaction {} is already fully reconciled",
            transaction.name
        );
    }
    Ok(())
}

/// Map matched candidate vouchers to the reconcile payload rows, each for
/// its full paid amount.
pub fn vouchers_payload(vouchers: &[CandidateVoucher]) -> Vec<VoucherRef> {
    vouchers
        .iter()
        .map(|voucher| VoucherRef::new(&voucher.doctype, &voucher.name, voucher.paid_amount))
        .collect()
}

/// Check number for a created entry: the reference number when present,
/// otherwise the description, truncated to the store's limit.
pub fn check_number(transaction: &BankTransaction) -> String {
    let source = if !transaction.reference_number.is_empty() {
        &transaction.reference_number
    } else {
        &transaction.description
    };
    source.chars().take(CHECK_NUMBER_MAX_LEN).collect()
}

// ============================================================================
// BANK ENTRY DRAFTS
// ============================================================================

/// One counter-account split the user configured for a bank entry.
/// `is_profit_and_loss` carries the account's report type so cost-center
/// defaulting needs no storage lookup here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankEntryAccount {
    pub account: String,
    pub amount: f64,
    pub cost_center: Option<String>,
    pub party_type: Option<String>,
    pub party: Option<String>,
    pub user_remark: Option<String>,
    pub is_profit_and_loss: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLine {
    pub account: String,
    pub bank_account: Option<String>,
    pub debit: f64,
    pub credit: f64,
    pub cost_center: Option<String>,
    pub party_type: Option<String>,
    pub party: Option<String>,
    pub user_remark: Option<String>,
}

/// A journal entry ready to hand to the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntryDraft {
    pub voucher_type: String,
    pub company: String,
    pub posting_date: NaiveDate,
    pub cheque_date: NaiveDate,
    pub cheque_no: String,
    pub user_remark: String,
    pub accounts: Vec<JournalLine>,
}

/// Build the journal entry that books a bank transaction against the given
/// counter accounts.
///
/// The bank ledger line takes the unallocated amount on the credit side for
/// withdrawals and the debit side for deposits; each counter line takes the
/// opposite side. Profit-and-loss lines without a cost center fall back to
/// the company default.
pub fn build_bank_entry(
    transaction: &BankTransaction,
    bank_ledger_account: &str,
    entries: &[BankEntryAccount],
    defaults: &CompanyDefaults,
    posting_date: NaiveDate,
    cheque_date: NaiveDate,
    is_credit_card: bool,
) -> Result<JournalEntryDraft> {
    ensure_reconcilable(transaction)?;

    let is_withdrawal = transaction.withdrawal > 0.0;

    let voucher_type = if is_credit_card {
        "Credit Card Entry"
    } else {
        "Bank Entry"
    };

    let mut accounts = Vec::with_capacity(entries.len() + 1);

    if is_withdrawal {
        accounts.push(JournalLine {
            account: bank_ledger_account.to_string(),
            bank_account: Some(transaction.bank_account.clone()),
            debit: 0.0,
            credit: transaction.unallocated_amount,
            cost_center: None,
            party_type: None,
            party: None,
            user_remark: None,
        });
    } else {
        accounts.push(JournalLine {
            account: bank_ledger_account.to_string(),
            bank_account: Some(transaction.bank_account.clone()),
            debit: transaction.unallocated_amount,
            credit: 0.0,
            cost_center: None,
            party_type: None,
            party: None,
            user_remark: None,
        });
    }

    for entry in entries {
        let cost_center = match &entry.cost_center {
            Some(cost_center) => Some(cost_center.clone()),
            // Profit-and-loss lines require a cost center
            None if entry.is_profit_and_loss => defaults.default_cost_center.clone(),
            None => None,
        };

        let credit = if is_withdrawal { 0.0 } else { entry.amount };
        let debit = if is_withdrawal { entry.amount } else { 0.0 };

        accounts.push(JournalLine {
            account: entry.account.clone(),
            bank_account: None,
            debit,
            credit,
            cost_center,
            party_type: entry.party.as_ref().and(entry.party_type.clone()),
            party: entry.party.clone(),
            user_remark: entry.user_remark.clone(),
        });
    }

    Ok(JournalEntryDraft {
        voucher_type: voucher_type.to_string(),
        company: defaults.company.clone(),
        posting_date,
        cheque_date,
        cheque_no: check_number(transaction),
        user_remark: transaction.description.clone(),
        accounts,
    })
}

/// Reconcile amount for a freshly created bank entry: the gross side of the
/// transaction, not the unallocated remainder.
pub fn bank_entry_reconcile_amount(transaction: &BankTransaction) -> f64 {
    if transaction.deposit > 0.0 {
        transaction.deposit
    } else {
        transaction.withdrawal
    }
}

// ============================================================================
// INTERNAL TRANSFER DRAFTS
// ============================================================================

/// A payment entry ready to hand to the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEntryDraft {
    pub company: String,
    pub payment_type: PaymentType,
    pub posting_date: NaiveDate,
    pub reference_date: NaiveDate,
    pub reference_no: String,
    pub paid_from: String,
    pub paid_to: String,
    pub paid_amount: f64,
    pub received_amount: f64,
    pub target_exchange_rate: f64,
    pub remarks: Option<String>,
}

/// Build the internal-transfer payment entry for a bank transaction.
///
/// Paid and received amounts both equal the unallocated amount. For a
/// withdrawal the bank ledger account is the paid-from side and `paid_to`
/// is honored; for a deposit it is the paid-to side and `paid_from` is
/// honored.
#[allow(clippy::too_many_arguments)]
pub fn build_internal_transfer(
    transaction: &BankTransaction,
    bank_ledger_account: &str,
    paid_from: &str,
    paid_to: &str,
    defaults: &CompanyDefaults,
    posting_date: NaiveDate,
    reference_date: NaiveDate,
    reference_no: &str,
    remarks: Option<String>,
) -> Result<PaymentEntryDraft> {
    ensure_reconcilable(transaction)?;

    let is_withdrawal = transaction.withdrawal > 0.0;

    let (paid_from, paid_to) = if is_withdrawal {
        (bank_ledger_account, paid_to)
    } else {
        (paid_from, bank_ledger_account)
    };

    Ok(PaymentEntryDraft {
        company: defaults.company.clone(),
        payment_type: PaymentType::InternalTransfer,
        posting_date,
        reference_date,
        reference_no: reference_no.to_string(),
        paid_from: paid_from.to_string(),
        paid_to: paid_to.to_string(),
        paid_amount: transaction.unallocated_amount,
        received_amount: transaction.unallocated_amount,
        // Single working currency per operation
        target_exchange_rate: 1.0,
        remarks,
    })
}

// ============================================================================
// TESTS
// ============================================================================
