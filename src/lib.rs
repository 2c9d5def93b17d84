// Bank Reconciliation Core - Library
// The computational core of the bank reconciliation feature: payment
// allocation arithmetic, voucher match scoring, transaction classification
// rules and voucher draft construction. Everything here is pure and
// synchronous; fetching, persistence and presentation live with the caller.

pub mod numbers;
pub mod allocation;
pub mod matching;
pub mod rules;
pub mod voucher;

// Re-export commonly used types
pub use numbers::{flt, flt_opt, flt_round, flt_str, round_amount, RoundingMethod};
pub use allocation::{
    AllocationEngine, Deduction, PartyType, PaymentContext, PaymentReference, PaymentType,
};
pub use matching::{
    find_mirror_transaction, score_candidate, score_candidates, BankTransaction,
    CandidateVoucher, MatchAnnotation, ReferenceMatch, TransactionDirection,
};
pub use rules::{
    BankEntryType, ClassifyAs, DescriptionCheck, DescriptionRule, RuleAccount, RuleEngine,
    TransactionRule, TransactionTypeFilter,
};
pub use voucher::{
    bank_entry_reconcile_amount, build_bank_entry, build_internal_transfer, check_number,
    ensure_reconcilable, vouchers_payload, BankEntryAccount, CompanyDefaults,
    JournalEntryDraft, JournalLine, PaymentEntryDraft, VoucherRef,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
