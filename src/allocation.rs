// 💰 Allocation Engine - Distribute a payment across outstanding references
// Computes per-reference allocations plus the total allocated, unallocated
// and difference amounts for a payment form, using double-entry payment
// allocation semantics. Pure in-memory arithmetic: the engine performs no
// I/O and every pass fully recomputes its outputs from the context.

use crate::numbers::{flt, flt_round, RoundingMethod};
use serde::{Deserialize, Serialize};

// ============================================================================
// PAYMENT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentType {
    Receive,
    Pay,
    #[serde(rename = "Internal Transfer")]
    InternalTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyType {
    Customer,
    Supplier,
    Employee,
    Shareholder,
}

// ============================================================================
// REFERENCES & DEDUCTIONS
// ============================================================================

/// One outstanding obligation (invoice, order) eligible for allocation.
/// The outstanding amount is signed: positive is owed to the counterparty,
/// negative is a credit/advance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReference {
    pub reference_doctype: String,

    /// Opaque identifier supplied by the external document store
    pub reference_name: String,

    pub outstanding_amount: f64,

    /// Output field; overwritten on every full allocation pass. `None`
    /// means no allocation has been made for this row yet.
    pub allocated_amount: Option<f64>,
}

impl PaymentReference {
    pub fn new(doctype: &str, name: &str, outstanding_amount: f64) -> Self {
        PaymentReference {
            reference_doctype: doctype.to_string(),
            reference_name: name.to_string(),
            outstanding_amount,
            allocated_amount: None,
        }
    }
}

/// A charge (bank fee, rounding write-off) subtracted from the payment
/// amount before allocation. Account fields are opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deduction {
    pub account: String,
    pub cost_center: Option<String>,
    pub amount: f64,
    pub description: Option<String>,
}

impl Deduction {
    pub fn new(account: &str, amount: f64) -> Self {
        Deduction {
            account: account.to_string(),
            cost_center: None,
            amount,
            description: None,
        }
    }
}

// ============================================================================
// PAYMENT CONTEXT
// ============================================================================

/// Aggregate input/output state for one allocation pass.
///
/// The company is an explicit field rather than ambient state, so every
/// invocation carries its own scope. The source system keeps parallel
/// `base_*` (company currency) and plain (presentation currency) fields for
/// each amount; this single-currency model collapses each pair into one
/// field, while the guard structure that consulted both halves is kept
/// intact in the engine so a multi-currency split can be reintroduced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentContext {
    pub company: String,
    pub payment_type: PaymentType,
    pub party_type: Option<PartyType>,
    pub party: Option<String>,

    /// Gross amount leaving the payer
    pub paid_amount: f64,

    /// Gross amount arriving at the payee
    pub received_amount: f64,

    pub total_taxes_and_charges: f64,

    pub references: Vec<PaymentReference>,
    pub deductions: Vec<Deduction>,

    // Derived outputs - always recomputed, never cached incrementally
    pub total_allocated_amount: f64,
    pub unallocated_amount: f64,
    pub difference_amount: f64,
}

impl PaymentContext {
    pub fn new(company: &str, payment_type: PaymentType) -> Self {
        PaymentContext {
            company: company.to_string(),
            payment_type,
            party_type: None,
            party: None,
            paid_amount: 0.0,
            received_amount: 0.0,
            total_taxes_and_charges: 0.0,
            references: Vec::new(),
            deductions: Vec::new(),
            total_allocated_amount: 0.0,
            unallocated_amount: 0.0,
            difference_amount: 0.0,
        }
    }

    pub fn total_deductions(&self) -> f64 {
        self.deductions.iter().map(|row| flt(row.amount)).sum()
    }
}

// ============================================================================
// ALLOCATION ENGINE
// ============================================================================

pub struct AllocationEngine {
    /// Monetary precision in decimal places (default: 2)
    pub precision: i32,

    /// Rounding policy applied at input points (default: banker's rounding)
    pub rounding_method: RoundingMethod,
}

impl AllocationEngine {
    pub fn new() -> Self {
        AllocationEngine {
            precision: 2,
            rounding_method: RoundingMethod::default(),
        }
    }

    pub fn with_rounding(precision: i32, rounding_method: RoundingMethod) -> Self {
        AllocationEngine {
            precision,
            rounding_method,
        }
    }

    /// Full recomputation entry point. Callers invoke this after every form
    /// edit (amount, reference or deduction change); there is no observer
    /// machinery inside the engine.
    pub fn recompute(&self, context: &mut PaymentContext) {
        self.set_total_allocated_amount(context);
    }

    /// Sum the allocated amounts over all references where one is set.
    /// Rounding is applied to each row at the point of input; the running
    /// sum itself is not re-rounded. Cascades into the unallocated amount.
    pub fn set_total_allocated_amount(&self, context: &mut PaymentContext) {
        let mut total_allocated_amount = 0.0;

        for reference in &context.references {
            if let Some(allocated) = reference.allocated_amount {
                total_allocated_amount +=
                    flt_round(allocated, self.precision, self.rounding_method);
            }
        }

        context.total_allocated_amount = total_allocated_amount;
        self.set_unallocated_amount(context);
    }

    /// Recompute the unallocated amount from the totals currently on the
    /// context. Cascades into the difference amount.
    pub fn set_unallocated_amount(&self, context: &mut PaymentContext) {
        let total_deductions = context.total_deductions();
        let mut unallocated_amount = 0.0;

        if context.party.is_some() {
            match context.payment_type {
                // Both guards below compared a base-currency total against a
                // presentation-currency total in the source system; with the
                // single-currency collapse they read the same fields but are
                // kept as two comparisons on purpose.
                PaymentType::Receive => {
                    if context.total_allocated_amount
                        < context.received_amount + total_deductions
                        && context.total_allocated_amount
                            < context.paid_amount + total_deductions
                    {
                        unallocated_amount = context.received_amount + total_deductions
                            + context.total_taxes_and_charges
                            - context.total_allocated_amount;
                    }
                }
                PaymentType::Pay => {
                    if context.total_allocated_amount
                        < context.paid_amount - total_deductions
                        && context.total_allocated_amount
                            < context.received_amount + total_deductions
                    {
                        unallocated_amount = context.paid_amount
                            + context.total_taxes_and_charges
                            - (total_deductions + context.total_allocated_amount);
                    }
                }
                PaymentType::InternalTransfer => {}
            }
        }

        context.unallocated_amount = unallocated_amount;
        self.set_difference_amount(context, unallocated_amount);
    }

    /// Difference between the declared payment amount and the party amount
    /// (allocated + unallocated), net of deductions and taxes. A non-zero
    /// difference is expected steady-state output for the user to resolve,
    /// not an error.
    pub fn set_difference_amount(
        &self,
        context: &mut PaymentContext,
        candidate_unallocated: f64,
    ) {
        let party_amount = context.total_allocated_amount + flt(candidate_unallocated);

        let difference_amount = match context.payment_type {
            PaymentType::Receive => party_amount - context.received_amount,
            PaymentType::Pay => context.paid_amount - party_amount,
            PaymentType::InternalTransfer => {
                context.paid_amount - context.received_amount
            }
        };

        context.difference_amount =
            difference_amount - context.total_deductions() + context.total_taxes_and_charges;
    }

    /// "Allocate Party Amount": distribute a gross amount across references
    /// with mixed-sign outstanding balances, used when the user has not
    /// allocated each row by hand. Deductions are consumed off the top.
    ///
    /// Receive-from-Customer and Pay-to-Supplier are the normal direction;
    /// everything else (refunding a customer, collecting from a supplier)
    /// takes the reverse branch.
    pub fn allocate_party_amount(&self, context: &mut PaymentContext, paid_amount: f64) {
        let total_deductions = context.total_deductions();
        let paid_amount = flt(paid_amount) - total_deductions;

        let mut total_positive_outstanding = 0.0;
        let mut total_negative_outstanding = 0.0;

        for reference in &context.references {
            let outstanding = flt(reference.outstanding_amount);
            if outstanding > 0.0 {
                total_positive_outstanding += outstanding;
            } else {
                total_negative_outstanding += outstanding.abs();
            }
        }

        let mut allocated_positive_outstanding = 0.0;
        let mut allocated_negative_outstanding = 0.0;

        let normal_direction = matches!(
            (context.payment_type, context.party_type),
            (PaymentType::Receive, Some(PartyType::Customer))
                | (PaymentType::Pay, Some(PartyType::Supplier))
        );

        if normal_direction {
            if total_positive_outstanding > paid_amount {
                let remaining_outstanding = total_positive_outstanding - paid_amount;
                allocated_negative_outstanding =
                    if total_negative_outstanding < remaining_outstanding {
                        total_negative_outstanding
                    } else {
                        remaining_outstanding
                    };
            }

            allocated_positive_outstanding = paid_amount + allocated_negative_outstanding;
        } else if paid_amount > total_negative_outstanding {
            // allocated_positive_outstanding is negative in this branch, and
            // the comparison against total_positive_outstanding below can
            // therefore never select the total. Observed behavior in the
            // production system, reproduced as-is and pinned by test;
            // flagged for product-owner review rather than fixed here.
            allocated_positive_outstanding = total_negative_outstanding - paid_amount;
            allocated_negative_outstanding = paid_amount
                + if total_positive_outstanding < allocated_positive_outstanding {
                    total_positive_outstanding
                } else {
                    allocated_positive_outstanding
                };
        }

        // Walk references in their original order, consuming each pool. A
        // positive row takes the remaining positive pool clamped to its own
        // outstanding; negative rows mirror this with the sign flipped.
        for reference in &mut context.references {
            let outstanding = flt(reference.outstanding_amount);

            if outstanding > 0.0 && allocated_positive_outstanding >= 0.0 {
                let allocated = if outstanding >= allocated_positive_outstanding {
                    allocated_positive_outstanding
                } else {
                    outstanding
                };
                reference.allocated_amount = Some(allocated);
                allocated_positive_outstanding -= allocated;
            } else if outstanding < 0.0 && allocated_negative_outstanding != 0.0 {
                let allocated = if outstanding >= allocated_negative_outstanding {
                    -allocated_negative_outstanding
                } else {
                    outstanding
                };
                reference.allocated_amount = Some(allocated);
                allocated_negative_outstanding -= allocated;
            }
        }

        self.set_total_allocated_amount(context);
    }
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
