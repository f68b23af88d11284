//! MarketPay Store - Settlement datastore
//!
//! An explicitly constructed, injected datastore handle. There is no global
//! or lazily-created connection: components receive a [`Datastore`] clone at
//! startup.
//!
//! Two rules hold for every mutation:
//!
//! 1. It runs inside [`Datastore::write`], the single atomic write unit.
//!    The closure receives a [`WriteTxn`]; if it returns an error, none of
//!    its staged changes are applied.
//! 2. Escrow status only changes through [`WriteTxn::escrow_transition`],
//!    a conditional update that compares the current status against the
//!    expected prior states and reports a pre-emption as a no-op instead of
//!    writing. This is the sole mutual-exclusion mechanism between the
//!    reconciler, the dispute controller, buyer actions and the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use marketpay_types::{
    Dispute, DisputeId, Escrow, EscrowId, EscrowStatus, Order, OrderId, Result, SettleError,
    Transition,
};

/// In-memory settlement state with uniqueness indexes
#[derive(Debug, Clone, Default)]
struct StoreInner {
    orders: HashMap<OrderId, Order>,
    escrows: HashMap<EscrowId, Escrow>,
    disputes: HashMap<DisputeId, Dispute>,
    /// Payment reference -> order (the idempotency correlation index)
    reference_index: HashMap<String, OrderId>,
    /// Order -> escrow (1:1, enforced on insert)
    escrow_index: HashMap<OrderId, EscrowId>,
}

/// Handle to the settlement datastore
#[derive(Debug, Clone, Default)]
pub struct Datastore {
    inner: Arc<RwLock<StoreInner>>,
}

impl Datastore {
    /// Create an empty datastore
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a closure inside a single atomic write unit.
    ///
    /// The closure mutates a staged copy of the state; the copy replaces
    /// the live state only if the closure succeeds. A partial failure (for
    /// example escrow updated but order not) therefore cannot be observed.
    pub async fn write<T>(&self, f: impl FnOnce(&mut WriteTxn) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().await;
        let mut txn = WriteTxn {
            state: guard.clone(),
        };
        let out = f(&mut txn)?;
        *guard = txn.state;
        Ok(out)
    }

    /// Fetch an order by id
    pub async fn order(&self, id: OrderId) -> Result<Order> {
        self.inner
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| SettleError::OrderNotFound {
                reference: id.to_string(),
            })
    }

    /// Fetch an order by its payment reference
    pub async fn order_by_reference(&self, reference: &str) -> Result<Order> {
        let inner = self.inner.read().await;
        inner
            .reference_index
            .get(reference)
            .and_then(|id| inner.orders.get(id))
            .cloned()
            .ok_or_else(|| SettleError::OrderNotFound {
                reference: reference.to_string(),
            })
    }

    /// Fetch an escrow by id
    pub async fn escrow(&self, id: EscrowId) -> Result<Escrow> {
        self.inner
            .read()
            .await
            .escrows
            .get(&id)
            .cloned()
            .ok_or_else(|| SettleError::EscrowNotFound {
                escrow_id: id.to_string(),
            })
    }

    /// Fetch the escrow backing an order
    pub async fn escrow_by_order(&self, order_id: OrderId) -> Result<Escrow> {
        let inner = self.inner.read().await;
        inner
            .escrow_index
            .get(&order_id)
            .and_then(|id| inner.escrows.get(id))
            .cloned()
            .ok_or_else(|| SettleError::EscrowNotFound {
                escrow_id: order_id.to_string(),
            })
    }

    /// Fetch a dispute by id
    pub async fn dispute(&self, id: DisputeId) -> Result<Dispute> {
        self.inner
            .read()
            .await
            .disputes
            .get(&id)
            .cloned()
            .ok_or_else(|| SettleError::DisputeNotFound {
                dispute_id: id.to_string(),
            })
    }

    /// Escrows whose buyer-confirmation window has lapsed
    pub async fn due_for_auto_release(&self, now: DateTime<Utc>) -> Vec<Escrow> {
        self.inner
            .read()
            .await
            .escrows
            .values()
            .filter(|e| {
                e.status == EscrowStatus::PendingConfirmation
                    && e.confirmation_deadline.is_some_and(|d| d <= now)
            })
            .cloned()
            .collect()
    }
}

/// The explicit transaction context for multi-record mutations.
///
/// Every function that mutates escrow, order and dispute records together
/// takes `&mut WriteTxn`; there is no mutation path outside one.
pub struct WriteTxn {
    state: StoreInner,
}

impl WriteTxn {
    /// Insert a new order, enforcing payment-reference uniqueness
    pub fn insert_order(&mut self, order: Order) -> Result<()> {
        let reference = order.payment.reference.clone();
        if self.state.reference_index.contains_key(&reference) {
            return Err(SettleError::conflict(format!(
                "payment reference {reference} is already in use"
            )));
        }
        self.state.reference_index.insert(reference, order.id);
        self.state.orders.insert(order.id, order);
        Ok(())
    }

    /// Insert a new escrow, enforcing the 1:1 order pairing
    pub fn insert_escrow(&mut self, escrow: Escrow) -> Result<()> {
        if self.state.escrow_index.contains_key(&escrow.order_id) {
            return Err(SettleError::conflict(format!(
                "order {} already has an escrow",
                escrow.order_id
            )));
        }
        self.state.escrow_index.insert(escrow.order_id, escrow.id);
        self.state.escrows.insert(escrow.id, escrow);
        Ok(())
    }

    /// Insert a new dispute, enforcing one active dispute per order
    pub fn insert_dispute(&mut self, dispute: Dispute) -> Result<()> {
        if self.active_dispute_for_order(dispute.order_id).is_some() {
            return Err(SettleError::DisputeAlreadyOpen {
                order_id: dispute.order_id.to_string(),
            });
        }
        self.state.disputes.insert(dispute.id, dispute);
        Ok(())
    }

    pub fn order(&self, id: OrderId) -> Result<Order> {
        self.state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| SettleError::OrderNotFound {
                reference: id.to_string(),
            })
    }

    pub fn order_by_reference(&self, reference: &str) -> Result<Order> {
        self.state
            .reference_index
            .get(reference)
            .and_then(|id| self.state.orders.get(id))
            .cloned()
            .ok_or_else(|| SettleError::OrderNotFound {
                reference: reference.to_string(),
            })
    }

    pub fn escrow(&self, id: EscrowId) -> Result<Escrow> {
        self.state
            .escrows
            .get(&id)
            .cloned()
            .ok_or_else(|| SettleError::EscrowNotFound {
                escrow_id: id.to_string(),
            })
    }

    pub fn escrow_by_order(&self, order_id: OrderId) -> Result<Escrow> {
        self.state
            .escrow_index
            .get(&order_id)
            .and_then(|id| self.state.escrows.get(id))
            .cloned()
            .ok_or_else(|| SettleError::EscrowNotFound {
                escrow_id: order_id.to_string(),
            })
    }

    pub fn dispute(&self, id: DisputeId) -> Result<Dispute> {
        self.state
            .disputes
            .get(&id)
            .cloned()
            .ok_or_else(|| SettleError::DisputeNotFound {
                dispute_id: id.to_string(),
            })
    }

    /// The open or under-review dispute for an order, if any
    pub fn active_dispute_for_order(&self, order_id: OrderId) -> Option<Dispute> {
        self.state
            .disputes
            .values()
            .find(|d| d.order_id == order_id && d.status.is_active())
            .cloned()
    }

    /// Replace an existing order record; the payment reference is immutable
    pub fn update_order(&mut self, order: Order) -> Result<()> {
        let existing = self.order(order.id)?;
        if existing.payment.reference != order.payment.reference {
            return Err(SettleError::validation(
                "payment.reference",
                "payment reference cannot change after initiation",
            ));
        }
        self.state.orders.insert(order.id, order);
        Ok(())
    }

    /// Replace an existing dispute record
    pub fn update_dispute(&mut self, dispute: Dispute) -> Result<()> {
        if !self.state.disputes.contains_key(&dispute.id) {
            return Err(SettleError::DisputeNotFound {
                dispute_id: dispute.id.to_string(),
            });
        }
        self.state.disputes.insert(dispute.id, dispute);
        Ok(())
    }

    /// Conditionally advance an escrow: apply `mutate` only if the current
    /// status is one of `expected`. A mismatch writes nothing and reports
    /// the actual status; it is the caller's signal that the transition
    /// already happened or was pre-empted.
    pub fn escrow_transition(
        &mut self,
        id: EscrowId,
        expected: &[EscrowStatus],
        mutate: impl FnOnce(&mut Escrow),
    ) -> Result<Transition> {
        let escrow = self
            .state
            .escrows
            .get_mut(&id)
            .ok_or_else(|| SettleError::EscrowNotFound {
                escrow_id: id.to_string(),
            })?;

        if !expected.contains(&escrow.status) {
            return Ok(Transition::NoOp {
                actual: escrow.status,
            });
        }

        mutate(escrow);
        escrow.updated_at = Utc::now();

        // Settlement timestamps are mutually exclusive; a breach here means
        // a transition function is wrong, not a caller.
        if escrow.released_at.is_some() && escrow.refunded_at.is_some() {
            return Err(SettleError::internal(format!(
                "escrow {id} has both released_at and refunded_at set"
            )));
        }

        Ok(Transition::Applied(escrow.clone()))
    }
}
