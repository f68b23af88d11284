//! MarketPay Orders - ledger-to-order propagation
//!
//! Pure read-after-write mirroring: whenever the escrow ledger completes a
//! transition, the order's visible status is updated to the corresponding
//! value inside the same write unit. This crate has no decision authority
//! over fund status; it only reflects ledger outcomes and hands
//! user-facing messages to the notification seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use marketpay_store::WriteTxn;
use marketpay_types::{Escrow, EscrowStatus, OrderStatus, Result, UserId};

/// Order status corresponding to an escrow status, if the order should move
pub fn order_status_for(status: EscrowStatus) -> Option<OrderStatus> {
    match status {
        EscrowStatus::Pending => None,
        EscrowStatus::Funded => Some(OrderStatus::Confirmed),
        EscrowStatus::PendingConfirmation => Some(OrderStatus::Delivered),
        EscrowStatus::ReleasedToVendor => Some(OrderStatus::Completed),
        EscrowStatus::RefundedToBuyer => Some(OrderStatus::Refunded),
        EscrowStatus::Disputed => Some(OrderStatus::Disputed),
        EscrowStatus::Cancelled => Some(OrderStatus::Cancelled),
    }
}

/// Mirror a just-applied escrow transition onto its order.
///
/// Must be called within the same write unit as the ledger transition so
/// the order and escrow never disagree.
pub fn mirror_escrow(txn: &mut WriteTxn, escrow: &Escrow) -> Result<()> {
    let Some(status) = order_status_for(escrow.status) else {
        return Ok(());
    };
    let mut order = txn.order(escrow.order_id)?;
    if order.status != status {
        order.status = status;
        order.updated_at = escrow.updated_at;
        txn.update_order(order)?;
    }
    Ok(())
}

/// Category for routing a notification to the right channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Payment,
    Order,
    Dispute,
}

/// A user-facing notification handed to the external delivery system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        category: NotificationCategory,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            category,
        }
    }
}

/// Fire-and-forget notification delivery seam.
///
/// Delivery is external to the settlement core; implementations may talk to
/// push/email infrastructure. Failures are logged by [`dispatch`], never
/// propagated into settlement outcomes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Send a batch of notifications, logging failures instead of returning them
pub async fn dispatch(notifier: &Arc<dyn Notifier>, notifications: Vec<Notification>) {
    for notification in notifications {
        let user = notification.user_id;
        if let Err(err) = notifier.notify(notification).await {
            warn!(user_id = %user, error = %err, "notification delivery failed");
        }
    }
}

/// Default notifier that logs deliveries via tracing
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(
            user_id = %notification.user_id,
            category = ?notification.category,
            title = %notification.title,
            "notification dispatched"
        );
        Ok(())
    }
}

/// Notifications owed to the parties after an escrow outcome
pub fn settlement_notices(escrow: &Escrow) -> Vec<Notification> {
    match escrow.status {
        EscrowStatus::Funded => vec![
            Notification::new(
                escrow.buyer_id,
                "Payment received",
                format!("Your payment of {} is held in escrow.", escrow.amount),
                NotificationCategory::Payment,
            ),
            Notification::new(
                escrow.vendor_id,
                "Order paid",
                "The buyer's payment is confirmed. Prepare the order for delivery.",
                NotificationCategory::Order,
            ),
        ],
        EscrowStatus::PendingConfirmation => vec![Notification::new(
            escrow.buyer_id,
            "Order delivered",
            format!(
                "Confirm receipt within {} days or funds release automatically.",
                escrow.auto_release_after_days
            ),
            NotificationCategory::Order,
        )],
        EscrowStatus::ReleasedToVendor => vec![
            Notification::new(
                escrow.vendor_id,
                "Funds released",
                format!("{} has been released to you.", escrow.vendor_payout()),
                NotificationCategory::Payment,
            ),
            Notification::new(
                escrow.buyer_id,
                "Order completed",
                "Your order is complete.",
                NotificationCategory::Order,
            ),
        ],
        EscrowStatus::RefundedToBuyer => vec![
            Notification::new(
                escrow.buyer_id,
                "Refund issued",
                format!(
                    "{} has been refunded to you.",
                    escrow.refunded_amount.unwrap_or(escrow.amount)
                ),
                NotificationCategory::Payment,
            ),
            Notification::new(
                escrow.vendor_id,
                "Order refunded",
                "The escrowed funds were returned to the buyer.",
                NotificationCategory::Order,
            ),
        ],
        EscrowStatus::Disputed => vec![
            Notification::new(
                escrow.buyer_id,
                "Dispute opened",
                "A dispute was opened for your order. Funds are frozen pending review.",
                NotificationCategory::Dispute,
            ),
            Notification::new(
                escrow.vendor_id,
                "Dispute opened",
                "A dispute was opened for your order. Funds are frozen pending review.",
                NotificationCategory::Dispute,
            ),
        ],
        EscrowStatus::Pending | EscrowStatus::Cancelled => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketpay_store::Datastore;
    use marketpay_types::{
        Currency, Money, Order, PaymentMethod, PaymentRecord, Escrow,
    };

    fn seed() -> (Order, Escrow) {
        let order = Order::new(
            UserId::new(),
            UserId::new(),
            PaymentRecord::initiate(
                "monipay",
                PaymentMethod::MobileMoney,
                "ref-1",
                Money::from_major(100_000, Currency::Sle),
            ),
        );
        let escrow = Escrow::new(
            order.id,
            order.buyer_id,
            order.vendor_id,
            order.payment.amount,
            Money::from_major(2_500, Currency::Sle),
        );
        (order, escrow)
    }

    #[test]
    fn mapping_covers_every_escrow_status() {
        assert_eq!(order_status_for(EscrowStatus::Pending), None);
        assert_eq!(
            order_status_for(EscrowStatus::Funded),
            Some(OrderStatus::Confirmed)
        );
        assert_eq!(
            order_status_for(EscrowStatus::PendingConfirmation),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            order_status_for(EscrowStatus::ReleasedToVendor),
            Some(OrderStatus::Completed)
        );
        assert_eq!(
            order_status_for(EscrowStatus::RefundedToBuyer),
            Some(OrderStatus::Refunded)
        );
        assert_eq!(
            order_status_for(EscrowStatus::Disputed),
            Some(OrderStatus::Disputed)
        );
        assert_eq!(
            order_status_for(EscrowStatus::Cancelled),
            Some(OrderStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn mirror_updates_order_in_same_unit() {
        let store = Datastore::new();
        let (order, mut escrow) = seed();
        let order_id = order.id;
        store
            .write(|txn| {
                txn.insert_order(order)?;
                txn.insert_escrow(escrow.clone())?;
                Ok(())
            })
            .await
            .unwrap();

        escrow.status = EscrowStatus::Funded;
        store
            .write(|txn| mirror_escrow(txn, &escrow))
            .await
            .unwrap();

        let order = store.order(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn dispatch_swallows_notifier_failures() {
        struct FailingNotifier;

        #[async_trait]
        impl Notifier for FailingNotifier {
            async fn notify(&self, _n: Notification) -> Result<()> {
                Err(marketpay_types::SettleError::internal("smtp down"))
            }
        }

        let notifier: Arc<dyn Notifier> = Arc::new(FailingNotifier);
        // Must not panic or propagate.
        dispatch(
            &notifier,
            vec![Notification::new(
                UserId::new(),
                "t",
                "m",
                NotificationCategory::Order,
            )],
        )
        .await;
    }

    #[test]
    fn released_escrow_notifies_both_parties() {
        let (_, mut escrow) = seed();
        escrow.status = EscrowStatus::ReleasedToVendor;
        let notices = settlement_notices(&escrow);
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().any(|n| n.user_id == escrow.vendor_id
            && n.category == NotificationCategory::Payment));
        assert!(notices.iter().any(|n| n.user_id == escrow.buyer_id));
    }
}
