//! Demo data for local runs.

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::memory::StoreState;
use super::records::*;
use crate::agent::Role;
use crate::chat::{DEFAULT_USER_ID, DEMO_EMAIL};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Build a fresh state with the demo user, two conversations, two orders
/// and their invoices.
pub fn demo_state() -> StoreState {
    let now = Utc::now();
    let mut state = StoreState::default();

    state.users.push(User {
        id: DEFAULT_USER_ID.to_string(),
        email: Some(DEMO_EMAIL.to_string()),
        name: Some("Demo User".to_string()),
    });

    let getting_started = Conversation {
        id: new_id(),
        user_id: DEFAULT_USER_ID.to_string(),
        title: Some("Getting started".to_string()),
        created_at: now,
        updated_at: now,
    };
    let billing_question = Conversation {
        id: new_id(),
        user_id: DEFAULT_USER_ID.to_string(),
        title: Some("Billing question".to_string()),
        created_at: now,
        updated_at: now,
    };

    let mut push_message = |conversation_id: &str, role: Role, content: &str| {
        state.messages.push(StoredMessage {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
    };
    push_message(&getting_started.id, Role::User, "Hi, I need help with my last order.");
    push_message(&getting_started.id, Role::Assistant, "Sure, what seems to be the issue?");
    push_message(&billing_question.id, Role::User, "Can I get an invoice for order A10001?");
    push_message(&getting_started.id, Role::User, "Order number is A10001. Where is it now?");

    state.conversations.push(getting_started);
    state.conversations.push(billing_question);

    // A10001: shipped, paid, with a refund record.
    let order1 = Order {
        id: new_id(),
        user_id: DEFAULT_USER_ID.to_string(),
        order_number: "A10001".to_string(),
        status: "SHIPPED".to_string(),
        total_cents: 12999,
        currency: "USD".to_string(),
        created_at: now,
    };
    let delivery1 = Delivery {
        id: new_id(),
        order_id: order1.id.clone(),
        carrier: "UPS".to_string(),
        tracking_code: "1Z999AA10123456784".to_string(),
        status: "IN_TRANSIT".to_string(),
        estimated_date: Some(now + Duration::days(3)),
    };
    let invoice1 = Invoice {
        id: new_id(),
        order_id: order1.id.clone(),
        number: "INV-10001".to_string(),
        status: "PAID".to_string(),
        subtotal_cents: 12000,
        tax_cents: 999,
        total_cents: 12999,
        currency: "USD".to_string(),
        created_at: now,
    };
    let payment1 = Payment {
        id: new_id(),
        user_id: DEFAULT_USER_ID.to_string(),
        invoice_id: Some(invoice1.id.clone()),
        provider: "stripe".to_string(),
        status: "SUCCEEDED".to_string(),
        amount_cents: 12999,
        currency: "USD".to_string(),
        created_at: now,
    };
    let refund1 = Refund {
        id: new_id(),
        payment_id: payment1.id.clone(),
        status: "NONE".to_string(),
        amount_cents: 0,
        created_at: now,
    };

    state.insert_order(order1, Some(delivery1));
    state.insert_invoice(invoice1);
    state.insert_payment(payment1);
    state.insert_refund(refund1);

    // A10002: processing, label created, invoice still open.
    let order2 = Order {
        id: new_id(),
        user_id: DEFAULT_USER_ID.to_string(),
        order_number: "A10002".to_string(),
        status: "PROCESSING".to_string(),
        total_cents: 4999,
        currency: "USD".to_string(),
        created_at: now,
    };
    let delivery2 = Delivery {
        id: new_id(),
        order_id: order2.id.clone(),
        carrier: "USPS".to_string(),
        tracking_code: "94001118992238569210".to_string(),
        status: "LABEL_CREATED".to_string(),
        estimated_date: None,
    };
    let invoice2 = Invoice {
        id: new_id(),
        order_id: order2.id.clone(),
        number: "INV-10002".to_string(),
        status: "OPEN".to_string(),
        subtotal_cents: 4500,
        tax_cents: 499,
        total_cents: 4999,
        currency: "USD".to_string(),
        created_at: now,
    };

    state.insert_order(order2, Some(delivery2));
    state.insert_invoice(invoice2);

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, Store};

    #[tokio::test]
    async fn test_demo_state_is_queryable() {
        let store = InMemoryStore::with_state(demo_state());

        let order = store
            .find_order_for_user(DEFAULT_USER_ID, "A10001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.delivery.unwrap().carrier, "UPS");

        let open = store
            .find_invoice_for_user(DEFAULT_USER_ID, "INV-10002")
            .await
            .unwrap()
            .unwrap();
        assert!(open.payment.is_none());

        let listed = store.list_conversations(DEFAULT_USER_ID).await.unwrap();
        assert_eq!(listed.len(), 2);
    }
}
