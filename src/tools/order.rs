//! Order tools - order details and delivery tracking

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_input, require_non_empty, Tool, ToolName};
use crate::agent::AgentContext;
use crate::store::{Delivery, Store};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNumberInput {
    pub order_number: String,
}

fn order_number_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "orderNumber": {
                "type": "string",
                "minLength": 1,
                "description": "Order number, e.g. A10001"
            }
        },
        "required": ["orderNumber"]
    })
}

fn validate_order_number(tool: ToolName, raw: &Value) -> Result<OrderNumberInput> {
    let input: OrderNumberInput = parse_input(tool, raw)?;
    require_non_empty(tool, "orderNumber", &input.order_number)?;
    Ok(input)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    pub order_number: String,
    pub status: String,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    pub carrier: String,
    pub tracking_code: String,
    pub status: String,
    pub estimated_date: Option<DateTime<Utc>>,
}

impl From<Delivery> for DeliverySummary {
    fn from(d: Delivery) -> Self {
        Self {
            carrier: d.carrier,
            tracking_code: d.tracking_code,
            status: d.status,
            estimated_date: d.estimated_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    pub order: OrderSummary,
    pub delivery: Option<DeliverySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatus {
    pub tracking_code: String,
    pub status: String,
    pub estimated_date: Option<DateTime<Utc>>,
}

/// Order details with its delivery
pub struct OrderDetailsTool {
    store: Arc<dyn Store>,
}

impl OrderDetailsTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OrderDetailsTool {
    type Input = OrderNumberInput;
    type Output = Option<OrderDetails>;

    fn name(&self) -> ToolName {
        ToolName::FetchOrderDetails
    }

    fn description(&self) -> &str {
        "Fetches order details including status, total, and associated delivery."
    }

    fn parameters(&self) -> Value {
        order_number_schema()
    }

    fn validate(&self, raw: &Value) -> Result<OrderNumberInput> {
        validate_order_number(self.name(), raw)
    }

    async fn execute(&self, input: OrderNumberInput, ctx: &AgentContext) -> Result<Option<OrderDetails>> {
        let Some(found) = self
            .store
            .find_order_for_user(&ctx.user_id, &input.order_number)
            .await?
        else {
            return Ok(None);
        };

        let order = found.order;
        Ok(Some(OrderDetails {
            order: OrderSummary {
                id: order.id,
                order_number: order.order_number,
                status: order.status,
                total_cents: order.total_cents,
                currency: order.currency,
                created_at: order.created_at,
            },
            delivery: found.delivery.map(DeliverySummary::from),
        }))
    }
}

/// Tracking status of an order's delivery
pub struct DeliveryStatusTool {
    store: Arc<dyn Store>,
}

impl DeliveryStatusTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeliveryStatusTool {
    type Input = OrderNumberInput;
    type Output = Option<DeliveryStatus>;

    fn name(&self) -> ToolName {
        ToolName::CheckDeliveryStatus
    }

    fn description(&self) -> &str {
        "Checks the current delivery status and tracking information for an order."
    }

    fn parameters(&self) -> Value {
        order_number_schema()
    }

    fn validate(&self, raw: &Value) -> Result<OrderNumberInput> {
        validate_order_number(self.name(), raw)
    }

    async fn execute(&self, input: OrderNumberInput, ctx: &AgentContext) -> Result<Option<DeliveryStatus>> {
        let found = self
            .store
            .find_order_for_user(&ctx.user_id, &input.order_number)
            .await?;

        Ok(found.and_then(|o| o.delivery).map(|d| DeliveryStatus {
            tracking_code: d.tracking_code,
            status: d.status,
            estimated_date: d.estimated_date,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{seed, InMemoryStore, Order};

    fn store_with_foreign_order() -> Arc<dyn Store> {
        let mut state = seed::demo_state();
        state.insert_order(
            Order {
                id: "other-order".into(),
                user_id: "someone-else".into(),
                order_number: "B20001".into(),
                status: "SHIPPED".into(),
                total_cents: 100,
                currency: "USD".into(),
                created_at: Utc::now(),
            },
            None,
        );
        Arc::new(InMemoryStore::with_state(state))
    }

    fn input(number: &str) -> OrderNumberInput {
        OrderNumberInput {
            order_number: number.to_string(),
        }
    }

    #[test]
    fn test_validate_requires_non_empty_order_number() {
        let tool = OrderDetailsTool::new(store_with_foreign_order());
        assert!(tool.validate(&json!({"orderNumber": "A10001"})).is_ok());
        assert!(tool.validate(&json!({"orderNumber": ""})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_fetch_order_details_with_delivery() {
        let tool = OrderDetailsTool::new(store_with_foreign_order());
        let ctx = AgentContext::test("where is A10001");

        let details = tool.execute(input("A10001"), &ctx).await.unwrap().unwrap();
        assert_eq!(details.order.status, "SHIPPED");
        assert_eq!(details.delivery.unwrap().tracking_code, "1Z999AA10123456784");
    }

    #[tokio::test]
    async fn test_orders_of_other_users_are_not_found() {
        let store = store_with_foreign_order();
        let ctx = AgentContext::test("where is B20001");

        let details = OrderDetailsTool::new(store.clone()).execute(input("B20001"), &ctx).await.unwrap();
        assert!(details.is_none());

        let status = DeliveryStatusTool::new(store).execute(input("B20001"), &ctx).await.unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn test_delivery_status_unknown_order_is_none() {
        let tool = DeliveryStatusTool::new(store_with_foreign_order());
        let ctx = AgentContext::test("status?");

        assert!(tool.execute(input("Z99999"), &ctx).await.unwrap().is_none());

        let status = tool.execute(input("A10002"), &ctx).await.unwrap().unwrap();
        assert_eq!(status.status, "LABEL_CREATED");
        assert!(status.estimated_date.is_none());
    }
}
