//! Billing tools - invoices, payments and refunds

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_input, require_non_empty, Tool, ToolName};
use crate::agent::AgentContext;
use crate::store::Store;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceNumberInput {
    pub invoice_number: String,
}

fn invoice_number_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "invoiceNumber": {
                "type": "string",
                "minLength": 1,
                "description": "Invoice number, e.g. INV-10001"
            }
        },
        "required": ["invoiceNumber"]
    })
}

fn validate_invoice_number(tool: ToolName, raw: &Value) -> Result<InvoiceNumberInput> {
    let input: InvoiceNumberInput = parse_input(tool, raw)?;
    require_non_empty(tool, "invoiceNumber", &input.invoice_number)?;
    Ok(input)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub provider: String,
    pub status: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetails {
    pub number: String,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub payment: Option<PaymentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInfo {
    pub status: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Invoice amounts and payment summary
pub struct InvoiceDetailsTool {
    store: Arc<dyn Store>,
}

impl InvoiceDetailsTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for InvoiceDetailsTool {
    type Input = InvoiceNumberInput;
    type Output = Option<InvoiceDetails>;

    fn name(&self) -> ToolName {
        ToolName::GetInvoiceDetails
    }

    fn description(&self) -> &str {
        "Retrieves invoice details including amounts, status, and payment information."
    }

    fn parameters(&self) -> Value {
        invoice_number_schema()
    }

    fn validate(&self, raw: &Value) -> Result<InvoiceNumberInput> {
        validate_invoice_number(self.name(), raw)
    }

    async fn execute(&self, input: InvoiceNumberInput, ctx: &AgentContext) -> Result<Option<InvoiceDetails>> {
        let found = self
            .store
            .find_invoice_for_user(&ctx.user_id, &input.invoice_number)
            .await?;

        Ok(found.map(|f| InvoiceDetails {
            number: f.invoice.number,
            status: f.invoice.status,
            subtotal_cents: f.invoice.subtotal_cents,
            tax_cents: f.invoice.tax_cents,
            total_cents: f.invoice.total_cents,
            currency: f.invoice.currency,
            created_at: f.invoice.created_at,
            payment: f.payment.map(|p| PaymentSummary {
                provider: p.provider,
                status: p.status,
                amount_cents: p.amount_cents,
            }),
        }))
    }
}

/// Refund history of an invoice's payment
pub struct RefundStatusTool {
    store: Arc<dyn Store>,
}

impl RefundStatusTool {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RefundStatusTool {
    type Input = InvoiceNumberInput;
    type Output = Vec<RefundInfo>;

    fn name(&self) -> ToolName {
        ToolName::CheckRefundStatus
    }

    fn description(&self) -> &str {
        "Checks refund status and history for a given invoice payment."
    }

    fn parameters(&self) -> Value {
        invoice_number_schema()
    }

    fn validate(&self, raw: &Value) -> Result<InvoiceNumberInput> {
        validate_invoice_number(self.name(), raw)
    }

    async fn execute(&self, input: InvoiceNumberInput, ctx: &AgentContext) -> Result<Vec<RefundInfo>> {
        let payment = self
            .store
            .find_invoice_for_user(&ctx.user_id, &input.invoice_number)
            .await?
            .and_then(|f| f.payment);

        let Some(payment) = payment else {
            return Ok(Vec::new());
        };

        let refunds = self.store.refunds_for_payment(&payment.id).await?;
        Ok(refunds
            .into_iter()
            .map(|r| RefundInfo {
                status: r.status,
                amount_cents: r.amount_cents,
                created_at: r.created_at,
            })
            .collect())
    }
}
