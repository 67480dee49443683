use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::approval::{Approvable, ApprovalState, AuditStamp, EntityKind};

const MONEY_DP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    PendingApproval,
    Sent,
    Viewed,
    Approved,
    Rejected,
    Expired,
    Converted,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "DRAFT",
            QuoteStatus::PendingApproval => "PENDING_APPROVAL",
            QuoteStatus::Sent => "SENT",
            QuoteStatus::Viewed => "VIEWED",
            QuoteStatus::Approved => "APPROVED",
            QuoteStatus::Rejected => "REJECTED",
            QuoteStatus::Expired => "EXPIRED",
            QuoteStatus::Converted => "CONVERTED",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(QuoteStatus::Draft),
            "PENDING_APPROVAL" => Ok(QuoteStatus::PendingApproval),
            "SENT" => Ok(QuoteStatus::Sent),
            "VIEWED" => Ok(QuoteStatus::Viewed),
            "APPROVED" => Ok(QuoteStatus::Approved),
            "REJECTED" => Ok(QuoteStatus::Rejected),
            "EXPIRED" => Ok(QuoteStatus::Expired),
            "CONVERTED" => Ok(QuoteStatus::Converted),
            other => Err(AppError::validation(format!("unknown quote status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteItem {
    pub id: Uuid,
    pub description: String,
    #[schema(value_type = String, example = "2")]
    pub quantity: Decimal,
    #[schema(value_type = String, example = "50.00")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "100.00")]
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl QuoteItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        QuoteItem {
            id: Uuid::new_v4(),
            description: description.into(),
            quantity,
            unit_price,
            total: quantity * unit_price,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl QuoteTotals {
    /// subtotal = sum(quantity * unit price); tax = subtotal * rate (to cents);
    /// total = subtotal + tax - discount.
    pub fn compute(items: &[QuoteItem], tax_rate: Decimal, discount: Decimal) -> Self {
        let subtotal: Decimal = items.iter().map(|item| item.quantity * item.unit_price).sum();
        let tax_amount =
            (subtotal * tax_rate).round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero);
        QuoteTotals {
            subtotal,
            tax_amount,
            total: subtotal + tax_amount - discount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub id: Uuid,
    pub tenant_id: String,
    pub company_id: Uuid,
    pub quote_number: String,
    pub title: String,
    pub description: Option<String>,
    pub customer_id: Option<Uuid>,
    pub items: Vec<QuoteItem>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub tax_rate: Decimal,
    #[schema(value_type = String)]
    pub tax_amount: Decimal,
    #[schema(value_type = String)]
    pub discount_amount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub status: QuoteStatus,
    pub valid_until: Option<DateTime<Utc>>,
    pub approval: ApprovalState,
    pub audit: AuditStamp,
}

impl Quote {
    pub fn draft(
        tenant_id: impl Into<String>,
        company_id: Uuid,
        quote_number: impl Into<String>,
        title: impl Into<String>,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Quote {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            company_id,
            quote_number: quote_number.into(),
            title: title.into(),
            description: None,
            customer_id: None,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            total: Decimal::ZERO,
            status: QuoteStatus::Draft,
            valid_until: None,
            approval: ApprovalState {
                approval_required: true,
                ..ApprovalState::default()
            },
            audit: AuditStamp::created(Some(created_by), now),
        }
    }

    /// Replace the line items and recompute every total.
    pub fn set_items(&mut self, items: Vec<QuoteItem>) {
        self.items = items
            .into_iter()
            .map(|mut item| {
                item.total = item.quantity * item.unit_price;
                item
            })
            .collect();
        self.recalculate_totals();
    }

    pub fn set_pricing(&mut self, tax_rate: Decimal, discount_amount: Decimal) -> Result<(), AppError> {
        if tax_rate.is_sign_negative() {
            return Err(AppError::validation("tax rate must not be negative"));
        }
        if discount_amount.is_sign_negative() {
            return Err(AppError::validation("discount must not be negative"));
        }
        self.tax_rate = tax_rate;
        self.discount_amount = discount_amount;
        self.recalculate_totals();
        Ok(())
    }

    pub fn recalculate_totals(&mut self) {
        let totals = QuoteTotals::compute(&self.items, self.tax_rate, self.discount_amount);
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total = totals.total;
    }
}

impl Approvable for Quote {
    const KIND: EntityKind = EntityKind::Quote;

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn is_pending_approval(&self) -> bool {
        self.status == QuoteStatus::PendingApproval
    }

    fn approval(&self) -> &ApprovalState {
        &self.approval
    }

    fn enter_pending(&mut self) {
        self.status = QuoteStatus::PendingApproval;
        self.approval.request();
    }

    fn enter_approved(&mut self, approver: &str, at: DateTime<Utc>) {
        self.status = QuoteStatus::Approved;
        self.approval.approve(approver, at);
    }

    fn enter_rejected(&mut self, reason: &str) {
        self.status = QuoteStatus::Rejected;
        self.approval.reject(reason);
    }

    fn touch(&mut self, actor: &str, at: DateTime<Utc>) {
        self.audit.touch(actor, at);
    }
}
