//! Printable HTML invoice for a single order.

use askama::Template;
use chrono::Utc;

use crate::auth::Caller;
use crate::domain::aggregates::Order;
use crate::domain::value_objects::number_text;
use crate::store::order_path;
use crate::{AppState, BackofficeError, Result};

pub struct InvoiceRow { pub name: String, pub qty: String, pub price: String, pub amount: String }

/// `templates/invoice.html`; every field is escaped on render.
#[derive(Template)]
#[template(path = "invoice.html")]
pub struct InvoiceTemplate {
    pub brand: String,
    pub id_short: String,
    pub created: String,
    pub generated: String,
    pub name: String,
    pub email: String,
    pub rows: Vec<InvoiceRow>,
    pub subtotal: String,
    /// Empty when no coupon was applied.
    pub coupon: String,
    pub discount: String,
    pub total: String,
    pub payment_id: String,
}

fn currency(v: f64) -> String { format!("₹ {v:.2}") }

fn short_id(id: &str) -> String {
    let n = id.chars().count();
    id.chars().skip(n.saturating_sub(8)).collect()
}

fn or_dash(s: &str) -> String { if s.is_empty() { "-".into() } else { s.to_string() } }

impl InvoiceTemplate {
    pub fn from_order(brand: &str, order: &Order) -> Self {
        let billing = order.billing();
        let (amount, discount, payable) = order.invoice_amounts();
        let rows = order.items().iter().map(|it| {
            let qty = it.qty.unwrap_or(0.0);
            let price = it.price.unwrap_or(0.0);
            InvoiceRow { name: it.name.clone(), qty: number_text(qty), price: currency(price), amount: currency(price * qty) }
        }).collect();
        Self {
            brand: brand.to_string(),
            id_short: short_id(order.id()),
            created: order.created_label(),
            generated: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
            name: or_dash(&billing.name),
            email: billing.email.clone(),
            rows,
            subtotal: currency(amount),
            coupon: order.coupon_code().unwrap_or_default().to_string(),
            discount: currency(discount),
            total: currency(payable),
            payment_id: or_dash(order.payment_id()),
        }
    }
}

/// Owners see their own orders; admins see all.
pub async fn render_invoice(state: &AppState, caller: &Caller, order_id: &str) -> Result<String> {
    let order_id = order_id.trim();
    if order_id.is_empty() { return Err(BackofficeError::InvalidArgument("orderId is required".into())); }
    let doc = state.store.get(&order_path(order_id)).await?
        .ok_or_else(|| BackofficeError::NotFound("Order not found".into()))?;
    let order = Order::from_document(order_id, doc)?;
    if !caller.is_admin && !order.is_owned_by(&caller.uid) {
        tracing::info!(order_id, uid = %caller.uid, "invoice denied");
        return Err(BackofficeError::PermissionDenied("Forbidden".into()));
    }
    InvoiceTemplate::from_order(&state.config.invoice_brand, &order).render()
        .map_err(|e| BackofficeError::Internal(format!("invoice render failed: {e}")))
}
