//! Reverse-shipment payload in the courier's schema.
//!
//! In a reverse shipment the pickup party is the customer and the consignee
//! is our own warehouse. Every string field is capped before it leaves.

use serde::Serialize;
use crate::config::{PackageDefaults, WarehouseConfig};
use crate::domain::aggregates::{Order, PickupOverride};
use crate::domain::value_objects::{number_text, truncate, AddressLines, Phone10, Pincode};

const NAME_MAX: usize = 200;
const REGION_MAX: usize = 40;
const WAREHOUSE_NAME_MAX: usize = 20;
const ORDER_NUMBER_MAX: usize = 20;
const FALLBACK_CONSIGNEE_PHONE: &str = "9999999999";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReversePayload {
    pub order_number: String,
    pub payment_type: &'static str,
    pub order_amount: i64,
    pub discount: i64,
    pub package_weight: u32,
    pub package_length: u32,
    pub package_breadth: u32,
    pub package_height: u32,
    pub request_auto_pickup: &'static str,
    pub pickup: PickupParty,
    pub consignee: Consignee,
    pub order_items: Vec<PayloadItem>,
    pub collectable_amount: i64,
    pub is_reverse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PickupParty {
    pub warehouse_name: String,
    pub name: String,
    pub address: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
    pub phone: Phone10,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Consignee {
    pub name: String,
    pub company_name: String,
    pub address: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst_number: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PayloadItem { pub name: String, pub qty: String, pub price: String, pub sku: String }

/// Inputs that do not come from the order itself.
#[derive(Clone, Copy, Debug)]
pub struct PayloadContext<'a> {
    pub package: PackageDefaults,
    pub warehouse: &'a WarehouseConfig,
}

fn pick<'a>(over: Option<&'a String>, fallback: &'a str) -> &'a str {
    over.map(String::as_str).filter(|s| !s.trim().is_empty()).unwrap_or(fallback)
}

/// `reason | notes`, blank parts skipped.
pub fn remarks(reason: Option<&str>, notes: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [reason, notes].into_iter().flatten().map(str::trim).filter(|s| !s.is_empty()).collect();
    if parts.is_empty() { None } else { Some(parts.join(" | ")) }
}

impl ReversePayload {
    pub fn build(ctx: PayloadContext<'_>, order: &Order, pickup: Option<&PickupOverride>, remarks: Option<String>) -> Self {
        let totals = order.totals();
        let billing = order.billing();
        let empty = PickupOverride::default();
        let over = pickup.unwrap_or(&empty);

        let p_name = pick(over.name.as_ref(), &billing.name);
        let lines = AddressLines::split(pick(over.address.as_ref(), &billing.address));
        let pickup = PickupParty {
            warehouse_name: truncate(if p_name.is_empty() { "Buyer" } else { p_name }, WAREHOUSE_NAME_MAX),
            name: truncate(p_name, NAME_MAX),
            address: lines.primary,
            address_2: lines.secondary,
            city: truncate(pick(over.city.as_ref(), &billing.city), REGION_MAX),
            state: truncate(pick(over.state.as_ref(), &billing.state), REGION_MAX),
            pincode: Pincode::normalize(pick(over.zip.as_ref(), &billing.zip)),
            phone: Phone10::normalize(pick(over.phone.as_ref(), &billing.phone)),
        };

        let wh = ctx.warehouse;
        let wh_phone = wh.phone10();
        let consignee = Consignee {
            name: truncate(&wh.name, NAME_MAX),
            company_name: wh.short_name(),
            address: wh.address.clone(),
            address_2: String::new(),
            city: truncate(&wh.city, REGION_MAX),
            state: truncate(&wh.state, REGION_MAX),
            pincode: wh.pincode(),
            phone: if wh_phone.is_empty() { FALLBACK_CONSIGNEE_PHONE.to_string() } else { wh_phone.to_string() },
            gst_number: Some(wh.gst_number.trim().to_string()).filter(|g| !g.is_empty()),
        };

        let order_items = order.items().iter().map(|it| PayloadItem {
            name: it.name.clone(),
            qty: number_text(it.quantity()),
            price: number_text(it.unit_price()),
            sku: it.sku_or_id().to_string(),
        }).collect();

        Self {
            order_number: truncate(&order.return_label(), ORDER_NUMBER_MAX),
            payment_type: "prepaid",
            order_amount: totals.payable,
            discount: totals.discount,
            package_weight: ctx.package.weight_grams,
            package_length: ctx.package.length,
            package_breadth: ctx.package.breadth,
            package_height: ctx.package.height,
            request_auto_pickup: if ctx.package.auto_pickup { "yes" } else { "no" },
            pickup,
            consignee,
            order_items,
            collectable_amount: 0,
            is_reverse: true,
            remarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CourierConfig;
    use serde_json::json;

    fn order() -> Order {
        Order::from_document("k9x2ab77", json!({
            "billing": {
                "name": "Asha Verma", "phone": "+91 98765 43210", "zip": "110087-extra",
                "address": "Flat 4, Tower B, Green Park, Sector 5", "city": "Delhi", "state": "Delhi",
            },
            "items": [{"name": "Sneaker", "qty": "2", "price": 1499, "id": "P1"}, {"name": "Sock", "qty": "x", "sku": "S-1"}],
            "amount": 3000, "discount": 200,
        })).unwrap()
    }

    #[test]
    fn test_build_from_billing() {
        let wh = WarehouseConfig::default();
        let ctx = PayloadContext { package: CourierConfig::default().package(), warehouse: &wh };
        let p = ReversePayload::build(ctx, &order(), None, remarks(Some("refund-approved"), Some("")));
        assert_eq!(p.order_number, "RETK9X2AB");
        assert_eq!(p.order_amount, 3304);
        assert_eq!(p.discount, 200);
        assert_eq!(p.package_weight, 700);
        assert_eq!(p.pickup.phone.as_str(), "9876543210");
        assert_eq!(p.pickup.pincode.as_str(), "110087");
        assert_eq!(p.pickup.address, "Flat 4, Tower B");
        assert_eq!(p.pickup.address_2, "Green Park, Sector 5");
        assert_eq!(p.pickup.warehouse_name, "Asha Verma");
        assert_eq!(p.consignee.company_name, "Megance WH1");
        assert_eq!(p.consignee.phone, "8882132169");
        assert_eq!(p.order_items[0], PayloadItem { name: "Sneaker".into(), qty: "2".into(), price: "1499".into(), sku: "P1".into() });
        assert_eq!(p.order_items[1].qty, "1");
        assert_eq!(p.order_items[1].price, "0");
        assert_eq!(p.remarks.as_deref(), Some("refund-approved"));
    }

    #[test]
    fn test_junk_item_still_ships_the_others() {
        let wh = WarehouseConfig::default();
        let ctx = PayloadContext { package: CourierConfig::default().package(), warehouse: &wh };
        let order = Order::from_document("o1", json!({"items": [{"name": "Sneaker", "qty": 1, "price": 999}, "junk"]})).unwrap();
        let p = ReversePayload::build(ctx, &order, None, None);
        assert_eq!(p.order_items.len(), 2);
        assert_eq!(p.order_items[0].price, "999");
        assert_eq!(p.order_items[1], PayloadItem { name: String::new(), qty: "1".into(), price: "0".into(), sku: String::new() });
    }

    #[test]
    fn test_override_wins() {
        let wh = WarehouseConfig { phone: "12".into(), gst_number: " 07AAACM ".into(), ..WarehouseConfig::default() };
        let ctx = PayloadContext { package: CourierConfig::default().package(), warehouse: &wh };
        let over = PickupOverride::from_fields("", "98111 22233", "12 Lake Road", "Pune", "", "411001");
        let p = ReversePayload::build(ctx, &order(), over.as_ref(), None);
        assert_eq!(p.pickup.name, "Asha Verma");
        assert_eq!(p.pickup.phone.as_str(), "9811122233");
        assert_eq!(p.pickup.city, "Pune");
        assert_eq!(p.pickup.state, "Delhi");
        assert_eq!(p.pickup.address, "12 Lake Road");
        assert_eq!(p.pickup.address_2, "");
        assert_eq!(p.consignee.phone, "12");
        assert_eq!(p.consignee.gst_number.as_deref(), Some("07AAACM"));
    }

    #[test]
    fn test_wire_shape() {
        let wh = WarehouseConfig { phone: String::new(), ..WarehouseConfig::default() };
        let ctx = PayloadContext { package: CourierConfig::default().package(), warehouse: &wh };
        let empty = Order::from_document("z", json!({})).unwrap();
        let v = serde_json::to_value(ReversePayload::build(ctx, &empty, None, None)).unwrap();
        assert_eq!(v["pickup"]["warehouse_name"], "Buyer");
        assert_eq!(v["consignee"]["phone"], "9999999999");
        assert_eq!(v["is_reverse"], true);
        assert_eq!(v["payment_type"], "prepaid");
        assert!(v.get("remarks").is_none());
        assert!(v["consignee"].get("gst_number").is_none());
    }

    #[test]
    fn test_remarks() {
        assert_eq!(remarks(Some("a"), Some("b")).as_deref(), Some("a | b"));
        assert_eq!(remarks(None, Some(" ")), None);
    }
}
