//! Service configuration, read once from the environment at startup.

use thiserror::Error;
use crate::domain::value_objects::{kg_to_grams, truncate, Phone10, Pincode};

pub const DEFAULT_COURIER_BASE_URL: &str = "https://shipment.xpressbees.com";
pub const DEFAULT_MESSAGING_API: &str = "https://api.twilio.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// In-memory document store when absent.
    pub database_url: Option<String>,
    pub auth: AuthConfig,
    pub courier: CourierConfig,
    pub warehouse: WarehouseConfig,
    pub messaging: MessagingConfig,
    pub invoice_brand: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lower-cased.
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty() && self.admin_emails.iter().any(|a| *a == email)
    }
}

/// Courier account and package defaults. Numeric settings stay raw and are
/// read leniently where they are used.
#[derive(Debug, Clone)]
pub struct CourierConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub default_weight_kg: String,
    pub default_length: String,
    pub default_breadth: String,
    pub default_height: String,
    pub auto_pickup: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageDefaults { pub weight_grams: u32, pub length: u32, pub breadth: u32, pub height: u32, pub auto_pickup: bool }

fn dimension(raw: &str, fallback: u32) -> u32 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.round() as u32,
        _ => fallback,
    }
}

impl CourierConfig {
    pub fn has_credentials(&self) -> bool { !self.username.trim().is_empty() && !self.password.trim().is_empty() }

    pub fn package(&self) -> PackageDefaults {
        PackageDefaults {
            weight_grams: kg_to_grams(&self.default_weight_kg),
            length: dimension(&self.default_length, 30),
            breadth: dimension(&self.default_breadth, 20),
            height: dimension(&self.default_height, 10),
            auto_pickup: self.auto_pickup.trim().eq_ignore_ascii_case("yes"),
        }
    }

    /// Scheme, host and port of the configured base URL; paths are dropped.
    pub fn origin(&self) -> String {
        let raw = if self.base_url.trim().is_empty() { DEFAULT_COURIER_BASE_URL } else { self.base_url.trim() };
        match reqwest::Url::parse(raw) {
            Ok(u) if u.has_host() => u.origin().ascii_serialization(),
            _ => {
                let cut = raw.find("/api/").map_or(raw, |i| &raw[..i]);
                cut.trim_end_matches('/').to_string()
            }
        }
    }
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COURIER_BASE_URL.into(), username: String::new(), password: String::new(),
            default_weight_kg: "0.7".into(), default_length: "30".into(), default_breadth: "20".into(),
            default_height: "10".into(), auto_pickup: "yes".into(),
        }
    }
}

/// Seller warehouse: the consignee of every reverse shipment.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub warehouse_name: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub gst_number: String,
}

impl WarehouseConfig {
    pub fn short_name(&self) -> String { truncate(&self.warehouse_name, 20) }
    pub fn phone10(&self) -> Phone10 { Phone10::normalize(&self.phone) }
    pub fn pincode(&self) -> Pincode { Pincode::normalize(&self.pincode) }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            warehouse_name: "Megance WH1".into(), name: "Megance".into(), phone: "8882132169".into(),
            email: "support@megance.com".into(), address: "A-51, First floor, Meera Bagh, Paschim Vihar".into(),
            city: "NEW DELHI".into(), state: "DELHI".into(), pincode: "110087".into(), gst_number: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessagingConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    pub whatsapp_from: String,
    pub rejected_template_sid: String,
    pub fallback_template_sid: String,
}

impl MessagingConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.whatsapp_from.is_empty()
    }

    /// Rejection template, else the generic returns template.
    pub fn rejection_template(&self) -> Option<&str> {
        [self.rejected_template_sid.trim(), self.fallback_template_sid.trim()].into_iter().find(|s| !s.is_empty())
    }
}

fn var(name: &str) -> Option<String> { std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) }
fn var_or(name: &str, default: &str) -> String { var(name).unwrap_or_else(|| default.to_string()) }

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match var("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: p })?,
            None => 8083,
        };
        let mut admin_emails: Vec<String> = var("ADMIN_EMAILS").unwrap_or_default()
            .split(',').map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()).collect();
        if let Some(owner) = var("OWNER_EMAIL") { admin_emails.push(owner.to_lowercase()); }

        let courier_defaults = CourierConfig::default();
        let warehouse_defaults = WarehouseConfig::default();
        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            auth: AuthConfig { jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?, admin_emails },
            courier: CourierConfig {
                base_url: var_or("XPRESSBEES_BASE_URL", &courier_defaults.base_url),
                username: var_or("XPRESSBEES_USERNAME", ""),
                password: var_or("XPRESSBEES_PASSWORD", ""),
                default_weight_kg: var_or("XPRESSBEES_DEFAULT_WEIGHT", &courier_defaults.default_weight_kg),
                default_length: var_or("XPRESSBEES_DEFAULT_LENGTH", &courier_defaults.default_length),
                default_breadth: var_or("XPRESSBEES_DEFAULT_BREADTH", &courier_defaults.default_breadth),
                default_height: var_or("XPRESSBEES_DEFAULT_HEIGHT", &courier_defaults.default_height),
                auto_pickup: var_or("XPRESSBEES_AUTO_PICKUP", &courier_defaults.auto_pickup),
            },
            warehouse: WarehouseConfig {
                warehouse_name: var_or("PICKUP_WAREHOUSE_NAME", &warehouse_defaults.warehouse_name),
                name: var_or("PICKUP_NAME", &warehouse_defaults.name),
                phone: var_or("PICKUP_PHONE", &warehouse_defaults.phone),
                email: var_or("PICKUP_EMAIL", &warehouse_defaults.email),
                address: var_or("PICKUP_ADDRESS", &warehouse_defaults.address),
                city: var_or("PICKUP_CITY", &warehouse_defaults.city),
                state: var_or("PICKUP_STATE", &warehouse_defaults.state),
                pincode: var_or("PICKUP_PINCODE", &warehouse_defaults.pincode),
                gst_number: var("PICKUP_GST").or_else(|| var("XPRESSBEES_GST_NUMBER")).unwrap_or_default(),
            },
            messaging: MessagingConfig {
                api_base: var_or("TWILIO_API_BASE", DEFAULT_MESSAGING_API),
                account_sid: var_or("TWILIO_ACCOUNT_SID", ""),
                auth_token: var_or("TWILIO_AUTH_TOKEN", ""),
                whatsapp_from: var_or("TWILIO_WHATSAPP_FROM", ""),
                rejected_template_sid: var_or("TWILIO_RETURNS_USER_REJECTED_SID", ""),
                fallback_template_sid: var_or("TWILIO_RETURNS_USER_TEMPLATE_SID", ""),
            },
            invoice_brand: var_or("INVOICE_BRAND", "MEGANCE"),
        })
    }

    /// Configuration for tests and local runs without an environment.
    pub fn for_secret(jwt_secret: &str, admin_emails: &[&str]) -> Self {
        Self {
            port: 8083,
            database_url: None,
            auth: AuthConfig { jwt_secret: jwt_secret.into(), admin_emails: admin_emails.iter().map(|e| e.to_lowercase()).collect() },
            courier: CourierConfig::default(),
            warehouse: WarehouseConfig::default(),
            messaging: MessagingConfig { api_base: DEFAULT_MESSAGING_API.into(), ..MessagingConfig::default() },
            invoice_brand: "MEGANCE".into(),
        }
    }
}
