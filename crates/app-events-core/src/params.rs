//! Typed parameter records for identity and standard events
//!
//! Field names serialize to the camelCase keys the native endpoint expects.
//! Optional fields are never skipped: an unset field is sent as `null`.

use crate::args::Parameters;
use serde::{Deserialize, Serialize};

/// User data attached to future events.
///
/// All fields are optional. Unset fields are sent as explicit `null`, which
/// lets the native endpoint clear values set by an earlier call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl UserData {
    /// Every key sent with `setUserData`, in declaration order
    pub const KEYS: [&'static str; 10] = [
        "email",
        "firstName",
        "lastName",
        "phone",
        "dateOfBirth",
        "gender",
        "city",
        "state",
        "zip",
        "country",
    ];

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn date_of_birth(mut self, date_of_birth: impl Into<String>) -> Self {
        self.date_of_birth = Some(date_of_birth.into());
        self
    }

    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    /// City, state, zip and country in one go
    pub fn address(
        mut self,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.city = Some(city.into());
        self.state = Some(state.into());
        self.zip = Some(zip.into());
        self.country = Some(country.into());
        self
    }
}

/// Parameters shared by viewed-content, add-to-cart and add-to-wishlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEvent {
    pub content_type: String,
    pub content_data: String,
    pub content_id: String,
    pub currency: String,
    pub price: f64,
}

/// Completed purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub amount: f64,
    pub currency: String,
    pub parameters: Parameters,
}

/// Search performed inside the app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEvent {
    pub content_type: String,
    pub content_data: String,
    pub content_id: String,
    pub search_string: String,
    pub success: bool,
}

/// Checkout started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutEvent {
    pub content_type: String,
    pub content_data: String,
    pub content_id: String,
    pub num_items: u32,
    pub payment_info_available: bool,
    pub currency: String,
    pub total_price: f64,
}

/// Registration completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEvent {
    pub registration_method: String,
}

/// Generic named event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    pub event_name: String,
    pub value_to_sum: Option<f64>,
    pub parameters: Option<Parameters>,
}

impl CustomEvent {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            value_to_sum: None,
            parameters: None,
        }
    }

    pub fn value_to_sum(mut self, value: f64) -> Self {
        self.value_to_sum = Some(value);
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Consent flag toggled by `setAdvertiserTracking`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertiserTracking {
    pub is_enabled: bool,
}

/// Persistent user identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId {
    pub id: String,
}
