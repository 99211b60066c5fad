//! # app-events-core
//!
//! Core types shared by the app-events bridge crates:
//! - Error taxonomy
//! - Argument bags, method calls and reply coercion
//! - Typed parameter records for identity and standard events

pub mod args;
pub mod error;
pub mod params;

pub use args::{Arguments, MethodCall, Parameters, expect_bool, expect_optional_string};
pub use error::{BridgeError, Result};
pub use params::{
    AdvertiserTracking, CheckoutEvent, ContentEvent, CustomEvent, PurchaseEvent,
    RegistrationEvent, SearchEvent, UserData, UserId,
};
