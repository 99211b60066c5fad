//! App-events bridge handle
//!
//! This crate exposes the native analytics SDK's event logging, user identity
//! and deep-link features as typed async methods on [`AppEvents`].
//!
//! Every method builds the argument bag of its operation, invokes the method
//! channel and waits for the single reply. Failures are returned unchanged:
//! the handle never retries and never substitutes a value, so an `Err` is
//! always distinguishable from an `Ok(false)` or `Ok(None)` reply.
//!
//! ```no_run
//! # async fn demo() -> app_events::Result<()> {
//! use app_events::AppEvents;
//!
//! let events = AppEvents::instance();
//! events.initialize_sdk().await?;
//! events.set_user_id("user-42").await?;
//!
//! let mut links = events.deep_link_feed().await?.listen();
//! while let Some(link) = links.recv().await {
//!     println!("opened via {}", link?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod deep_link;

pub use app_events_core::{
    BridgeError, CheckoutEvent, ContentEvent, CustomEvent, Parameters, Result, SearchEvent,
    UserData,
};
pub use binding::{attach, is_attached};
pub use deep_link::{DeepLinkFeed, DeepLinkListener};

use app_events_bridge::{BinaryMessenger, EventChannel, MethodChannel};
use app_events_core::{
    AdvertiserTracking, MethodCall, PurchaseEvent, RegistrationEvent, UserId, expect_bool,
    expect_optional_string,
};
use binding::AttachedMessenger;
use deep_link::FEED_CAPACITY;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;

/// Name of the request/response channel agreed with the native endpoint
pub const METHOD_CHANNEL: &str = "app_events_bridge/methodChannel";

/// Name of the deep-link subscription channel agreed with the native endpoint
pub const EVENT_CHANNEL: &str = "app_events_bridge/eventChannel";

static INSTANCE: OnceLock<AppEvents> = OnceLock::new();

/// Typed handle on the native analytics SDK
pub struct AppEvents {
    channel: MethodChannel,
    event_channel: EventChannel,
    /// Created on first access, then reused for the lifetime of the handle
    deep_links: OnceCell<DeepLinkFeed>,
}

impl AppEvents {
    /// The process-wide handle, bound to the endpoint passed to [`attach`]
    pub fn instance() -> &'static AppEvents {
        INSTANCE.get_or_init(|| Self::with_messenger(Arc::new(AttachedMessenger)))
    }

    /// A standalone handle over an explicit messenger
    pub fn with_messenger(messenger: Arc<dyn BinaryMessenger>) -> Self {
        Self {
            channel: MethodChannel::new(METHOD_CHANNEL, messenger.clone()),
            event_channel: EventChannel::new(EVENT_CHANNEL, messenger),
            deep_links: OnceCell::new(),
        }
    }

    async fn invoke(&self, call: MethodCall) -> Result<Value> {
        self.channel.invoke_method(call).await
    }

    async fn invoke_bool(&self, call: MethodCall) -> Result<bool> {
        let method = call.method.clone();
        let reply = self.invoke(call).await?;
        expect_bool(&method, reply)
    }

    async fn invoke_string(&self, call: MethodCall) -> Result<Option<String>> {
        let method = call.method.clone();
        let reply = self.invoke(call).await?;
        expect_optional_string(&method, reply)
    }

    async fn invoke_void(&self, call: MethodCall) -> Result<()> {
        self.invoke(call).await.map(|_| ())
    }

    /// Version string of the native runtime
    pub async fn platform_version(&self) -> Result<Option<String>> {
        self.invoke_string(MethodCall::new("getPlatformVersion"))
            .await
    }

    /// Most recently recorded deep-link URL.
    ///
    /// A point-in-time query; use [`AppEvents::deep_link_feed`] to follow links
    /// as they arrive.
    pub async fn get_deep_link_url(&self) -> Result<Option<String>> {
        self.invoke_string(MethodCall::new("getDeepLinkUrl")).await
    }

    /// Initialize the native SDK. `true` means the request was dispatched.
    pub async fn initialize_sdk(&self) -> Result<bool> {
        self.invoke_bool(MethodCall::new("initializeSDK")).await
    }

    /// Log an app activation. `true` means the event was recorded.
    pub async fn log_activate_app(&self) -> Result<bool> {
        self.invoke_bool(MethodCall::new("logActivateApp")).await
    }

    /// Associate a persistent user identifier with future events
    pub async fn set_user_id(&self, id: &str) -> Result<()> {
        let call = MethodCall::from_params("setUserID", &UserId { id: id.to_string() })?;
        self.invoke_void(call).await
    }

    /// Attach user data to future events.
    ///
    /// All ten keys are always sent. Unset fields go out as `null`, which the
    /// native endpoint treats as clearing any previously stored value.
    pub async fn set_user_data(&self, data: &UserData) -> Result<()> {
        let call = MethodCall::from_params("setUserData", data)?;
        self.invoke_void(call).await
    }

    /// Forget the user identifier set with [`AppEvents::set_user_id`]
    pub async fn clear_user_id(&self) -> Result<()> {
        self.invoke_void(MethodCall::new("clearUserID")).await
    }

    /// Forget all user data set with [`AppEvents::set_user_data`]
    pub async fn clear_user_data(&self) -> Result<()> {
        self.invoke_void(MethodCall::new("clearUserData")).await
    }

    /// Ask the native SDK to flush its buffered events.
    ///
    /// Returns once the native side acknowledged the request, not when the
    /// events reached the network.
    pub async fn flush(&self) -> Result<()> {
        self.invoke_void(MethodCall::new("flush")).await
    }

    /// Log that the user viewed a piece of content
    pub async fn log_viewed_content(&self, event: &ContentEvent) -> Result<bool> {
        self.invoke_bool(MethodCall::from_params("logViewedContent", event)?)
            .await
    }

    /// Log an item added to the shopping cart
    pub async fn log_add_to_cart(&self, event: &ContentEvent) -> Result<bool> {
        self.invoke_bool(MethodCall::from_params("logAddToCart", event)?)
            .await
    }

    /// Log an item added to the wishlist
    pub async fn log_add_to_wishlist(&self, event: &ContentEvent) -> Result<bool> {
        self.invoke_bool(MethodCall::from_params("logAddToWishlist", event)?)
            .await
    }

    /// Log a completed registration, e.g. `"email"` or `"google"`
    pub async fn log_complete_registration(&self, registration_method: &str) -> Result<bool> {
        let event = RegistrationEvent {
            registration_method: registration_method.to_string(),
        };
        self.invoke_bool(MethodCall::from_params("logCompleteRegistration", &event)?)
            .await
    }

    /// Log a purchase of `amount` in `currency` with extra SDK parameters
    pub async fn log_purchase(
        &self,
        amount: f64,
        currency: &str,
        parameters: Parameters,
    ) -> Result<bool> {
        let event = PurchaseEvent {
            amount,
            currency: currency.to_string(),
            parameters,
        };
        self.invoke_bool(MethodCall::from_params("logPurchase", &event)?)
            .await
    }

    /// Log a search and whether it found anything
    pub async fn log_search(&self, event: &SearchEvent) -> Result<bool> {
        self.invoke_bool(MethodCall::from_params("logSearch", event)?)
            .await
    }

    /// Log the start of a checkout
    pub async fn log_initiate_checkout(&self, event: &CheckoutEvent) -> Result<bool> {
        self.invoke_bool(MethodCall::from_params("logInitiateCheckout", event)?)
            .await
    }

    /// Log a custom named event
    pub async fn log_event(&self, event: &CustomEvent) -> Result<bool> {
        self.invoke_bool(MethodCall::from_params("logEvent", event)?)
            .await
    }

    /// Toggle the advertiser tracking consent flag.
    ///
    /// Only iOS acts on this flag. Other platforms answer with a no-op reply,
    /// which reads as `false`.
    pub async fn set_advertiser_tracking(&self, is_enabled: bool) -> Result<bool> {
        let call =
            MethodCall::from_params("setAdvertiserTracking", &AdvertiserTracking { is_enabled })?;
        self.invoke_bool(call).await
    }

    /// The shared deep-link feed.
    ///
    /// The first call opens the single native subscription; every later call
    /// returns the same feed. Concurrent first calls wait for one another, so
    /// a second subscription is never opened. If opening fails nothing is
    /// cached and the next call tries again.
    pub async fn deep_link_feed(&self) -> Result<&DeepLinkFeed> {
        self.deep_links
            .get_or_try_init(|| async {
                let upstream = self.event_channel.receive_stream().await?;
                Ok::<_, BridgeError>(DeepLinkFeed::spawn(upstream, FEED_CAPACITY))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_events_bridge::{MemoryMessenger, RecordedCall};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn handle(reply: Value) -> (AppEvents, Arc<MemoryMessenger>) {
        let messenger = Arc::new(MemoryMessenger::replying(reply));
        (AppEvents::with_messenger(messenger.clone()), messenger)
    }

    async fn last(messenger: &MemoryMessenger) -> MethodCall {
        let RecordedCall { channel, call } = messenger.last_call().await.unwrap();
        assert_eq!(channel, METHOD_CHANNEL);
        call
    }

    fn content() -> ContentEvent {
        ContentEvent {
            content_type: "product".into(),
            content_data: "d1".into(),
            content_id: "123".into(),
            currency: "USD".into(),
            price: 9.99,
        }
    }

    #[tokio::test]
    async fn test_log_viewed_content_scenario() {
        let (events, messenger) = handle(json!(true));

        assert!(events.log_viewed_content(&content()).await.unwrap());
        assert_eq!(
            last(&messenger).await,
            MethodCall {
                method: "logViewedContent".into(),
                arguments: json!({
                    "contentType": "product",
                    "contentData": "d1",
                    "contentId": "123",
                    "currency": "USD",
                    "price": 9.99
                }),
            }
        );
    }

    #[tokio::test]
    async fn test_user_id_scenario() {
        let (events, messenger) = handle(Value::Null);

        assert_ok!(events.set_user_id("user-42").await);
        assert_eq!(
            last(&messenger).await,
            MethodCall {
                method: "setUserID".into(),
                arguments: json!({"id": "user-42"}),
            }
        );

        assert_ok!(events.clear_user_id().await);
        assert_eq!(last(&messenger).await, MethodCall::new("clearUserID"));
    }

    #[tokio::test]
    async fn test_user_data_subset_sends_nulls() {
        let (events, messenger) = handle(Value::Null);
        let data = UserData::default()
            .email("jane@example.com")
            .address("Lisbon", "LX", "1000", "PT");

        assert_ok!(events.set_user_data(&data).await);
        let call = last(&messenger).await;
        assert_eq!(call.method, "setUserData");
        assert_eq!(
            call.arguments,
            json!({
                "email": "jane@example.com",
                "firstName": null,
                "lastName": null,
                "phone": null,
                "dateOfBirth": null,
                "gender": null,
                "city": "Lisbon",
                "state": "LX",
                "zip": "1000",
                "country": "PT"
            })
        );
    }

    #[tokio::test]
    async fn test_every_operation_uses_its_fixed_name_and_bag() {
        let (events, messenger) = handle(json!(true));
        let mut params = Parameters::new();
        params.insert("fb_order_id".into(), json!("o-1"));

        assert_ok!(events.initialize_sdk().await);
        assert_ok!(events.log_activate_app().await);
        assert_ok!(events.clear_user_data().await);
        assert_ok!(events.flush().await);
        assert_ok!(events.log_add_to_cart(&content()).await);
        assert_ok!(events.log_add_to_wishlist(&content()).await);
        assert_ok!(events.log_complete_registration("email").await);
        assert_ok!(events.log_purchase(19.5, "EUR", params.clone()).await);
        assert_ok!(
            events
                .log_search(&SearchEvent {
                    content_type: "product".into(),
                    content_data: "d".into(),
                    content_id: "9".into(),
                    search_string: "shoes".into(),
                    success: true,
                })
                .await
        );
        assert_ok!(
            events
                .log_initiate_checkout(&CheckoutEvent {
                    content_type: "product".into(),
                    content_data: "d".into(),
                    content_id: "9".into(),
                    num_items: 3,
                    payment_info_available: false,
                    currency: "EUR".into(),
                    total_price: 30.0,
                })
                .await
        );
        assert_ok!(events.log_event(&CustomEvent::new("level_up").value_to_sum(2.0)).await);
        assert_ok!(events.set_advertiser_tracking(true).await);

        let calls: Vec<MethodCall> = messenger
            .calls()
            .await
            .into_iter()
            .map(|recorded| recorded.call)
            .collect();
        let content_bag = json!({
            "contentType": "product",
            "contentData": "d1",
            "contentId": "123",
            "currency": "USD",
            "price": 9.99
        });
        let expected = vec![
            MethodCall::new("initializeSDK"),
            MethodCall::new("logActivateApp"),
            MethodCall::new("clearUserData"),
            MethodCall::new("flush"),
            MethodCall {
                method: "logAddToCart".into(),
                arguments: content_bag.clone(),
            },
            MethodCall {
                method: "logAddToWishlist".into(),
                arguments: content_bag,
            },
            MethodCall {
                method: "logCompleteRegistration".into(),
                arguments: json!({"registrationMethod": "email"}),
            },
            MethodCall {
                method: "logPurchase".into(),
                arguments: json!({
                    "amount": 19.5,
                    "currency": "EUR",
                    "parameters": {"fb_order_id": "o-1"}
                }),
            },
            MethodCall {
                method: "logSearch".into(),
                arguments: json!({
                    "contentType": "product",
                    "contentData": "d",
                    "contentId": "9",
                    "searchString": "shoes",
                    "success": true
                }),
            },
            MethodCall {
                method: "logInitiateCheckout".into(),
                arguments: json!({
                    "contentType": "product",
                    "contentData": "d",
                    "contentId": "9",
                    "numItems": 3,
                    "paymentInfoAvailable": false,
                    "currency": "EUR",
                    "totalPrice": 30.0
                }),
            },
            MethodCall {
                method: "logEvent".into(),
                arguments: json!({
                    "eventName": "level_up",
                    "valueToSum": 2.0,
                    "parameters": null
                }),
            },
            MethodCall {
                method: "setAdvertiserTracking".into(),
                arguments: json!({"isEnabled": true}),
            },
        ];
        assert_eq!(calls, expected);
    }

    #[tokio::test]
    async fn test_string_accessors() {
        let (events, messenger) = handle(json!("myapp://promo/7"));
        assert_eq!(
            events.get_deep_link_url().await.unwrap(),
            Some("myapp://promo/7".to_string())
        );
        assert_eq!(last(&messenger).await, MethodCall::new("getDeepLinkUrl"));

        let (events, messenger) = handle(Value::Null);
        assert_eq!(events.platform_version().await.unwrap(), None);
        assert_eq!(last(&messenger).await, MethodCall::new("getPlatformVersion"));
    }

    #[tokio::test]
    async fn test_native_failure_is_not_false() {
        let messenger = Arc::new(MemoryMessenger::failing("SDK_ERROR", "not initialized"));
        let events = AppEvents::with_messenger(messenger);

        let err = assert_err!(events.log_activate_app().await);
        assert_eq!(err, BridgeError::native("SDK_ERROR", "not initialized"));
        assert_err!(events.flush().await);
        assert_err!(events.get_deep_link_url().await);
    }

    #[tokio::test]
    async fn test_no_op_reply_reads_false() {
        let (events, _) = handle(Value::Null);
        assert!(!events.set_advertiser_tracking(false).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_reply_type_is_mismatch() {
        let (events, _) = handle(json!({"ok": true}));
        assert!(matches!(
            events.initialize_sdk().await,
            Err(BridgeError::TypeMismatch(_))
        ));
        assert!(matches!(
            events.platform_version().await,
            Err(BridgeError::TypeMismatch(_))
        ));
        // Void operations ignore the reply value
        assert_ok!(events.flush().await);
    }

    #[tokio::test]
    async fn test_feed_opened_once_and_reused() {
        let (events, messenger) = handle(Value::Null);

        let (a, b, c) = tokio::join!(
            events.deep_link_feed(),
            events.deep_link_feed(),
            events.deep_link_feed()
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(std::ptr::eq(a, b));
        assert!(std::ptr::eq(b, c));
        assert!(std::ptr::eq(a, events.deep_link_feed().await.unwrap()));
        assert_eq!(messenger.subscription_count(EVENT_CHANNEL).await, 1);
    }

    #[tokio::test]
    async fn test_feed_delivers_to_every_listener() {
        let (events, messenger) = handle(Value::Null);
        let feed = events.deep_link_feed().await.unwrap();
        let mut first = feed.listen();
        let mut second = events.deep_link_feed().await.unwrap().listen();

        assert_eq!(messenger.emit(EVENT_CHANNEL, json!("myapp://x")).await, 1);

        assert_eq!(first.recv().await, Some(Ok("myapp://x".to_string())));
        assert_eq!(second.recv().await, Some(Ok("myapp://x".to_string())));
    }
}
