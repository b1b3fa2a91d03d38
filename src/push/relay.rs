//! Delivery of push messages to the browser's push service.

use web_push::{
    ContentEncoding, HyperWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

use crate::{
    Error,
    push::{NotificationData, PushSubscription},
};

/// Sends an encrypted payload to a single push subscription.
#[async_trait::async_trait]
pub trait PushRelay: Send + Sync {
    /// Deliver `payload`, a JSON string, to `subscription`.
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> Result<(), Error>;
}

/// A [PushRelay] that signs messages with a VAPID key and posts them over HTTP.
pub struct WebPushRelay {
    client: HyperWebPushClient,
    vapid_private_key_pem: Vec<u8>,
    contact_email: String,
}

impl WebPushRelay {
    /// Create a relay from the PEM encoded VAPID private key and the contact
    /// address push services can use to reach the operator.
    pub fn new(vapid_private_key_pem: Vec<u8>, contact_email: &str) -> Self {
        Self {
            client: HyperWebPushClient::new(),
            vapid_private_key_pem,
            contact_email: contact_email.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl PushRelay for WebPushRelay {
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> Result<(), Error> {
        let subscription_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.p256dh,
            &subscription.auth,
        );

        let mut signature_builder = VapidSignatureBuilder::from_pem(
            self.vapid_private_key_pem.as_slice(),
            &subscription_info,
        )
        .map_err(|error| Error::PushDelivery(format!("invalid VAPID key: {error}")))?;
        signature_builder.add_claim("sub", format!("mailto:{}", self.contact_email));
        let signature = signature_builder
            .build()
            .map_err(|error| Error::PushDelivery(format!("could not sign message: {error}")))?;

        let mut message_builder = WebPushMessageBuilder::new(&subscription_info);
        message_builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        message_builder.set_vapid_signature(signature);
        let message = message_builder
            .build()
            .map_err(|error| Error::PushDelivery(format!("could not build message: {error}")))?;

        self.client
            .send(message)
            .await
            .map_err(|error| Error::PushDelivery(error.to_string()))
    }
}

/// Send `data` to the user's subscription, as read by [crate::push::get_subscription].
///
/// The subscription is looked up by the caller so that the database lock is
/// released before the message is sent.
///
/// # Errors
/// Returns:
/// - [Error::MissingPushSubscription] if the user has not subscribed,
/// - [Error::InvalidPushSubscription] if the subscription is missing its endpoint or keys,
/// - [Error::PushDelivery] if the relay could not deliver the message.
pub async fn dispatch_notification(
    relay: &dyn PushRelay,
    subscription: Option<PushSubscription>,
    data: NotificationData,
) -> Result<(), Error> {
    let subscription = subscription.ok_or(Error::MissingPushSubscription)?;

    if !subscription.is_complete() {
        return Err(Error::InvalidPushSubscription(format!(
            "subscription {} is missing its endpoint or keys",
            subscription.id
        )));
    }

    let kind = data.kind;
    let payload = serde_json::to_string(&data.into_payload())
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    relay.send(&subscription, &payload).await?;
    tracing::info!(
        "Sent {} notification to user {}",
        kind.as_str(),
        subscription.user_id
    );

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_relay {
    use std::sync::Mutex;

    use crate::{
        Error,
        push::{PushRelay, PushSubscription},
    };

    /// Records every payload instead of sending it, optionally failing.
    #[derive(Default)]
    pub(crate) struct StubRelay {
        pub(crate) sent: Mutex<Vec<(String, String)>>,
        pub(crate) fail: bool,
    }

    impl StubRelay {
        pub(crate) fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub(crate) fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PushRelay for StubRelay {
        async fn send(&self, subscription: &PushSubscription, payload: &str) -> Result<(), Error> {
            if self.fail {
                return Err(Error::PushDelivery("push service unavailable".to_owned()));
            }

            self.sent
                .lock()
                .unwrap()
                .push((subscription.endpoint.clone(), payload.to_owned()));

            Ok(())
        }
    }
}
