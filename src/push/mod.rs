//! Browser push notifications: stored subscriptions, notification payloads
//! and delivery through a [PushRelay].

mod handlers;
mod notification;
mod page;
mod relay;
mod subscription;

pub use handlers::{send_test_notification, send_weekly_summary, subscribe_user, unsubscribe_user};
pub use notification::{DEFAULT_TEST_MESSAGE, NotificationData, NotificationType};
pub use page::get_notifications_page;
pub use relay::{PushRelay, WebPushRelay, dispatch_notification};
pub use subscription::{
    PushSubscription, SubscriptionRequest, create_push_subscription_table, delete_subscriptions,
    get_subscription, save_subscription,
};

#[cfg(test)]
pub(crate) use relay::test_relay;
#[cfg(test)]
pub(crate) use subscription::test_support;
