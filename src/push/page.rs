//! The page for turning push notifications on and off.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base,
    },
    navigation::NavBar,
    push::DEFAULT_TEST_MESSAGE,
};

/// The state needed to render the notifications page.
#[derive(Debug, Clone)]
pub struct NotificationsPageState {
    /// The VAPID public key the browser needs to create a push subscription.
    pub vapid_public_key: String,
}

impl FromRef<AppState> for NotificationsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            vapid_public_key: state.vapid_public_key.clone(),
        }
    }
}

fn notifications_view(vapid_public_key: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::NOTIFICATIONS_VIEW).into_html();

    html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section
                id="push-settings"
                class={ (CARD_STYLE) " max-w-md space-y-4" }
                data-vapid-public-key=(vapid_public_key)
                data-subscribe-url=(endpoints::PUSH_SUBSCRIBE)
                data-unsubscribe-url=(endpoints::PUSH_UNSUBSCRIBE)
            {
                h1 class="text-xl font-bold" { "Push Notifications" }

                p id="push-status" class="text-sm text-gray-600 dark:text-gray-400"
                {
                    "Get an alert each time you log an expense, and a summary of your week on request."
                }

                div class="flex gap-2"
                {
                    button id="push-subscribe" type="button" class=(BUTTON_PRIMARY_STYLE)
                    {
                        "Enable notifications"
                    }

                    button id="push-unsubscribe" type="button" class=(BUTTON_SECONDARY_STYLE)
                    {
                        "Disable"
                    }
                }

                form
                    id="push-test-form"
                    action=(endpoints::PUSH_TEST)
                    method="post"
                    class="space-y-2"
                {
                    label for="message" class=(FORM_LABEL_STYLE) { "Test message" }
                    input
                        type="text"
                        name="message"
                        id="message"
                        placeholder=(DEFAULT_TEST_MESSAGE)
                        class=(FORM_TEXT_INPUT_STYLE);

                    button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Send test notification" }
                }

                button
                    id="push-weekly-summary"
                    type="button"
                    data-url=(endpoints::PUSH_WEEKLY_SUMMARY)
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Send weekly summary"
                }
            }
        }
    }
}

/// Display the push notification settings.
pub async fn get_notifications_page(State(state): State<NotificationsPageState>) -> Response {
    base(
        "Notifications",
        &[],
        &notifications_view(&state.vapid_public_key),
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
    };

    use super::{NotificationsPageState, get_notifications_page};

    #[tokio::test]
    async fn page_exposes_vapid_key() {
        let state = NotificationsPageState {
            vapid_public_key: "BPublicKey".to_owned(),
        };

        let response = get_notifications_page(State(state)).await;

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let selector = Selector::parse("#push-settings").unwrap();
        let settings = html.select(&selector).next().expect("missing push settings");
        assert_eq!(settings.value().attr("data-vapid-public-key"), Some("BPublicKey"));
        assert_eq!(
            settings.value().attr("data-subscribe-url"),
            Some(endpoints::PUSH_SUBSCRIBE)
        );
    }

    #[tokio::test]
    async fn page_has_test_form() {
        let state = NotificationsPageState {
            vapid_public_key: "BPublicKey".to_owned(),
        };

        let response = get_notifications_page(State(state)).await;

        let html = parse_html_document(response).await;
        let selector = Selector::parse("form#push-test-form input[name=message]").unwrap();
        assert_eq!(html.select(&selector).count(), 1);
    }
}
