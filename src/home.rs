//! The root page: a landing page for guests, a redirect for logged in users.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};

use crate::{
    auth::get_token_from_cookies,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, CARD_STYLE, base},
};

struct Feature {
    icon: &'static str,
    title: &'static str,
    description: &'static str,
}

const FEATURES: [Feature; 3] = [
    Feature {
        icon: "🤖",
        title: "AI Insights",
        description: "Smart analysis of your spending patterns",
    },
    Feature {
        icon: "✨",
        title: "Auto Categories",
        description: "Intelligent expense categorization",
    },
    Feature {
        icon: "📊",
        title: "Smart Dashboard",
        description: "Beautiful, intuitive financial overview",
    },
];

const FAQS: [(&str, &str); 3] = [
    (
        "What is ExpenseTracker AI?",
        "A web app for logging your day-to-day expenses, charting them by day \
        and getting suggestions on where your money goes.",
    ),
    (
        "How does the AI work?",
        "Your recent expenses are sent to a language model which replies with \
        short observations, suggested categories and answers to your questions.",
    ),
    (
        "Is ExpenseTracker AI free?",
        "Yes. Register with an email address and start tracking straight away.",
    ),
];

fn guest_view() -> Markup {
    let content = html! {
        main class="max-w-screen-lg mx-auto px-4 py-12 space-y-12 text-gray-900 dark:text-white"
        {
            section id="hero" class="text-center space-y-4"
            {
                h1 class="text-4xl font-bold" { "Welcome to ExpenseTracker AI" }
                p class="text-lg text-gray-600 dark:text-gray-400"
                {
                    "Track your expenses, manage your budget, and get AI-powered insights"
                }

                div class="flex justify-center gap-4"
                {
                    a href=(endpoints::REGISTER_VIEW) class={ (BUTTON_PRIMARY_STYLE) " max-w-48" }
                    {
                        "Get Started Free"
                    }
                    a
                        href=(endpoints::LOG_IN_VIEW)
                        class="px-4 py-2 rounded border border-blue-500 text-blue-600
                            dark:text-blue-400 hover:bg-blue-50 dark:hover:bg-gray-800"
                    {
                        "Log In"
                    }
                }
            }

            section id="features" class="grid grid-cols-1 md:grid-cols-3 gap-6"
            {
                @for feature in &FEATURES {
                    div class=(CARD_STYLE)
                    {
                        span class="text-3xl" { (feature.icon) }
                        h2 class="text-lg font-semibold mt-2" { (feature.title) }
                        p class="text-sm text-gray-600 dark:text-gray-400" { (feature.description) }
                    }
                }
            }

            section id="faq" class="space-y-4"
            {
                h2 class="text-2xl font-bold text-center" { "Frequently Asked Questions" }

                @for (question, answer) in &FAQS {
                    details class=(CARD_STYLE)
                    {
                        summary class="font-semibold cursor-pointer" { (question) }
                        p class="mt-2 text-sm text-gray-600 dark:text-gray-400" { (answer) }
                    }
                }
            }
        }
    };

    base("ExpenseTracker AI", &[], &content)
}

/// Show the guest landing page, or send logged in users to their dashboard.
pub async fn get_home_page(jar: PrivateCookieJar) -> Response {
    match get_token_from_cookies(&jar) {
        Ok(_) => Redirect::to(endpoints::DASHBOARD_VIEW).into_response(),
        Err(_) => guest_view().into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        extract::State,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use axum_test::TestServer;
    use scraper::{Html, Selector};
    use time::{Duration, UtcOffset};

    use crate::{
        Error,
        auth::{COOKIE_TOKEN, UserID, set_auth_cookie},
        endpoints,
        test_utils::assert_valid_html,
    };

    use super::get_home_page;

    const TEST_LOG_IN_ROUTE: &str = "/test_log_in";

    async fn stub_log_in(
        State(_key): State<Key>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(jar, UserID::new(1), Duration::minutes(5), UtcOffset::UTC)
    }

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::ROOT, get(get_home_page))
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in))
            .with_state(Key::generate());

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn guest_sees_landing_page() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        let headings: Vec<String> = html
            .select(&Selector::parse("#features h2").unwrap())
            .map(|heading| heading.text().collect())
            .collect();
        assert_eq!(headings, ["AI Insights", "Auto Categories", "Smart Dashboard"]);
        let register_link = html
            .select(&Selector::parse("#hero a").unwrap())
            .next()
            .expect("missing call to action");
        assert_eq!(register_link.attr("href"), Some(endpoints::REGISTER_VIEW));
    }

    #[tokio::test]
    async fn logged_in_user_is_redirected_to_dashboard() {
        let server = get_test_server();
        let token_cookie = server.post(TEST_LOG_IN_ROUTE).await.cookie(COOKIE_TOKEN);

        let response = server.get(endpoints::ROOT).add_cookie(token_cookie).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::DASHBOARD_VIEW);
    }
}
