//! The web app manifest that lets browsers install the app.

use axum::{
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::internal_server_error::InternalServerError;

const ICON_SIZES: [u16; 8] = [72, 96, 128, 144, 152, 192, 384, 512];

#[derive(Debug, Serialize)]
struct ManifestIcon {
    src: String,
    sizes: String,
    #[serde(rename = "type")]
    mime_type: &'static str,
    purpose: &'static str,
}

#[derive(Debug, Serialize)]
struct Shortcut {
    name: &'static str,
    short_name: &'static str,
    description: &'static str,
    url: &'static str,
}

#[derive(Debug, Serialize)]
struct WebAppManifest {
    name: &'static str,
    short_name: &'static str,
    description: &'static str,
    start_url: &'static str,
    scope: &'static str,
    display: &'static str,
    display_override: [&'static str; 3],
    orientation: &'static str,
    background_color: &'static str,
    theme_color: &'static str,
    categories: [&'static str; 3],
    lang: &'static str,
    dir: &'static str,
    prefer_related_applications: bool,
    icons: Vec<ManifestIcon>,
    shortcuts: [Shortcut; 3],
}

fn web_app_manifest() -> WebAppManifest {
    let icons = ICON_SIZES
        .iter()
        .map(|size| ManifestIcon {
            src: format!("/static/icons/icon-{size}x{size}.png"),
            sizes: format!("{size}x{size}"),
            mime_type: "image/png",
            purpose: "maskable",
        })
        .collect();

    WebAppManifest {
        name: "Expense Tracker AI - Smart Finance Management",
        short_name: "Expense Tracker",
        description: "Track expenses, manage budgets, and get AI-powered financial insights \
            with our intelligent expense tracker PWA.",
        start_url: "/",
        scope: "/",
        display: "standalone",
        display_override: ["window-controls-overlay", "standalone", "minimal-ui"],
        orientation: "portrait-primary",
        background_color: "#ffffff",
        theme_color: "#3b82f6",
        categories: ["finance", "productivity", "utilities"],
        lang: "en",
        dir: "ltr",
        prefer_related_applications: false,
        icons,
        shortcuts: [
            Shortcut {
                name: "Add New Record",
                short_name: "Add Record",
                description: "Quickly add a new expense record",
                url: "/dashboard#add-record-form",
            },
            Shortcut {
                name: "View Dashboard",
                short_name: "Dashboard",
                description: "View your complete financial dashboard",
                url: "/dashboard",
            },
            Shortcut {
                name: "AI Insights",
                short_name: "Insights",
                description: "Get AI-powered financial insights and recommendations",
                url: "/dashboard#insights",
            },
        ],
    }
}

/// Serve the manifest as JSON.
pub async fn get_manifest() -> Response {
    match serde_json::to_string(&web_app_manifest()) {
        Ok(body) => ([(CONTENT_TYPE, "application/manifest+json")], body).into_response(),
        Err(error) => {
            tracing::error!("Could not serialize the web app manifest: {error}");
            InternalServerError::default().into_response()
        }
    }
}
