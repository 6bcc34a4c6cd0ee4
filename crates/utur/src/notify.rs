use std::time::Duration;

use isahc::prelude::*;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// `Telegram` Bot API limits messages to 4096 characters.
const MAX_MESSAGE_LEN: usize = 4096;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(serde::Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

#[derive(serde::Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// One-way `Telegram` notifications to the trip's group chat.
pub struct Notifier {
    http: isahc::HttpClient,
    base_url: String,
    chat_id: String,
}

impl Notifier {
    #[must_use]
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: isahc::HttpClient::new().expect("create HTTP client"),
            base_url: format!("{TELEGRAM_API}/bot{bot_token}"),
            chat_id: chat_id.to_owned(),
        }
    }

    /// Build a notifier from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_GROUP_ID`.
    ///
    /// Returns `None` when either is unset; notifications are optional.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_GROUP_ID").ok()?;
        Some(Self::new(&token, &chat_id))
    }

    /// Send one HTML-formatted message to the group chat.
    pub async fn send(&self, text: &str) -> Result<(), String> {
        let url = format!("{}/sendMessage", self.base_url);
        let truncated = truncate(text);
        let body = SendMessageBody {
            chat_id: &self.chat_id,
            text: &truncated,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_vec(&body).map_err(|e| e.to_string())?;

        let request = isahc::Request::post(&url)
            .timeout(HTTP_TIMEOUT)
            .header("Content-Type", "application/json")
            .body(json)
            .map_err(|e: isahc::http::Error| e.to_string())?;

        let mut response = self
            .http
            .send_async(request)
            .await
            .map_err(|e| e.to_string())?;
        let resp_text = response.text().await.map_err(|e| e.to_string())?;
        let parsed: ApiResponse =
            serde_json::from_str(&resp_text).map_err(|e| e.to_string())?;

        if parsed.ok {
            Ok(())
        } else {
            Err(parsed.description.unwrap_or_else(|| "unknown error".into()))
        }
    }
}

/// Escape `&`, `<`, and `>` for safe inclusion in `Telegram` HTML.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Truncate to the API limit, keeping the cut on a char boundary.
fn truncate(text: &str) -> String {
    if text.len() <= MAX_MESSAGE_LEN {
        return text.to_owned();
    }
    let mut end = MAX_MESSAGE_LEN - 3;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Summary message for a finished resolution batch.
#[must_use]
pub fn resolved_summary(names: &[String]) -> String {
    let unit = if names.len() == 1 { "sted" } else { "steder" };
    let lines: Vec<String> = names
        .iter()
        .map(|name| format!("\u{2022} {}", escape_html(name)))
        .collect();
    format!(
        "<b>Fant koordinater for {} {unit}:</b>\n{}",
        names.len(),
        lines.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_specials() {
        assert_eq!(escape_html("Fish & Chips <Oslo>"), "Fish &amp; Chips &lt;Oslo&gt;");
    }

    #[test]
    fn short_text_untouched() {
        assert_eq!(truncate("hei"), "hei");
    }

    #[test]
    fn long_text_truncated_with_ellipsis() {
        let long = "a".repeat(MAX_MESSAGE_LEN + 10);
        let out = truncate(&long);
        assert_eq!(out.len(), MAX_MESSAGE_LEN);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "ø".repeat(MAX_MESSAGE_LEN);
        let out = truncate(&long);
        assert!(out.len() <= MAX_MESSAGE_LEN);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn summary_lists_escaped_names() {
        let names = vec!["Paris".to_owned(), "Fish & Chips".to_owned()];
        let text = resolved_summary(&names);
        assert!(text.starts_with("<b>Fant koordinater for 2 steder:</b>"));
        assert!(text.contains("\u{2022} Paris"));
        assert!(text.contains("Fish &amp; Chips"));
    }

    #[test]
    fn summary_singular() {
        let text = resolved_summary(&["Paris".to_owned()]);
        assert!(text.contains("1 sted:"));
    }
}
