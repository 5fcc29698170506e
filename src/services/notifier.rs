use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use serde_json::json;

use crate::errors::SinkError;
use crate::models::{AlertRecord, Category};
use crate::services::dispatcher::NotificationSink;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram notification service.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(http: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            api_base: TELEGRAM_API_BASE.into(),
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message. Only a 2xx answer counts as delivered.
    pub async fn send(&self, message: &str) -> Result<(), SinkError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Telegram sendMessage returned non-2xx");
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Upload a file with `sendDocument`, captioned in Markdown.
    pub async fn send_document(
        &self,
        filename: &str,
        caption: &str,
        body: Vec<u8>,
    ) -> Result<(), SinkError> {
        let url = format!("{}/bot{}/sendDocument", self.api_base, self.bot_token);

        let document = Part::bytes(body)
            .file_name(filename.to_string())
            .mime_str("text/csv")?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .text("parse_mode", "Markdown")
            .part("document", document);

        let resp = self.http.post(&url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Telegram sendDocument returned non-2xx");
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for Notifier {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        self.send(message).await
    }

    async fn notify_document(
        &self,
        filename: &str,
        caption: &str,
        body: Vec<u8>,
    ) -> Result<(), SinkError> {
        self.send_document(filename, caption, body).await
    }
}

/// Escape characters that legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn short_address(address: &str) -> String {
    if address.len() > 10 && address.is_ascii() {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// Format a fresh-wallet alert.
pub fn format_alert(alert: &AlertRecord) -> String {
    let age = match alert.account_age_days {
        Some(days) => format!("{days}d"),
        None => "unknown".into(),
    };
    let name = if alert.display_name.eq_ignore_ascii_case(&alert.trader_id) {
        String::new()
    } else {
        format!(" ({})", escape_markdown(&alert.display_name))
    };

    format!(
        "*Fresh Wallet Alert*\nTrader: `{}`{}\nBet: ${} on {}\nMarket: {}\nCategory: {}\nAccount age: {} | Activity: {}\nhttps://polymarket.com/profile/{}",
        short_address(&alert.trader_id),
        name,
        alert.usd_amount.round_dp(2),
        escape_markdown(&alert.outcome_label),
        escape_markdown(&alert.market_title),
        alert.category.label(),
        age,
        alert.activity_count,
        alert.trader_id,
    )
}

/// Format a roll-up of alert counts per category; used as the report caption.
pub fn format_rollup(
    counts: &BTreeMap<Category, u64>,
    since: DateTime<Utc>,
    threshold: Option<Decimal>,
) -> String {
    let total: u64 = counts.values().sum();
    let mut lines = vec![
        "*Fresh Wallet Summary*".to_string(),
        format!("Since: {}", since.format("%Y-%m-%d %H:%M UTC")),
    ];
    if let Some(min) = threshold {
        lines.push(format!("Threshold: > ${}", min.normalize()));
    }
    lines.push(format!("Total alerts: {total}"));
    for category in Category::ALL {
        if let Some(n) = counts.get(&category).filter(|n| **n > 0) {
            lines.push(format!("{}: {}", category.label(), n));
        }
    }
    lines.join("\n")
}
