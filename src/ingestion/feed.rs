use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::errors::FeedError;
use crate::models::Trade;

/// One page of normalized trades.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub trades: Vec<Trade>,
    /// Raw records the provider returned, before any were dropped.
    pub received: usize,
    /// Records dropped because they could not be normalized.
    pub malformed: usize,
    /// Offset of the next page; `None` when the provider is exhausted.
    pub next_cursor: Option<u32>,
}

/// Source of recent large trades.
#[async_trait]
pub trait TradeFeed: Send + Sync {
    /// Fetch one page of trades at or above `min_amount` USD, newest first.
    async fn fetch_page(
        &self,
        min_amount: Decimal,
        cursor: Option<u32>,
    ) -> Result<FeedPage, FeedError>;
}

/// Bulk pull: page backward in time until the provider runs dry, a page's
/// oldest trade is older than `cutoff`, or `max_pages` pages were read.
/// Trades older than `cutoff` are not returned.
pub async fn fetch_since(
    feed: &dyn TradeFeed,
    min_amount: Decimal,
    cutoff: DateTime<Utc>,
    max_pages: u32,
) -> Result<FeedPage, FeedError> {
    let mut collected = FeedPage::default();
    let mut cursor: Option<u32> = None;

    for page_no in 0..max_pages {
        let page = feed.fetch_page(min_amount, cursor).await?;
        collected.malformed += page.malformed;
        collected.received += page.received;

        // A page of only dropped records is not the end of the feed
        if page.received == 0 {
            tracing::debug!(page = page_no, "Backfill: empty page, done");
            return Ok(collected);
        }

        let crossed_cutoff = page.trades.iter().any(|t| t.observed_at < cutoff);
        collected
            .trades
            .extend(page.trades.into_iter().filter(|t| t.observed_at >= cutoff));

        if crossed_cutoff {
            tracing::debug!(page = page_no, cutoff = %cutoff, "Backfill: reached cutoff");
            return Ok(collected);
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(collected),
        }
    }

    tracing::warn!(
        max_pages = max_pages,
        collected = collected.trades.len(),
        "Backfill: page cap reached before cutoff"
    );
    collected.next_cursor = cursor;
    Ok(collected)
}
