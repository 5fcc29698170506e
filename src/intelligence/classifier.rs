use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use crate::models::Category;

/// Built-in keywords, matched as lowercase substrings of the market title.
const DEFAULT_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Politics,
        &[
            "trump", "biden", "harris", "jd vance", "newsom", "election", "president",
            "presidential", "nomination", "nominee", "senate", "congress", "governor",
            "democrat", "republican", "gop", "parliament", "prime minister", "impeach",
            "cabinet", "white house", "supreme court", "mayor", "referendum", "tariff",
        ],
    ),
    (
        Category::Crypto,
        &[
            "bitcoin", "btc", "ethereum", "eth ", "solana", "crypto", "xrp", "dogecoin",
            "stablecoin", "memecoin", "binance", "coinbase", "microstrategy", "blockchain",
            "defi", "airdrop", "token",
        ],
    ),
    (
        Category::Sports,
        &[
            "nba", "nfl", "nhl", "mlb", "ufc", "fifa", "world cup", "super bowl",
            "champions league", "premier league", "la liga", "olympic", "grand slam",
            "wimbledon", "formula 1", "f1 ", "playoffs", "finals", "championship",
            " vs. ", " vs ",
        ],
    ),
    (
        Category::TraditionalFinance,
        &[
            "fed ", "federal reserve", "interest rate", "rate cut", "rate hike", "inflation",
            "cpi", "gdp", "recession", "s&p", "nasdaq", "dow jones", "stock", "ipo",
            "earnings", "treasury", "yield", "sec ", "oil price", "gold price",
        ],
    ),
];

/// Keyword table keyed by category. Iteration follows `Category::PRIORITY`.
#[derive(Debug, Clone)]
pub struct MarketClassifier {
    keywords: BTreeMap<Category, Vec<String>>,
}

impl Default for MarketClassifier {
    fn default() -> Self {
        let keywords = DEFAULT_KEYWORDS
            .iter()
            .map(|(cat, words)| (*cat, words.iter().map(|w| w.to_string()).collect()))
            .collect();
        Self { keywords }
    }
}

impl MarketClassifier {
    pub fn new(keywords: BTreeMap<Category, Vec<String>>) -> Self {
        let keywords = keywords
            .into_iter()
            .map(|(cat, words)| {
                let words = words
                    .into_iter()
                    .map(|w| w.to_lowercase())
                    .filter(|w| !w.trim().is_empty())
                    .collect();
                (cat, words)
            })
            .collect();
        Self { keywords }
    }

    /// Parse a TOML table such as `politics = ["trump", "senate"]`.
    /// The file replaces the built-in table entirely.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let parsed: BTreeMap<String, Vec<String>> =
            toml::from_str(raw).context("invalid keyword table")?;

        let mut keywords = BTreeMap::new();
        for (name, words) in parsed {
            let category = Category::from_config_str(&name)
                .ok_or_else(|| anyhow::anyhow!("unknown category in keyword table: {name}"))?;
            if !Category::PRIORITY.contains(&category) {
                anyhow::bail!("category {name} is the fallback and takes no keywords");
            }
            keywords.insert(category, words);
        }
        Ok(Self::new(keywords))
    }

    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// First category in priority order with any keyword contained in the
    /// title wins. Titles are padded with spaces so trailing-space keywords
    /// like `"eth "` still match at the end of a title.
    pub fn classify(&self, market_title: &str) -> Category {
        let title = market_title.trim();
        if title.is_empty() {
            return Category::Other;
        }
        let haystack = format!(" {} ", title.to_lowercase());

        Category::PRIORITY
            .iter()
            .find(|cat| {
                self.keywords
                    .get(*cat)
                    .is_some_and(|words| words.iter().any(|w| haystack.contains(w.as_str())))
            })
            .copied()
            .unwrap_or(Category::Other)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_politics() {
        let c = MarketClassifier::default();
        assert_eq!(c.classify("Trump 2028 nomination odds"), Category::Politics);
        assert_eq!(c.classify("Who will win the NYC mayor race?"), Category::Politics);
    }

    #[test]
    fn test_crypto_beats_traditional_finance() {
        let c = MarketClassifier::default();
        // Contains "sec " (TradFi) and "bitcoin" (Crypto); Crypto has priority
        assert_eq!(c.classify("Bitcoin ETF approval by SEC"), Category::Crypto);
    }

    #[test]
    fn test_classify_sports_and_finance() {
        let c = MarketClassifier::default();
        assert_eq!(c.classify("Lakers vs. Celtics"), Category::Sports);
        assert_eq!(c.classify("Will the Fed cut rates in March?"), Category::TraditionalFinance);
        assert_eq!(c.classify("Will ETH hit $10k?"), Category::Crypto);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let c = MarketClassifier::default();
        assert_eq!(c.classify("BITCOIN above 100k"), Category::Crypto);
    }

    #[test]
    fn test_empty_and_unmatched_titles() {
        let c = MarketClassifier::default();
        assert_eq!(c.classify(""), Category::Other);
        assert_eq!(c.classify("   "), Category::Other);
        assert_eq!(c.classify("Will it snow in Paris on Christmas?"), Category::Other);
    }

    #[test]
    fn test_custom_table_from_toml() {
        let c = MarketClassifier::from_toml_str(
            r#"
            crypto = ["Bitcoin"]
            traditional_finance = ["sec"]
            "#,
        )
        .unwrap();
        assert_eq!(c.classify("Bitcoin ETF approval by SEC"), Category::Crypto);
        assert_eq!(c.classify("SEC chair resigns"), Category::TraditionalFinance);
        // Built-in table is replaced, not merged
        assert_eq!(c.classify("Trump wins"), Category::Other);
    }

    #[test]
    fn test_toml_rejects_unknown_category() {
        assert!(MarketClassifier::from_toml_str(r#"weather = ["rain"]"#).is_err());
    }

    #[test]
    fn test_toml_rejects_keywords_for_fallback_category() {
        assert!(MarketClassifier::from_toml_str(r#"other = ["misc"]"#).is_err());
    }
}
