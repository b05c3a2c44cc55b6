//! Web scraping for article body text.
//!
//! News sources return headlines and snippets only. The [`article`] scraper
//! follows each link and extracts the page's main text so the script writer
//! has more than a one-line summary to work from.
//!
//! Scraping is best effort: a page that cannot be fetched or parsed simply
//! contributes no text.

pub mod article;
