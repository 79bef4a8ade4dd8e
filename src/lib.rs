pub mod error;
pub mod model;
pub mod orchestrate;
pub mod parse;
pub mod query;
pub mod session;
pub mod table;

use error::ScrapeError;
use model::ScrapeReport;
use orchestrate::ScrapeOptions;
use query::TripQuery;
use session::ChromeSessionProvider;

/// Scrape every leg of `query` with a fresh headless Chrome session,
/// filling `query.results` and reporting per-leg outcomes.
pub fn scrape(
    query: &mut TripQuery,
    options: &ScrapeOptions,
) -> Result<ScrapeReport, ScrapeError> {
    let provider = ChromeSessionProvider::default();
    orchestrate::scrape_query(query, &provider, options)
}
