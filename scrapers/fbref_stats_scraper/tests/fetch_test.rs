use mockito::Matcher;

use fbref_stats_scraper::{config::ScrapingConfig, fetch::Fetcher, ScrapeError, Source};

fn fast_config() -> ScrapingConfig {
    ScrapingConfig {
        backoff_step_ms: 0,
        request_timeout_secs: 5,
        ..ScrapingConfig::default()
    }
}

#[test]
fn test_fetch_sends_browser_headers_and_returns_body() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/en/squads/639950ae/Flamengo-Stats")
        .match_header("user-agent", Matcher::Regex("Chrome/".to_string()))
        .match_header("accept-language", "en-US,en;q=0.9")
        .with_status(200)
        .with_body("<html><table id=\"matchlogs_for\"></table></html>")
        .create();

    let fetcher = Fetcher::from_config(&fast_config()).unwrap();
    let url = format!("{}/en/squads/639950ae/Flamengo-Stats", server.url());
    let doc = fetcher.fetch(&Source::parse(&url)).unwrap();

    assert!(doc.html.contains("matchlogs_for"));
    mock.assert();
}

#[test]
fn test_persistent_forbidden_exhausts_attempts() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/en/comps/9/Premier-League-Stats")
        .with_status(403)
        .expect(3)
        .create();

    let fetcher = Fetcher::from_config(&fast_config()).unwrap();
    let url = format!("{}/en/comps/9/Premier-League-Stats", server.url());
    let err = fetcher.fetch(&Source::parse(&url)).unwrap_err();

    assert!(matches!(err, ScrapeError::Fetch { .. }));
    mock.assert();
}

#[test]
fn test_server_error_is_not_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/en/players/11111111/Pedro")
        .with_status(500)
        .expect(1)
        .create();

    let fetcher = Fetcher::from_config(&fast_config()).unwrap();
    let url = format!("{}/en/players/11111111/Pedro", server.url());
    let err = fetcher.fetch(&Source::parse(&url)).unwrap_err();

    assert!(err.to_string().contains("HTTP 500"));
    mock.assert();
}
