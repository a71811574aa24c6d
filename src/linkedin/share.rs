use reqwest::Url;

const FEED_SHARE_URL: &str = "https://www.linkedin.com/feed/";

/// Opens the LinkedIn composer with `text` prefilled.
pub fn share_url(text: &str) -> String {
    build(FEED_SHARE_URL, &[("shareActive", "true"), ("text", text)])
}

fn build(base: &str, params: &[(&str, &str)]) -> String {
    Url::parse_with_params(base, params)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| base.to_string())
}
