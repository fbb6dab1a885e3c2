//! Google Fonts stylesheet API.
//!
//! The API answers with different `src` formats depending on the requesting
//! browser, so one stylesheet is requested per wanted format, each with a
//! matching `User-Agent`, and the answers are concatenated.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use fontlib_config::GoogleFormat;
use fontlib_urlcache::{FetcherHandle, Request};

/// Host of the stylesheet API.
pub const GOOGLE_FONTS_HOST: &str = "fonts.googleapis.com";
/// Host serving the font files.
pub const GOOGLE_FONTS_GSTATIC: &str = "fonts.gstatic.com";

/// Is `url` an http(s) URL on one of the Google Fonts hosts?
pub fn is_google_font_url(url: &str) -> bool {
    let Ok(url) = url::Url::parse(url) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https")
        && matches!(url.host_str(), Some(GOOGLE_FONTS_HOST | GOOGLE_FONTS_GSTATIC))
}

/// A browser the API serves `format` to.
pub fn user_agent(format: GoogleFormat) -> &'static str {
    match format {
        GoogleFormat::Woff2 => "Mozilla/5.0 (X11; Linux x86_64; rv:66.0) Gecko/20100101 Firefox/66.0",
        // Android 2
        GoogleFormat::Ttf => {
            "Mozilla/5.0 (Linux; U; Android 2.2; en-us; DROID2 GLOBAL Build/S273) AppleWebKit/533.1 \
             (KHTML, like Gecko) Version/4.0 Mobile Safari/533.1"
        },
        // iOS < 4.2
        GoogleFormat::Svg => {
            "Mozilla/5.0 (iPad; U; CPU OS 3_2 like Mac OS X; en-us) AppleWebKit/531.21.10 \
             (KHTML, like Gecko) Version/4.0.4 Mobile/7B334b Safari/531.21.10"
        },
    }
}

/// Fetch the stylesheet at `url` once per format and concatenate the bodies.
pub async fn read_google_css(fetcher: &FetcherHandle, url: &str, formats: &[GoogleFormat]) -> Result<Vec<u8>> {
    if !is_google_font_url(url) {
        exn::bail!(ErrorKind::NotGoogle(url.to_string()));
    }
    let mut css = Vec::new();
    for format in formats {
        tracing::debug!(url, %format, "requesting google stylesheet");
        let request = Request::new(url).with_user_agent(user_agent(*format));
        let body = fetcher.read_all(&request).await.or_raise(|| ErrorKind::Stylesheet(url.to_string()))?;
        css.extend_from_slice(&body);
        css.push(b'\n');
    }
    Ok(css)
}
