//! Blocking HTTP GET over libcurl.

use crate::fetch::{FetchError, TransportMode};
use crate::retry::{classify_curl_error, classify_http_status, ErrorKind};
use std::time::Duration;

/// curl settings for manifest and image requests.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(120),
            user_agent: format!("gdm/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn curl_failure(url: &str, e: &curl::Error) -> FetchError {
    match classify_curl_error(e) {
        ErrorKind::Ssl => FetchError::ssl(url, e.to_string()),
        ErrorKind::Network => FetchError::network(url, e.to_string()),
        _ => FetchError::Other(format!("{}: {}", url, e)),
    }
}

/// GETs `url` into memory. `Degraded` turns off certificate and host verification.
pub fn http_get(url: &str, mode: TransportMode, opts: &HttpOptions) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    let mut setup = || -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(opts.connect_timeout)?;
        easy.timeout(opts.timeout)?;
        easy.useragent(&opts.user_agent)?;
        if mode == TransportMode::Degraded {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }
        Ok(())
    };
    setup().map_err(|e| curl_failure(url, &e))?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(|e| curl_failure(url, &e))?;
        transfer.perform().map_err(|e| curl_failure(url, &e))?;
    }

    let code = easy.response_code().map_err(|e| curl_failure(url, &e))?;
    match classify_http_status(code) {
        None => Ok(body),
        Some(ErrorKind::Network) => Err(FetchError::network(url, format!("HTTP {}", code))),
        Some(_) => Err(FetchError::parse(url, format!("HTTP {}", code))),
    }
}
