//! Map fetch/store failures, curl errors and HTTP statuses into error kinds.

use super::policy::ErrorKind;
use crate::fetch::FetchError;

/// Classify a fetch or store failure for the retry policy.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Network { .. } => ErrorKind::Network,
        FetchError::Ssl { .. } => ErrorKind::Ssl,
        FetchError::Parse { .. } => ErrorKind::Parse,
        FetchError::FolderMissing { .. } => ErrorKind::FolderMissing,
        FetchError::RangeInvalid(_) => ErrorKind::RangeInvalid,
        FetchError::DiskFull { .. } | FetchError::PathTooLong { .. } => ErrorKind::DiskFull,
        FetchError::Other(_) => ErrorKind::Unknown,
    }
}

/// Classify an HTTP status code returned by the site.
///
/// Returns `None` for success codes.
pub fn classify_http_status(code: u32) -> Option<ErrorKind> {
    match code {
        200..=299 => None,
        408 | 429 | 500..=599 => Some(ErrorKind::Network),
        // 4xx other than throttling: the page exists in the listing but the
        // server gives us something we cannot use.
        _ => Some(ErrorKind::Parse),
    }
}

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cacert()
        || e.is_ssl_cacert_badfile()
        || e.is_ssl_cipher()
        || e.is_ssl_shutdown_failed()
    {
        return ErrorKind::Ssl;
    }
    if e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Network;
    }
    ErrorKind::Unknown
}
