//! URL and response validation shared by index and artifact fetching

use repomirror_errors::{Error, NetworkError};
use reqwest::{Response, StatusCode};
use url::Url;

/// Parse and validate a URL before any request goes out.
///
/// Only `http` and `https` are accepted; everything else is a
/// configuration mistake, not a retryable condition.
pub(crate) fn validate_url(url: &str) -> Result<Url, Error> {
    let parsed =
        Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(NetworkError::InvalidUrl(format!(
            "unsupported URL scheme '{scheme}' in {url}"
        ))
        .into()),
    }
}

/// Map a non-success status to the matching network error.
///
/// 404 and auth failures are permanent; other failures (5xx, odd 4xx)
/// are treated as transient and left to the caller's retry policy.
pub(crate) fn check_status(response: Response, url: &str) -> Result<Response, Error> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(NetworkError::NotFound {
            url: url.to_string(),
        }
        .into());
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(NetworkError::AccessDenied {
            status: status.as_u16(),
            url: url.to_string(),
        }
        .into());
    }

    if !status.is_success() {
        return Err(NetworkError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        }
        .into());
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("http://repo.example.com/linux-64/repodata.json").is_ok());
        assert!(validate_url("https://repo.example.com/linux-64/repodata.json").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("ftp://repo.example.com/file").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        let error = validate_url("not a url").unwrap_err();
        assert!(matches!(
            error,
            Error::Network(NetworkError::InvalidUrl(_))
        ));
    }
}
