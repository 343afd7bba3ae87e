use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Host unreachable, connection reset, DNS.
    Transport,
    /// The request outlived the fetch budget.
    Timeout,
    Status(u16),
    /// Body was not the JSON shape the caller needed.
    Decode,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub endpoint: String,
    pub kind: ApiErrorKind,
    pub detail: String,
}

impl ApiError {
    pub fn new(endpoint: impl Into<String>, kind: ApiErrorKind, detail: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind,
            detail: detail.into(),
        }
    }

    /// Classifies an error chain; anything that is not an `ApiError` counts as transport.
    pub fn kind_of(err: &anyhow::Error) -> ApiErrorKind {
        err.downcast_ref::<ApiError>()
            .map(|e| e.kind)
            .unwrap_or(ApiErrorKind::Transport)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ApiErrorKind::Transport => write!(f, "request to {} failed: {}", self.endpoint, self.detail),
            ApiErrorKind::Timeout => write!(f, "request to {} timed out: {}", self.endpoint, self.detail),
            ApiErrorKind::Status(status) => {
                write!(f, "{} returned HTTP {status}: {}", self.endpoint, self.detail)
            }
            ApiErrorKind::Decode => write!(f, "unexpected body from {}: {}", self.endpoint, self.detail),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_survives_anyhow_round_trip() {
        let err: anyhow::Error =
            ApiError::new("/api/us/portfolio", ApiErrorKind::Status(404), "not found").into();
        assert_eq!(ApiError::kind_of(&err), ApiErrorKind::Status(404));
        assert_eq!(
            err.to_string(),
            "/api/us/portfolio returned HTTP 404: not found"
        );

        let other = anyhow::anyhow!("boom");
        assert_eq!(ApiError::kind_of(&other), ApiErrorKind::Transport);
    }
}
