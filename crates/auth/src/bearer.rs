use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BearerError {
    #[error("authorization header is not a bearer token")]
    NotBearer,

    #[error("bearer token is empty")]
    Empty,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: &str) -> Result<&str, BearerError> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(BearerError::NotBearer)?
        .trim();

    if token.is_empty() {
        return Err(BearerError::Empty);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix() {
        assert_eq!(extract_bearer("Bearer abc.def"), Ok("abc.def"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(extract_bearer("Basic abc"), Err(BearerError::NotBearer));
        assert_eq!(extract_bearer("abc"), Err(BearerError::NotBearer));
        assert_eq!(extract_bearer("Bearer   "), Err(BearerError::Empty));
    }
}
