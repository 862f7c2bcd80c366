//! Caller identity extraction.
//!
//! Authentication happens upstream; the gateway forwards the verified
//! caller identity in the `X-User-Id` header. Handlers fail with 401 when
//! the header is missing or malformed rather than guessing.

use actix_web::HttpRequest;

use crate::domain::{Error, UserId};

/// Header carrying the verified caller identity.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller, or `unauthorized` when absent or invalid.
pub fn authenticated_user(req: &HttpRequest) -> Result<UserId, Error> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::unauthorized("missing caller identity"))?;
    raw.parse()
        .map_err(|_| Error::unauthorized("malformed caller identity"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use uuid::Uuid;

    #[test]
    fn parses_a_valid_header() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();
        assert_eq!(
            authenticated_user(&req).expect("valid header"),
            UserId::from_uuid(id)
        );
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let req = TestRequest::default().to_http_request();
        assert!(authenticated_user(&req).is_err());

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(authenticated_user(&req).is_err());
    }
}
