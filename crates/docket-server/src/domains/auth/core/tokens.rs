use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session claims. `sub` is the employee id as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub login_id: String,
    pub perms: Vec<i32>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(
        employee_id: i64,
        login_id: &str,
        perms: Vec<i32>,
        issued_at: DateTime<Utc>,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            sub: employee_id.to_string(),
            login_id: login_id.to_string(),
            perms,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::minutes(ttl_minutes)).timestamp(),
        }
    }

    pub fn employee_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

pub fn issue_token(claims: &SessionClaims, secret: &str) -> Result<String, &'static str> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| "token_encode_failed")
}

/// Verifies the HS256 signature and `exp` with no leeway.
pub fn verify_token(token: &str, secret: &str) -> Result<SessionClaims, &'static str> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => "token_expired",
        _ => "token_invalid",
    })
}
