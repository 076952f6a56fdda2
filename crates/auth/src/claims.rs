use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Role, TokenError};

/// Bearer token claims.
///
/// On the wire this is `{"username", "role", "exp"}` with `exp` in unix
/// seconds. There is no issuer, audience or token id: the token is a
/// stateless credential whose only server-side check is signature + expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub role: Role,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

/// Check the time window of already-decoded claims.
///
/// A token is no longer honoured once `expires_at <= now`.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if now >= claims.expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn claims_expiring(at: DateTime<Utc>) -> Claims {
        Claims {
            username: "alice".to_string(),
            role: Role::USER,
            expires_at: at,
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        assert!(validate_claims(&claims_expiring(now + Duration::seconds(1)), now).is_ok());
        assert_eq!(
            validate_claims(&claims_expiring(now), now),
            Err(TokenError::Expired)
        );
        assert_eq!(
            validate_claims(&claims_expiring(now - Duration::seconds(1)), now),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn wire_format_uses_exp_seconds() {
        let at = Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(claims_expiring(at)).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["role"], "user");
        assert_eq!(json["exp"], at.timestamp());
    }
}
