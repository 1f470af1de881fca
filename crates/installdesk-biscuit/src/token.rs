//! Minting and verifying session tokens.

use crate::claims::SessionClaims;
use crate::error::BiscuitError;
use crate::keys::KeyPair;
use biscuit_auth::builder::AuthorizerBuilder;
use biscuit_auth::macros::{check, fact};
use biscuit_auth::{Biscuit, PublicKey};
use chrono::Utc;
use installdesk_core::Role;
use uuid::Uuid;

/// Signs session tokens with the server keypair.
pub struct SessionIssuer {
    keypair: KeyPair,
}

impl SessionIssuer {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn verifier(&self) -> SessionVerifier {
        SessionVerifier::new(self.keypair.public_key())
    }

    pub fn mint(&self, claims: &SessionClaims) -> Result<String, BiscuitError> {
        let mut builder = Biscuit::builder()
            .fact(fact!("user({id})", id = claims.user_id.to_string()))
            .map_err(BiscuitError::mint)?
            .fact(fact!("role({role})", role = claims.role.to_string()))
            .map_err(BiscuitError::mint)?
            .fact(fact!(
                "issued_at({timestamp})",
                timestamp = claims.issued_at.timestamp()
            ))
            .map_err(BiscuitError::mint)?;

        if let Some(expires_at) = claims.expires_at {
            builder = builder
                .check(check!(
                    "check if time($time), $time < {expires_at}",
                    expires_at = expires_at.timestamp()
                ))
                .map_err(BiscuitError::mint)?;
        }

        let biscuit = builder
            .build(self.keypair.inner())
            .map_err(BiscuitError::mint)?;

        tracing::debug!(user_id = %claims.user_id, role = %claims.role, "minted session token");

        biscuit
            .to_base64()
            .map_err(BiscuitError::mint)
    }
}

/// What a valid token proves about its bearer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Clone)]
pub struct SessionVerifier {
    public_key: PublicKey,
}

impl SessionVerifier {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// Check the signature and expiry, then read the user and role facts.
    pub fn verify(&self, token: &str) -> Result<VerifiedSession, BiscuitError> {
        let biscuit = Biscuit::from_base64(token, self.public_key.clone())
            .map_err(|e| BiscuitError::Malformed(e.to_string()))?;

        let now = Utc::now().timestamp();
        let mut authorizer = AuthorizerBuilder::new()
            .code(format!(
                r#"
                time({now});
                allow if user($u);
                "#
            ))
            .map_err(BiscuitError::rejected)?
            .build(&biscuit)
            .map_err(BiscuitError::rejected)?;

        authorizer
            .authorize()
            .map_err(BiscuitError::rejected)?;

        let user = string_fact(&mut authorizer, "user")?;
        let user_id = Uuid::parse_str(&user).map_err(|_| BiscuitError::InvalidFact {
            fact: "user",
            value: user.clone(),
        })?;

        let role_name = string_fact(&mut authorizer, "role")?;
        let role = role_name
            .parse::<Role>()
            .map_err(|_| BiscuitError::InvalidFact {
                fact: "role",
                value: role_name.clone(),
            })?;

        Ok(VerifiedSession { user_id, role })
    }
}

fn string_fact(
    authorizer: &mut biscuit_auth::Authorizer,
    name: &str,
) -> Result<String, BiscuitError> {
    let rule: biscuit_auth::builder::Rule = format!("data($x) <- {}($x)", name)
        .parse()
        .map_err(BiscuitError::rejected::<biscuit_auth::error::Token>)?;

    let results: Vec<(String,)> = authorizer
        .query(rule)
        .map_err(BiscuitError::rejected)?;

    results
        .into_iter()
        .next()
        .map(|(s,)| s)
        .ok_or_else(|| BiscuitError::MissingFact(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(KeyPair::generate().unwrap())
    }

    #[test]
    fn test_mint_and_verify() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let claims = SessionClaims::new(user_id, Role::Manager).expires_in(Duration::hours(1));

        let token = issuer.mint(&claims).unwrap();
        let session = issuer.verifier().verify(&token).unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.role, Role::Manager);
    }

    #[test]
    fn test_token_without_expiry_verifies() {
        let issuer = issuer();
        let token = issuer
            .mint(&SessionClaims::new(Uuid::new_v4(), Role::Admin))
            .unwrap();
        assert_eq!(issuer.verifier().verify(&token).unwrap().role, Role::Admin);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = issuer();
        let claims = SessionClaims::new(Uuid::new_v4(), Role::User).expires_in(Duration::hours(-1));
        assert!(claims.is_expired_at(Utc::now()));

        let token = issuer.mint(&claims).unwrap();
        assert!(matches!(
            issuer.verifier().verify(&token),
            Err(BiscuitError::Rejected(_))
        ));
    }

    #[test]
    fn test_token_from_other_key_is_rejected() {
        let token = issuer()
            .mint(&SessionClaims::new(Uuid::new_v4(), Role::User))
            .unwrap();
        assert!(issuer().verifier().verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            issuer().verifier().verify("not-a-token"),
            Err(BiscuitError::Malformed(_))
        ));
    }
}
