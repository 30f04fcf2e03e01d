//! # Customer Profiles
//!
//! Name, contact and default billing details for registered customers.
//! Invoice issuance snapshots the profile; editing it later leaves issued
//! invoices untouched.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::services::booking::validate_billing;
use primeclean_core::validation::{validate_email, validate_optional_text, validate_required};
use primeclean_core::{Actor, BillingAddress, CoreError, CoreResult, CustomerProfile};
use primeclean_db::repository::profile::ProfileInput;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub billing: BillingAddress,
}

/// Staff, or the customer the profile belongs to.
fn ensure_profile_access(actor: &Actor, user_id: i64) -> CoreResult<()> {
    if actor.is_staff() || actor.user_id == Some(user_id) {
        Ok(())
    } else {
        Err(CoreError::forbidden("profile belongs to another customer"))
    }
}

impl Engine {
    pub async fn upsert_profile(
        &self,
        actor: &Actor,
        request: ProfileRequest,
    ) -> EngineResult<CustomerProfile> {
        ensure_profile_access(actor, request.user_id)?;

        let input = ProfileInput {
            user_id: request.user_id,
            full_name: validate_required("full_name", &request.full_name)?,
            email: validate_email(&request.email)?,
            phone: validate_optional_text("phone", request.phone.as_deref())?,
            billing: validate_billing(&request.billing)?,
        };

        let profile = self.db.profiles().upsert(&input).await?;
        info!(user_id = profile.user_id, "Profile saved");
        Ok(profile)
    }

    pub async fn get_profile(&self, actor: &Actor, user_id: i64) -> EngineResult<CustomerProfile> {
        ensure_profile_access(actor, user_id)?;
        self.db
            .profiles()
            .get(user_id)
            .await?
            .ok_or_else(|| EngineError::not_found("CustomerProfile", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{test_engine, STAFF};

    fn request(user_id: i64, name: &str) -> ProfileRequest {
        ProfileRequest {
            user_id,
            full_name: name.to_string(),
            email: "Maria@Example.com".to_string(),
            phone: Some("305-555-0199".to_string()),
            billing: BillingAddress {
                address: Some("9 Ocean Dr".to_string()),
                city: Some("Miami Beach".to_string()),
                state: Some("FL".to_string()),
                zip: Some("33139".to_string()),
                country: None,
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_profile() {
        let engine = test_engine().await;
        let owner = Actor::customer(7);

        let created = engine.upsert_profile(&owner, request(7, "Maria Gomez")).await.unwrap();
        assert_eq!(created.email, "maria@example.com");
        assert_eq!(created.billing.city.as_deref(), Some("Miami Beach"));

        let updated = engine
            .upsert_profile(&STAFF, request(7, "Maria G. Gomez"))
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Maria G. Gomez");

        let fetched = engine.get_profile(&owner, 7).await.unwrap();
        assert_eq!(fetched.full_name, "Maria G. Gomez");
    }

    #[tokio::test]
    async fn test_profile_access_and_validation() {
        let engine = test_engine().await;

        let err = engine
            .upsert_profile(&Actor::customer(8), request(7, "Maria Gomez"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = engine.upsert_profile(&Actor::customer(7), request(7, "  ")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = engine.get_profile(&STAFF, 7).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = engine.get_profile(&Actor::guest(), 7).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
