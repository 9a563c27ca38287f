//! Account model

use crate::db::schema::accounts;
use anyhow::Result;
use chrono::NaiveDateTime;
use diesel::{pg::Pg, Insertable, Queryable, Selectable};
use lapmart_core::{
    common::{AccountResponse, AccountSummary},
    role::Role,
};

/// Account record, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(Pg))]
pub struct AccountRecord {
    /// Internal Database Identifier
    pub id: i32,
    /// Normalized email address, unique across accounts
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Phone number, if given
    pub phone: Option<String>,
    /// Stored form of [Role]
    pub role: String,
    /// Whether the email address was verified
    pub is_verified: bool,
    /// Short profile text
    pub bio: Option<String>,
    /// Avatar location
    pub image_url: Option<String>,
    /// Avatar identifier at the upload provider
    pub image_public_id: Option<String>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

impl AccountRecord {
    /// The role of this account.
    ///
    /// Fails on role strings that the database constraint should have kept out.
    pub fn role(&self) -> Result<Role> {
        Ok(self.role.parse::<Role>()?)
    }

    /// The public part of this account
    pub fn to_summary(&self) -> Result<AccountSummary> {
        Ok(AccountSummary {
            id: self.id,
            name: self.display_name.clone(),
            email: self.email.clone(),
            role: self.role()?,
        })
    }

    /// Everything about this account except credentials
    pub fn to_account(&self) -> Result<AccountResponse> {
        Ok(AccountResponse {
            id: self.id,
            name: self.display_name.clone(),
            email: self.email.clone(),
            mobile: self.phone.clone(),
            role: self.role()?,
            is_verified: self.is_verified,
            bio: self.bio.clone(),
            image_url: self.image_url.clone(),
            image_public_id: self.image_public_id.clone(),
        })
    }
}

/// New Account Struct (for creating new accounts)
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    /// Normalized email address
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Phone number, if given
    pub phone: Option<String>,
    /// Stored form of [Role]
    pub role: String,
    /// Whether the email address was verified
    pub is_verified: bool,
}

impl NewAccount {
    /// A verified [Role::User] account, as materialized by email verification
    pub fn verified_user(
        email: String,
        display_name: String,
        password_hash: String,
        phone: Option<String>,
    ) -> Self {
        Self {
            email,
            display_name,
            password_hash,
            phone,
            role: Role::User.to_string(),
            is_verified: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use testresult::TestResult;

    fn record(role: &str) -> AccountRecord {
        let now = Utc::now().naive_utc();
        AccountRecord {
            id: 7,
            email: "ana@x.com".to_string(),
            display_name: "Ana".to_string(),
            password_hash: "$argon2id$v=19$...".to_string(),
            phone: Some("555-0100".to_string()),
            role: role.to_string(),
            is_verified: true,
            bio: None,
            image_url: None,
            image_public_id: None,
            inserted_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_to_account_drops_password_hash() -> TestResult {
        let account = record("OWNER").to_account()?;
        let json = serde_json::to_string(&account)?;

        assert_eq!(account.role, Role::Owner);
        assert_eq!(account.mobile.as_deref(), Some("555-0100"));
        assert!(!json.contains("argon2"));
        Ok(())
    }

    #[test]
    fn test_unknown_role_is_an_error() {
        assert!(record("ROOT").to_summary().is_err());
    }

    #[test]
    fn test_verified_user_defaults() {
        let account = NewAccount::verified_user(
            "ana@x.com".to_string(),
            "Ana".to_string(),
            "hash".to_string(),
            None,
        );

        assert_eq!(account.role, "USER");
        assert!(account.is_verified);
    }
}
