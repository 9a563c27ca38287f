//! Pending verification model
use crate::db::schema::pending_verifications;
use anyhow::Result;
use chrono::NaiveDateTime;
use diesel::{pg::Pg, AsChangeset, Insertable, Queryable, Selectable};
use lapmart_core::purpose::VerificationPurpose;
use rand::Rng;

/// Account data held back until the email address is verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAccount {
    /// Display name
    pub display_name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Phone number, if given
    pub phone: Option<String>,
}

/// Pending Verification Record
#[derive(Debug, Queryable, Selectable, Clone, PartialEq, Eq)]
#[diesel(table_name = pending_verifications)]
#[diesel(check_for_backend(Pg))]
pub struct PendingVerification {
    /// Normalized email address, one record per address
    pub email: String,
    /// The 6-digit code
    pub code: String,
    /// Stored form of [VerificationPurpose]
    pub purpose: String,
    /// Instant after which the code no longer verifies
    pub expires_at: NaiveDateTime,
    /// Failed verification attempts against the current code
    pub attempts: i32,
    /// Staged display name
    pub display_name: Option<String>,
    /// Staged password hash
    pub password_hash: Option<String>,
    /// Staged phone number
    pub phone: Option<String>,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

impl PendingVerification {
    /// The flow this code belongs to
    pub fn purpose(&self) -> Result<VerificationPurpose> {
        Ok(self.purpose.parse()?)
    }

    /// Whether the code is past its expiry at `now`
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }

    /// The staged account data, present for email verifications only
    pub fn staged_account(&self) -> Option<StagedAccount> {
        match (&self.display_name, &self.password_hash) {
            (Some(display_name), Some(password_hash)) => Some(StagedAccount {
                display_name: display_name.clone(),
                password_hash: password_hash.clone(),
                phone: self.phone.clone(),
            }),
            _ => None,
        }
    }
}

/// Pending verification as written by code issuance.
///
/// Upserting one of these replaces every field of an existing record for the
/// same email, including the attempt counter.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = pending_verifications)]
#[diesel(treat_none_as_null = true)]
pub struct NewPendingVerification {
    /// Normalized email address
    pub email: String,
    /// The 6-digit code
    pub code: String,
    /// Stored form of [VerificationPurpose]
    pub purpose: String,
    /// Instant after which the code no longer verifies
    pub expires_at: NaiveDateTime,
    /// Always 0 for a fresh code
    pub attempts: i32,
    /// Staged display name
    pub display_name: Option<String>,
    /// Staged password hash
    pub password_hash: Option<String>,
    /// Staged phone number
    pub phone: Option<String>,
    /// Updated at timestamp
    pub updated_at: NaiveDateTime,
}

impl NewPendingVerification {
    /// A fresh code for `email`, valid until `expires_at`
    pub fn issue(
        email: &str,
        purpose: VerificationPurpose,
        staged: Option<StagedAccount>,
        now: NaiveDateTime,
        expires_at: NaiveDateTime,
    ) -> Self {
        let (display_name, password_hash, phone) = match staged {
            Some(staged) => (
                Some(staged.display_name),
                Some(staged.password_hash),
                staged.phone,
            ),
            None => (None, None, None),
        };

        Self {
            email: email.to_string(),
            code: generate_code(),
            purpose: purpose.to_string(),
            expires_at,
            attempts: 0,
            display_name,
            password_hash,
            phone,
            updated_at: now,
        }
    }
}

/// Generate a code that can be sent to the user.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn test_issue_without_staged_data() {
        let now = Utc::now().naive_utc();
        let record = NewPendingVerification::issue(
            "ana@x.com",
            VerificationPurpose::ResetPassword,
            None,
            now,
            now + Duration::minutes(10),
        );

        assert_eq!(record.purpose, "RESET_PASSWORD");
        assert_eq!(record.attempts, 0);
        assert!(record.display_name.is_none());
        assert!(record.password_hash.is_none());
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let now = Utc::now().naive_utc();
        let record = PendingVerification {
            email: "ana@x.com".to_string(),
            code: "123456".to_string(),
            purpose: "VERIFY_EMAIL".to_string(),
            expires_at: now,
            attempts: 0,
            display_name: Some("Ana".to_string()),
            password_hash: Some("hash".to_string()),
            phone: None,
            inserted_at: now,
            updated_at: now,
        };

        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::seconds(1)));
        assert_eq!(
            record.staged_account().map(|staged| staged.display_name),
            Some("Ana".to_string())
        );
    }
}
