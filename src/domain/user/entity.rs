//! User entity and related types

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// User identifier assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Parse a user id from a path segment
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        raw.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| DomainError::invalid_id(format!("'{}' is not a valid user id", raw)))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Complete set of user attributes, as required by create and full update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub city: String,
    pub state: String,
    pub zip: u32,
    pub email: String,
    pub web: String,
    pub age: u32,
}

/// Subset of user attributes supplied by a partial update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<u32>,
    pub email: Option<String>,
    pub web: Option<String>,
    pub age: Option<u32>,
}

impl UserPatch {
    /// Merge the supplied fields into an existing user
    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            user.last_name = v.clone();
        }
        if let Some(v) = &self.company_name {
            user.company_name = v.clone();
        }
        if let Some(v) = &self.city {
            user.city = v.clone();
        }
        if let Some(v) = &self.state {
            user.state = v.clone();
        }
        if let Some(v) = self.zip {
            user.zip = v;
        }
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.web {
            user.web = v.clone();
        }
        if let Some(v) = self.age {
            user.age = v;
        }
    }

    /// Convert into a draft when every field was supplied
    pub fn into_draft(self) -> Option<UserDraft> {
        Some(UserDraft {
            first_name: self.first_name?,
            last_name: self.last_name?,
            company_name: self.company_name?,
            city: self.city?,
            state: self.state?,
            zip: self.zip?,
            email: self.email?,
            web: self.web?,
            age: self.age?,
        })
    }
}

/// A person record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    first_name: String,
    last_name: String,
    company_name: String,
    city: String,
    state: String,
    zip: u32,
    email: String,
    web: String,
    age: u32,
}

impl User {
    /// Build a user from a store-assigned id and its attributes
    pub fn from_draft(id: UserId, draft: UserDraft) -> Self {
        Self {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            company_name: draft.company_name,
            city: draft.city,
            state: draft.state,
            zip: draft.zip,
            email: draft.email,
            web: draft.web,
            age: draft.age,
        }
    }

    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn zip(&self) -> u32 {
        self.zip
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn web(&self) -> &str {
        &self.web
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    // Mutators

    /// Replace every attribute; the id is kept
    pub fn replace(&mut self, draft: UserDraft) {
        *self = Self::from_draft(self.id, draft);
    }
}

#[cfg(test)]
pub(crate) fn sample_draft(first_name: &str, last_name: &str, email: &str) -> UserDraft {
    UserDraft {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        company_name: "Benton, John B Jr".to_string(),
        city: "New Orleans".to_string(),
        state: "LA".to_string(),
        zip: 70116,
        email: email.to_string(),
        web: "http://www.bentonjohnbjr.com".to_string(),
        age: 70,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parse() {
        assert_eq!(UserId::parse("42").unwrap(), UserId::new(42));
        assert_eq!(UserId::parse(" 7 ").unwrap().value(), 7);
        assert!(UserId::parse("abc").is_err());
        assert!(UserId::parse("").is_err());
    }

    #[test]
    fn test_user_from_draft() {
        let user = User::from_draft(UserId::new(1), sample_draft("James", "Butt", "jbutt@gmail.com"));

        assert_eq!(user.id().value(), 1);
        assert_eq!(user.first_name(), "James");
        assert_eq!(user.last_name(), "Butt");
        assert_eq!(user.zip(), 70116);
        assert_eq!(user.email(), "jbutt@gmail.com");
    }

    #[test]
    fn test_replace_keeps_id() {
        let mut user = User::from_draft(UserId::new(3), sample_draft("James", "Butt", "jbutt@gmail.com"));

        user.replace(sample_draft("Anna", "Smith", "anna@example.com"));

        assert_eq!(user.id().value(), 3);
        assert_eq!(user.first_name(), "Anna");
        assert_eq!(user.email(), "anna@example.com");
    }

    #[test]
    fn test_patch_only_touches_supplied_fields() {
        let mut user = User::from_draft(UserId::new(1), sample_draft("James", "Butt", "jbutt@gmail.com"));
        let patch = UserPatch {
            city: Some("Boston".to_string()),
            age: Some(71),
            ..Default::default()
        };

        patch.apply_to(&mut user);

        assert_eq!(user.city(), "Boston");
        assert_eq!(user.age(), 71);
        assert_eq!(user.first_name(), "James");
        assert_eq!(user.state(), "LA");
    }

    #[test]
    fn test_patch_into_draft_requires_all_fields() {
        let partial = UserPatch {
            first_name: Some("James".to_string()),
            ..Default::default()
        };
        assert!(partial.into_draft().is_none());
    }
}
