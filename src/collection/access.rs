//! Access restriction
//!
//! Callers are either unrestricted or restricted to a set of accounts.
//! A restricted caller only sees documents whose account-bearing fields
//! name one of its accounts.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use crate::filter::{or_conditions, QueryParams};

/// Authorization outcome for one caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRights {
    pub granted: bool,
    /// Empty means unrestricted
    #[serde(default)]
    pub restrict_to_accounts: Vec<String>,
    /// Access key of the caller, pinned by the multiplexed request's guard
    #[serde(skip)]
    pub access_key: Option<KeyedAccess>,
}

/// Access key presented on one call of a multiplexed request
#[derive(Debug, Clone)]
pub struct KeyedAccess {
    guard: Arc<AccessGuard>,
    key: Option<String>,
}

impl KeyedAccess {
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl PartialEq for KeyedAccess {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.guard, &other.guard) && self.key == other.key
    }
}

impl Eq for KeyedAccess {}

impl AccessRights {
    pub fn unrestricted() -> Self {
        Self {
            granted: true,
            restrict_to_accounts: Vec::new(),
            access_key: None,
        }
    }

    pub fn restricted(accounts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            granted: true,
            restrict_to_accounts: accounts.into_iter().map(Into::into).collect(),
            access_key: None,
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            restrict_to_accounts: Vec::new(),
            access_key: None,
        }
    }

    pub fn is_restricted(&self) -> bool {
        !self.restrict_to_accounts.is_empty()
    }

    /// Binds the caller's access key to the guard of a multiplexed request
    pub fn with_access_key(mut self, guard: &Arc<AccessGuard>, key: Option<&str>) -> Self {
        self.access_key = Some(KeyedAccess {
            guard: guard.clone(),
            key: key.map(str::to_string),
        });
        self
    }

    /// Access-key pinning first, then the grant itself
    pub fn ensure_granted(&self) -> QueryResult<()> {
        if let Some(keyed) = &self.access_key {
            keyed.guard.check(keyed.key())?;
        }
        if self.granted {
            Ok(())
        } else {
            Err(QueryError::AccessDenied)
        }
    }

    /// Condition limiting documents to the caller's accounts; `None` when
    /// unrestricted. `account_fields` are storage names on the document root.
    pub fn condition(&self, params: &mut QueryParams, account_fields: &[String]) -> Option<String> {
        let accounts = &self.restrict_to_accounts;
        if accounts.is_empty() {
            return None;
        }
        if account_fields.is_empty() {
            return Some("false".to_string());
        }
        let operand = if accounts.len() == 1 {
            format!("== @{}", params.add(Value::from(accounts[0].clone())))
        } else {
            let list: Vec<Value> = accounts.iter().cloned().map(Value::from).collect();
            format!("IN @{}", params.add(Value::Array(list)))
        };
        let conditions = account_fields
            .iter()
            .map(|field| format!("doc.{} {}", field, operand))
            .collect();
        Some(or_conditions(conditions))
    }

    /// In-memory rendition of [`AccessRights::condition`]
    pub fn test(&self, document: &Value, account_fields: &[String]) -> bool {
        if !self.is_restricted() {
            return true;
        }
        account_fields.iter().any(|field| {
            document
                .get(field)
                .and_then(Value::as_str)
                .map_or(false, |account| self.restrict_to_accounts.iter().any(|a| a == account))
        })
    }
}

/// Pins one access key per multiplexed request
#[derive(Debug, Default)]
pub struct AccessGuard {
    key: Mutex<Option<Option<String>>>,
    conflicted: std::sync::atomic::AtomicBool,
}

impl AccessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first key; any later different key fails this and every
    /// subsequent check
    pub fn check(&self, access_key: Option<&str>) -> QueryResult<()> {
        use std::sync::atomic::Ordering;

        if self.conflicted.load(Ordering::Relaxed) {
            return Err(QueryError::MultipleAccessKeys);
        }
        let mut key = self.key.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match key.as_ref() {
            None => {
                *key = Some(access_key.map(str::to_string));
                Ok(())
            }
            Some(first) if first.as_deref() == access_key => Ok(()),
            Some(_) => {
                self.conflicted.store(true, Ordering::Relaxed);
                Err(QueryError::MultipleAccessKeys)
            }
        }
    }
}
