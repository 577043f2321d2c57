//! User profile storage with email uniqueness.

use std::sync::Arc;

use super::{normalize_email, NewUser, User, UserUpdate};
use crate::error::{Error, Result};
use crate::storage::schema::{indexes, stores};
use crate::storage::{Database, RecordStore, StoreTxn};

/// User profile CRUD.
#[derive(Debug, Clone)]
pub struct UserService {
    store: RecordStore,
}

impl UserService {
    /// Create a new user service backed by the given database.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            store: RecordStore::new(db),
        }
    }

    /// Create a user. Fails with `DuplicateKey` if the id or the email is
    /// already taken.
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let user = new.into_record(crate::time::now());
        user.validate()?;

        let record = user.clone();
        self.store
            .write_transaction("create_user", move |txn| {
                ensure_email_free(txn, &record.email, None)?;
                txn.add_typed(stores::USERS, &record)
            })
            .await?;

        tracing::info!(id = %user.id, "User created");
        Ok(user)
    }

    /// Get a user by id.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.store.get_typed(stores::USERS, id).await
    }

    /// Look a user up by email, ignoring case and surrounding whitespace.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users: Vec<User> = self
            .store
            .get_by_index_typed(stores::USERS, indexes::BY_EMAIL, normalize_email(email))
            .await?;
        Ok(users.into_iter().next())
    }

    /// Update a profile. Returns `None` if the user does not exist.
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>> {
        let id = id.to_string();
        self.store
            .write_transaction("update_user", move |txn| {
                let Some(mut user) = txn.get_typed::<User>(stores::USERS, &id)? else {
                    return Ok(None);
                };
                update.apply(&mut user);
                user.updated_at = crate::time::advance(user.updated_at);
                user.validate()?;
                ensure_email_free(txn, &user.email, Some(&user.id))?;
                txn.put_typed(stores::USERS, &user)?;
                Ok(Some(user))
            })
            .await
    }

    /// Delete a user. Returns `false` if it did not exist.
    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        let removed = self.store.remove(stores::USERS, id).await?;
        if removed {
            tracing::info!(id, "User deleted");
        }
        Ok(removed)
    }
}

fn ensure_email_free(txn: &StoreTxn<'_>, email: &str, owner: Option<&str>) -> Result<()> {
    let holders: Vec<User> = txn.get_by_index_typed(stores::USERS, indexes::BY_EMAIL, email)?;
    if holders.iter().any(|u| Some(u.id.as_str()) != owner) {
        return Err(Error::DuplicateKey {
            store: stores::USERS.to_string(),
            key: email.to_string(),
        });
    }
    Ok(())
}
