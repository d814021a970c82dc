//! Shared test models: a user account with an organization relation, a model
//! with a client-generated primary key, and an in-memory store with a mail
//! outbox that hook bodies write to.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use lifecycle_hooks::prelude::{
    AFTER_CREATE, AFTER_DELETE, AFTER_SAVE, AFTER_UPDATE, BEFORE_CREATE, BEFORE_DELETE,
    BEFORE_SAVE, BEFORE_UPDATE, Condition, ConfigError, FieldKind, HookRegistry, Lifecycle,
    LifecycleError, LifecycleModel, LifecycleState, ResolveError, hook,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Cannot delete trial user!")]
    CannotDeleteActiveTrial,

    #[error("Cannot delete an account that joined before 1989-12-17")]
    CannotDeleteBoomer,

    #[error("Oh, not Flanders. Anybody but Flanders.")]
    CannotRename,

    #[error("account {0} does not exist")]
    Missing(u64),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub name: String,
}

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    accounts: HashMap<u64, UserAccount>,
    organizations: HashMap<u64, Organization>,
    outbox: Vec<Mail>,
}

/// In-memory persistence shared by every handle cloned from it.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap()
    }

    fn next_id(&self) -> u64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        inner.next_id
    }

    pub fn create_organization(&self, name: &str) -> Organization {
        let org = Organization {
            id: self.next_id(),
            name: name.to_string(),
        };
        self.lock().organizations.insert(org.id, org.clone());
        org
    }

    pub fn rename_organization(&self, id: u64, name: &str) {
        if let Some(org) = self.lock().organizations.get_mut(&id) {
            org.name = name.to_string();
        }
    }

    pub fn organization(&self, id: u64) -> Option<Organization> {
        self.lock().organizations.get(&id).cloned()
    }

    pub fn delete_organization(&self, id: u64) {
        self.lock().organizations.remove(&id);
    }

    /// Load a stored account, tracked from its persisted state.
    pub fn get_account(&self, id: u64) -> Result<UserAccount, AppError> {
        let stored = self.lock().accounts.get(&id).cloned();
        let mut account = stored.ok_or(AppError::Missing(id))?;
        account.store = self.clone();
        account.lifecycle = LifecycleState::new();
        account.organization_cache = None;
        account.track()?;
        Ok(account)
    }

    /// Load a stored account with its organization already cached.
    pub fn get_account_with_organization(&self, id: u64) -> Result<UserAccount, AppError> {
        let mut account = self.get_account(id)?;
        account.organization_cache = account
            .organization_id
            .and_then(|org_id| self.organization(org_id));
        Ok(account)
    }

    pub fn contains_account(&self, id: u64) -> bool {
        self.lock().accounts.contains_key(&id)
    }

    pub fn stored_account(&self, id: u64) -> Option<UserAccount> {
        self.lock().accounts.get(&id).cloned()
    }

    pub fn send_mail(&self, subject: &str, body: &str) {
        self.lock().outbox.push(Mail {
            subject: subject.to_string(),
            body: body.to_string(),
        });
    }

    pub fn outbox(&self) -> Vec<Mail> {
        self.lock().outbox.clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.outbox().into_iter().map(|mail| mail.subject).collect()
    }

    pub fn clear_outbox(&self) {
        self.lock().outbox.clear();
    }
}

#[derive(Clone, Serialize)]
pub struct UserAccount {
    pub id: Option<u64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub email: Option<String>,
    pub password_updated_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
    pub has_trial: bool,
    pub status: String,
    pub organization_id: Option<u64>,

    #[serde(skip)]
    pub organization_cache: Option<Organization>,
    #[serde(skip)]
    pub store: Store,
    #[serde(skip)]
    lifecycle: LifecycleState,
}

impl UserAccount {
    /// A fresh, unsaved account with the usual test data.
    pub fn new(store: &Store) -> Self {
        let account = Self {
            id: None,
            username: "homer.simpson".into(),
            first_name: "Homer".into(),
            last_name: "Simpson".into(),
            password: "donuts".into(),
            email: None,
            password_updated_at: None,
            joined_at: None,
            has_trial: false,
            status: "active".into(),
            organization_id: None,
            organization_cache: None,
            store: store.clone(),
            lifecycle: LifecycleState::new(),
        };
        account.tracked().expect("UserAccount hooks declare cleanly")
    }

    /// Create and save an account; returns the saved instance.
    pub fn create(store: &Store, edit: impl FnOnce(&mut Self)) -> Result<Self, AppError> {
        let mut account = Self::new(store);
        edit(&mut account);
        account.save()?;
        Ok(account)
    }

    pub fn pk(&self) -> u64 {
        self.id.expect("account has been saved")
    }

    fn mail(&self, subject: &str, body: &str) -> Result<(), AppError> {
        self.store.send_mail(subject, body);
        Ok(())
    }

    fn lowercase_email(&mut self) -> Result<(), AppError> {
        self.email = self.email.as_ref().map(|email| email.to_lowercase());
        Ok(())
    }

    fn timestamp_joined_at(&mut self) -> Result<(), AppError> {
        self.joined_at = Some(Utc::now());
        Ok(())
    }

    fn do_after_create_jobs(&mut self) -> Result<(), AppError> {
        self.mail("Welcome!", "Thank you for joining.")
    }

    fn timestamp_password_change(&mut self) -> Result<(), AppError> {
        self.password_updated_at = Some(Utc::now());
        Ok(())
    }

    fn ensure_trial_not_active(&mut self) -> Result<(), AppError> {
        Err(AppError::CannotDeleteActiveTrial)
    }

    fn ensure_last_name_is_not_changed_to_flanders(&mut self) -> Result<(), AppError> {
        Err(AppError::CannotRename)
    }

    fn organization_name(&self) -> String {
        self.related("organization")
            .ok()
            .flatten()
            .and_then(|org| org.get("name").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default()
    }

    fn notify_org_name_change(&mut self) -> Result<(), AppError> {
        let body = format!("You organization is now named {}", self.organization_name());
        self.mail("The name of your organization has changed!", &body)
    }

    fn notify_user_they_were_moved_to_online_school(&mut self) -> Result<(), AppError> {
        let body = format!("You organization is now named {}", self.organization_name());
        self.mail("You were moved to our online school!", &body)
    }

    fn email_deleted_user(&mut self) -> Result<(), AppError> {
        self.mail("We have deleted your account", "Thank you for your time.")
    }

    fn email_banned_user(&mut self) -> Result<(), AppError> {
        self.mail("You have been banned", "You may or may not deserve it.")
    }

    fn email_user_about_name_change(&mut self) -> Result<(), AppError> {
        self.mail("Update", "You changed your first name or your last name")
    }

    fn email_deactivated_user(&mut self) -> Result<(), AppError> {
        self.mail("You can not log in", "From now you can not log in.")
    }

    fn email_activated_user(&mut self) -> Result<(), AppError> {
        self.mail("You can log in", "From now you can log in.")
    }

    fn email_user_long_password(&mut self) -> Result<(), AppError> {
        self.mail(
            "Congratulations for long password",
            "You have really long password now!",
        )
    }

    fn email_user_got_worse_password(&mut self) -> Result<(), AppError> {
        self.mail(
            "Bad, very bad change of your password you made",
            "Bad, very bad",
        )
    }

    fn restrict_delete_boomer_account(&mut self) -> Result<(), AppError> {
        Err(AppError::CannotDeleteBoomer)
    }

    fn email_congratulation_to_elon(&mut self) -> Result<(), AppError> {
        self.mail("Welcome, Elon!", "Welcome to the test cases!")
    }
}

fn str_in(options: &'static [&'static str]) -> Condition {
    Condition::predicate(move |value| value.as_str().is_some_and(|s| options.contains(&s)))
}

fn str_len(check: fn(usize) -> bool) -> Condition {
    Condition::predicate(move |value| value.as_str().is_some_and(|s| check(s.chars().count())))
}

pub fn boomer_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1989, 12, 17, 0, 0, 0).unwrap()
}

fn joined_before_cutoff() -> Condition {
    Condition::predicate(|value| {
        serde_json::from_value::<DateTime<Utc>>(value.clone())
            .is_ok_and(|joined| joined < boomer_cutoff())
    })
}

impl LifecycleModel for UserAccount {
    type Error = AppError;

    fn lifecycle_state(&self) -> &LifecycleState {
        &self.lifecycle
    }

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
        &mut self.lifecycle
    }

    fn register_hooks(hooks: &mut HookRegistry<Self>) -> Result<(), ConfigError> {
        hooks
            .method("lowercase_email", Self::lowercase_email)
            .hook(hook(BEFORE_SAVE).when("email").is_not(Value::Null))?;
        hooks
            .method("timestamp_joined_at", Self::timestamp_joined_at)
            .hook(hook(BEFORE_CREATE))?;
        hooks
            .method("do_after_create_jobs", Self::do_after_create_jobs)
            .hook(hook(AFTER_CREATE))?;
        hooks
            .method("timestamp_password_change", Self::timestamp_password_change)
            .hook(hook(BEFORE_UPDATE).when("password").has_changed(true))?;
        hooks
            .method("ensure_trial_not_active", Self::ensure_trial_not_active)
            .hook(hook(BEFORE_DELETE).when("has_trial").was("*").is_now(true))?;
        hooks
            .method(
                "ensure_last_name_is_not_changed_to_flanders",
                Self::ensure_last_name_is_not_changed_to_flanders,
            )
            .hook(hook(BEFORE_UPDATE).when("last_name").changes_to("Flanders"))?;
        hooks
            .method("notify_org_name_change", Self::notify_org_name_change)
            .hook(
                hook(AFTER_UPDATE)
                    .when("organization.name")
                    .has_changed(true),
            )?;
        hooks
            .method(
                "notify_user_they_were_moved_to_online_school",
                Self::notify_user_they_were_moved_to_online_school,
            )
            .hook(
                hook(AFTER_UPDATE)
                    .when("organization.name")
                    .was("Hogwarts")
                    .is_now("Hogwarts Online"),
            )?;
        hooks
            .method("email_deleted_user", Self::email_deleted_user)
            .hook(hook(AFTER_DELETE))?;
        hooks
            .method("email_banned_user", Self::email_banned_user)
            .hook(hook(AFTER_UPDATE).when("status").was("active").is_now("banned"))?;
        hooks
            .method(
                "email_user_about_name_change",
                Self::email_user_about_name_change,
            )
            .hook(
                hook(AFTER_UPDATE)
                    .when_any(["first_name", "last_name"])
                    .has_changed(true),
            )?;
        hooks
            .method("email_deactivated_user", Self::email_deactivated_user)
            .hook(
                hook(AFTER_UPDATE)
                    .when("status")
                    .was("active")
                    .is_now(str_in(&["banned", "disabled"])),
            )?;
        hooks
            .method("email_activated_user", Self::email_activated_user)
            .hook(
                hook(AFTER_UPDATE)
                    .when("status")
                    .was(str_in(&["banned", "disabled"]))
                    .is_now("active"),
            )?;
        hooks
            .method("email_user_long_password", Self::email_user_long_password)
            .hook(
                hook(AFTER_SAVE)
                    .when("password")
                    .is_now(str_len(|len| len > 10)),
            )?;
        hooks
            .method(
                "email_user_got_worse_password",
                Self::email_user_got_worse_password,
            )
            .hook(
                hook(AFTER_UPDATE)
                    .when("password")
                    .was(str_len(|len| len > 5))
                    .is_now(str_len(|len| len < 3)),
            )?;
        hooks
            .method(
                "restrict_delete_boomer_account",
                Self::restrict_delete_boomer_account,
            )
            .hook(
                hook(BEFORE_DELETE)
                    .when("joined_at")
                    .is_now(joined_before_cutoff()),
            )?;
        hooks
            .method(
                "email_congratulation_to_elon",
                Self::email_congratulation_to_elon,
            )
            .hook(
                hook(AFTER_UPDATE)
                    .when("username")
                    .is_now(Condition::predicate(|value| value == "elon.musk")),
            )?;
        Ok(())
    }

    fn is_adding(&self) -> bool {
        self.id.is_none()
    }

    fn persist(&mut self) -> Result<(), AppError> {
        let id = match self.id {
            Some(id) => id,
            None => self.store.next_id(),
        };
        self.id = Some(id);
        let stored = self.clone();
        self.store.lock().accounts.insert(id, stored);
        Ok(())
    }

    fn remove(&mut self) -> Result<(), AppError> {
        if let Some(id) = self.id {
            self.store.lock().accounts.remove(&id);
        }
        Ok(())
    }

    fn field_kind(field: &str) -> FieldKind {
        match field {
            "organization" => FieldKind::foreign_key("organization"),
            _ => FieldKind::Plain,
        }
    }

    fn related(&self, relation: &str) -> Result<Option<Value>, ResolveError> {
        if relation != "organization" {
            return Err(ResolveError::UnknownRelation(relation.to_string()));
        }

        let Some(org_id) = self.organization_id else {
            return Ok(None);
        };

        let org = match &self.organization_cache {
            Some(cached) => cached.clone(),
            None => self
                .store
                .organization(org_id)
                .ok_or_else(|| ResolveError::DoesNotExist(format!("organization {org_id}")))?,
        };

        serde_json::to_value(org)
            .map(Some)
            .map_err(|err| ResolveError::Other(err.to_string()))
    }

    fn clear_cached_relation(&mut self, relation: &str) {
        if relation == "organization" {
            self.organization_cache = None;
        }
    }
}

/// A model whose primary key is assigned before it is ever saved.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCustomPk {
    pub id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub answer: Option<i64>,

    #[serde(skip)]
    pub persisted: bool,
    #[serde(skip)]
    lifecycle: LifecycleState,
}

impl ModelCustomPk {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: None,
            answer: None,
            persisted: false,
            lifecycle: LifecycleState::new(),
        }
        .tracked()
        .expect("ModelCustomPk hooks declare cleanly")
    }
}

impl LifecycleModel for ModelCustomPk {
    type Error = LifecycleError;

    fn lifecycle_state(&self) -> &LifecycleState {
        &self.lifecycle
    }

    fn lifecycle_state_mut(&mut self) -> &mut LifecycleState {
        &mut self.lifecycle
    }

    fn register_hooks(hooks: &mut HookRegistry<Self>) -> Result<(), ConfigError> {
        hooks
            .method("timestamp_created_at", |model: &mut Self| {
                model.created_at = Some(Utc::now());
                Ok(())
            })
            .hook(hook(BEFORE_CREATE))?;
        hooks
            .method(
                "answer_to_the_ultimate_question_of_life",
                |model: &mut Self| {
                    model.answer = Some(42);
                    Ok(())
                },
            )
            .hook(hook(AFTER_CREATE))?;
        Ok(())
    }

    fn is_adding(&self) -> bool {
        !self.persisted
    }

    fn persist(&mut self) -> lifecycle_hooks::Result<()> {
        self.persisted = true;
        Ok(())
    }

    fn remove(&mut self) -> lifecycle_hooks::Result<()> {
        self.persisted = false;
        Ok(())
    }
}
