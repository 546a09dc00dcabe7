//! Deposit form: input cleaning, field checks, the record payload it
//! produces and the page state machine.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::error::CoreError;
use crate::schema::FieldViolation;
use crate::types::{DbId, JsonMap};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_CONTRIBUTOR_NAME: &str = "contributor_name";
/// Key for errors that belong to no single input.
pub const FIELD_FORM: &str = "_form";

const MSG_FIELD_REQUIRED: &str = "This field is required.";

/// Raw form body as posted by the browser. Missing inputs deserialize as
/// empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contributor_name: String,
}

/// Cleaned form values.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct DepositForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub contributor_name: String,
}

impl From<DepositInput> for DepositForm {
    fn from(input: DepositInput) -> Self {
        Self {
            title: input.title.trim().to_string(),
            contributor_name: input.contributor_name.trim().to_string(),
        }
    }
}

impl DepositForm {
    /// Run the field checks, collecting one message per failing input.
    pub fn check(&self) -> Result<(), FormErrors> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let mut out = FormErrors::default();
        for (field, field_errors) in errors.field_errors() {
            let message = field_errors
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| MSG_FIELD_REQUIRED.to_string());
            out.insert(field.to_string(), message);
        }
        Err(out)
    }

    /// Record metadata for a single-contributor deposit.
    pub fn to_payload(&self, owner: Option<DbId>) -> JsonMap {
        let mut payload = JsonMap::new();
        payload.insert("title".into(), json!(self.title));
        payload.insert(
            "contributors".into(),
            json!([{ "name": self.contributor_name }]),
        );
        if let Some(owner) = owner {
            payload.insert("owner".into(), json!(owner));
        }
        payload
    }
}

/// Error messages keyed by form input name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, String>);

impl FormErrors {
    /// Keep the first message reported for a field.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Map record schema violations onto the inputs that produced them.
    pub fn from_violations(violations: &[FieldViolation]) -> Self {
        let mut out = FormErrors::default();
        for v in violations {
            let field = if v.field == "title" {
                FIELD_TITLE
            } else if v.field == "contributors" || v.field.starts_with("contributors.") {
                FIELD_CONTRIBUTOR_NAME
            } else {
                FIELD_FORM
            };
            out.insert(field, v.message.clone());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositState {
    Idle,
    FormPresented,
    FormSubmitted,
    Validated,
    Invalid,
    Created,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositEvent {
    Present,
    Submit,
    Accept,
    Reject,
    Persist,
    Redirect,
}

impl DepositState {
    pub fn next(self, event: DepositEvent) -> Result<Self, CoreError> {
        use DepositEvent as E;
        use DepositState as S;
        match (self, event) {
            (S::Idle | S::Invalid, E::Present) => Ok(S::FormPresented),
            (S::FormPresented, E::Submit) => Ok(S::FormSubmitted),
            (S::FormSubmitted, E::Accept) => Ok(S::Validated),
            (S::FormSubmitted | S::Validated, E::Reject) => Ok(S::Invalid),
            (S::Validated, E::Persist) => Ok(S::Created),
            (S::Created, E::Redirect) => Ok(S::Success),
            (state, event) => Err(CoreError::Internal(format!(
                "Illegal deposit transition {event:?} from {state:?}"
            ))),
        }
    }
}
