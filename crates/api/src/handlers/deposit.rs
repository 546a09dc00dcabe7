//! Deposit form handlers.
//!
//! A submission walks the [`DepositState`] machine: the form is checked,
//! turned into a record payload owned by the submitting user and handed to
//! the Record Store. Failures at either step re-render the form with
//! field-level messages and persist nothing.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use mysite_core::deposit::{DepositEvent, DepositForm, DepositInput, DepositState, FormErrors};
use mysite_core::error::CoreError;
use mysite_core::permissions::{Actor, Operation};
use mysite_db::store::StoreError;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentActor;
use crate::state::AppState;
use crate::views::{self, DepositValues};

const CREATE_PATH: &str = "/deposit/create";
const SUCCESS_PATH: &str = "/deposit/success";

/// GET /deposit/create
pub async fn show_form(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
) -> AppResult<Response> {
    if let Some(redirect) = login_redirect(&state, &actor)? {
        return Ok(redirect);
    }
    DepositState::Idle.next(DepositEvent::Present)?;

    Ok(Html(views::deposit_form_page(
        &DepositValues::default(),
        &FormErrors::default(),
    ))
    .into_response())
}

/// POST /deposit/create
///
/// Valid submissions answer `303 See Other` to the success page; invalid
/// ones re-render the form with a 200.
pub async fn submit_form(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Form(input): Form<DepositInput>,
) -> AppResult<Response> {
    if let Some(redirect) = login_redirect(&state, &actor)? {
        return Ok(redirect);
    }

    let flow = DepositState::Idle
        .next(DepositEvent::Present)?
        .next(DepositEvent::Submit)?;
    let form = DepositForm::from(input);

    if let Err(errors) = form.check() {
        return rerender(flow, &form, &errors);
    }
    let flow = flow.next(DepositEvent::Accept)?;

    let endpoint = &state.site().records;
    let payload = form.to_payload(actor.user_id);
    endpoint
        .permissions
        .create
        .require(&actor, &payload, Operation::Create)?;

    let record = match state.store.create(endpoint, &payload).await {
        Ok(record) => record,
        Err(StoreError::Core(CoreError::Schema(violations))) => {
            return rerender(flow, &form, &FormErrors::from_violations(&violations));
        }
        Err(e) => return Err(e.into()),
    };
    let flow = flow
        .next(DepositEvent::Persist)?
        .next(DepositEvent::Redirect)?;

    tracing::info!(
        pid_value = %record.pid_value,
        user_id = ?actor.user_id,
        state = ?flow,
        "Deposit created record"
    );

    Ok(Redirect::to(SUCCESS_PATH).into_response())
}

/// GET /deposit/success
pub async fn success() -> Html<String> {
    Html(views::deposit_success_page())
}

/// Redirect anonymous users to the login page when deposits require
/// authentication.
fn login_redirect(state: &AppState, actor: &Actor) -> AppResult<Option<Response>> {
    let deposit = &state.site().deposit;
    if !deposit.require_auth || actor.is_authenticated() {
        return Ok(None);
    }
    let query = serde_urlencoded::to_string([("next", CREATE_PATH)])
        .map_err(|e| AppError::InternalError(format!("Failed to encode login redirect: {e}")))?;
    let target = format!("{}?{query}", deposit.login_url);
    Ok(Some(Redirect::to(&target).into_response()))
}

fn rerender(flow: DepositState, form: &DepositForm, errors: &FormErrors) -> AppResult<Response> {
    let flow = flow
        .next(DepositEvent::Reject)?
        .next(DepositEvent::Present)?;
    tracing::debug!(state = ?flow, errors = ?errors, "Deposit form rejected");

    let values = DepositValues {
        title: &form.title,
        contributor_name: &form.contributor_name,
    };
    Ok(Html(views::deposit_form_page(&values, errors)).into_response())
}
