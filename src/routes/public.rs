use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::info;

use crate::{auth, error::AppError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/login", get(login_form).post(login_submit))
        .route("/signup", get(signup_form).post(signup_submit))
        .route("/logout", get(logout))
}

async fn root() -> Redirect {
    Redirect::temporary("/fleet-dashboard")
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    show_error: bool,
    error_message: String,
    email: String,
}

async fn login_form() -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LoginTemplate {
        show_error: false,
        error_message: String::new(),
        email: String::new(),
    })
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
struct SignupTemplate {
    show_error: bool,
    error_message: String,
    email: String,
}

async fn signup_form() -> impl IntoResponse {
    AskamaTemplateResponse::into_response(SignupTemplate {
        show_error: false,
        error_message: String::new(),
        email: String::new(),
    })
}

#[derive(Deserialize)]
struct CredentialsForm {
    email: String,
    #[serde(default)]
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    match state.authenticator.authenticate(&form.email, &form.password) {
        Ok(identity) => {
            info!("session opened for {}", identity.email);
            Ok((auth::apply_session_cookie(jar, &identity), Redirect::to("/")).into_response())
        }
        Err(AppError::Unauthorized) => Ok(render_error(AskamaTemplateResponse::into_response(
            LoginTemplate {
                show_error: true,
                error_message: "Login failed, please check your email address.".into(),
                email: form.email,
            },
        ))),
        Err(err) => Err(err),
    }
}

async fn signup_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    match state.authenticator.authenticate(&form.email, &form.password) {
        Ok(identity) => {
            info!("account created for {}", identity.email);
            Ok((auth::apply_session_cookie(jar, &identity), Redirect::to("/")).into_response())
        }
        Err(AppError::Unauthorized) => Ok(render_error(AskamaTemplateResponse::into_response(
            SignupTemplate {
                show_error: true,
                error_message: "Please enter an email address.".into(),
                email: form.email,
            },
        ))),
        Err(err) => Err(err),
    }
}

fn render_error(page: Response) -> Response {
    (StatusCode::BAD_REQUEST, page).into_response()
}

async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (auth::clear_session_cookie(jar), Redirect::to("/login"))
}
