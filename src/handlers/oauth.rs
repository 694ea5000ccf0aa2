// OAuth handlers: sign-in, callback, sign-out and the current-session lookup
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{debug, info};

use crate::oauth::{CallbackOrchestrator, FlowState, OAuthCallback};
use crate::session::cookie::extract_cookie_value;
use crate::session::{OAUTH_STATE_COOKIE, SESSION_COOKIE};
use crate::utils::logging::LoggingHelper;
use crate::utils::response_builder::ResponseBuilder;

/// `GET /auth/{provider}`: start a login attempt
///
/// # Errors
///
/// Never fails at the actix level; disabled providers yield a 404 response
pub async fn oauth_sign_in(
    path: web::Path<String>,
    orchestrator: web::Data<CallbackOrchestrator>,
) -> Result<HttpResponse> {
    let provider = path.into_inner();

    match orchestrator.start(&provider) {
        Ok(started) => {
            info!("Redirecting to {provider} OAuth");
            Ok(ResponseBuilder::redirect(
                started.authorization_url.as_str(),
                Some(vec![started.state_cookie]),
            ))
        }
        Err(e) => {
            debug!("Sign-in rejected for '{provider}': {e}");
            Ok(ResponseBuilder::flow_error(&e, Vec::new()))
        }
    }
}

/// `GET /auth/{provider}/callback`: finish a login attempt
///
/// # Errors
///
/// Never fails at the actix level; flow errors are rendered as plain-text responses
pub async fn oauth_callback(
    path: web::Path<String>,
    query: web::Query<OAuthCallback>,
    req: HttpRequest,
    orchestrator: web::Data<CallbackOrchestrator>,
) -> Result<HttpResponse> {
    let provider = path.into_inner();
    LoggingHelper::log_callback_debug(&req, &provider);

    let stored_state = extract_cookie_value(&req, OAUTH_STATE_COOKIE);
    match orchestrator
        .complete(&provider, &query, stored_state.as_deref())
        .await
    {
        Ok(completed) => Ok(ResponseBuilder::success_redirect_with_cookies(
            &completed.redirect_to,
            vec![completed.session_cookie, completed.clear_state_cookie],
        )),
        Err(e) => {
            // Rejected callbacks leave the state cookie in place
            let cookies = if e.terminal_state() == FlowState::Failed {
                vec![orchestrator.cookies().create_expired_state_cookie()]
            } else {
                Vec::new()
            };
            Ok(ResponseBuilder::flow_error(&e, cookies))
        }
    }
}

/// `GET|POST /auth/logout`: clear the session and any pending state
///
/// # Errors
///
/// Never fails
pub async fn oauth_sign_out(orchestrator: web::Data<CallbackOrchestrator>) -> Result<HttpResponse> {
    let cookies = orchestrator.cookies();
    info!("User signed out; session cookie cleared");
    Ok(ResponseBuilder::success_redirect_with_cookies(
        "/",
        vec![
            cookies.create_expired_session_cookie(),
            cookies.create_expired_state_cookie(),
        ],
    ))
}

/// `GET /auth/me`: the verified credential of the current session
///
/// # Errors
///
/// Never fails; a missing or invalid session yields a 401 JSON response
pub async fn oauth_userinfo(
    req: HttpRequest,
    orchestrator: web::Data<CallbackOrchestrator>,
) -> Result<HttpResponse> {
    let Some(token) = extract_cookie_value(&req, SESSION_COOKIE) else {
        return Ok(ResponseBuilder::unauthorized());
    };

    match orchestrator.issuer().verify(&token) {
        Ok(credential) => Ok(HttpResponse::Ok().json(credential)),
        Err(e) => {
            debug!("Rejected session cookie: {e}");
            Ok(ResponseBuilder::unauthorized())
        }
    }
}
