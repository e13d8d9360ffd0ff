//! Request interceptor: the entry point every request passes through.
//!
//! # States
//! ```text
//! Start → GeneralLimitCheck → Inspect → RouteClassify
//!       → AuthLimitCheck?  (auth routes)
//!       → BruteForceCheck? (login route on POST)
//!       → Forward → OutcomeRecord? (login route) → End
//!
//! Any check may end in Rejected (429 or 400, JSON body).
//! ```
//!
//! # Design Decisions
//! - Identity faults forward the request unprotected (fail open)
//! - An unreadable account identifier skips both the pre-check and the
//!   outcome record for that request
//! - The outcome is recorded only after a response is observed; a dropped
//!   request future records nothing

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http::request::{peek_login_account, BodyReadError};
use crate::http::response::{panic_response, DownstreamFault, Rejection};
use crate::observability::metrics;
use crate::routing::RouteClass;
use crate::security::headers::with_hardening_headers;
use crate::security::{resolve_client_key, ClientKey, Clock, Decision, LimiterKind, LoginCheck, Shield};

/// Wrap `app` with the full protection layer.
///
/// Layer order, outermost first: hardening headers, panic catcher, interceptor.
pub fn protect<S>(app: Router<S>, shield: Arc<Shield>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let app = app
        .layer(middleware::from_fn_with_state(shield, intercept))
        .layer(CatchPanicLayer::custom(panic_response));
    with_hardening_headers(app)
}

/// Middleware sequencing the limiter, inspection and brute-force checks.
pub async fn intercept(State(shield): State<Arc<Shield>>, request: Request<Body>, next: Next) -> Response {
    let now = shield.clock.now();
    let client = match resolve_client_key(&request, shield.options.trust_forwarded_headers) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, path = %request.uri().path(), "Client identity unresolved, forwarding unprotected");
            metrics::record_fail_open("identity");
            metrics::record_request("unprotected");
            return next.run(request).await;
        }
    };

    if let Decision::Rejected { retry_after } = shield.general.check(&client, now) {
        return throttled(LimiterKind::General, &client, retry_after);
    }

    if let Some(finding) = shield.inspector.inspect(&request) {
        tracing::warn!(
            client = %client,
            finding = %finding,
            suspicious_activity = true,
            "Suspicious request rejected"
        );
        return reject(Rejection::Malformed);
    }

    let route = shield.routes.classify(request.method(), request.uri().path());

    if route.is_auth() {
        if let Decision::Rejected { retry_after } = shield.auth.check(&client, now) {
            return throttled(LimiterKind::Auth, &client, retry_after);
        }
    }

    if route != RouteClass::Login {
        metrics::record_request("forwarded");
        return next.run(request).await;
    }

    let peeked = match peek_login_account(
        request,
        shield.options.max_login_body_bytes,
        &shield.options.account_fields,
    )
    .await
    {
        Ok(peeked) => peeked,
        Err(BodyReadError::TooLarge { limit }) => {
            tracing::warn!(client = %client, limit, suspicious_activity = true, "Login body over limit");
            return reject(Rejection::PayloadTooLarge);
        }
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "Login body unreadable");
            return reject(Rejection::Malformed);
        }
    };
    let request = peeked.request;

    let account = match peeked.account {
        Ok(account) => account,
        Err(e) => {
            tracing::error!(client = %client, error = %e, "Login account unreadable, skipping brute-force check");
            metrics::record_fail_open("body");
            metrics::record_request("unprotected");
            return next.run(request).await;
        }
    };

    if let LoginCheck::Locked { retry_after } = shield.guard.pre_check(&client, &account, now) {
        tracing::warn!(
            client = %client,
            account = %account,
            retry_after_secs = retry_after.as_secs(),
            security_event = true,
            "Login locked out after repeated failures"
        );
        return reject(Rejection::LockedOut { retry_after });
    }

    metrics::record_request("forwarded");
    let response = next.run(request).await;

    if response.extensions().get::<DownstreamFault>().is_some() {
        tracing::error!(client = %client, account = %account, "Login not answered by application, outcome not recorded");
        return response;
    }

    let status = response.status();
    let success = shield.options.login_success.is_success(status.as_u16());
    shield.guard.record_outcome(&client, &account, success, shield.clock.now());
    if !success {
        let failures = shield.guard.failures(&client, &account, shield.clock.now());
        if failures >= shield.options.max_login_attempts as usize {
            tracing::warn!(
                client = %client,
                account = %account,
                failures,
                security_event = true,
                "Login failure threshold reached"
            );
        }
    }
    response
}

fn throttled(kind: LimiterKind, client: &ClientKey, retry_after: std::time::Duration) -> Response {
    tracing::warn!(
        limiter = kind.as_str(),
        client = %client,
        retry_after_secs = retry_after.as_secs(),
        "Rate limit exceeded"
    );
    let rejection = match kind {
        LimiterKind::General => Rejection::Throttled { retry_after },
        LimiterKind::Auth => Rejection::AuthThrottled { retry_after },
    };
    reject(rejection)
}

fn reject(rejection: Rejection) -> Response {
    metrics::record_rejection(rejection.reason());
    metrics::record_request("rejected");
    rejection.into_response()
}
