use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::account::MailAccount;
use crate::error::MailError;
use crate::session::SessionWorkflow;
use crate::web::http::{Request, Response};
use crate::web::pages;

const SCRIPT_JS: &str = include_str!("../../static/js/script.js");

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<SessionWorkflow>,
    /// Upper bound for any request that talks to a mail server.
    pub request_timeout: Duration,
}

pub async fn handle(req: &Request, state: &AppState) -> Response {
    let method = req.method.as_str();
    let path = req.path.as_str();

    if let Some(index) = path.strip_prefix("/select_account/") {
        return match method {
            "GET" => select_account(index, state),
            _ => not_allowed(),
        };
    }

    match (method, path) {
        ("GET", "/") => Response::html(200, pages::index(&state.workflow.snapshot())),

        ("GET", "/add_account") => Response::html(200, pages::add_account()),
        ("POST", "/add_account") => add_account(req, state).await,

        ("GET", "/fetch_emails") => match run_blocking(state, |wf| wf.fetch()).await {
            Ok(list) => Response::html(200, pages::messages(&list)),
            Err(resp) => resp,
        },

        ("GET", "/send_email") => {
            let from = state.workflow.current().map(|a| a.username);
            Response::html(200, pages::send_email(from.as_deref()))
        }
        ("POST", "/send_email") => send_email(req, state).await,

        ("GET", "/static/js/script.js") => Response::asset("application/javascript", SCRIPT_JS),

        (_, "/" | "/add_account" | "/fetch_emails" | "/send_email" | "/static/js/script.js") => not_allowed(),
        _ => error_page(404, "not found"),
    }
}

fn select_account(index: &str, state: &AppState) -> Response {
    let Ok(index) = index.parse::<usize>() else {
        return error_page(404, "not found");
    };
    match state.workflow.select(index) {
        Ok(()) => Response::see_other("/"),
        Err(e) => mail_error(&e),
    }
}

async fn add_account(req: &Request, state: &AppState) -> Response {
    let form = req.form();
    let field = |name: &str| form.get(name).cloned().unwrap_or_default();
    // ports that don't parse become 0, the same as an empty field
    let port = |name: &str| form.get(name).and_then(|v| v.trim().parse::<u16>().ok()).unwrap_or(0);

    let account = MailAccount {
        username: field("username"),
        password: field("password"),
        imap_server: field("imap_server"),
        imap_port: port("imap_port"),
        smtp_server: field("smtp_server"),
        smtp_port: port("smtp_port"),
    };

    match run_local(state, move |wf| wf.add(account)).await {
        Ok(()) => Response::see_other("/"),
        Err(resp) => resp,
    }
}

async fn send_email(req: &Request, state: &AppState) -> Response {
    let form = req.form();
    let field = |name: &str| form.get(name).cloned().unwrap_or_default();
    let (to, subject, body) = (field("to"), field("subject"), field("body"));

    match run_blocking(state, move |wf| wf.send(&to, &subject, &body)).await {
        Ok(()) => Response::see_other("/"),
        Err(resp) => resp,
    }
}

/// Runs a blocking workflow call off the async threads, bounded by the request timeout.
async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&SessionWorkflow) -> Result<T, MailError> + Send + 'static,
{
    match tokio::time::timeout(state.request_timeout, spawn_work(state, f)).await {
        Ok(joined) => joined,
        Err(_) => Err(mail_error(&MailError::Timeout(state.request_timeout))),
    }
}

/// Unbounded variant for local disk work; the page answers only once the call is done.
async fn run_local<T, F>(state: &AppState, f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&SessionWorkflow) -> Result<T, MailError> + Send + 'static,
{
    spawn_work(state, f).await
}

async fn spawn_work<T, F>(state: &AppState, f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&SessionWorkflow) -> Result<T, MailError> + Send + 'static,
{
    let wf = state.workflow.clone();
    match tokio::task::spawn_blocking(move || f(&wf)).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(mail_error(&e)),
        Err(join) => {
            error!("worker task failed: {join}");
            Err(error_page(500, "internal error"))
        }
    }
}

fn mail_error(e: &MailError) -> Response {
    error_page(e.status(), &e.to_string())
}

fn error_page(status: u16, message: &str) -> Response {
    Response::html(status, pages::error(status, message))
}

fn not_allowed() -> Response {
    error_page(405, "method not allowed")
}
