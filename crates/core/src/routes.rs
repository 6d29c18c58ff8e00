//! Route table shared by the edge guard and the client session store.

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::login_errors::LoginErrorCode;

pub const LOGIN_ROUTE: &str = "/login";

/// Where a successful sign-in lands.
pub const LANDING_ROUTE: &str = "/dashboard";

/// Routes that require an authenticated session, matched as path prefixes.
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/try-now",
    "/readings",
    "/settings",
    "/profile",
];

/// Authentication pages. Never guarded.
pub const AUTH_ROUTES: &[&str] = &[
    "/login",
    "/signup",
    "/register",
    "/forgot-password",
    "/reset-password",
];

/// `true` when `path` equals `prefix` or continues it with a `/`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Strip any query string or fragment from a request target.
fn path_only(target: &str) -> &str {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    &target[..end]
}

/// The path a file server would resolve `target` to.
///
/// Drops any query, percent-decodes once, then collapses empty and `.`
/// segments and resolves `..`. A trailing slash is kept. `//dashboard/`,
/// `/%64ashboard/` and `/./dashboard/` all become `/dashboard/`.
pub fn canonical_path(target: &str) -> String {
    let decoded = percent_decode_str(path_only(target)).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if !segments.is_empty() && decoded.ends_with('/') {
        path.push('/');
    }
    path
}

pub fn is_protected_route(path: &str) -> bool {
    let path = canonical_path(path);
    PROTECTED_PREFIXES.iter().any(|p| matches_prefix(&path, p))
}

pub fn is_auth_route(path: &str) -> bool {
    let path = canonical_path(path);
    AUTH_ROUTES.iter().any(|p| matches_prefix(&path, p))
}

/// Build a login redirect target, e.g. `/login?error=session_expired&redirect=%2Fdashboard`.
pub fn login_redirect(code: Option<LoginErrorCode>, from: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(code) = code {
        query.append_pair("error", code.as_str());
    }
    if let Some(from) = from.filter(|f| !f.is_empty() && !is_auth_route(f)) {
        query.append_pair("redirect", from);
    }
    let query = query.finish();
    if query.is_empty() {
        LOGIN_ROUTE.to_string()
    } else {
        format!("{LOGIN_ROUTE}?{query}")
    }
}
