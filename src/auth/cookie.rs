// Session cookie carrying the signed token

/// Cookie name for the session token
pub const TOKEN_COOKIE: &str = "token";

/// Cookie lifetime on issuance (7 days)
pub const SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

pub fn session_cookie(token: &str, secure: bool) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        TOKEN_COOKIE,
        token,
        SESSION_MAX_AGE_SECS,
        if secure { "; Secure" } else { "" }
    )
}

/// Expires the session cookie immediately
pub fn clear_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax{}",
        TOKEN_COOKIE,
        if secure { "; Secure" } else { "" }
    )
}
