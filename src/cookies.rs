//! Cookie relay between the upstream API and the browser-facing cookie jar.
//!
//! The upstream issues its CSRF and session cookies on its own responses; this
//! module parses those `Set-Cookie` strings, re-emits them on the outgoing
//! response with normalized attributes, and maintains the merged
//! [`CookieView`] used to build the `Cookie` header for the next upstream hop.

use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc2822};

/// Canonical Sanctum session cookie name (hyphen).
pub const SESSION_COOKIE: &str = "laravel-session";
/// Legacy session cookie name (underscore). Read for compatibility, never written.
pub const LEGACY_SESSION_COOKIE: &str = "laravel_session";
/// Double-submit CSRF cookie; its URL-decoded value goes into `X-XSRF-TOKEN`.
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

/// A single parsed `Set-Cookie` entry.
///
/// Attributes are kept optional here; defaults are decided when the cookie is
/// rendered for the outgoing response, because the `Secure` default depends on
/// the runtime mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedCookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<OffsetDateTime>,
    pub max_age: Option<i64>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub same_site: Option<SameSite>,
}

impl RelayedCookie {
    /// Materialize with the defaulted attributes filled in: path `/`,
    /// httpOnly on, sameSite lax, secure only in production.
    pub fn to_cookie(&self, secure_default: bool) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()))
            .path(self.path.clone().unwrap_or_else(|| "/".to_string()))
            .http_only(self.http_only.unwrap_or(true))
            .secure(self.secure.unwrap_or(secure_default))
            .same_site(self.same_site.unwrap_or(SameSite::Lax));

        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(seconds) = self.max_age {
            builder = builder.max_age(Duration::seconds(seconds));
        }
        if let Some(at) = self.expires {
            builder = builder.expires(at);
        }

        builder.build()
    }
}

/// Parse one raw `Set-Cookie` string.
///
/// The first `;`-segment must be `name=value` with both sides non-empty;
/// anything else yields `None`. Remaining segments are attribute pairs with
/// case-insensitive keys. Unrecognized attributes and unparseable attribute
/// values are dropped, not errors.
pub fn parse_set_cookie(raw: &str) -> Option<RelayedCookie> {
    let mut segments = raw.split(';');

    let (name, value) = segments.next()?.trim().split_once('=')?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return None;
    }

    let mut cookie = RelayedCookie {
        name: name.to_string(),
        value: value.to_string(),
        path: None,
        domain: None,
        expires: None,
        max_age: None,
        secure: None,
        http_only: None,
        same_site: None,
    };

    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, val) = match segment.split_once('=') {
            Some((key, val)) => (key.trim().to_ascii_lowercase(), val.trim()),
            None => (segment.to_ascii_lowercase(), ""),
        };
        match key.as_str() {
            "expires" => cookie.expires = parse_cookie_date(val),
            "max-age" => cookie.max_age = val.parse().ok(),
            "path" if !val.is_empty() => cookie.path = Some(val.to_string()),
            "domain" if !val.is_empty() => cookie.domain = Some(val.to_string()),
            "secure" => cookie.secure = Some(true),
            "httponly" => cookie.http_only = Some(true),
            "samesite" => cookie.same_site = parse_same_site(val),
            _ => {}
        }
    }

    Some(cookie)
}

/// Parse a batch of raw `Set-Cookie` strings, preserving order and silently
/// skipping malformed entries. Best-effort relay: one bad entry never aborts
/// the batch.
pub fn parse_set_cookies<S: AsRef<str>>(raws: &[S]) -> Vec<RelayedCookie> {
    raws.iter()
        .filter_map(|raw| parse_set_cookie(raw.as_ref()))
        .collect()
}

/// Relayed cookies headed for the outgoing response.
///
/// `Set-Cookie` values are rendered with the upstream's cookie value passed
/// through verbatim. The response cookie jar percent-encodes on emission,
/// which would encode the upstream's already-encoded values a second time
/// (`abc%3D123` becoming `abc%253D123`) and the browser would store the
/// mangled form, breaking the double-submit round trip.
#[derive(Debug, Clone, Default)]
pub struct RelayJar {
    cookies: Vec<RelayedCookie>,
    secure_default: bool,
}

impl RelayJar {
    pub fn new(secure_default: bool) -> Self {
        Self {
            cookies: Vec::new(),
            secure_default,
        }
    }

    /// Add a batch in order; a later cookie overwrites an earlier one of the
    /// same name.
    pub fn extend(&mut self, relayed: Vec<RelayedCookie>) {
        for cookie in relayed {
            self.cookies.retain(|existing| existing.name != cookie.name);
            self.cookies.push(cookie);
        }
    }

    /// Rendered `Set-Cookie` header values, in application order, with the
    /// documented attribute defaults filled in.
    pub fn header_values(&self) -> Vec<String> {
        self.cookies
            .iter()
            .map(|cookie| cookie.to_cookie(self.secure_default).to_string())
            .collect()
    }
}

impl IntoResponseParts for RelayJar {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for value in self.header_values() {
            if let Ok(value) = HeaderValue::from_str(&value) {
                res.headers_mut().append(SET_COOKIE, value);
            }
        }
        Ok(res)
    }
}

fn parse_same_site(val: &str) -> Option<SameSite> {
    match val.to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "none" => Some(SameSite::None),
        _ => None,
    }
}

/// Cookie dates arrive as `Wed, 21 Oct 2015 07:28:00 GMT`; the time crate's
/// RFC 2822 parser wants a numeric zone, so normalize the trailing GMT.
fn parse_cookie_date(val: &str) -> Option<OffsetDateTime> {
    let normalized = match val.strip_suffix("GMT") {
        Some(rest) => format!("{rest}+0000"),
        None => val.to_string(),
    };
    OffsetDateTime::parse(&normalized, &Rfc2822).ok()
}

/// The effective cookie set for one logical operation, in application order.
///
/// A relay write only lands on the outgoing response; the inbound request's
/// cookie view is never updated implicitly. Every upstream hop therefore builds
/// its `Cookie` header from this explicit merge of the inbound cookies and the
/// freshly relayed ones, the relay output winning on name collisions.
#[derive(Debug, Clone, Default)]
pub struct CookieView(Vec<(String, String)>);

impl CookieView {
    pub fn from_jar(jar: &CookieJar) -> Self {
        let mut view = Self::default();
        for cookie in jar.iter() {
            view.insert(cookie.name().to_string(), cookie.value().to_string());
        }
        view
    }

    /// Apply in order; a later write for the same name replaces the value in
    /// place.
    pub fn merge_relayed(&mut self, cookies: &[RelayedCookie]) {
        for cookie in cookies {
            self.insert(cookie.name.clone(), cookie.value.clone());
        }
    }

    fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the `Cookie` request header value, raw (undecoded) values.
    pub fn header(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// URL-decoded CSRF token, or `None` when the cookie is absent.
    ///
    /// Callers must omit the `X-XSRF-TOKEN` header entirely on `None`; an
    /// empty header is rejected upstream differently from a missing one.
    pub fn csrf_token(&self) -> Option<String> {
        self.get(CSRF_COOKIE).map(|raw| {
            urlencoding::decode(raw)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
    }

    pub fn has_session(&self) -> bool {
        self.get(SESSION_COOKIE).is_some() || self.get(LEGACY_SESSION_COOKIE).is_some()
    }
}
