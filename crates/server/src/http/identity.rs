use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

pub const ACTOR_HEADER: &str = "x-planzo-actor";
pub const ACTOR_NAME_HEADER: &str = "x-planzo-actor-name";

/// Fallback actor for unattributed calls (cron jobs, integrations).
pub const SYSTEM_ACTOR: &str = "system@planzo.local";

/// Resolved caller identity, attached to every API request. The session
/// layer in front of this service forwards the signed-in user through
/// the actor headers; cookie handling itself lives outside this crate.
#[derive(Debug, Clone)]
pub struct Identity {
    pub actor: String,
    pub actor_name: Option<String>,
}

impl Identity {
    fn from_headers(headers: &HeaderMap) -> Self {
        let actor = headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(SYSTEM_ACTOR)
            .to_string();
        let actor_name = headers
            .get(ACTOR_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Self { actor, actor_name }
    }
}

pub async fn attach_identity(mut request: Request, next: Next) -> Response {
    let identity = Identity::from_headers(request.headers());
    request.extensions_mut().insert(identity);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::*;

    #[test]
    fn identity_defaults_to_the_system_actor() {
        let identity = Identity::from_headers(&HeaderMap::new());
        assert_eq!(identity.actor, SYSTEM_ACTOR);
        assert!(identity.actor_name.is_none());
    }

    #[test]
    fn identity_reads_actor_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("ana@acme.dev"));
        headers.insert(ACTOR_NAME_HEADER, HeaderValue::from_static("Ana Alves"));

        let identity = Identity::from_headers(&headers);
        assert_eq!(identity.actor, "ana@acme.dev");
        assert_eq!(identity.actor_name.as_deref(), Some("Ana Alves"));
    }

    #[test]
    fn blank_header_values_fall_back_to_the_default() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("   "));

        let identity = Identity::from_headers(&headers);
        assert_eq!(identity.actor, SYSTEM_ACTOR);
    }
}
