//! GraphQL authentication middleware and context extraction
//!
//! Provides helpers for:
//! - Extracting the bearer credential from the `Authorization` header
//! - Resolving it into a [`Principal`] and injecting it into the request
//! - Reading the principal back inside resolvers

use async_graphql::{Context, Request, Response, Schema};
use axum::{extract::Extension, http::HeaderMap, Json};

use crate::identity::{IdentityResolver, Principal};

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the caller of an HTTP request; `None` means anonymous
pub fn resolve_principal(headers: &HeaderMap, identity: &IdentityResolver) -> Option<Principal> {
    identity.resolve(extract_bearer(headers))
}

/// Standard GraphQL handler with principal injection
///
/// Anonymous requests are executed too; resolvers that need a caller reject
/// them with `AuthenticationRequired`.
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Extension, Router, routing::post};
/// use pleme_tasks::{auth::graphql_handler, schema::{MutationRoot, QueryRoot}};
/// use async_graphql::EmptySubscription;
///
/// # fn example(schema: pleme_tasks::TaskSchema, identity: pleme_tasks::IdentityResolver) {
/// let app: Router = Router::new()
///     .route("/graphql", post(graphql_handler::<QueryRoot, MutationRoot, EmptySubscription>))
///     .layer(Extension(schema))
///     .layer(Extension(identity));
/// # }
/// ```
pub async fn graphql_handler<Query, Mutation, Subscription>(
    Extension(schema): Extension<Schema<Query, Mutation, Subscription>>,
    Extension(identity): Extension<IdentityResolver>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response>
where
    Query: async_graphql::ObjectType + 'static,
    Mutation: async_graphql::ObjectType + 'static,
    Subscription: async_graphql::SubscriptionType + 'static,
{
    let mut request = req.0;

    if let Some(principal) = resolve_principal(&headers, &identity) {
        request = request.data(principal);
    }

    let response = schema.execute(request).await;

    Json(response)
}

/// Get the calling principal from GraphQL context
///
/// # Example
///
/// ```rust,no_run
/// use async_graphql::Context;
/// use pleme_tasks::auth::get_principal;
///
/// fn resolver(ctx: &Context<'_>) -> Option<pleme_tasks::Principal> {
///     get_principal(ctx).copied()
/// }
/// ```
pub fn get_principal<'a>(ctx: &'a Context<'_>) -> Option<&'a Principal> {
    ctx.data_opt::<Principal>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::identity::JwtCredentials;
    use crate::task::UserId;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn test_resolve_principal_from_headers() {
        let creds = Arc::new(JwtCredentials::new(
            &AuthConfig::new("0123456789abcdef0123456789abcdef").unwrap(),
        ));
        let identity = IdentityResolver::new(creds.clone());
        let user = UserId::new();
        let token = creds.issue(user).unwrap();

        let principal = resolve_principal(&headers(&format!("Bearer {}", token)), &identity);
        assert_eq!(principal, Some(Principal::new(user)));
        assert_eq!(resolve_principal(&headers("Bearer forged"), &identity), None);
    }
}
