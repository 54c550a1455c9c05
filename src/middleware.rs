use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::Layer;
use tower::Service;

use crate::authorizer::{Authenticated, Decision};
use crate::axum_integration::operation_key;
use crate::plugin::CompiledRoles;

/// Middleware layer enforcing compiled role requirements
///
/// Must run after the authenticators, which insert [`Authenticated`] into
/// the request extensions, and before the handlers.
#[derive(Clone)]
pub struct RolesLayer {
    roles: CompiledRoles,
}

impl RolesLayer {
    pub fn new(roles: CompiledRoles) -> Self {
        Self { roles }
    }
}

impl<S> Layer<S> for RolesLayer {
    type Service = RolesMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RolesMiddleware {
            inner,
            roles: self.roles.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RolesMiddleware<S> {
    inner: S,
    roles: CompiledRoles,
}

impl<S> RolesMiddleware<S> {
    fn decide(&self, request: &Request) -> Decision {
        let Some(key) = operation_key(request) else {
            tracing::warn!(uri = %request.uri(), "No operation key for request, skipping role check");
            return Decision::Allow;
        };
        let key = self.roles.requirement_key(&key);
        self.roles
            .authorize(&key, request.extensions().get::<Authenticated>())
    }
}

impl<S> Service<Request> for RolesMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let decision = self.decide(&request);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match decision {
                Decision::Allow => inner.call(request).await,
                Decision::Deny(forbidden) => Ok(forbidden.into_response()),
            }
        })
    }
}
