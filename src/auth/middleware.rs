use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::app::AppState;
use crate::auth::gate::{authenticate, AuthFailure};
use crate::error::AppError;

/// Requests that may pass without a session token.
fn is_public(method: &Method, path: &str) -> bool {
    match (method, path) {
        (&Method::GET, "/health") => true,
        (&Method::POST, "/users") | (&Method::POST, "/users/login") => true,
        (&Method::GET, path) => path
            .strip_prefix("/users/")
            .and_then(|rest| rest.strip_suffix("/avatar"))
            .map_or(false, |id| !id.is_empty() && !id.contains('/')),
        _ => false,
    }
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        if is_public(req.method(), req.path()) {
            return Box::pin(async move {
                service
                    .call(req)
                    .await
                    .map(ServiceResponse::map_into_left_body)
            });
        }

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| AppError::InternalServerError("AppState is not registered".into()))?;

            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            match authenticate(state.store.as_ref(), &state.tokens, authorization.as_deref()).await {
                Ok(ctx) => {
                    req.extensions_mut().insert(ctx);
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                }
                Err(AuthFailure::Store(e)) => {
                    let response = AppError::DatabaseError(format!(
                        "store failure during authentication: {}",
                        e
                    ))
                    .error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
                Err(failure) => {
                    log::debug!("Rejected {} {}: {}", req.method(), req.path(), failure);
                    let response = AppError::Unauthorized(failure.to_string()).error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
