// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request extractors whose rejections are [`AppError`]s, so malformed
//! input gets the same `{success, message}` body as every other error.

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::{header, request::Parts};
use serde::de::DeserializeOwned;

/// JSON request body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Query string parameters.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(QueryParams(value))
    }
}

/// `multipart/form-data` body.
pub struct MultipartBody(pub Multipart);

impl<S> FromRequest<S> for MultipartBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MultipartBody(Multipart::from_request(req, state).await?))
    }
}

/// Body sent either as JSON or as `multipart/form-data`, chosen by the
/// request's content type. Anything not multipart is parsed as JSON.
pub enum JsonOrMultipart<T> {
    Json(T),
    Multipart(Multipart),
}

impl<S, T> FromRequest<S> for JsonOrMultipart<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let MultipartBody(multipart) = MultipartBody::from_request(req, state).await?;
            Ok(JsonOrMultipart::Multipart(multipart))
        } else {
            let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
            Ok(JsonOrMultipart::Json(value))
        }
    }
}
