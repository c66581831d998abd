//! Request extractors whose rejections use the API's JSON error body.

use crate::error::ClinicError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ClinicError))]
pub struct Payload<T>(pub T);

/// Query string parameters
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ClinicError))]
pub struct Params<T>(pub T);

/// Path segments, such as a record `:id`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ClinicError))]
pub struct PathParam<T>(pub T);
