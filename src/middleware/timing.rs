// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request timing header.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;

pub const PROCESS_TIME_HEADER: &str = "X-Process-Time";

/// Report handler time in seconds as `X-Process-Time`.
pub async fn add_process_time_header(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed().as_secs_f64();

    if let Ok(value) = HeaderValue::from_str(&elapsed.to_string()) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }

    response
}
