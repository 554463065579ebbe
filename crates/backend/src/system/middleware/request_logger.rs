use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Local;
use std::fmt;
use std::time::{Duration, Instant};

use crate::shared::format::format_number;

/// Одна строка журнала запросов
struct RequestLine<'a> {
    duration: Duration,
    /// None, если тело ответа не удалось прочитать
    size: Option<usize>,
    status: StatusCode,
    method: &'a Method,
    path: &'a str,
}

impl fmt::Display for RequestLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.size {
            Some(bytes) => format_number(bytes),
            None => "error".to_string(),
        };
        write!(
            f,
            "{:>5}ms | {:>12} | {} {:>6} {}",
            self.duration.as_millis(),
            size,
            self.status.as_u16(),
            self.method.as_str(),
            self.path
        )
    }
}

/// Голубой для успешных ответов, коричневый для остальных
fn color_code(status: StatusCode, size: Option<usize>) -> &'static str {
    if status.is_success() && size.is_some() {
        "36"
    } else {
        "33"
    }
}

/// Middleware для логирования HTTP запросов
///
/// Выводит в консоль время, длительность, размер ответа, статус, метод и путь.
/// Ошибочные статусы дополнительно попадают в tracing.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;
    let (parts, body) = response.into_parts();

    // Читаем тело ответа, чтобы узнать реальный размер
    let bytes = to_bytes(body, usize::MAX).await.ok();

    let line = RequestLine {
        duration: start.elapsed(),
        size: bytes.as_ref().map(|b| b.len()),
        status: parts.status,
        method: &method,
        path: uri.path(),
    };

    println!(
        "\x1b[{}m{}\x1b[0m | {}",
        color_code(line.status, line.size),
        Local::now().format("%H:%M:%S"),
        line
    );
    if !line.status.is_success() {
        tracing::warn!("{}", line);
    }

    let body = bytes.map(Body::from).unwrap_or_default();
    Response::from_parts(parts, body)
}
