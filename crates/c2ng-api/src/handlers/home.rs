use axum::response::Html;

/// Unauthenticated homepage.
pub async fn homepage() -> Html<&'static str> {
    Html("<html><body><h1>C2NG</h1></body></html>")
}
