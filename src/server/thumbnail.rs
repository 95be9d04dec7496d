use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};

use crate::ThumbnailError;

/// Fetch an image and inline it as a `data:` URL
pub async fn fetch_thumbnail(client: &Client, url: &str) -> Result<String, ThumbnailError> {
    tracing::debug!("Proxying thumbnail: {}", url);

    let response = client.get(url).send().await?;
    if response.status() != StatusCode::OK {
        return Err(ThumbnailError::Status(response.status().as_u16()));
    }

    let image = response.bytes().await?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};
    use tokio::net::TcpListener;

    async fn image_server() -> String {
        let app = Router::new()
            .route("/thumb.jpg", get(|| async { vec![0xFFu8, 0xD8, 0xFF] }))
            .route("/missing.jpg", get(|| async { AxumStatus::NOT_FOUND }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_encodes_image() {
        let base = image_server().await;
        let data = fetch_thumbnail(&Client::new(), &format!("{}/thumb.jpg", base))
            .await
            .unwrap();
        assert_eq!(data, "data:image/jpeg;base64,/9j/");
    }

    #[tokio::test]
    async fn test_non_200_is_a_status_error() {
        let base = image_server().await;
        let err = fetch_thumbnail(&Client::new(), &format!("{}/missing.jpg", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Status(404)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let err = fetch_thumbnail(&Client::new(), "http://127.0.0.1:1/thumb.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Network(_)));
    }
}
