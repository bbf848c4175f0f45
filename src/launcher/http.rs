//! HTTP commands — fire-and-forget requests from launch text.
//!
//! Requests run detached so a slow endpoint can never stall the
//! dispatch pipeline. Failures are logged, not reported.

use super::LaunchError;

/// `**http.get:<url>`
pub fn get(url: &str) {
    let url = url.to_string();
    tokio::spawn(async move {
        match reqwest::get(&url).await {
            Ok(resp) => {
                tracing::debug!(url = %url, status = %resp.status(), "http.get completed");
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "http.get failed");
            }
        }
    });
}

/// `**http.post:<url>,<content type>,<body>`
pub fn post(args: &str) -> Result<(), LaunchError> {
    let mut parts = args.splitn(3, ',');
    let (Some(url), Some(format), Some(data)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(LaunchError::InvalidPostFormat(args.to_string()));
    };
    let url = url.trim().to_string();
    let format = format.trim().to_string();
    let data = data.trim().to_string();

    tokio::spawn(async move {
        let client = reqwest::Client::new();
        match client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, format)
            .body(data)
            .send()
            .await
        {
            Ok(resp) => {
                tracing::debug!(url = %url, status = %resp.status(), "http.post completed");
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "http.post failed");
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_requires_three_fields() {
        assert!(post("http://localhost:1,application/json").is_err());
        assert!(post("http://localhost:1, text/plain , {\"a\":1,\"b\":2}").is_ok());
    }
}
