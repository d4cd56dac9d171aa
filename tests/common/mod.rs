//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;

use github_signin::{AppState, config};
use tokio::net::TcpListener;
use wiremock::MockServer;

/// Test server instance
///
/// Runs the full router on an ephemeral port, with every GitHub
/// endpoint pointed at a wiremock server.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        let github = MockServer::start().await;

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            github: config::GitHubOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                redirect_uri: "http://localhost:8080/callback".to_string(),
                authorize_url: format!("{}/login/oauth/authorize", github.uri()),
                token_url: format!("{}/login/oauth/access_token", github.uri()),
                user_url: format!("{}/user", github.uri()),
                user_agent: "github-signin-tests".to_string(),
                timeout_seconds: 5,
                token_placement: config::TokenPlacement::Header,
            },
            session: config::SessionConfig {
                secret: "test-secret-key-32-bytes-long!!!".to_string(),
                cookie_name: "sid".to_string(),
                ttl_seconds: 3600,
                secure: Some(false),
                http_only: true,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = github_signin::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            github,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A fresh browser with no cookies
    pub fn browser(&self) -> Browser {
        Browser {
            base: self.addr.clone(),
            client: no_redirect_client(),
            cookies: HashMap::new(),
        }
    }
}

pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Minimal cookie-keeping client that never follows redirects
pub struct Browser {
    base: String,
    client: reqwest::Client,
    pub cookies: HashMap<String, String>,
}

impl Browser {
    /// GET a path, sending and then absorbing cookies
    pub async fn get(&mut self, path: &str) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{}", self.base, path));
        if let Some(header) = self.cookie_header() {
            request = request.header("Cookie", header);
        }

        let response = request.send().await.expect("request succeeds");
        self.absorb(&response);
        response
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn absorb(&mut self, response: &reqwest::Response) {
        for header in response.headers().get_all("set-cookie") {
            let Ok(header) = header.to_str() else {
                continue;
            };
            let pair = header.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };

            let removed = value.is_empty() || header.contains("Max-Age=0");
            if removed {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// Value of one query parameter in an absolute URL
pub fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
