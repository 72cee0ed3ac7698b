//! Google OAuth2 authentication
//!
//! Implements the OAuth2 authorization code flow shared by the Gmail
//! and Drive clients. Uses a local HTTP server to receive the OAuth
//! callback and synchronous HTTP (ureq) to be executor-agnostic.
//!
//! The rest of the crate treats the resulting access token as an opaque
//! bearer credential; nothing outside this module inspects it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

/// Token cache filename in the sift config directory
const TOKEN_FILE: &str = "google-tokens.json";

/// OAuth2 configuration and token management for Google APIs
pub struct GoogleAuth {
    client_id: String,
    client_secret: String,
}

/// Cached token data
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: String,
}

impl GoogleAuth {
    /// Google OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Scopes: read-only mail access plus read/write Drive access
    const SCOPES: &'static [&'static str] = &[
        "https://www.googleapis.com/auth/gmail.readonly",
        "https://www.googleapis.com/auth/drive",
    ];

    /// Port range to try for the local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Create a new GoogleAuth instance
    ///
    /// # Arguments
    /// * `client_id` - OAuth2 client ID from Google Cloud Console
    /// * `client_secret` - OAuth2 client secret from Google Cloud Console
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Get a valid access token, refreshing or re-authenticating as needed
    pub fn access_token(&self) -> Result<String> {
        // Try the cached token first
        if let Ok(token) = config::load_json::<StoredToken>(TOKEN_FILE) {
            // Still valid (with a 5 minute buffer)?
            if let Some(expires_at) = token.expires_at {
                let now = chrono::Utc::now().timestamp();
                if expires_at > now + 300 {
                    return Ok(token.access_token);
                }
            }

            if let Some(refresh_token) = token.refresh_token
                && let Ok(new_token) = self.refresh_access_token(&refresh_token)
            {
                self.save_token_response(&new_token)?;
                return Ok(new_token.access_token);
            }
        }

        // Need to authenticate from scratch
        let token = self.authorization_code_auth()?;
        self.save_token_response(&token)?;
        Ok(token.access_token)
    }

    /// Perform authorization code flow authentication
    fn authorization_code_auth(&self) -> Result<TokenResponse> {
        // Step 1: Start local server to receive the callback
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);

        // Step 2: Build authorization URL
        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&Self::SCOPES.join(" ")),
        );

        println!("\n=== Google Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        // Step 3: Wait for callback with the authorization code
        println!("Waiting for authorization...");
        let code = self.wait_for_callback(listener)?;

        // Step 4: Exchange code for tokens
        println!("Exchanging authorization code for tokens...");
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        println!("Authentication successful!\n");
        Ok(token)
    }

    /// Start a local TCP server on an available port
    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Wait for the OAuth callback and extract the authorization code
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        // Format: GET /?code=AUTH_CODE&scope=... HTTP/1.1
        let code = Self::query_param(&request_line, "code");
        let error = Self::query_param(&request_line, "error");

        // Send response to the browser
        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = error {
            anyhow::bail!("OAuth error: {}", err);
        }

        code.context("No authorization code received")
    }

    /// Extract a query parameter from the callback request line
    fn query_param(request_line: &str, name: &str) -> Option<String> {
        request_line
            .split_whitespace()
            .nth(1) // the path
            .and_then(|path| path.split('?').nth(1))
            .and_then(|query| {
                query.split('&').find_map(|param| {
                    let mut parts = param.split('=');
                    if parts.next() == Some(name) {
                        parts.next().map(|s| s.to_string())
                    } else {
                        None
                    }
                })
            })
    }

    /// Refresh an access token using a refresh token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Preserve the refresh token if not returned
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    /// Save a token response to the config directory
    fn save_token_response(&self, token: &TokenResponse) -> Result<()> {
        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token
                .expires_in
                .map(|d| chrono::Utc::now().timestamp() + d as i64),
        };
        config::save_json(TOKEN_FILE, &stored)
    }

    /// Check if a usable token is already cached
    pub fn is_authenticated(&self) -> bool {
        if let Ok(token) = config::load_json::<StoredToken>(TOKEN_FILE) {
            if let Some(expires_at) = token.expires_at {
                let now = chrono::Utc::now().timestamp();
                if expires_at > now + 300 {
                    return true;
                }
            }
            if let Some(refresh_token) = token.refresh_token {
                return self.refresh_access_token(&refresh_token).is_ok();
            }
        }
        false
    }

    /// Clear cached tokens (logout)
    pub fn logout(&self) -> Result<()> {
        config::remove(TOKEN_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let line = "GET /?code=abc123&scope=mail HTTP/1.1";
        assert_eq!(GoogleAuth::query_param(line, "code"), Some("abc123".to_string()));
        assert_eq!(GoogleAuth::query_param(line, "scope"), Some("mail".to_string()));
        assert_eq!(GoogleAuth::query_param(line, "error"), None);
    }

    #[test]
    fn test_query_param_error_callback() {
        let line = "GET /?error=access_denied HTTP/1.1";
        assert_eq!(
            GoogleAuth::query_param(line, "error"),
            Some("access_denied".to_string())
        );
        assert_eq!(GoogleAuth::query_param(line, "code"), None);
    }
}
