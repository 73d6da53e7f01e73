//! Auth backend
//!
//! `HttpBackend` talks to the real API with reqwest. The manager only sees
//! the `AuthBackend` trait so tests can script responses.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::error::AuthError;
use crate::user::{LoginCredentials, TokenResponse, User};
use crate::Result;

const TOKEN_PATH: &str = "api/auth/login/access-token";
const PROFILE_PATH: &str = "api/users/me";

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for an access token.
    async fn request_token(&self, credentials: &LoginCredentials) -> Result<TokenResponse>;

    /// Fetch the profile of the user owning `access_token`.
    async fn fetch_current_user(&self, access_token: &str) -> Result<User>;
}

/// Resolved endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: Url,
    pub profile_url: Url,
}

impl Endpoints {
    /// Token endpoint under `api_base`, profile endpoint under `profile_base`.
    pub fn new(api_base: &Url, profile_base: &Url) -> Result<Self> {
        Ok(Self {
            token_url: join_base(api_base, TOKEN_PATH)?,
            profile_url: join_base(profile_base, PROFILE_PATH)?,
        })
    }

    /// Both endpoints under the same origin.
    pub fn same_origin(base: &Url) -> Result<Self> {
        Self::new(base, base)
    }
}

// `Url::join` drops the last path segment unless the base ends in '/',
// so "https://host/prefix" must become "https://host/prefix/" first.
fn join_base(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path)?)
}

pub struct HttpBackend {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(endpoints: Endpoints) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints)
    }

    pub fn with_client(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn request_token(&self, credentials: &LoginCredentials) -> Result<TokenResponse> {
        tracing::debug!(url = %self.endpoints.token_url, "Requesting access token");

        let response = self
            .client
            .post(self.endpoints.token_url.clone())
            .form(credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = %status, "Token request rejected");
            let body = response.bytes().await?;
            return Err(AuthError::from_rejection_body(&body));
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    async fn fetch_current_user(&self, access_token: &str) -> Result<User> {
        tracing::debug!(url = %self.endpoints.profile_url, "Fetching current user");

        let response = self
            .client
            .get(self.endpoints.profile_url.clone())
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Profile request rejected");
            return Err(AuthError::ProfileFetch);
        }

        Ok(response.json::<User>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[test]
    fn test_same_origin_endpoints() {
        let base = Url::parse("http://127.0.0.1:8000").unwrap();
        let endpoints = Endpoints::same_origin(&base).unwrap();

        assert_eq!(
            endpoints.token_url.as_str(),
            "http://127.0.0.1:8000/api/auth/login/access-token"
        );
        assert_eq!(endpoints.profile_url.as_str(), "http://127.0.0.1:8000/api/users/me");
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let api = Url::parse("https://api.example.com/v2").unwrap();
        let web = Url::parse("https://app.example.com/").unwrap();
        let endpoints = Endpoints::new(&api, &web).unwrap();

        assert_eq!(
            endpoints.token_url.as_str(),
            "https://api.example.com/v2/api/auth/login/access-token"
        );
        assert_eq!(endpoints.profile_url.as_str(), "https://app.example.com/api/users/me");
    }

    /// Serve one canned response per connection, returning the raw requests.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (Url, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);

                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (base, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn test_request_token_posts_form() {
        let (base, server) = serve(vec![(200, r#"{"access_token":"tok123","token_type":"bearer"}"#)]).await;
        let backend = HttpBackend::new(Endpoints::same_origin(&base).unwrap());

        let token = backend
            .request_token(&LoginCredentials::new("alice", "hunter2"))
            .await
            .unwrap();
        assert_eq!(token.access_token, "tok123");
        assert_eq!(token.token_type, "bearer");

        let requests = server.await.unwrap();
        let request = &requests[0];
        assert!(request.starts_with("POST /api/auth/login/access-token "));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(request.ends_with("username=alice&password=hunter2"));
    }

    #[tokio::test]
    async fn test_request_token_rejected_with_detail() {
        let (base, _server) = serve(vec![(401, r#"{"detail":"Incorrect username or password"}"#)]).await;
        let backend = HttpBackend::new(Endpoints::same_origin(&base).unwrap());

        let err = backend
            .request_token(&LoginCredentials::new("alice", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        assert_eq!(err.to_string(), "Incorrect username or password");
    }

    #[tokio::test]
    async fn test_request_token_malformed_success_body() {
        let (base, _server) = serve(vec![(200, r#"{"token":"missing access_token"}"#)]).await;
        let backend = HttpBackend::new(Endpoints::same_origin(&base).unwrap());

        let err = backend
            .request_token(&LoginCredentials::new("alice", "hunter2"))
            .await
            .unwrap_err();
        match err {
            AuthError::Http(e) => assert!(e.is_decode()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_current_user_sends_bearer() {
        let (base, server) = serve(vec![(200, r#"{"id":"1","full_name":"Alice A","email":"a@x.com"}"#)]).await;
        let backend = HttpBackend::new(Endpoints::same_origin(&base).unwrap());

        let user = backend.fetch_current_user("tok123").await.unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(user.email, "a@x.com");

        let requests = server.await.unwrap();
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("get /api/users/me "));
        assert!(request.contains("authorization: bearer tok123"));
        assert!(request.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_fetch_current_user_failure() {
        let (base, _server) = serve(vec![(401, r#"{"detail":"Could not validate credentials"}"#)]).await;
        let backend = HttpBackend::new(Endpoints::same_origin(&base).unwrap());

        let err = backend.fetch_current_user("expired").await.unwrap_err();
        assert!(matches!(err, AuthError::ProfileFetch));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let backend = HttpBackend::new(Endpoints::same_origin(&base).unwrap());

        let err = backend
            .request_token(&LoginCredentials::new("alice", "hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Http(_)));
    }
}
