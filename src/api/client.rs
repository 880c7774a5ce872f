//! HTTP client for the tijo template registry

use crate::api::token::{self, Token, TOKEN_FILE};
use crate::api::types::{
    Credentials, LoginResponse, PostTemplateRequest, RegisterRequest, ResetRequest,
    SearchRequest, SearchResponse, TemplateRecord,
};
use crate::command::{Command, Fact, FactMap};
use crate::config::Config;
use crate::error::{TijoError, TijoResult};
use crate::resolver::{TemplateLookup, TemplateQuery};
use crate::Template;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Options for [`TijoApi::push_template`]
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Display name, defaults to the command basename
    pub name: Option<String>,
    pub tags: Vec<String>,
    /// Facts merged over the gathered ones
    pub facts: FactMap,
    /// Gathered facts to send, `None` for [`Fact::DEFAULT`]
    pub fact_kinds: Option<Vec<Fact>>,
}

/// Client for the template registry API
#[derive(Debug, Clone)]
pub struct TijoApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<Token>,
    token_file: Option<PathBuf>,
}

impl TijoApi {
    /// Create a client. A token stored under `cache_dir` is loaded if present.
    pub fn new(
        api_url: &str,
        cache_dir: Option<&Path>,
        timeout: Duration,
        insecure: bool,
    ) -> TijoResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| TijoError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        let token_file = cache_dir.map(|dir| dir.join(TOKEN_FILE));
        let token = token_file.as_deref().and_then(Token::load);

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            token,
            token_file,
        })
    }

    pub fn from_config(config: &Config) -> TijoResult<Self> {
        Self::new(
            &config.api_url,
            config.cache_path().as_deref(),
            Duration::from_secs(config.timeout_secs),
            config.insecure,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Option<Token>) {
        self.token = token;
    }

    /// Where the session token is persisted, if anywhere
    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    /// Log in and keep the returned token; optionally persist it.
    ///
    /// Returns the raw response, or `None` if the request failed.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        save_token: bool,
    ) -> Option<LoginResponse> {
        let body = Credentials { email, password };
        let resp: LoginResponse = self
            .post_for("/auth/login", &body, None)
            .await
            .map_err(|e| warn!(error = %e, "login failed"))
            .ok()?;

        if let (Some(token), Some(refresh_token), Some(expiration_time)) = (
            resp.token.clone(),
            resp.refresh_token.clone(),
            resp.expiration_time,
        ) {
            let token = Token {
                token,
                refresh_token,
                expiration_time,
            };

            if save_token {
                match &self.token_file {
                    Some(path) => {
                        if let Err(e) = token.save(path) {
                            warn!(path = %path.display(), error = %e, "failed to save token");
                        }
                    }
                    None => warn!("no cache directory configured, token not saved"),
                }
            }
            self.token = Some(token);
        }

        Some(resp)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> bool {
        let body = RegisterRequest {
            email,
            password,
            first_name,
            last_name,
        };
        self.succeeds("/auth/register", &body).await
    }

    /// Ask the registry to resend the account confirmation email
    pub async fn resend(&self, email: &str, password: &str) -> bool {
        self.succeeds("/auth/resend", &Credentials { email, password })
            .await
    }

    /// Request a password reset email
    pub async fn reset(&self, email: &str) -> bool {
        self.succeeds("/auth/reset", &ResetRequest { email }).await
    }

    /// Publish a template.
    ///
    /// Fails with [`TijoError::NotAuthenticated`] or [`TijoError::TokenExpired`]
    /// before any request is made when no valid token is held. Any other
    /// failure yields `Ok(None)`.
    pub async fn post_template(
        &self,
        basename: &str,
        name: Option<&str>,
        template: Option<&Template>,
        tags: &[String],
        facts: Option<&FactMap>,
    ) -> TijoResult<Option<serde_json::Value>> {
        let bearer = token::bearer(self.token.as_ref())?;

        let body = PostTemplateRequest {
            command: basename,
            name: name.unwrap_or(basename),
            json: template,
            tags: join_nonempty(tags),
            command_facts: facts.filter(|f| !f.is_empty()),
        };

        match self.post_for("/templates", &body, Some(bearer)).await {
            Ok(created) => Ok(Some(created)),
            Err(e) => {
                warn!(command = basename, error = %e, "failed to post template");
                Ok(None)
            }
        }
    }

    /// Publish the template attached to `command` with its gathered facts
    pub async fn push_template(
        &self,
        command: &Command,
        options: &PushOptions,
    ) -> TijoResult<Option<serde_json::Value>> {
        let kinds = options.fact_kinds.as_deref().unwrap_or(&Fact::DEFAULT);
        let mut facts = command.facts().to_map(kinds).unwrap_or_default();
        facts.extend(options.facts.clone());

        self.post_template(
            command.basename(),
            options.name.as_deref(),
            command.template(),
            &options.tags,
            Some(&facts),
        )
        .await
    }

    /// Ranked search; `None` on any failure or when nothing matched
    pub async fn search_templates(
        &self,
        query: &TemplateQuery<'_>,
        offset: usize,
        limit: usize,
    ) -> Option<Vec<TemplateRecord>> {
        let body = SearchRequest {
            command: query.basename,
            command_args: join_nonempty(query.args),
            command_facts: query.facts.as_ref().filter(|f| !f.is_empty()),
        };
        let path = format!("/templates/search?offset={}&limit={}", offset, limit);

        let resp: SearchResponse = self
            .post_for(&path, &body, None)
            .await
            .map_err(|e| debug!(command = query.basename, error = %e, "template search failed"))
            .ok()?;

        resp.templates.filter(|t| !t.is_empty())
    }

    /// Best ranked template document for `query`
    pub async fn search_template(&self, query: &TemplateQuery<'_>) -> Option<Template> {
        self.search_templates(query, 0, 1)
            .await?
            .into_iter()
            .next()
            .and_then(|record| record.json)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn succeeds<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> bool {
        match self.post(path, body, None).await {
            Ok(_) => true,
            Err(e) => {
                warn!(path, error = %e, "request failed");
                false
            }
        }
    }

    async fn post_for<T, B>(&self, path: &str, body: &B, bearer: Option<&str>) -> TijoResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.post(path, body, bearer).await?;
        let text = response.text().await.map_err(|e| {
            TijoError::NetworkError(format!("Failed to read response body: {}", e))
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// POST a JSON body; anything but 200/201 is an error
    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> TijoResult<reqwest::Response> {
        let url = self.url(path);
        debug!(%url, "POST");

        let mut request = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TijoError::NetworkError(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "response");
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(TijoError::HttpError {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl TemplateLookup for TijoApi {
    async fn search_template(&self, query: &TemplateQuery<'_>) -> Option<Template> {
        TijoApi::search_template(self, query).await
    }
}

fn join_nonempty(parts: &[String]) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
