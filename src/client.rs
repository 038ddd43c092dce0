//! Client-side session controller. The browser-equivalent counterpart of the
//! portal: it rehydrates its identity from `/auth/me` before trusting any
//! cached state, carries the opaque session cookie on every call, and is the
//! only writer of the in-process identity holder.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::auth::handlers::MeResponse;
use crate::directory::{CreatePrincipal, ManagerOption, PrincipalDto};
use crate::model::attendance::Attendance;
use crate::model::role::{Role, RoleSet};
use crate::workflow::{LeaveDto, SubmitLeave};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connectivity or protocol failure. Never interpreted as "logged out":
    /// only an explicit 401 from the server carries that meaning.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server explicitly reported the session as absent or invalid.
    #[error("authentication required")]
    Unauthenticated,

    #[error("{code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

/// What the controller knows about the current identity. `Unknown` until the
/// startup probe resolves; callers must not render role-gated views from it.
#[derive(Debug, Clone)]
pub enum AuthState {
    Unknown,
    Authenticated(SessionContext),
    Anonymous,
}

/// The identity snapshot handed to views. Populated once per successful
/// login or rehydration, cleared on logout; never written elsewhere.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub username: String,
    pub roles: RoleSet,
}

impl SessionContext {
    /// Client-side mirror of the authorization gate, for UX only; the server
    /// enforces the real check on every request.
    pub fn can(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Debug)]
pub struct LogoutOutcome {
    /// Whether the server confirmed the invalidation. Local state is cleared
    /// regardless; the two steps are independent.
    pub server_acknowledged: bool,
}

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    state: AuthState,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            state: AuthState::Unknown,
        })
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.state
    }

    pub fn session(&self) -> Option<&SessionContext> {
        match &self.state {
            AuthState::Authenticated(ctx) => Some(ctx),
            _ => None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthenticated);
        }

        #[derive(Deserialize, Default)]
        struct ErrorBody {
            #[serde(default)]
            error: String,
            #[serde(default)]
            message: String,
        }
        let body = resp.json::<ErrorBody>().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            code: body.error,
            message: body.message,
        })
    }

    /// Startup rehydration: ask the server who we are before rendering
    /// anything. A transport failure leaves the state untouched (still
    /// provisional); only an explicit 401 flips it to Anonymous.
    pub async fn restore_session(&mut self) -> Result<&AuthState, ClientError> {
        let resp = self.http.get(self.url("/auth/me")).send().await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            self.state = AuthState::Anonymous;
        } else {
            let me: MeResponse = Self::check(resp).await?.json().await?;
            self.state = AuthState::Authenticated(SessionContext {
                username: me.username,
                roles: me.roles,
            });
        }

        Ok(&self.state)
    }

    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<&SessionContext, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let me: MeResponse = Self::check(resp).await?.json().await?;

        self.state = AuthState::Authenticated(SessionContext {
            username: me.username,
            roles: me.roles,
        });

        match &self.state {
            AuthState::Authenticated(ctx) => Ok(ctx),
            _ => unreachable!(),
        }
    }

    /// Server invalidation and local clearing are independent: the local
    /// identity is dropped even when the server call fails.
    pub async fn logout(&mut self) -> LogoutOutcome {
        let server_acknowledged = match self.http.post(self.url("/auth/logout")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        };

        self.state = AuthState::Anonymous;
        LogoutOutcome {
            server_acknowledged,
        }
    }

    // ----- leave workflow -----

    pub async fn submit_leave(&self, req: &SubmitLeave) -> Result<LeaveDto, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/leave"))
            .json(req)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn my_leaves(&self) -> Result<Vec<LeaveDto>, ClientError> {
        let resp = self.http.get(self.url("/api/leave/my")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn leaves_to_approve(&self) -> Result<Vec<LeaveDto>, ClientError> {
        let resp = self
            .http
            .get(self.url("/api/leave/to-approve"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn pending_leaves(&self) -> Result<Vec<LeaveDto>, ClientError> {
        let resp = self.http.get(self.url("/api/leave/pending")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn approve_leave(
        &self,
        id: i64,
        comment: Option<&str>,
    ) -> Result<LeaveDto, ClientError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/leave/{id}/approve")))
            .json(&json!({ "comment": comment }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn reject_leave(
        &self,
        id: i64,
        comment: Option<&str>,
    ) -> Result<LeaveDto, ClientError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/leave/{id}/reject")))
            .json(&json!({ "comment": comment }))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    // ----- attendance -----

    pub async fn check_in(&self) -> Result<Attendance, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/attendance/check-in"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn check_out(&self) -> Result<Attendance, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/attendance/check-out"))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn my_attendance(&self) -> Result<Vec<Attendance>, ClientError> {
        let resp = self.http.get(self.url("/api/attendance/my")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    // ----- staff management (admin) -----

    pub async fn list_users(&self) -> Result<Vec<PrincipalDto>, ClientError> {
        let resp = self.http.get(self.url("/api/users")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn create_user(&self, req: &CreatePrincipal) -> Result<PrincipalDto, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/users"))
            .json(req)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/users/{id}")))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn manager_candidates(&self) -> Result<Vec<ManagerOption>, ClientError> {
        let resp = self.http.get(self.url("/api/meta/managers")).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = PortalClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.url("/auth/me"), "http://localhost:8080/auth/me");
    }

    #[test]
    fn identity_starts_provisional() {
        let client = PortalClient::new("http://localhost:8080").unwrap();
        assert!(matches!(client.auth_state(), AuthState::Unknown));
        assert!(client.session().is_none());
    }
}
