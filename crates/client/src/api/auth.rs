//! OTP login, admin login, and logout.

use medico_core::{Email, PhoneNumber, SessionId, UserId, UserRole};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::ApiClient;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::http::ADMIN_LOGIN_PATH;
use crate::session::Session;

/// Length of a login OTP.
pub const OTP_LENGTH: usize = 6;

/// Minimum admin password length accepted before calling the backend.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Body of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: SecretString,
    pub user_id: UserId,
    pub session_id: SessionId,
}

/// Body of `/auth/get-otp`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtpResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiClient {
    /// Ask the backend to text a login OTP to `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn get_otp(&self, phone: &PhoneNumber) -> Result<OtpResponse> {
        let body = json!({ "phone_number": e164(phone) });
        let response = self
            .send(self.request(Method::POST, "/auth/get-otp").json(body))
            .await?;
        if response.body.is_empty() {
            return Ok(OtpResponse::default());
        }
        response.json()
    }

    /// Complete a customer login with the texted OTP.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed OTP (no request is
    /// made) or an error if the backend rejects it.
    #[instrument(skip_all)]
    pub async fn login(&self, phone: &PhoneNumber, otp: &str) -> Result<Session> {
        let otp = validate_otp(otp)?;
        let body = json!({ "phone_number": e164(phone), "otp": otp });
        let response: LoginResponse = self.send_json(Method::POST, "/auth/login", &body).await?;

        Ok(self.establish(response, UserRole::Customer))
    }

    /// Sign in as an administrator.
    ///
    /// A rejected password shows "Invalid email or password" rather than the
    /// generic session-expired toast.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a short password or an error if
    /// the backend rejects the credentials.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn admin_login(&self, email: &Email, password: &SecretString) -> Result<Session> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ClientError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let body = json!({ "email": email.as_str(), "password": password.expose_secret() });
        let request = self
            .request(Method::POST, ADMIN_LOGIN_PATH)
            .json(body)
            .quiet();

        let response = match self.send(request).await {
            Ok(response) => response.json::<LoginResponse>()?,
            Err(e) => {
                let message = if e.is_unauthorized() {
                    "Invalid email or password".to_string()
                } else {
                    e.toast_message()
                };
                self.toasts().error(message, self.toasts().default_duration());
                return Err(e);
            }
        };

        Ok(self.establish(response, UserRole::Admin))
    }

    /// End this session on the server and locally.
    ///
    /// Local state is cleared even when the server call fails.
    ///
    /// # Errors
    ///
    /// Returns the server error, if any, after local state is cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.end_session("/auth/logout").await
    }

    /// End every session of this user on the server, then locally.
    ///
    /// # Errors
    ///
    /// Returns the server error, if any, after local state is cleared.
    #[instrument(skip(self))]
    pub async fn logout_all(&self) -> Result<()> {
        self.end_session("/auth/logout-all").await
    }

    async fn end_session(&self, path: &str) -> Result<()> {
        let result = self.send_unit(self.request(Method::POST, path)).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "server logout failed, clearing local session anyway");
        }
        self.auth().logout();
        add_breadcrumb("auth", "Logged out", None);
        result
    }

    fn establish(&self, response: LoginResponse, role: UserRole) -> Session {
        let session = Session::authenticated(response.user_id, response.session_id, [role]);
        self.auth().login(session.clone(), response.access_token);
        add_breadcrumb("auth", "Logged in", Some(&[("role", role.as_str())]));
        session
    }
}

fn e164(phone: &PhoneNumber) -> String {
    format!("+91{}", phone.as_str())
}

fn validate_otp(otp: &str) -> Result<&str> {
    let otp = otp.trim();
    if otp.is_empty() {
        return Err(ClientError::Validation("OTP is required".to_string()));
    }
    if otp.chars().count() != OTP_LENGTH {
        return Err(ClientError::Validation(format!(
            "OTP must be {OTP_LENGTH} digits"
        )));
    }
    if !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(ClientError::Validation(
            "OTP must contain only numbers".to_string(),
        ));
    }
    Ok(otp)
}
