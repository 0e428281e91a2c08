/**
 * Authentication Routes
 * JWT-based admin authentication with login, verify, refresh, and logout.
 * Single-admin setup: credentials come from the environment, refresh tokens
 * live in an in-memory store keyed by their SHA-256 hash.
 */
use axum::{http::StatusCode, response::IntoResponse, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

// ============================================================================
// Configuration
// ============================================================================

lazy_static::lazy_static! {
    /// JWT secret key from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());

    /// Admin email from environment
    pub static ref ADMIN_EMAIL: String = std::env::var("ADMIN_EMAIL")
        .unwrap_or_else(|_| "admin@example.com".to_string());

    /// Admin password hash from environment (or plain password to hash)
    pub static ref ADMIN_PASSWORD_HASH: String = {
        if let Ok(hashed) = std::env::var("ADMIN_HASH_PASSWORD") {
            hashed
        } else if let Ok(plain) = std::env::var("ADMIN_PASSWORD") {
            hash(&plain, DEFAULT_COST).unwrap_or_else(|_| "".to_string())
        } else {
            // Fallback dev password "admin123"; run() warns about this in production.
            hash("admin123", DEFAULT_COST).unwrap_or_else(|_| "".to_string())
        }
    };

    /// Refresh token storage (in-memory, keyed by token hash)
    static ref REFRESH_TOKENS: Arc<RwLock<HashMap<String, RefreshTokenData>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// Access token expiry in minutes
const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token expiry in days
const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // Subject (admin email)
    pub email: String, // Admin email
    pub role: String,  // Role, always "admin" here
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

/// Stored refresh token data
#[derive(Debug, Clone)]
struct RefreshTokenData {
    email: String,
    expires_at: i64,
    revoked: bool,
}

/// User info returned to the frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub email: String,
    pub role: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Generate a random refresh token
fn generate_refresh_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 64)
}

/// Hash a refresh token for storage. A cryptographic hash matters here: the
/// stored value must not be invertible to the token the client holds.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create a signed access token for the admin identity.
fn create_access_token(email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: email.to_string(),
        email: email.to_string(),
        role: "admin".to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

/// Verify an access token and return its claims.
pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Mint a refresh token and record its hash.
async fn issue_refresh_token(email: &str) -> String {
    let token = generate_refresh_token();
    let data = RefreshTokenData {
        email: email.to_string(),
        expires_at: (Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS)).timestamp(),
        revoked: false,
    };
    REFRESH_TOKENS.write().await.insert(hash_token(&token), data);
    token
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(Json(payload): Json<LoginRequest>) -> impl IntoResponse {
    let email = payload.email.trim().to_lowercase();

    let credentials_ok = email == ADMIN_EMAIL.to_lowercase()
        && verify(&payload.password, &ADMIN_PASSWORD_HASH).unwrap_or(false);

    if !credentials_ok {
        tracing::warn!("Failed login attempt for {}", email);
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                user: None,
                access_token: None,
                refresh_token: None,
                error: Some("Invalid email or password".to_string()),
            }),
        );
    }

    let access_token = match create_access_token(&email) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create access token: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginResponse {
                    success: false,
                    user: None,
                    access_token: None,
                    refresh_token: None,
                    error: Some("Failed to create token".to_string()),
                }),
            );
        }
    };

    let refresh_token = issue_refresh_token(&email).await;

    tracing::info!("Admin login succeeded for {}", email);

    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            user: Some(UserInfo {
                email,
                role: "admin".to_string(),
            }),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            error: None,
        }),
    )
}

/// POST /api/auth/verify - Validate the bearer token in the Authorization header
pub async fn verify_token(headers: axum::http::HeaderMap) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.map(verify_access_token) {
        Some(Ok(claims)) => (
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                is_valid: true,
                user: Some(UserInfo {
                    email: claims.email,
                    role: claims.role,
                }),
                error: None,
            }),
        ),
        Some(Err(_)) => (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                success: false,
                is_valid: false,
                user: None,
                error: Some("Invalid or expired token".to_string()),
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                success: false,
                is_valid: false,
                user: None,
                error: Some("Authorization required".to_string()),
            }),
        ),
    }
}

/// POST /api/auth/refresh - Rotate the refresh token and mint a new access token
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> impl IntoResponse {
    let key = hash_token(&payload.refresh_token);

    let data = {
        let store = REFRESH_TOKENS.read().await;
        store.get(&key).cloned()
    };

    let data = match data {
        Some(d) if !d.revoked && d.expires_at > Utc::now().timestamp() => d,
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(RefreshResponse {
                    success: false,
                    access_token: None,
                    refresh_token: None,
                    error: Some("Invalid or expired refresh token".to_string()),
                }),
            );
        }
    };

    // Rotation: the presented token is spent either way.
    REFRESH_TOKENS.write().await.remove(&key);

    let access_token = match create_access_token(&data.email) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create access token: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RefreshResponse {
                    success: false,
                    access_token: None,
                    refresh_token: None,
                    error: Some("Failed to create token".to_string()),
                }),
            );
        }
    };

    let new_refresh = issue_refresh_token(&data.email).await;

    (
        StatusCode::OK,
        Json(RefreshResponse {
            success: true,
            access_token: Some(access_token),
            refresh_token: Some(new_refresh),
            error: None,
        }),
    )
}

/// POST /api/auth/logout - Revoke the supplied refresh token
pub async fn logout(Json(payload): Json<LogoutRequest>) -> impl IntoResponse {
    if let Some(token) = payload.refresh_token {
        let key = hash_token(&token);
        let mut store = REFRESH_TOKENS.write().await;
        if let Some(data) = store.get_mut(&key) {
            data.revoked = true;
        }
    }

    (StatusCode::OK, Json(LogoutResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let token = create_access_token("admin@example.com").unwrap();
        let claims = verify_access_token(&token).unwrap();
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(verify_access_token("not-a-jwt").is_err());
    }

    #[test]
    fn test_hash_token_is_stable_and_hex() {
        let a = hash_token("abc");
        let b = hash_token("abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("abd"));
    }

    #[test]
    fn test_generate_refresh_token_length_and_uniqueness() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_refresh_rejects_unknown_token() {
        let response = refresh(Json(RefreshRequest {
            refresh_token: "nope".to_string(),
        }))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_issued_refresh_token_can_be_rotated_once() {
        let token = issue_refresh_token("admin@example.com").await;

        let response = refresh(Json(RefreshRequest {
            refresh_token: token.clone(),
        }))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        // Spent on first use.
        let again = refresh(Json(RefreshRequest {
            refresh_token: token,
        }))
        .await
        .into_response();
        assert_eq!(again.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let token = issue_refresh_token("admin@example.com").await;

        logout(Json(LogoutRequest {
            refresh_token: Some(token.clone()),
        }))
        .await;

        let response = refresh(Json(RefreshRequest {
            refresh_token: token,
        }))
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
