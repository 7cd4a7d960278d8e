// src/middleware/identity.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;

use crate::common::error::ApiError;

// A autenticação fica fora deste serviço: o gateway repassa o usuário
// já identificado neste cabeçalho.
const USER_ID_HEADER: &str = "x-user-id";

/// Usuário que está executando a ação (ex.: quem cria o orçamento).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(ActingUser)
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "Cabeçalho X-User-ID ausente ou inválido.",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn reads_user_from_header() {
        let user = Uuid::new_v4();
        let (mut parts, _) = Request::builder()
            .header(USER_ID_HEADER, user.to_string())
            .body(())
            .unwrap()
            .into_parts();
        let acting = ActingUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(acting.0, user);
    }

    #[tokio::test]
    async fn rejects_missing_user() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = ActingUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
