use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::services::token::{generate_token, hash_token};

type HmacSha256 = Hmac<Sha256>;

/// CSRFトークンを運ぶ Cookie 名（JavaScript から読めるよう HttpOnly を付けない）
pub const CSRF_COOKIE_NAME: &str = "x-csrf-token";
/// クライアントがトークンを返送するヘッダー名
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";
/// 匿名セッションIDの Cookie 名
pub const SESSION_COOKIE_NAME: &str = "sid";

/// 署名シークレットの最小長（バイト）
pub const MIN_SECRET_LEN: usize = 32;

const NONCE_LEN: usize = 16;

/// CSRFトークンの束縛先
///
/// ベアラートークンを提示している場合はそのダイジェスト、未ログインなら匿名セッションID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionBinding {
    Credential(String),
    Anonymous(String),
}

impl SessionBinding {
    /// 平文のベアラートークンから束縛を作る
    pub fn credential(token: &str) -> Self {
        Self::Credential(hash_token(token))
    }

    fn message(&self, nonce: &str) -> String {
        match self {
            Self::Credential(digest) => format!("cred:{digest}:{nonce}"),
            Self::Anonymous(sid) => format!("anon:{sid}:{nonce}"),
        }
    }
}

/// 新しい匿名セッションIDを生成
pub fn new_session_id() -> String {
    generate_token()
}

/// ダブルサブミット Cookie 方式の CSRF 保護
///
/// トークン形式: `hex(nonce) "." hex(HMAC-SHA256(secret, binding ":" nonce))`
#[derive(Clone)]
pub struct CsrfService {
    /// シークレットで鍵付けした HMAC（使用時に clone する）
    keyed_mac: HmacSha256,
    cookie_secure: bool,
}

impl CsrfService {
    /// 新しい CsrfService を作成
    ///
    /// # Errors
    /// シークレットが32バイト未満の場合
    pub fn new(secret: &str, cookie_secure: bool) -> Result<Self, AppError> {
        if secret.len() < MIN_SECRET_LEN {
            tracing::error!(
                expected = MIN_SECRET_LEN,
                actual = secret.len(),
                "CSRFシークレットの長さが不足"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "csrf secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let keyed_mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "HMAC初期化エラー");
            AppError::Internal(anyhow::anyhow!("hmac initialization error"))
        })?;

        Ok(Self {
            keyed_mac,
            cookie_secure,
        })
    }

    /// 束縛先に対する新しいトークンを発行
    pub fn issue(&self, binding: &SessionBinding) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);

        let signature = hex::encode(self.mac(binding, &nonce).finalize().into_bytes());
        format!("{nonce}.{signature}")
    }

    /// トークンが束縛先に対して署名されたものか検証
    pub fn verify(&self, binding: &SessionBinding, token: &str) -> bool {
        let Some((nonce, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        if nonce.len() != NONCE_LEN * 2 {
            return false;
        }

        self.mac(binding, nonce).verify_slice(&signature).is_ok()
    }

    /// リクエストの検証
    ///
    /// ヘッダーと Cookie の両方が存在して一致し、かつ現在の束縛先で署名を再検証できること
    pub fn validate(
        &self,
        binding: Option<&SessionBinding>,
        header_token: Option<&str>,
        cookie_token: Option<&str>,
    ) -> Result<(), AppError> {
        let (Some(binding), Some(header_token), Some(cookie_token)) =
            (binding, header_token, cookie_token)
        else {
            return Err(AppError::CsrfValidation);
        };

        let matches: bool = header_token.as_bytes().ct_eq(cookie_token.as_bytes()).into();
        if !matches || !self.verify(binding, header_token) {
            return Err(AppError::CsrfValidation);
        }

        Ok(())
    }

    /// CSRFトークン Cookie の Set-Cookie 値
    pub fn csrf_cookie(&self, token: &str) -> String {
        self.build_cookie(CSRF_COOKIE_NAME, token, false, None)
    }

    /// 匿名セッション Cookie の Set-Cookie 値
    pub fn session_cookie(&self, sid: &str) -> String {
        self.build_cookie(SESSION_COOKIE_NAME, sid, true, None)
    }

    /// ログアウト時に CSRF / セッション Cookie を削除する Set-Cookie 値
    pub fn clear_cookies(&self) -> [String; 2] {
        [
            self.build_cookie(CSRF_COOKIE_NAME, "", false, Some(0)),
            self.build_cookie(SESSION_COOKIE_NAME, "", true, Some(0)),
        ]
    }

    fn mac(&self, binding: &SessionBinding, nonce: &str) -> HmacSha256 {
        let mut mac = self.keyed_mac.clone();
        mac.update(binding.message(nonce).as_bytes());
        mac
    }

    fn build_cookie(&self, name: &str, value: &str, http_only: bool, max_age: Option<i64>) -> String {
        let mut cookie = format!("{name}={value}; Path=/; SameSite=Strict");
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn service() -> CsrfService {
        CsrfService::new(SECRET, false).unwrap()
    }

    #[test]
    fn test_short_secret_is_rejected() {
        assert!(CsrfService::new("too-short", false).is_err());
    }

    #[test]
    fn test_issued_token_verifies_only_for_its_binding() {
        let service = service();
        let binding = SessionBinding::credential("bearer-a");
        let token = service.issue(&binding);

        assert!(service.verify(&binding, &token));
        assert!(!service.verify(&SessionBinding::credential("bearer-b"), &token));
        assert!(!service.verify(&SessionBinding::Anonymous("bearer-a".to_string()), &token));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let binding = SessionBinding::Anonymous("sid".to_string());
        let other = CsrfService::new("ffffffffffffffffffffffffffffffff", false).unwrap();
        let token = other.issue(&binding);

        assert!(!service().verify(&binding, &token));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = service();
        let binding = SessionBinding::Anonymous("sid".to_string());
        for token in ["", "no-dot", "abcd.zz", ".", "00.00"] {
            assert!(!service.verify(&binding, token), "token {token:?}");
        }
    }

    #[test]
    fn test_validate_requires_header_and_cookie_to_match() {
        let service = service();
        let binding = SessionBinding::credential("bearer");
        let token = service.issue(&binding);
        let other = service.issue(&binding);

        assert!(service.validate(Some(&binding), Some(&token), Some(&token)).is_ok());
        assert!(matches!(
            service.validate(Some(&binding), None, Some(&token)),
            Err(AppError::CsrfValidation)
        ));
        assert!(matches!(
            service.validate(Some(&binding), Some(&token), None),
            Err(AppError::CsrfValidation)
        ));
        assert!(matches!(
            service.validate(Some(&binding), Some(&token), Some(&other)),
            Err(AppError::CsrfValidation)
        ));
        assert!(matches!(
            service.validate(None, Some(&token), Some(&token)),
            Err(AppError::CsrfValidation)
        ));
    }

    #[test]
    fn test_cookie_attributes() {
        let secure = CsrfService::new(SECRET, true).unwrap();
        let cookie = secure.csrf_cookie("abc");
        assert!(cookie.starts_with("x-csrf-token=abc; Path=/"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Secure"));
        assert!(!cookie.contains("HttpOnly"));

        let session = service().session_cookie("sid-value");
        assert!(session.contains("HttpOnly"));
        assert!(!session.contains("Secure"));

        for cleared in service().clear_cookies() {
            assert!(cleared.contains("Max-Age=0"));
        }
    }
}
