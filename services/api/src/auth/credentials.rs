//! 管理员凭证校验：用户名精确匹配 + bcrypt 哈希比对。

use std::sync::Arc;

use crate::{auth::AuthError, config::SecretString};

/// 启动时加载、之后不可变的管理员身份。
#[derive(Debug, Clone)]
pub(crate) struct AdminIdentity {
    pub(crate) username: String,
    pub(crate) password_hash: SecretString,
}

/// 凭证校验器；克隆共享同一份身份。
#[derive(Debug, Clone)]
pub(crate) struct CredentialVerifier {
    identity: Arc<AdminIdentity>,
}

impl CredentialVerifier {
    pub(crate) fn new(identity: AdminIdentity) -> Self {
        Self {
            identity: Arc::new(identity),
        }
    }

    /// 校验用户名与密码，成功时返回管理员用户名。
    ///
    /// 用户名不匹配时仍执行一次 bcrypt 比对，三种失败（用户名错误、密码错误、
    /// 哈希解析失败）统一返回 `InvalidCredentials`。
    pub(crate) fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let username_ok = username == self.identity.username;
        let password_ok =
            bcrypt::verify(password, self.identity.password_hash.expose()).unwrap_or(false);
        if username_ok && password_ok {
            Ok(self.identity.username.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// 生成 bcrypt 密码哈希。
pub(crate) fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

#[cfg(test)]
mod tests {
    use super::{AdminIdentity, CredentialVerifier, hash_password};
    use crate::{auth::AuthError, config::SecretString};

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(AdminIdentity {
            username: "admin".to_string(),
            password_hash: SecretString::new(hash_password("admin123", 4).unwrap()),
        })
    }

    #[test]
    fn matching_credentials_return_username() {
        assert_eq!(
            verifier().verify_credentials("admin", "admin123"),
            Ok("admin".to_string())
        );
    }

    #[test]
    fn wrong_username_and_wrong_password_are_indistinguishable() {
        let verifier = verifier();
        let wrong_user = verifier.verify_credentials("root", "admin123");
        let wrong_pass = verifier.verify_credentials("admin", "wrong");
        assert_eq!(wrong_user, Err(AuthError::InvalidCredentials));
        assert_eq!(wrong_user, wrong_pass);
    }

    #[test]
    fn no_normalization_is_applied() {
        let verifier = verifier();
        assert!(verifier.verify_credentials(" admin", "admin123").is_err());
        assert!(verifier.verify_credentials("Admin", "admin123").is_err());
        assert!(verifier.verify_credentials("admin", "admin123 ").is_err());
    }

    #[test]
    fn unparsable_hash_fails_closed() {
        let verifier = CredentialVerifier::new(AdminIdentity {
            username: "admin".to_string(),
            password_hash: SecretString::new("not-a-bcrypt-hash"),
        });
        assert_eq!(
            verifier.verify_credentials("admin", "not-a-bcrypt-hash"),
            Err(AuthError::InvalidCredentials)
        );
    }
}
