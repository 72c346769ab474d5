use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

/// 登录会话
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub issued_at: DateTime<Utc>,
}

/// 会话令牌表 (内存)
///
/// 只做演示级校验: 用户名和密码非空即可登录。
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登录成功返回令牌
    pub fn login(&self, username: &str, password: &str) -> Option<(String, Session)> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return None;
        }

        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            username: username.to_string(),
            issued_at: Utc::now(),
        };
        self.sessions.insert(token.clone(), session.clone());
        tracing::info!("User {} logged in", session.username);
        Some((token, session))
    }

    pub fn validate(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    /// 注销, 返回令牌是否存在
    pub fn logout(&self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some((_, session)) => {
                tracing::info!("User {} logged out", session.username);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let store = SessionStore::new();
        assert!(store.login("", "secret").is_none());
        assert!(store.login("hirata", "").is_none());
        assert!(store.login("   ", "secret").is_none());
    }

    #[test]
    fn test_login_validate_logout() {
        let store = SessionStore::new();
        let (token, session) = store.login("hirata", "secret").unwrap();
        assert_eq!(session.username, "hirata");
        assert_eq!(store.validate(&token).unwrap().username, "hirata");
        assert!(store.logout(&token));
        assert!(store.validate(&token).is_none());
        assert!(!store.logout(&token));
    }
}
