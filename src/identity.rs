//! 身份缓存
//!
//! 已登录用户的展示信息（邮箱、名字、验证状态、头像）保存在持久化的
//! 键值存储中。缓存只用于展示，访问控制只看身份客户端的会话。

use crate::error::PalResult;

pub const KEY_USER_EMAIL: &str = "userEmail";
pub const KEY_USER_NAME: &str = "userName";
pub const KEY_EMAIL_VERIFIED: &str = "emailVerified";
pub const KEY_AVATAR_URL: &str = "avatarUrl";
pub const KEY_EMAIL_TO_VERIFY: &str = "emailToVerify";

/// 持久化键值存储（浏览器中为 LocalStorage）
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> PalResult<()>;
    fn remove(&self, key: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedIdentity {
    pub display_name: String,
    pub email: String,
    pub email_verified: bool,
    pub avatar_url: Option<String>,
}

impl CachedIdentity {
    pub fn new(email: &str, display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.display_name.is_empty()
    }

    /// 导航栏“已登录”提示；不可用于访问决策
    pub fn looks_signed_in(&self) -> bool {
        !self.email.is_empty()
    }
}

/// 身份缓存接口
pub trait IdentityCache {
    /// 读取缓存；不存在时返回空身份，从不失败
    fn read(&self) -> CachedIdentity;
    fn write(&self, identity: &CachedIdentity) -> PalResult<()>;
    fn clear(&self);

    fn set_pending_verification(&self, email: &str) -> PalResult<()>;
    fn pending_verification(&self) -> Option<String>;
    fn clear_pending_verification(&self);
}

/// 基于 `KeyValueStore` 的身份缓存
pub struct StoredIdentityCache<S> {
    store: S,
}

impl<S: KeyValueStore> StoredIdentityCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> IdentityCache for StoredIdentityCache<S> {
    fn read(&self) -> CachedIdentity {
        CachedIdentity {
            display_name: self.store.get(KEY_USER_NAME).unwrap_or_default(),
            email: self.store.get(KEY_USER_EMAIL).unwrap_or_default(),
            email_verified: self.store.get(KEY_EMAIL_VERIFIED).as_deref() == Some("true"),
            avatar_url: self.store.get(KEY_AVATAR_URL).filter(|u| !u.is_empty()),
        }
    }

    fn write(&self, identity: &CachedIdentity) -> PalResult<()> {
        self.store.set(KEY_USER_EMAIL, &identity.email)?;
        self.store.set(KEY_USER_NAME, &identity.display_name)?;
        self.store.set(
            KEY_EMAIL_VERIFIED,
            if identity.email_verified { "true" } else { "false" },
        )?;
        match &identity.avatar_url {
            Some(url) => self.store.set(KEY_AVATAR_URL, url)?,
            None => self.store.remove(KEY_AVATAR_URL),
        }
        Ok(())
    }

    fn clear(&self) {
        for key in [KEY_USER_EMAIL, KEY_USER_NAME, KEY_EMAIL_VERIFIED, KEY_AVATAR_URL] {
            self.store.remove(key);
        }
    }

    fn set_pending_verification(&self, email: &str) -> PalResult<()> {
        self.store.set(KEY_EMAIL_TO_VERIFY, email)
    }

    fn pending_verification(&self) -> Option<String> {
        self.store.get(KEY_EMAIL_TO_VERIFY).filter(|e| !e.is_empty())
    }

    fn clear_pending_verification(&self) {
        self.store.remove(KEY_EMAIL_TO_VERIFY);
    }
}

// =========================================================
// 测试实现 (Mock)
// =========================================================

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::PalError;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// 内存键值存储，可模拟写入失败（浏览器配额耗尽等）
    #[derive(Default)]
    pub struct MemoryStore {
        pub data: RefCell<HashMap<String, String>>,
        pub fail_writes: Cell<bool>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn snapshot(&self) -> HashMap<String, String> {
            self.data.borrow().clone()
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.data.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> PalResult<()> {
            if self.fail_writes.get() {
                return Err(PalError::storage("quota exceeded").in_op_with("store.set", key));
            }
            self.data.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) {
            self.data.borrow_mut().remove(key);
        }
    }

    pub fn memory_cache() -> StoredIdentityCache<MemoryStore> {
        StoredIdentityCache::new(MemoryStore::new())
    }

    fn ada() -> CachedIdentity {
        CachedIdentity {
            display_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            email_verified: true,
            avatar_url: Some("https://cdn.test/a.png".into()),
        }
    }

    #[test]
    fn test_read_empty_store() {
        let cache = memory_cache();
        let identity = cache.read();
        assert!(identity.is_empty());
        assert!(!identity.looks_signed_in());
    }

    #[test]
    fn test_write_then_read() {
        let cache = memory_cache();
        cache.write(&ada()).unwrap();
        assert_eq!(cache.read(), ada());
        assert_eq!(
            cache.store().get(KEY_USER_EMAIL).as_deref(),
            Some("ada@example.com")
        );
    }

    #[test]
    fn test_read_is_idempotent() {
        let cache = memory_cache();
        cache.write(&ada()).unwrap();
        let first = cache.read();
        for _ in 0..5 {
            assert_eq!(cache.read(), first);
        }
        assert_eq!(cache.store().snapshot().len(), 4);
    }

    #[test]
    fn test_clear_keeps_pending_verification() {
        let cache = memory_cache();
        cache.write(&ada()).unwrap();
        cache.set_pending_verification("new@example.com").unwrap();

        cache.clear();

        assert!(cache.read().is_empty());
        assert_eq!(cache.pending_verification().as_deref(), Some("new@example.com"));
        cache.clear_pending_verification();
        assert_eq!(cache.pending_verification(), None);
    }

    #[test]
    fn test_write_without_avatar_removes_stale_url() {
        let cache = memory_cache();
        cache.write(&ada()).unwrap();
        cache.write(&CachedIdentity::new("ada@example.com", "Ada")).unwrap();
        assert_eq!(cache.read().avatar_url, None);
        assert!(!cache.read().email_verified);
    }

    #[test]
    fn test_write_failure_surfaces_storage_error() {
        let cache = memory_cache();
        cache.store().fail_writes.set(true);
        let err = cache.write(&ada()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Storage);
    }
}
