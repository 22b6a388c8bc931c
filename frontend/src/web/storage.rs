//! LocalStorage 适配
//!
//! 身份缓存的键值以原始字符串保存（不经过 JSON 编码），
//! 因此直接使用 `gloo-storage` 暴露的底层 `Storage`。

use gloo_storage::{LocalStorage, Storage};
use receiptpal::error::{PalError, PalResult};
use receiptpal::identity::KeyValueStore;

/// 浏览器 LocalStorage 键值存储
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStore;

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> PalResult<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| PalError::storage(format!("{e:?}")).in_op_with("local_storage.set", key))
    }

    fn remove(&self, key: &str) {
        if LocalStorage::raw().remove_item(key).is_err() {
            log::warn!("local storage refused to remove {key}");
        }
    }
}
