//! 浏览器地址解析
//!
//! 守卫只关心地址中的两件事：路径（决定路由）与查询串/片段中是否带有
//! OAuth 授权回调的 `code` 参数。

use url::Url;
use url::form_urlencoded;

const PARSE_BASE: &str = "http://localhost";

/// 授权回调参数名
pub const CALLBACK_CODE_PARAM: &str = "code";

/// 地址中的回调标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMarker {
    /// 查询串或片段中带有非空的 `code`
    OAuthCallback,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// 不含前导 `?`
    pub query: String,
    /// 不含前导 `#`
    pub fragment: String,
}

impl Location {
    pub fn new(path: &str, query: &str, fragment: &str) -> Self {
        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.trim_start_matches('?').to_string(),
            fragment: fragment.trim_start_matches('#').to_string(),
        }
    }

    /// 解析完整 URL 或站内相对地址（如 `/upload?code=1`）
    pub fn parse(href: &str) -> Self {
        let parsed =
            Url::parse(href).or_else(|_| Url::parse(PARSE_BASE).and_then(|b| b.join(href)));
        match parsed {
            Ok(url) => Self::new(
                url.path(),
                url.query().unwrap_or(""),
                url.fragment().unwrap_or(""),
            ),
            Err(_) => Self::new(href, "", ""),
        }
    }

    /// 查询串优先，其次片段
    pub fn callback_code(&self) -> Option<String> {
        find_param(&self.query, CALLBACK_CODE_PARAM)
            .or_else(|| find_param(&self.fragment, CALLBACK_CODE_PARAM))
    }

    pub fn marker(&self) -> LocationMarker {
        if self.callback_code().is_some() {
            LocationMarker::OAuthCallback
        } else {
            LocationMarker::None
        }
    }

    /// 查询串与片段组成的键；变化时守卫重新评估
    pub fn search_key(&self) -> String {
        format!("?{}#{}", self.query, self.fragment)
    }

    /// 去掉 `code` / `state` 之后的站内地址，用于回调完成后替换历史记录
    pub fn without_callback(&self) -> String {
        let strip = |raw: &str| {
            let kept: Vec<(String, String)> = form_urlencoded::parse(raw.as_bytes())
                .filter(|(k, _)| k != CALLBACK_CODE_PARAM && k != "state")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            form_urlencoded::Serializer::new(String::new())
                .extend_pairs(kept)
                .finish()
        };
        Self::new(&self.path, &strip(&self.query), &strip(&self.fragment)).to_href()
    }

    pub fn to_href(&self) -> String {
        let mut href = self.path.clone();
        if !self.query.is_empty() {
            href.push('?');
            href.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            href.push('#');
            href.push_str(&self.fragment);
        }
        href
    }
}

fn find_param(raw: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(raw.as_bytes())
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}
