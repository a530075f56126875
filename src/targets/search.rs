//! Search targets

use super::{paged, PageTarget, SEARCH_PATH};
use crate::http::RequestSpec;
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Which search flavour to call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchApi {
    #[default]
    SalesNavigator,
    Classic,
}

impl SearchApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesNavigator => "sales_navigator",
            Self::Classic => "classic",
        }
    }

    /// Largest `limit` the API accepts
    pub fn max_page_size(&self) -> usize {
        match self {
            Self::SalesNavigator => 100,
            Self::Classic => 50,
        }
    }
}

/// People search driven by a criteria object
#[derive(Debug, Clone)]
pub struct SearchTarget {
    account_id: String,
    api: SearchApi,
    criteria: JsonObject,
}

impl SearchTarget {
    /// Sales Navigator people search
    pub fn sales_navigator(account_id: impl Into<String>, criteria: JsonValue) -> Self {
        Self::new(account_id, SearchApi::SalesNavigator, criteria)
    }

    /// Classic people search
    pub fn classic(account_id: impl Into<String>, criteria: JsonValue) -> Self {
        Self::new(account_id, SearchApi::Classic, criteria)
    }

    /// Non-object criteria are treated as empty
    pub fn new(account_id: impl Into<String>, api: SearchApi, criteria: JsonValue) -> Self {
        let criteria = match criteria {
            JsonValue::Object(map) => map,
            _ => JsonObject::new(),
        };
        Self {
            account_id: account_id.into(),
            api,
            criteria,
        }
    }

    pub fn api(&self) -> SearchApi {
        self.api
    }

    fn body(&self) -> JsonValue {
        match self.api {
            SearchApi::SalesNavigator => {
                let mut body = JsonObject::new();
                body.insert("api".into(), json!(self.api.as_str()));
                body.insert("category".into(), json!("people"));
                for (key, value) in &self.criteria {
                    body.insert(key.clone(), value.clone());
                }
                JsonValue::Object(body)
            }
            SearchApi::Classic => json!({
                "api": self.api.as_str(),
                "category": "people",
                "params": self.criteria,
            }),
        }
    }
}

impl PageTarget for SearchTarget {
    fn name(&self) -> &str {
        match self.api {
            SearchApi::SalesNavigator => "sales_navigator_search",
            SearchApi::Classic => "classic_search",
        }
    }

    fn max_page_size(&self) -> usize {
        self.api.max_page_size()
    }

    fn request(&self, cursor: Option<&str>, page_size: usize) -> RequestSpec {
        paged(
            RequestSpec::post(SEARCH_PATH),
            &self.account_id,
            cursor,
            page_size,
        )
        .json(self.body())
    }
}

/// People search from a search page URL
#[derive(Debug, Clone)]
pub struct UrlSearchTarget {
    account_id: String,
    url: String,
}

impl UrlSearchTarget {
    pub fn new(account_id: impl Into<String>, url: impl AsRef<str>) -> Self {
        Self {
            account_id: account_id.into(),
            url: url.as_ref().trim().to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PageTarget for UrlSearchTarget {
    fn name(&self) -> &str {
        "url_search"
    }

    fn max_page_size(&self) -> usize {
        100
    }

    fn request(&self, cursor: Option<&str>, page_size: usize) -> RequestSpec {
        paged(
            RequestSpec::post(SEARCH_PATH),
            &self.account_id,
            cursor,
            page_size,
        )
        .json(json!({ "url": self.url }))
    }

    // Older provider deployments only accept the URL under this key
    fn fallback_request(&self, cursor: Option<&str>, page_size: usize) -> Option<RequestSpec> {
        Some(
            paged(
                RequestSpec::post(SEARCH_PATH),
                &self.account_id,
                cursor,
                page_size,
            )
            .json(json!({ "search_from_url": self.url })),
        )
    }
}
