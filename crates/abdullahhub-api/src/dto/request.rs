//! Request DTOs.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use abdullahhub_core::types::{PageRequest, PluginId};
use abdullahhub_database::MarketplaceQuery;

/// Query of `GET /plugins/marketplace`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplaceParams {
    /// Substring matched against name and description.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub page_size: Option<u64>,
}

impl MarketplaceParams {
    /// Split into filters and a page request; blank filters are dropped.
    pub fn into_parts(self) -> (MarketplaceQuery, PageRequest) {
        let defaults = PageRequest::default();
        let page = PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.page_size.unwrap_or(defaults.page_size),
        );
        let query = MarketplaceQuery {
            search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            category: self
                .category
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };
        (query, page)
    }
}

/// Body of `POST /plugins/{id}/rate`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RateRequest {
    /// 1 to 5.
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
}

/// Query of `GET /admin/plugins`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminPluginsParams {
    /// `pending` lists only plugins awaiting review.
    pub status: Option<String>,
}

impl AdminPluginsParams {
    /// Whether only pending plugins were requested.
    pub fn pending_only(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("pending"))
    }
}

/// Body of `POST /api/v1/execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicExecuteRequest {
    /// Plugin to run.
    pub plugin_id: PluginId,
    /// Plugin input. Older clients send it as `data`.
    #[serde(default, alias = "data")]
    pub input: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marketplace_params_blank_filters() {
        let params = MarketplaceParams {
            search: Some("  ".into()),
            category: Some("Image Processing".into()),
            page: Some(0),
            page_size: Some(1000),
        };
        let (query, page) = params.into_parts();
        assert!(query.search.is_none());
        assert_eq!(query.category.as_deref(), Some("Image Processing"));
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 100);
    }

    #[test]
    fn test_rating_range() {
        assert!(RateRequest { rating: 1 }.validate().is_ok());
        assert!(RateRequest { rating: 5 }.validate().is_ok());
        assert!(RateRequest { rating: 0 }.validate().is_err());
        assert!(RateRequest { rating: 6 }.validate().is_err());
    }

    #[test]
    fn test_pending_only() {
        let params = AdminPluginsParams {
            status: Some("Pending".into()),
        };
        assert!(params.pending_only());
        assert!(!AdminPluginsParams::default().pending_only());
    }

    #[test]
    fn test_public_execute_defaults_input() {
        let req: PublicExecuteRequest = serde_json::from_value(serde_json::json!({
            "plugin_id": "0b0a1c5e-4d2f-4a7e-9a53-2a0c9d9b2f11"
        }))
        .unwrap();
        assert!(req.input.is_null());
    }

    #[test]
    fn test_public_execute_accepts_data_field() {
        let req: PublicExecuteRequest = serde_json::from_value(serde_json::json!({
            "plugin_id": "0b0a1c5e-4d2f-4a7e-9a53-2a0c9d9b2f11",
            "data": {"image": "https://example.com/a.png"}
        }))
        .unwrap();
        assert_eq!(req.input["image"], "https://example.com/a.png");
    }
}
