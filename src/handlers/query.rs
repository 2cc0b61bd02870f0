use serde::Deserialize;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::database::Page;
use crate::error::ApiError;
use crate::handlers::validation::{check_reason, FieldErrors};

/// `?limit=&offset=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn page(&self, api: &ApiConfig) -> Result<Page, ApiError> {
        let limit = self.limit.unwrap_or(api.default_page_limit);
        let offset = self.offset.unwrap_or(0);

        let mut errors = FieldErrors::new();
        if !(1..=api.max_page_limit).contains(&limit) {
            errors.add("limit", format!("limit must be between 1 and {}", api.max_page_limit));
        }
        errors.check(offset >= 0, "offset", "offset must be >= 0");
        errors.into_result()?;

        Ok(Page::new(limit, offset))
    }
}

/// `?q=` free-text search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

impl SearchParams {
    pub fn query(&self) -> Result<&str, ApiError> {
        let q = self.q.as_deref().map(str::trim).unwrap_or_default();
        let mut errors = FieldErrors::new();
        if q.is_empty() {
            errors.add("q", "No search was entered");
        } else if q.chars().count() > 100 {
            errors.add("q", "Search must be at most 100 characters");
        }
        errors.into_result()?;
        Ok(q)
    }
}

/// `?reason=` on soft delete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteParams {
    pub reason: Option<String>,
}

impl DeleteParams {
    pub fn reason(&self) -> Result<Option<&str>, ApiError> {
        let reason = self.reason.as_deref().map(str::trim);
        let mut errors = FieldErrors::new();
        check_reason(&mut errors, "reason", reason);
        errors.into_result()?;
        Ok(reason)
    }
}

/// Optional equality filters on account listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFilters {
    pub client_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn page_defaults() {
        let api = AppConfig::development().api;
        let page = PageParams::default().page(&api).unwrap();
        assert_eq!(page, Page::new(20, 0));
    }

    #[test]
    fn page_bounds() {
        let api = AppConfig::development().api;
        assert!(PageParams { limit: Some(40), offset: Some(0) }.page(&api).is_ok());
        assert!(PageParams { limit: Some(41), offset: None }.page(&api).is_err());
        assert!(PageParams { limit: Some(0), offset: None }.page(&api).is_err());
        assert!(PageParams { limit: None, offset: Some(-1) }.page(&api).is_err());
    }

    #[test]
    fn search_requires_text() {
        assert!(SearchParams { q: Some("   ".to_string()) }.query().is_err());
        assert_eq!(SearchParams { q: Some(" ana ".to_string()) }.query().unwrap(), "ana");
    }

    #[test]
    fn empty_delete_reason_is_rejected() {
        assert!(DeleteParams { reason: Some("".to_string()) }.reason().is_err());
        assert_eq!(DeleteParams::default().reason().unwrap(), None);
    }
}
