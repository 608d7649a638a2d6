use super::{Filter, FilterOptions, FilterOptionsError};
use crate::config::{self, PaginationConfig};
use crate::feature::Feature;
use crate::params::Params;
use crate::query::Relation;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const PAGINATE_KEY: &str = "paginate";
const LIMIT_KEY: &str = "limit";
const PAGE_KEY: &str = "page";
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PaginateOptions {
    limit: Option<u64>,
    lower: Option<u64>,
    upper: Option<u64>,
    #[serde(default)]
    default_enabled: bool,
}

/// A resolved page: 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Rows skipped before the page, capped at `i64::MAX` (the largest
    /// `OFFSET` PostgreSQL binds).
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(MAX_OFFSET)
    }

    /// Read back a window produced by [`PaginateFilter::extract`](Filter::extract).
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            page: value.get(PAGE_KEY)?.as_u64()?.max(1),
            limit: value.get(LIMIT_KEY)?.as_u64()?,
        })
    }

    fn to_value(self) -> Value {
        let mut window = Map::new();
        window.insert(LIMIT_KEY.to_string(), Value::from(self.limit));
        window.insert(PAGE_KEY.to_string(), Value::from(self.page));
        Value::Object(window)
    }
}

/// LIMIT/OFFSET window driven by `limit` and `page`.
///
/// Enabled when `paginate` is truthy, or when it is absent and `limit` or
/// `page` is given, or when declared with `default_enabled`. A falsy
/// `paginate` always disables it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginateFilter {
    default_limit: u64,
    lower: u64,
    upper: u64,
    default_enabled: bool,
}

impl PaginateFilter {
    /// Bounds from `defaults` unless overridden; the default limit is clamped
    /// into the bounds.
    pub fn with_defaults(
        options: &FilterOptions,
        defaults: &PaginationConfig,
    ) -> Result<Self, FilterOptionsError> {
        let options: PaginateOptions = options.parse()?;
        let lower = options.lower.unwrap_or(defaults.lower);
        let upper = options.upper.unwrap_or(defaults.upper);
        if lower == 0 || lower > upper {
            return Err(FilterOptionsError::new(format!(
                "pagination bounds must satisfy 0 < lower <= upper (lower = {}, upper = {})",
                lower, upper
            )));
        }
        let default_limit = options
            .limit
            .unwrap_or(defaults.default_limit)
            .clamp(lower, upper);

        Ok(Self {
            default_limit,
            lower,
            upper,
            default_enabled: options.default_enabled,
        })
    }

    pub fn construct(
        options: &FilterOptions,
        _feature: &Feature,
    ) -> Result<Arc<dyn Filter>, FilterOptionsError> {
        let filter = Self::with_defaults(options, &config::settings().pagination)?;
        Ok(Arc::new(filter))
    }

    pub fn bounds(&self) -> (u64, u64) {
        (self.lower, self.upper)
    }

    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    fn enabled(&self, params: &Params) -> bool {
        match params.flag(PAGINATE_KEY) {
            Some(enabled) => enabled,
            None => {
                params.contains(LIMIT_KEY) || params.contains(PAGE_KEY) || self.default_enabled
            }
        }
    }

    /// The page `params` ask for, or `None` when pagination is off.
    pub fn window(&self, params: &Params) -> Option<PageWindow> {
        if !self.enabled(params) {
            return None;
        }
        let limit = params
            .integer(LIMIT_KEY)
            .map(|limit| clamp(limit, self.lower, self.upper))
            .unwrap_or(self.default_limit);
        let page = params
            .integer(PAGE_KEY)
            .map_or(1, |page| u64::try_from(page).unwrap_or(0).max(1));
        Some(PageWindow { page, limit })
    }
}

fn clamp(value: i64, lower: u64, upper: u64) -> u64 {
    u64::try_from(value).unwrap_or(0).clamp(lower, upper)
}

impl Filter for PaginateFilter {
    fn kind(&self) -> &str {
        "paginate"
    }

    fn param_key(&self) -> &str {
        PAGINATE_KEY
    }

    fn reads(&self, key: &str) -> bool {
        matches!(key, PAGINATE_KEY | LIMIT_KEY | PAGE_KEY)
    }

    fn extract(&self, params: &Params) -> Option<Value> {
        self.window(params).map(PageWindow::to_value)
    }

    fn is_window(&self) -> bool {
        true
    }

    fn apply(&self, relation: Relation, value: &Value) -> Relation {
        match PageWindow::from_value(value) {
            Some(window) => relation.limit(window.limit).offset(window.offset()),
            None => {
                log::warn!("Ignoring malformed page window: {}", value);
                relation
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginate(options: FilterOptions) -> PaginateFilter {
        PaginateFilter::with_defaults(&options, &PaginationConfig::default()).unwrap()
    }

    #[test]
    fn test_disabled_without_trigger() {
        assert_eq!(paginate(FilterOptions::new()).window(&Params::new()), None);
    }

    #[test]
    fn test_limit_or_page_enables() {
        let filter = paginate(FilterOptions::new());
        let window = filter.window(&Params::new().with("page", 3)).unwrap();
        assert_eq!(window, PageWindow { page: 3, limit: 20 });
        assert_eq!(window.offset(), 40);

        let window = filter.window(&Params::new().with("limit", "5")).unwrap();
        assert_eq!(window, PageWindow { page: 1, limit: 5 });
    }

    #[test]
    fn test_explicit_false_disables() {
        let filter = paginate(FilterOptions::new().with("default_enabled", true));
        assert!(filter.window(&Params::new()).is_some());
        let params = Params::new().with("paginate", false).with("limit", 2);
        assert_eq!(filter.window(&params), None);
    }

    #[test]
    fn test_limit_is_clamped_and_page_floored() {
        let filter = paginate(FilterOptions::new().with("lower", 2).with("upper", 100));
        let params = Params::new()
            .with("paginate", true)
            .with("limit", 1000)
            .with("page", -4);
        assert_eq!(filter.window(&params), Some(PageWindow { page: 1, limit: 100 }));

        let params = Params::new().with("limit", 1);
        assert_eq!(filter.window(&params).unwrap().limit, 2);
    }

    #[test]
    fn test_non_numeric_values_fall_back() {
        let filter = paginate(FilterOptions::new().with("limit", 10));
        let params = Params::new().with("limit", "many").with("page", "next");
        assert_eq!(filter.window(&params), Some(PageWindow { page: 1, limit: 10 }));
    }

    #[test]
    fn test_apply_sets_window() {
        let filter = paginate(FilterOptions::new());
        let value = filter
            .extract(&Params::new().with("limit", 2).with("page", 2))
            .unwrap();
        let relation = filter.apply(Relation::new("products"), &value);
        assert_eq!(relation.limit_value(), Some(2));
        assert_eq!(relation.offset_value(), Some(2));
        assert!(filter.is_window());
        assert!(filter.reads("page"));
    }

    #[test]
    fn test_offset_of_a_far_page_stays_bindable() {
        let filter = paginate(FilterOptions::new().with("lower", 2));
        let params = Params::new().with("limit", 2).with("page", i64::MAX);
        let window = filter.window(&params).unwrap();
        assert_eq!(window.page, i64::MAX as u64);
        assert_eq!(window.offset(), i64::MAX as u64);

        let relation = filter.apply(Relation::new("products"), &window.to_value());
        let (_, values) = relation.build();
        assert!(crate::query::value_conversion::with_converted_params(&values, |p| {
            Ok(p.len())
        })
        .is_ok());
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        let err = PaginateFilter::with_defaults(
            &FilterOptions::new().with("lower", 10).with("upper", 2),
            &PaginationConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("lower <= upper"));
    }
}
