//! Paginated response envelope

use serde::{Deserialize, Serialize};

use crate::query_params::{FilterParam, Page, QueryParams, Sort};

/// One page of records together with the parameters that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Records on this page
    pub data: Vec<T>,
    /// Number of records matching the filters, across all pages
    pub total: u64,
    /// Applied sorting
    pub sort: Sort,
    /// Current page
    pub page: Page,
    /// Applied filters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_params: Vec<FilterParam>,
}

impl<T> PageResponse<T> {
    /// Wraps `data` with the parameters of the request that produced it
    pub fn new(data: Vec<T>, total: u64, params: &QueryParams) -> Self {
        Self {
            data,
            total,
            sort: params.sort.clone(),
            page: params.page,
            filter_params: params.filter_params.clone(),
        }
    }

    /// Number of pages needed for `total` records at the page's limit
    pub fn total_pages(&self) -> u64 {
        if self.page.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.page.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_params::{FilterAction, SortDirection};

    #[test]
    fn test_total_pages() {
        let params = QueryParams::default();
        let response = PageResponse::new(vec![1, 2, 3], 21, &params);
        assert_eq!(response.total_pages(), 3);
        assert_eq!(response.sort, params.sort);
    }

    #[test]
    fn test_serialized_shape() {
        let params = QueryParams {
            filter_params: vec![FilterParam::new("name", FilterAction::Like, "bon")],
            ..Default::default()
        };
        let response = PageResponse::new(vec!["a"], 1, &params);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["total"], 1);
        assert_eq!(json["page"]["number"], 1);
        assert_eq!(json["page"]["limit"], 10);
        assert_eq!(json["sort"]["by"], "created_at");
        assert_eq!(json["sort"]["direction"], SortDirection::Descending.as_sql());
        assert_eq!(json["filter_params"][0]["action"], "like");
    }

    #[test]
    fn test_empty_filters_are_omitted() {
        let response = PageResponse::new(Vec::<u8>::new(), 0, &QueryParams::default());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("filter_params").is_none());
    }
}
