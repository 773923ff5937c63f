use serde::{Deserialize, Serialize};

/// Parameters of a paginated list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub filter: Option<String>,
    pub sort: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, 30)
    }
}

impl ListQuery {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            filter: None,
            sort: None,
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = (!filter.is_empty()).then_some(filter);
        self
    }

    /// Sort expression such as `-updated` (descending) or `created`
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Query-string pairs in the record API's naming
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("perPage", self.per_page.to_string()),
        ];
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs() {
        let query = ListQuery::new(1, 1)
            .filter(r#"gamekey="snake""#)
            .sort("-updated");

        assert_eq!(
            query.to_pairs(),
            vec![
                ("page", "1".to_string()),
                ("perPage", "1".to_string()),
                ("filter", r#"gamekey="snake""#.to_string()),
                ("sort", "-updated".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_filter_is_omitted() {
        let query = ListQuery::new(0, 0).filter("");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 1);
        assert_eq!(query.filter, None);
    }

    #[test]
    fn test_list_result_wire_format() {
        let raw = json!({
            "page": 1,
            "perPage": 50,
            "totalItems": 2,
            "totalPages": 1,
            "items": [{"id": "a"}, {"id": "b"}]
        });

        let result: ListResult<serde_json::Value> = serde_json::from_value(raw).unwrap();
        assert_eq!(result.per_page, 50);
        assert_eq!(result.total_items, 2);
        assert_eq!(result.items.len(), 2);
    }
}
