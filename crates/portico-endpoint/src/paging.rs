//! Paging wire shape.
//!
//! Handlers return a [`PagingResponse`] in a `paging` output field; the
//! populator injects the body into its `content` member.

use portico_codec::PagingWrapper;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A page of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingResponse {
    /// Page contents, filled from the body field.
    pub content: Value,
    /// Whether another page follows.
    pub has_next: bool,
    /// Requested page size.
    pub size: u32,
    /// Elements on this page.
    pub number_of_elements: u32,
    /// Page number.
    pub number: u32,
    /// Echo of the requested page.
    pub pageable: PageableResponse,
}

impl PagingResponse {
    /// Describes page `page` of `size` holding `elements` entries.
    pub fn new(page: u32, size: u32, elements: u32, has_next: bool) -> Self {
        Self {
            content: Value::Null,
            has_next,
            size,
            number_of_elements: elements,
            number: page,
            pageable: PageableResponse {
                page,
                size,
                sort: SortResponse::default(),
            },
        }
    }

    /// Adds a sort order.
    #[must_use]
    pub fn with_sort(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.pageable.sort.orders.push(SortOrderResponse {
            property: property.into(),
            direction,
        });
        self
    }
}

impl PagingWrapper for PagingResponse {
    fn content_field() -> &'static str {
        "content"
    }
}

/// The requested page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageableResponse {
    /// Page number.
    pub page: u32,
    /// Page size.
    pub size: u32,
    /// Sort orders.
    pub sort: SortResponse,
}

/// Sort orders applied to a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortResponse {
    /// Orders, most significant first.
    pub orders: Vec<SortOrderResponse>,
}

/// One sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrderResponse {
    /// Sorted property.
    pub property: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paging_wire_shape() {
        let page = PagingResponse::new(2, 10, 3, false).with_sort("name", SortDirection::Desc);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({
                "content": null,
                "hasNext": false,
                "size": 10,
                "numberOfElements": 3,
                "number": 2,
                "pageable": {
                    "page": 2,
                    "size": 10,
                    "sort": {"orders": [{"property": "name", "direction": "DESC"}]}
                }
            })
        );
        assert_eq!(PagingResponse::content_field(), "content");
    }
}
