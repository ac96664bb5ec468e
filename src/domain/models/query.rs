use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(text: &str) -> Option<SortDirection> {
        return SortDirection::iter().find(|e| return e.to_string() == text);
    }
}

/// User-driven list inputs. Nothing is applied until the user submits a
/// search or sort. `sort_field` and `sort_direction` are set and cleared as
/// a pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilters {
    pub search: Option<String>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<SortDirection>,
}

/// A fully resolved list query, ready to be rendered as query parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListRequest {
    pub filters: ListFilters,
    pub page: u32,
    pub per_page: u32,
}

impl ListRequest {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
        ];

        if let Some(search) = &self.filters.search {
            pairs.push(("search".to_string(), search.to_string()));
        }

        // sort_by and order travel together or not at all.
        if let (Some(field), Some(direction)) =
            (&self.filters.sort_field, self.filters.sort_direction)
        {
            pairs.push(("sort_by".to_string(), field.to_string()));
            pairs.push(("order".to_string(), direction.to_string()));
        }

        return pairs;
    }
}
