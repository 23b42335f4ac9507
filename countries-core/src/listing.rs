use crate::model::Country;

pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Countries whose common name contains `query`, ignoring case.
/// A blank query keeps everything.
pub fn filter_by_name<'a>(countries: &'a [Country], query: &str) -> Vec<&'a Country> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return countries.iter().collect();
    }

    countries
        .iter()
        .filter(|c| c.name.common.to_lowercase().contains(&needle))
        .collect()
}

/// `ceil(len / page_size)`.
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// The 1-based `page` of `items`; empty when out of range.
pub fn page_slice<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    let page_size = page_size.max(1);
    let Some(start) = page.checked_sub(1).and_then(|p| p.checked_mul(page_size)) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Search box + pager state of the country list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    query: String,
    page: usize,
    page_size: usize,
}

/// What the list view shows for the current query and page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage<'a> {
    pub items: Vec<&'a Country>,
    pub page: usize,
    pub pages: usize,
    pub matches: usize,
}

impl ListingPage<'_> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Listing {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Listing {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the query starts over at page 1.
    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if query != self.query {
            self.query = query;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn visible<'a>(&self, countries: &'a [Country]) -> ListingPage<'a> {
        let filtered = filter_by_name(countries, &self.query);
        let items = page_slice(&filtered, self.page_size, self.page).to_vec();

        ListingPage {
            items,
            page: self.page,
            pages: page_count(filtered.len(), self.page_size),
            matches: filtered.len(),
        }
    }
}
