use serde::Deserialize;

use crate::error::DataError;

/// Pagination parameters, e.g. deserialized from query params.
#[derive(Debug, Clone, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page_size() -> u32 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort: None,
        }
    }
}

impl Pageable {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// `(PageNum, PageSize)` as bound to the paged statement.
    pub fn window(&self) -> Result<(i32, i32), DataError> {
        let offset = i32::try_from(self.offset())
            .map_err(|_| DataError::Other(format!("page offset {} out of range", self.offset())))?;
        let size = i32::try_from(self.size)
            .map_err(|_| DataError::Other(format!("page size {} out of range", self.size)))?;
        Ok((offset, size))
    }
}
