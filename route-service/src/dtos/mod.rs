pub mod audit;
pub mod rate_limits;
pub mod routes;
pub mod users;

use serde::Deserialize;

use crate::models::PageRequest;

/// `?page=&size=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page, params.size)
    }
}
