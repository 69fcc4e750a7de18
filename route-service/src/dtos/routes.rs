use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::Validate;

use crate::models::{HttpMethod, OwnerFilter, RouteChanges, RouteStatus};
use crate::services::routes::{NewRoute, RouteListQuery};
use crate::services::GatewayError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 255, message = "Path is required"))]
    pub path: String,

    #[validate(length(max = 2048, message = "Upstream URL is too long"))]
    #[serde(default)]
    pub upstream_url: String,

    #[serde(default)]
    pub methods: BTreeSet<HttpMethod>,

    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,

    pub rate_limit_id: Option<Uuid>,
}

impl From<CreateRouteRequest> for NewRoute {
    fn from(req: CreateRouteRequest) -> Self {
        NewRoute {
            path: req.path,
            upstream_url: req.upstream_url,
            methods: req.methods,
            description: req.description,
            rate_limit_id: req.rate_limit_id,
        }
    }
}

/// Partial update. An absent field is left alone; an explicit `null` clears
/// the optional ones.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    #[validate(length(min = 1, max = 255, message = "Path must not be empty"))]
    pub path: Option<String>,

    #[validate(length(max = 2048, message = "Upstream URL is too long"))]
    pub upstream_url: Option<String>,

    pub methods: Option<BTreeSet<HttpMethod>>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub rate_limit_id: Option<Option<Uuid>>,
}

impl From<UpdateRouteRequest> for RouteChanges {
    fn from(req: UpdateRouteRequest) -> Self {
        RouteChanges {
            path: req.path,
            upstream_url: req.upstream_url,
            methods: req.methods,
            description: req.description,
            rate_limit_id: req.rate_limit_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRouteRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRoutesParams {
    pub status: Option<String>,
    /// `me` or a user id.
    pub created_by: Option<String>,
    pub search: Option<String>,
    pub upstream: Option<String>,
    pub upstream_exact: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ListRoutesParams {
    pub fn to_query(&self) -> Result<RouteListQuery, GatewayError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<RouteStatus>().map_err(GatewayError::validation))
            .transpose()?;

        let owner = match self.created_by.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(me) if me.eq_ignore_ascii_case("me") => Some(OwnerFilter::Me),
            Some(id) => Some(OwnerFilter::User(id.parse::<Uuid>().map_err(|_| {
                GatewayError::validation(format!("Invalid createdBy filter: {}", id))
            })?)),
        };

        Ok(RouteListQuery {
            status,
            owner,
            search: self.search.clone(),
            upstream: self.upstream.clone(),
            upstream_exact: self.upstream_exact.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
