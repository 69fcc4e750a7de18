use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{AuditFilter, EntityType};
use crate::services::GatewayError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogParams {
    pub user_id: Option<Uuid>,
    /// Comma-separated action names.
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl AuditLogParams {
    pub fn to_filter(&self) -> Result<AuditFilter, GatewayError> {
        let entity_type = self
            .entity_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<EntityType>().map_err(GatewayError::validation))
            .transpose()?;

        let actions = self
            .action
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();

        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(GatewayError::validation("dateFrom must not be after dateTo"));
            }
        }

        Ok(AuditFilter {
            entity_type,
            entity_id: self.entity_id,
            actor_id: self.user_id,
            actions,
            from: self.date_from,
            to: self.date_to,
            oldest_first: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_action_csv() {
        let params = AuditLogParams {
            action: Some("approved, rejected,,published".into()),
            entity_type: Some("route".into()),
            ..Default::default()
        };
        let filter = params.to_filter().unwrap();
        assert_eq!(filter.actions, vec!["approved", "rejected", "published"]);
        assert_eq!(filter.entity_type, Some(EntityType::Route));
    }

    #[test]
    fn rejects_unknown_entity_type() {
        let params = AuditLogParams {
            entity_type: Some("invoice".into()),
            ..Default::default()
        };
        assert!(matches!(params.to_filter(), Err(GatewayError::ValidationFailed(_))));
    }
}
