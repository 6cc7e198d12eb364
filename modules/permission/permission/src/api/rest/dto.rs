use permission_sdk::{Payload, Routes, UserId};
use serde::{Deserialize, Serialize};

/// REST DTO for `POST /is_allowed`.
#[derive(Debug, Clone, Deserialize)]
pub struct IsAllowedRequest {
    pub name: String,
    pub user_id: UserId,
    #[serde(default)]
    pub data: Vec<Payload>,
}

/// REST DTO for `POST /restrict_fq_fields`.
#[derive(Debug, Clone, Deserialize)]
pub struct RestrictFqFieldsRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub fqfields: Vec<String>,
}

/// REST DTO for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthDto {
    pub healthinfo: HealthInfoDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthInfoDto {
    pub routes: Routes,
}

impl From<Routes> for HealthDto {
    fn from(routes: Routes) -> Self {
        Self {
            healthinfo: HealthInfoDto { routes },
        }
    }
}
