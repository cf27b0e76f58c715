use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::{AppConfig, ListGeometry, OperationMode},
    state::roster::ParticipantColor,
};

/// Configuration as shown to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub spin_duration_secs: f64,
    pub auto_interval_secs: f64,
    pub celebration_duration_secs: f64,
    pub operation_mode: OperationMode,
    pub wheel_full_turns: u32,
    pub list_extra_loops: u32,
    pub list_geometry: ListGeometry,
    pub colors: Vec<ParticipantColor>,
}

impl From<&AppConfig> for ConfigResponse {
    fn from(value: &AppConfig) -> Self {
        Self {
            spin_duration_secs: value.spin_duration.as_secs_f64(),
            auto_interval_secs: value.auto_interval.as_secs_f64(),
            celebration_duration_secs: value.celebration_duration.as_secs_f64(),
            operation_mode: value.operation_mode,
            wheel_full_turns: value.wheel_full_turns,
            list_extra_loops: value.list_extra_loops,
            list_geometry: value.list_geometry,
            colors: value.colors().to_vec(),
        }
    }
}

/// Partial configuration update; omitted fields keep their value.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ConfigUpdateRequest {
    #[validate(range(min = 0.05, max = 600.0))]
    pub spin_duration_secs: Option<f64>,
    #[validate(range(min = 0.0, max = 3600.0))]
    pub auto_interval_secs: Option<f64>,
    #[validate(range(min = 0.05, max = 600.0))]
    pub celebration_duration_secs: Option<f64>,
    pub operation_mode: Option<OperationMode>,
    #[validate(range(min = 1, max = 50))]
    pub wheel_full_turns: Option<u32>,
    #[validate(range(min = 1, max = 20))]
    pub list_extra_loops: Option<u32>,
    pub colors: Option<Vec<ParticipantColor>>,
}

impl ConfigUpdateRequest {
    /// Copy every provided field onto `config`.
    pub fn apply_to(self, config: &mut AppConfig) {
        if let Some(secs) = self.spin_duration_secs {
            config.spin_duration = Duration::from_secs_f64(secs);
        }
        if let Some(secs) = self.auto_interval_secs {
            config.auto_interval = Duration::from_secs_f64(secs);
        }
        if let Some(secs) = self.celebration_duration_secs {
            config.celebration_duration = Duration::from_secs_f64(secs);
        }
        if let Some(mode) = self.operation_mode {
            config.operation_mode = mode;
        }
        if let Some(turns) = self.wheel_full_turns {
            config.wheel_full_turns = turns;
        }
        if let Some(loops) = self.list_extra_loops {
            config.list_extra_loops = loops;
        }
        if let Some(colors) = self.colors {
            config.set_colors(colors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_values_fail_validation() {
        let request = ConfigUpdateRequest {
            spin_duration_secs: Some(0.0),
            wheel_full_turns: Some(0),
            ..Default::default()
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("spin_duration_secs"));
        assert!(errors.field_errors().contains_key("wheel_full_turns"));
    }

    #[test]
    fn apply_only_touches_provided_fields() {
        let mut config = AppConfig::default();
        let before = config.clone();
        ConfigUpdateRequest {
            auto_interval_secs: Some(1.5),
            operation_mode: Some(OperationMode::SemiAuto),
            ..Default::default()
        }
        .apply_to(&mut config);

        assert_eq!(config.auto_interval, Duration::from_millis(1500));
        assert_eq!(config.operation_mode, OperationMode::SemiAuto);
        assert_eq!(config.spin_duration, before.spin_duration);
        assert_eq!(config.colors(), before.colors());
    }
}
