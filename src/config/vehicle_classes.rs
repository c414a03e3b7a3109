use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use super::Validate;

/// Vehicle class catalogue: which visual templates each SUMO `vClass` may be drawn with.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehiclesConfig {
    pub vehicle_classes: HashMap<String, VehicleClass>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehicleClass {
    /// Colloquial name, for display only.
    pub label: String,
    pub models: Vec<ModelTemplate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelTemplate {
    pub object_url: String,
    #[serde(default)]
    pub material_url: Option<String>,
    #[serde(default)]
    pub scale: Option<f64>,
}

impl VehiclesConfig {
    pub fn is_supported(&self, vehicle_class: &str) -> bool {
        self.vehicle_classes.contains_key(vehicle_class)
    }

    pub fn templates(&self, vehicle_class: &str) -> Option<&[ModelTemplate]> {
        self.vehicle_classes
            .get(vehicle_class)
            .map(|class| class.models.as_slice())
    }
}

impl Validate for VehiclesConfig {
    fn validate(&self) -> Result<()> {
        if self.vehicle_classes.is_empty() {
            return Err(anyhow!("At least one vehicle class must be defined"));
        }

        for (name, class) in &self.vehicle_classes {
            if class.models.is_empty() {
                return Err(anyhow!("Vehicle class '{}' needs at least one model", name));
            }

            for model in &class.models {
                if model.object_url.is_empty() {
                    return Err(anyhow!("Model of vehicle class '{}' has an empty object url", name));
                }

                if let Some(scale) = model.scale {
                    if scale <= 0.0 {
                        return Err(anyhow!("Model scale for '{}' must be positive", name));
                    }
                }
            }
        }

        Ok(())
    }
}
