use rocket::serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Active,
    Maintenance,
    Retired,
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VehicleStatus::Active => "Active",
            VehicleStatus::Maintenance => "Maintenance",
            VehicleStatus::Retired => "Retired",
        };
        f.write_str(label)
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub plate: String,
    pub status: VehicleStatus,
}

#[derive(Deserialize, Debug, Validate)]
pub struct VehicleRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(min = 2, max = 12))]
    pub plate: String,
}

#[derive(Deserialize, Debug)]
pub struct VehicleStatusRequest {
    pub status: VehicleStatus,
}

#[derive(Serialize, Debug, Clone)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub name: String,
    pub plate: String,
    pub status: VehicleStatus,
}

impl From<&Vehicle> for VehicleResponse {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id,
            name: vehicle.name.clone(),
            plate: vehicle.plate.clone(),
            status: vehicle.status,
        }
    }
}
