use serde::{Deserialize, Serialize};

/// The slice of a pet record the scheduling form needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(rename = "idPet")]
    pub pet_id: String,
    #[serde(rename = "idOwner")]
    pub owner_id: String,
    pub name: String,
    /// Kilograms. Lookup key into a service's weight tiers.
    pub weight: f64,
}
