use serde::{Deserialize, Serialize};

use super::null_as_default;

/// One `{minWeight, maxWeight, price}` band of a weight-priced service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightPriceRule {
    pub min_weight: f64,
    pub max_weight: f64,
    pub price: f64,
}

impl WeightPriceRule {
    /// Both ends inclusive.
    pub fn contains(&self, weight: f64) -> bool {
        weight >= self.min_weight && weight <= self.max_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "idService")]
    pub service_id: String,
    pub name: String,
    pub base_price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_by_weight: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weight_price_rules: Vec<WeightPriceRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_bounds_are_inclusive() {
        let rule = WeightPriceRule { min_weight: 10.0, max_weight: 25.0, price: 50_000.0 };
        assert!(rule.contains(10.0));
        assert!(rule.contains(25.0));
        assert!(!rule.contains(25.01));
        assert!(!rule.contains(9.99));
    }

    #[test]
    fn service_without_rules_deserializes() {
        let json = r#"{"idService": "s1", "name": "Bath", "basePrice": 35000}"#;
        let service: Service = serde_json::from_str(json).unwrap();
        assert!(!service.price_by_weight);
        assert!(service.weight_price_rules.is_empty());
        assert_eq!(service.base_price, 35_000.0);
    }

    #[test]
    fn null_rules_read_as_empty() {
        let json = r#"{"idService": "s1", "name": "Bath", "basePrice": 35000.0,
            "priceByWeight": false, "weightPriceRules": null}"#;
        let service: Service = serde_json::from_str(json).unwrap();
        assert!(service.weight_price_rules.is_empty());

        let json = r#"{"idService": "s2", "name": "Cut", "basePrice": 20000,
            "priceByWeight": null}"#;
        let service: Service = serde_json::from_str(json).unwrap();
        assert!(!service.price_by_weight);
    }
}
