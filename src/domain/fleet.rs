// Fleet entity domain models (devices, groups, rules)
use serde::{Deserialize, Serialize};

/// Reference to another entity by id, as the host API nests them
/// (`{"device": {"id": "b1"}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A tracked vehicle (host entity type `Device`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Group {
    /// Display label; unnamed groups (built-in ones such as `GroupCompanyId`)
    /// show their id.
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// An exception rule definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Rule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Anything listed in a selector and ordered by name.
pub trait Named {
    /// Name used for ordering; a missing name sorts as the empty string.
    fn sort_name(&self) -> &str;
}

impl Named for Vehicle {
    fn sort_name(&self) -> &str {
        &self.name
    }
}

impl Named for Group {
    fn sort_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

impl Named for Rule {
    fn sort_name(&self) -> &str {
        &self.name
    }
}

/// Sort case-insensitively by name. Stable: equal names keep the order the
/// host returned them in.
pub fn sort_by_name<T: Named>(items: &mut [T]) {
    items.sort_by_cached_key(|item| item.sort_name().to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let mut vehicles = vec![
            Vehicle::new("b1", "truck 9"),
            Vehicle::new("b2", "Bus 4"),
            Vehicle::new("b3", "Truck 10"),
            Vehicle::new("b4", "ambulance"),
        ];
        sort_by_name(&mut vehicles);

        let names: Vec<&str> = vehicles.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ambulance", "Bus 4", "Truck 10", "truck 9"]);
    }

    #[test]
    fn test_sort_by_name_is_stable_on_ties() {
        let mut vehicles = vec![
            Vehicle::new("first", "Van"),
            Vehicle::new("x", "Car"),
            Vehicle::new("second", "VAN"),
            Vehicle::new("third", "van"),
        ];
        sort_by_name(&mut vehicles);

        let ids: Vec<&str> = vehicles.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "first", "second", "third"]);
    }

    #[test]
    fn test_unnamed_group_sorts_first_and_shows_id() {
        let mut groups = vec![
            Group {
                id: "g1".to_string(),
                name: Some("Depot".to_string()),
            },
            Group {
                id: "GroupCompanyId".to_string(),
                name: None,
            },
        ];
        sort_by_name(&mut groups);

        assert_eq!(groups[0].label(), "GroupCompanyId");
        assert_eq!(groups[1].label(), "Depot");
    }

    #[test]
    fn test_empty_group_name_falls_back_to_id() {
        let group = Group {
            id: "g7".to_string(),
            name: Some(String::new()),
        };
        assert_eq!(group.label(), "g7");
    }

    #[test]
    fn test_vehicle_ignores_unknown_device_fields() {
        let vehicle: Vehicle = serde_json::from_value(serde_json::json!({
            "id": "b12",
            "name": "Service Van",
            "serialNumber": "G9ABC",
            "activeFrom": "2020-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(vehicle, Vehicle::new("b12", "Service Van"));
    }
}
