use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

/// Wire-level description of an admin entity: its endpoint path, the
/// singular key mutations are wrapped under, the plural key list responses
/// come back under, and the form fields validation messages may refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSpec {
    pub path: &'static str,
    pub singular: &'static str,
    pub plural: &'static str,
    pub known_fields: &'static [&'static str],
}

/// An admin entity managed through a list screen. Every implementation gets
/// the same controller behavior, parameterized only by its spec and draft.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    type Draft: Serialize + Send + Sync;

    const SPEC: ResourceSpec;

    fn id(&self) -> u64;
    fn summary(&self) -> String;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    pub description: String,
}

impl Resource for Role {
    type Draft = RoleDraft;

    const SPEC: ResourceSpec = ResourceSpec {
        path: "roles",
        singular: "role",
        plural: "roles",
        known_fields: &["name", "description"],
    };

    fn id(&self) -> u64 {
        return self.id;
    }

    fn summary(&self) -> String {
        return format!("{}\t{}\t{}", self.id, self.name, self.description);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organizational_unit_id: Option<u64>,
    #[serde(default)]
    pub organizational_unit_name: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDraft {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit_id: Option<u64>,
}

impl Resource for Position {
    type Draft = PositionDraft;

    const SPEC: ResourceSpec = ResourceSpec {
        path: "positions",
        singular: "position",
        plural: "positions",
        known_fields: &["name", "description", "organizational_unit"],
    };

    fn id(&self) -> u64 {
        return self.id;
    }

    fn summary(&self) -> String {
        return format!(
            "{}\t{}\t{}\t{}",
            self.id, self.name, self.organizational_unit_name, self.description
        );
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_type_id: Option<u64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnitDraft {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_type_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

impl Resource for OrgUnit {
    type Draft = OrgUnitDraft;

    const SPEC: ResourceSpec = ResourceSpec {
        path: "organizational_units",
        singular: "organizational_unit",
        plural: "organizational_units",
        known_fields: &["name", "description", "location_type", "parent"],
    };

    fn id(&self) -> u64 {
        return self.id;
    }

    fn summary(&self) -> String {
        return format!("{}\t{}\t{}", self.id, self.name, self.description);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationType {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTypeDraft {
    pub name: String,
    pub description: String,
}

impl Resource for LocationType {
    type Draft = LocationTypeDraft;

    const SPEC: ResourceSpec = ResourceSpec {
        path: "location_types",
        singular: "location_type",
        plural: "location_types",
        known_fields: &["name", "description"],
    };

    fn id(&self) -> u64 {
        return self.id;
    }

    fn summary(&self) -> String {
        return format!("{}\t{}\t{}", self.id, self.name, self.description);
    }
}
