use serde::{Deserialize, Serialize};

/// Supplier key (`cve`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SupplierKey(pub String);

impl SupplierKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Display for SupplierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub key: SupplierKey,
    pub name: String,
    pub legal_name: String,
}

impl Supplier {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        legal_name: impl Into<String>,
    ) -> Self {
        Self { key: SupplierKey::new(key), name: name.into(), legal_name: legal_name.into() }
    }
}
