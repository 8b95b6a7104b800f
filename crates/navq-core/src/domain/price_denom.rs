use serde::{Deserialize, Serialize};

/// Ordered, de-duplicated set of price denominations.
///
/// Matching is exact and case-sensitive. An empty set places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PriceDenomSet(Vec<String>);

impl PriceDenomSet {
    /// Build from raw values, keeping the first occurrence of each entry and
    /// dropping blank ones.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut denoms: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if value.trim().is_empty() || denoms.contains(&value) {
                continue;
            }
            denoms.push(value);
        }
        Self(denoms)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `price_denom` passes this filter.
    pub fn allows(&self, price_denom: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|denom| denom == price_denom)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for PriceDenomSet {
    fn from(values: Vec<String>) -> Self {
        Self::new(values)
    }
}

impl From<PriceDenomSet> for Vec<String> {
    fn from(value: PriceDenomSet) -> Self {
        value.0
    }
}
