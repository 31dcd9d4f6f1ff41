use serde::{Deserialize, Serialize};

use super::enums::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub document_number: String,
    pub name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name)
    }

    /// First given name + first surname, as list rows show it.
    pub fn short_name(&self) -> String {
        let first = self.name.split_whitespace().next().unwrap_or_default();
        let last = self.last_name.split_whitespace().next().unwrap_or_default();
        format!("{first} {last}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_takes_first_words() {
        let user = User {
            document_number: "1012657654".into(),
            name: "Ana María".into(),
            last_name: "Gómez Ruiz".into(),
            role: UserRole::Client,
        };
        assert_eq!(user.short_name(), "Ana Gómez");
        assert_eq!(user.full_name(), "Ana María Gómez Ruiz");
    }
}
