use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder printed for a field the API sent as `null`.
pub const NULL_CELL: &str = "None";

/// The API's `id` value. Numeric ids are the norm but text ids pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Number(id.into())
    }
}

// Required-but-nullable: the key must be present, `null` is accepted.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

fn cell<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| NULL_CELL.to_string(), ToString::to_string)
}

/// A user as returned by the upstream API. Fields not listed here are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "nullable")]
    pub id: Option<UserId>,
    #[serde(deserialize_with = "nullable")]
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub username: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub email: Option<String>,
    pub address: Address,
    #[serde(deserialize_with = "nullable")]
    pub phone: Option<String>,
    pub company: Company,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(deserialize_with = "nullable")]
    pub street: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub suite: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(deserialize_with = "nullable")]
    pub name: Option<String>,
}

/// Flat, re-keyed form of a [`User`]. `null` inputs stay `null` here and
/// only become [`NULL_CELL`] when rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedUser {
    #[serde(rename = "ID")]
    pub id: Option<UserId>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Username")]
    pub username: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: Option<String>,
    #[serde(rename = "Company")]
    pub company: Option<String>,
}

impl TransformedUser {
    pub const COLUMNS: [&'static str; 7] = [
        "ID",
        "Name",
        "Username",
        "Email",
        "Address",
        "PhoneNumber",
        "Company",
    ];

    /// Cells in [`TransformedUser::COLUMNS`] order.
    pub fn row(&self) -> Vec<String> {
        vec![
            cell(&self.id),
            cell(&self.name),
            cell(&self.username),
            cell(&self.email),
            self.address.clone(),
            cell(&self.phone_number),
            cell(&self.company),
        ]
    }
}

impl Address {
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}",
            cell(&self.street),
            cell(&self.suite),
            cell(&self.city)
        )
    }
}

impl From<User> for TransformedUser {
    fn from(user: User) -> Self {
        let address = user.address.one_line();
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            address,
            phone_number: user.phone,
            company: user.company.name,
        }
    }
}
