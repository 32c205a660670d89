use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ParseEnumError;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, ToSchema,
)]
pub enum Role {
    Developer,
    Designer,
    Manager,
    Tester,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Developer, Role::Designer, Role::Manager, Role::Tester];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Developer => "Developer",
            Role::Designer => "Designer",
            Role::Manager => "Manager",
            Role::Tester => "Tester",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "role",
                value: s.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, ToSchema)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|gender| gender.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "gender",
                value: s.to_string(),
            })
    }
}

/// Everything a user types into the registration form, once validated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct EmployeeFields {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub skills: String,
    /// Years of experience as entered, e.g. `"3"`.
    pub experience: String,
    pub gender: Gender,
    #[serde(rename = "joinDate")]
    #[schema(value_type = String, format = Date)]
    pub join_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub duration: NaiveDate,
    pub agreement: bool,
}

/// A stored employee. `id` and the timestamps are assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct Employee {
    pub id: String,
    #[serde(flatten)]
    pub fields: EmployeeFields,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}
