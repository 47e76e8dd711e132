use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::validate::{ParamRules, ParamSchema, Rule};

/// A persisted user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub password: String,
}

/// Body of a create or register request
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

impl ParamSchema for NewUser {
    fn rules() -> ParamRules {
        ParamRules::new()
            .field("username", Rule::string().required())
            .field("password", Rule::string().required())
    }
}

/// Fields written by an update; absent fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    /// Reads the writable fields out of an arbitrary JSON body.
    ///
    /// Unknown keys and `_id` are ignored. Scalars are cast to strings and
    /// `null` leaves a field untouched; arrays and objects are a cast error.
    pub fn from_value(body: &Value) -> Result<Self, ApiError> {
        let Some(map) = body.as_object() else {
            return Err(ApiError::bad_request("update body must be a JSON object"));
        };

        Ok(Self {
            username: cast_string(map.get("username"), "username")?,
            password: cast_string(map.get("password"), "password")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(password) = &self.password {
            user.password = password.clone();
        }
    }
}

fn cast_string(value: Option<&Value>, field: &str) -> Result<Option<String>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(ApiError::bad_request(format!(
            "Cast to string failed for field '{}'",
            field
        ))),
    }
}
