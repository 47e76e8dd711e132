//! Declarative body parameter rules, checked before a handler runs.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ApiError;

use super::body::ParsedBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Int,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    fn name(self) -> &'static str {
        match self {
            ParamType::String => "a string",
            ParamType::Number => "a number",
            ParamType::Int => "an integer",
            ParamType::Boolean => "a boolean",
            ParamType::Object => "an object",
            ParamType::Array => "an array",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Int => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub kind: ParamType,
    pub required: bool,
    pub allow_empty: bool,
}

impl Rule {
    pub fn of(kind: ParamType) -> Self {
        Self {
            kind,
            required: false,
            allow_empty: false,
        }
    }

    pub fn string() -> Self {
        Self::of(ParamType::String)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Why `value` breaks this rule, if it does
    fn check(&self, value: Option<&Value>) -> Option<String> {
        let value = match value {
            None | Some(Value::Null) if self.required => return Some("required".to_string()),
            None | Some(Value::Null) => return None,
            Some(v) => v,
        };

        if !self.kind.accepts(value) {
            return Some(format!("should be {}", self.kind.name()));
        }

        if value.as_str() == Some("") && !self.allow_empty {
            return Some("should not be empty".to_string());
        }

        None
    }
}

/// Ordered field rules for one request body
#[derive(Debug, Clone, Default)]
pub struct ParamRules {
    fields: Vec<(String, Rule)>,
}

impl ParamRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    /// Checks every field and reports all violations at once
    pub fn verify(&self, body: &Value) -> Result<(), ApiError> {
        let empty = Map::new();
        let object = match body {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                let mut field_errors = HashMap::new();
                field_errors.insert("body".to_string(), "should be an object".to_string());
                return Err(ApiError::unprocessable_entity("Validation Failed", field_errors));
            }
        };

        let field_errors: HashMap<String, String> = self
            .fields
            .iter()
            .filter_map(|(name, rule)| rule.check(object.get(name)).map(|err| (name.clone(), err)))
            .collect();

        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::unprocessable_entity("Validation Failed", field_errors))
        }
    }
}

/// Request bodies that declare their own parameter rules
pub trait ParamSchema {
    fn rules() -> ParamRules;
}

/// JSON or form body that passed `T::rules()` and deserialized into `T`
#[derive(Debug, Clone)]
pub struct Verified<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Verified<T>
where
    S: Send + Sync,
    T: ParamSchema + DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ParsedBody(body) = ParsedBody::from_request(req, state).await?;

        if let Err(err) = T::rules().verify(&body) {
            tracing::debug!("Parameter validation failed: {:?}", err);
            return Err(err);
        }

        serde_json::from_value(body)
            .map(Verified)
            .map_err(|e| ApiError::invalid_json(e.to_string()))
    }
}
