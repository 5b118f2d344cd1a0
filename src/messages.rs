/// Runtime messages exchanged between popup, background and content scripts
///
/// Every request is a JSON object with a string `action`. Parsing maps the
/// action to one variant; an action nobody handles becomes
/// `MessageError::UnknownAction`, which still gets an `{error}` reply.
use crate::error::MessageError;
use crate::favorites::FavoritesList;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// Requests handled by the background worker.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundCommand {
    GetFavorites,
    SaveFavorites(FavoritesList),
    GetStatus,
    ToggleDesign { enabled: bool },
    LogEvent { event: String, data: Value },
}

/// Requests handled by a content script.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentCommand {
    /// From the popup.
    ShowMyList,
    /// From the "view my list" context menu.
    OpenFavorites,
    AddCurrentToFavorites,
    RefreshDesign { enabled: bool },
}

fn split(request: Value) -> Result<(String, Map<String, Value>), MessageError> {
    let Value::Object(mut fields) = request else {
        return Err(MessageError::MissingAction);
    };
    match fields.remove("action") {
        Some(Value::String(action)) => Ok((action, fields)),
        _ => Err(MessageError::MissingAction),
    }
}

fn field<T: DeserializeOwned>(action: &str, fields: &mut Map<String, Value>, name: &str) -> Result<T, MessageError> {
    let value = fields.remove(name).unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| MessageError::InvalidPayload {
        action: action.to_string(),
        message: format!("{}: {}", name, e),
    })
}

impl BackgroundCommand {
    pub fn parse(request: Value) -> Result<Self, MessageError> {
        let (action, mut fields) = split(request)?;

        match action.as_str() {
            "getFavorites" => Ok(BackgroundCommand::GetFavorites),
            "saveFavorites" => Ok(BackgroundCommand::SaveFavorites(field(&action, &mut fields, "data")?)),
            "getStatus" => Ok(BackgroundCommand::GetStatus),
            "toggleDesign" => Ok(BackgroundCommand::ToggleDesign {
                enabled: field(&action, &mut fields, "enabled")?,
            }),
            "logEvent" => Ok(BackgroundCommand::LogEvent {
                event: field::<Option<String>>(&action, &mut fields, "event")?.unwrap_or_default(),
                data: fields.remove("data").unwrap_or(Value::Null),
            }),
            _ => Err(MessageError::UnknownAction(action)),
        }
    }
}

impl ContentCommand {
    pub fn parse(request: Value) -> Result<Self, MessageError> {
        let (action, mut fields) = split(request)?;

        match action.as_str() {
            "showMyList" => Ok(ContentCommand::ShowMyList),
            "openFavorites" => Ok(ContentCommand::OpenFavorites),
            "addCurrentToFavorites" => Ok(ContentCommand::AddCurrentToFavorites),
            "refreshDesign" => Ok(ContentCommand::RefreshDesign {
                enabled: field(&action, &mut fields, "enabled")?,
            }),
            _ => Err(MessageError::UnknownAction(action)),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ContentCommand::ShowMyList => json!({ "action": "showMyList" }),
            ContentCommand::OpenFavorites => json!({ "action": "openFavorites" }),
            ContentCommand::AddCurrentToFavorites => json!({ "action": "addCurrentToFavorites" }),
            ContentCommand::RefreshDesign { enabled } => json!({ "action": "refreshDesign", "enabled": enabled }),
        }
    }
}

/// Reply shapes. Serialized untagged so the JSON matches what callers read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Favorites {
        favorites: FavoritesList,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Saved {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Status {
        enabled: bool,
    },
    Received {
        received: bool,
    },
    Shown {
        shown: bool,
    },
    Error {
        error: String,
    },
}

impl Response {
    pub fn saved<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Response::Saved { success: true, error: None },
            Err(e) => Response::Saved {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn error(err: &MessageError) -> Self {
        Response::Error { error: err.to_string() }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}
