use thiserror::Error;

pub const UNSUPPORTED_REPLY: &str = "This interaction is not supported";

/// Fleet provider call failed (network, auth, throttling, bad response)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),
    #[error("Provider response missing field: {0}")]
    MissingField(String),
    #[error("Unexpected instance state: {0}")]
    UnexpectedState(String),
}

/// Command declare/list/delete failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Cannot list {scope} commands: {reason}")]
    List { scope: String, reason: String },
    #[error("Cannot create '{name}' command: {reason}")]
    Declare { name: String, reason: String },
    #[error("Cannot delete '{name}' {scope} command: {reason}")]
    Delete {
        name: String,
        scope: String,
        reason: String,
    },
    #[error("Command client error: {0}")]
    Client(String),
}

/// Inbound payload could not be authenticated or understood
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Stale signature timestamp: {0}")]
    StaleTimestamp(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Missing or invalid startup option
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required option: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {option}: {reason}")]
    Invalid {
        option: &'static str,
        reason: String,
    },
}

/// Follow-up event does not fit the session it names
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found or expired: {0}")]
    NotFound(String),
    #[error("Session {session} belongs to another user")]
    NotOwner { session: String },
    #[error("Instance {instance_id} is not in the directory of session {session}")]
    UnknownInstance {
        session: String,
        instance_id: String,
    },
    #[error("Session {session} is not expecting a {event} event")]
    UnexpectedEvent { session: String, event: String },
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl BotError {
    pub fn code(&self) -> &'static str {
        match self {
            BotError::Provider(_) => "PROVIDER_ERROR",
            BotError::Registration(_) => "REGISTRATION_ERROR",
            BotError::Transport(TransportError::InvalidSignature(_)) => "INVALID_SIGNATURE",
            BotError::Transport(TransportError::StaleTimestamp(_)) => "STALE_TIMESTAMP",
            BotError::Transport(TransportError::MalformedPayload(_)) => "MALFORMED_PAYLOAD",
            BotError::Config(_) => "CONFIGURATION_ERROR",
            BotError::Session(SessionError::NotFound(_)) => "SESSION_NOT_FOUND",
            BotError::Session(SessionError::NotOwner { .. }) => "SESSION_NOT_OWNER",
            BotError::Session(SessionError::UnknownInstance { .. }) => "UNKNOWN_INSTANCE",
            BotError::Session(SessionError::UnexpectedEvent { .. }) => "UNEXPECTED_EVENT",
            BotError::StorageError(_) => "STORAGE_ERROR",
        }
    }

    /// Text shown to the chat user whose request failed
    pub fn user_message(&self) -> String {
        match self {
            BotError::Provider(_) => {
                "Unable to reach the server fleet right now, please try again later".to_string()
            }
            BotError::Session(SessionError::NotFound(_)) => {
                "This menu has expired, run the command again".to_string()
            }
            BotError::Session(SessionError::NotOwner { .. }) => {
                "This menu belongs to someone else".to_string()
            }
            BotError::Session(SessionError::UnknownInstance { .. }) => {
                "That server is no longer available, run the command again".to_string()
            }
            BotError::Session(SessionError::UnexpectedEvent { .. }) => {
                "Select a server before choosing an action".to_string()
            }
            _ => "Something went wrong handling that request".to_string(),
        }
    }
}

impl From<BotError> for fleetbot_core::ErrorResponse {
    fn from(err: BotError) -> Self {
        fleetbot_core::ErrorResponse::new(err.code(), err.to_string())
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
