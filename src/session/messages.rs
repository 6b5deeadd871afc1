use serde::{Deserialize, Serialize};

/// Events accepted over the wire from any connected party
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ClientEvent {
    /// Host declares (or updates) the active session
    #[serde(rename = "sessionID")]
    SessionId(SessionDecl),

    /// Host signals go
    #[serde(rename = "startGame")]
    StartGame,

    /// A player reports completion of the current question
    #[serde(rename = "playerDone")]
    PlayerDone,

    /// Cut the current question short without full quorum
    #[serde(rename = "timeOut")]
    TimeOut,

    /// Opaque value relayed to the host, e.g. question-count reporting
    #[serde(rename = "setSize")]
    SetSize(serde_json::Value),
}

/// Payload of a `sessionID` event. The object form is what current clients
/// send; the bare scalar is the legacy form carrying only the session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionDecl {
    Declared { id: u32, set: u32 },
    Legacy(u32),
}

/// Events sent from the coordinator to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ServerEvent {
    /// Roster snapshot, broadcast to players after membership changes
    #[serde(rename = "playerNames")]
    PlayerNames(Vec<String>),

    /// Active set number, sent to a newly admitted player
    #[serde(rename = "activeSet")]
    ActiveSet(u32),

    #[serde(rename = "startGame")]
    StartGame,

    /// Every connected player finished the current question
    #[serde(rename = "questionDone")]
    QuestionDone,

    /// Relayed verbatim to the host
    #[serde(rename = "setSize")]
    SetSize(serde_json::Value),
}
