use crate::model::{Role, SessionError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallResponse {
    Accept,
    Decline,
}

/// Client to server messages, tagged by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum InboundMessage {
    Register {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    InitiatePairing {
        to: String,
        from: String,
        #[serde(alias = "offer")]
        sdp_offer: String,
    },
    #[serde(rename_all = "camelCase")]
    PairingResponse {
        call_response: CallResponse,
        from: String,
        #[serde(default, alias = "offer")]
        sdp_offer: Option<String>,
    },
    ConfirmMediaReady,
    StartRound,
    SubmitFirstDecision {
        decision: String,
    },
    SubmitSecondDecision {
        decision: String,
    },
    Stop,
    #[serde(rename_all = "camelCase")]
    Play {
        user: String,
        #[serde(alias = "offer")]
        sdp_offer: String,
    },
    StopPlayback,
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Register { .. } => "register",
            InboundMessage::InitiatePairing { .. } => "initiatePairing",
            InboundMessage::PairingResponse { .. } => "pairingResponse",
            InboundMessage::ConfirmMediaReady => "confirmMediaReady",
            InboundMessage::StartRound => "startRound",
            InboundMessage::SubmitFirstDecision { .. } => "submitFirstDecision",
            InboundMessage::SubmitSecondDecision { .. } => "submitSecondDecision",
            InboundMessage::Stop => "stop",
            InboundMessage::Play { .. } => "play",
            InboundMessage::StopPlayback => "stopPlayback",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// Server to client messages, tagged by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "camelCase")]
pub enum OutboundMessage {
    RegisterResult {
        response: Response,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    IncomingPairing {
        from: String,
    },
    #[serde(rename_all = "camelCase")]
    PairingResult {
        response: Response,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sdp_answer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MediaStart {
        sdp_answer: String,
    },
    PeerStopped,
    #[serde(rename_all = "camelCase")]
    PlayResponse {
        response: Response,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sdp_answer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    RoleAssignment {
        role: Role,
    },
    /// `src` references the round image and is only sent to the describer.
    StartReview {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<String>,
    },
    StartFirstQuery,
    GetFirstDecision,
    Hint {
        hint: String,
    },
    StartSecondQuery,
    GetSecondDecision,
    StartPostSession,
}

impl OutboundMessage {
    pub fn registration_accepted() -> Self {
        OutboundMessage::RegisterResult {
            response: Response::Accepted,
            message: None,
        }
    }

    pub fn registration_rejected(error: &SessionError) -> Self {
        OutboundMessage::RegisterResult {
            response: Response::Rejected,
            message: Some(error.to_string()),
        }
    }

    pub fn pairing_accepted(sdp_answer: String) -> Self {
        OutboundMessage::PairingResult {
            response: Response::Accepted,
            sdp_answer: Some(sdp_answer),
            message: None,
        }
    }

    /// Rejection with no reason, sent to a caller whose peer declined.
    pub fn pairing_declined() -> Self {
        OutboundMessage::PairingResult {
            response: Response::Rejected,
            sdp_answer: None,
            message: None,
        }
    }

    pub fn pairing_rejected(error: &SessionError) -> Self {
        OutboundMessage::PairingResult {
            response: Response::Rejected,
            sdp_answer: None,
            message: Some(error.to_string()),
        }
    }

    pub fn play_accepted(sdp_answer: String) -> Self {
        OutboundMessage::PlayResponse {
            response: Response::Accepted,
            sdp_answer: Some(sdp_answer),
            message: None,
        }
    }

    pub fn play_rejected(error: &SessionError) -> Self {
        OutboundMessage::PlayResponse {
            response: Response::Rejected,
            sdp_answer: None,
            message: Some(error.to_string()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            OutboundMessage::RegisterResult {
                response: Response::Accepted,
                ..
            } | OutboundMessage::PairingResult {
                response: Response::Accepted,
                ..
            } | OutboundMessage::PlayResponse {
                response: Response::Accepted,
                ..
            }
        )
    }
}
