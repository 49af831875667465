use std::fmt;

/// FIX MsgType (35) values the bridge sends or routes
///
/// Anything else is carried verbatim in [`MsgType::Other`] so that unknown
/// inbound types can be acknowledged without being understood.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MsgType {
    Heartbeat,
    TestRequest,
    ResendRequest,
    Reject,
    SequenceReset,
    Logout,
    ExecutionReport,
    Logon,
    MarketDataRequest,
    MarketDataSnapshotFullRefresh,
    MarketDataIncrementalRefresh,
    MarketDataRequestReject,
    SecurityDefinitionRequest,
    SecurityDefinition,
    SecurityList,
    BusinessMessageReject,
    Other(String),
}

impl MsgType {
    /// Wire value of the type
    pub fn as_str(&self) -> &str {
        match self {
            MsgType::Heartbeat => "0",
            MsgType::TestRequest => "1",
            MsgType::ResendRequest => "2",
            MsgType::Reject => "3",
            MsgType::SequenceReset => "4",
            MsgType::Logout => "5",
            MsgType::ExecutionReport => "8",
            MsgType::Logon => "A",
            MsgType::MarketDataRequest => "V",
            MsgType::MarketDataSnapshotFullRefresh => "W",
            MsgType::MarketDataIncrementalRefresh => "X",
            MsgType::MarketDataRequestReject => "Y",
            MsgType::SecurityDefinitionRequest => "c",
            MsgType::SecurityDefinition => "d",
            MsgType::SecurityList => "y",
            MsgType::BusinessMessageReject => "j",
            MsgType::Other(value) => value,
        }
    }

    /// Session-level (administrative) message types
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            MsgType::Heartbeat
                | MsgType::TestRequest
                | MsgType::ResendRequest
                | MsgType::Reject
                | MsgType::SequenceReset
                | MsgType::Logout
                | MsgType::Logon
        )
    }
}

impl From<&str> for MsgType {
    fn from(value: &str) -> Self {
        match value {
            "0" => MsgType::Heartbeat,
            "1" => MsgType::TestRequest,
            "2" => MsgType::ResendRequest,
            "3" => MsgType::Reject,
            "4" => MsgType::SequenceReset,
            "5" => MsgType::Logout,
            "8" => MsgType::ExecutionReport,
            "A" => MsgType::Logon,
            "V" => MsgType::MarketDataRequest,
            "W" => MsgType::MarketDataSnapshotFullRefresh,
            "X" => MsgType::MarketDataIncrementalRefresh,
            "Y" => MsgType::MarketDataRequestReject,
            "c" => MsgType::SecurityDefinitionRequest,
            "d" => MsgType::SecurityDefinition,
            "y" => MsgType::SecurityList,
            "j" => MsgType::BusinessMessageReject,
            other => MsgType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
