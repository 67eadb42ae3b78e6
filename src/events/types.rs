//! Canonical event records and the inbound message vocabulary

use serde::{Deserialize, Serialize};

/// Kill event kinds the dashboard understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Bounty,
}

impl EventType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Bounty" => Some(EventType::Bounty),
            _ => None,
        }
    }
}

/// One faction's share of a bounty payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardShare {
    #[serde(rename = "Faction")]
    pub faction: String,
    #[serde(rename = "Reward", default)]
    pub reward: u64,
}

/// A single destroyed ship. Never mutated after normalization.
///
/// Field names on the wire match the dashboard's storage format so that
/// snapshots written by older builds replay unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    pub timestamp: String,
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    #[serde(rename = "shipname")]
    pub ship_name: String,
    #[serde(rename = "VictimFaction", default, skip_serializing_if = "Option::is_none")]
    pub victim_faction: Option<String>,
    #[serde(rename = "bountyAmount", default)]
    pub bounty_amount: u64,
    #[serde(rename = "Rewards", default)]
    pub rewards: Vec<RewardShare>,
}

impl KillEvent {
    /// `Faction: Reward` pairs joined for the kill log
    pub fn rewards_text(&self) -> String {
        self.rewards
            .iter()
            .map(|r| format!("{}: {}", r.faction, r.reward))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// An accepted massacre mission, replaced wholesale on re-acceptance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionEvent {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "isMassacre")]
    pub is_massacre: bool,
    pub faction: String,
    pub target: String,
    #[serde(rename = "kills")]
    pub kills_required: u64,
    pub reward: u64,
}

/// Named events delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventName {
    NewKill,
    NewTest,
    NewMission,
    FailMission,
    CompleteMission,
    /// Raw game journal envelope posted by the game-client plugin
    Journal,
    TestServer,
    Unknown(String),
}

impl EventName {
    pub fn parse(name: &str) -> Self {
        match name {
            "new_kill" => EventName::NewKill,
            "new_test" => EventName::NewTest,
            "new_mission" => EventName::NewMission,
            "fail_mission" => EventName::FailMission,
            "complete_mission" => EventName::CompleteMission,
            "journal" => EventName::Journal,
            "test_server" => EventName::TestServer,
            other => EventName::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventName::NewKill => "new_kill",
            EventName::NewTest => "new_test",
            EventName::NewMission => "new_mission",
            EventName::FailMission => "fail_mission",
            EventName::CompleteMission => "complete_mission",
            EventName::Journal => "journal",
            EventName::TestServer => "test_server",
            EventName::Unknown(name) => name,
        }
    }
}

/// One message from the transport: an event name plus its raw payload
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub name: EventName,
    pub payload: serde_json::Value,
}

impl InboundEvent {
    pub fn new(name: EventName, payload: serde_json::Value) -> Self {
        Self { name, payload }
    }

    /// Parse a feed line of the form `{"event": "<name>", "data": {...}}`
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            event: String,
            #[serde(default)]
            data: serde_json::Value,
        }

        let envelope: Envelope = serde_json::from_str(line)?;
        Ok(Self {
            name: EventName::parse(&envelope.event),
            payload: envelope.data,
        })
    }
}
