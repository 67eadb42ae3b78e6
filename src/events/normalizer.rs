//! Event normalization from raw transport payloads to canonical records
//!
//! Payloads arrive in several shapes: dashboard-ready kill and mission messages,
//! test events that identify the ship by numeric id, and raw game journal
//! entries forwarded by the game-client plugin. Everything is mapped onto
//! [`KillEvent`] / [`MissionEvent`]. Unsupported events are dropped without error.

use super::types::{EventName, EventType, InboundEvent, KillEvent, MissionEvent, RewardShare};
use crate::reference::ShipCatalog;
use serde_json::Value;

/// How a mission left the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionOutcome {
    Failed,
    Completed,
}

/// Result of normalizing one inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Kill {
        kill: KillEvent,
        /// Commander/location line carried by test events
        status: Option<String>,
    },
    MissionAccepted(MissionEvent),
    MissionClosed {
        id: String,
        outcome: MissionOutcome,
        reward: Option<u64>,
    },
    /// Connectivity probe from the server
    Probe,
    Ignored,
}

/// Normalize an inbound event. Pure apart from the catalog lookup for test kills.
pub fn normalize(event: &InboundEvent, catalog: &ShipCatalog) -> Normalized {
    let payload = &event.payload;
    match &event.name {
        EventName::NewKill => match kill_from_payload(payload) {
            Some(kill) => Normalized::Kill { kill, status: None },
            None => Normalized::Ignored,
        },
        EventName::NewTest => match kill_from_test(payload, catalog) {
            Some((kill, status)) => Normalized::Kill { kill, status },
            None => Normalized::Ignored,
        },
        EventName::NewMission => match mission_from_payload(payload) {
            Some(mission) => Normalized::MissionAccepted(mission),
            None => Normalized::Ignored,
        },
        EventName::FailMission => mission_closed(payload, MissionOutcome::Failed),
        EventName::CompleteMission => mission_closed(payload, MissionOutcome::Completed),
        EventName::Journal => from_journal(payload),
        EventName::TestServer => Normalized::Probe,
        EventName::Unknown(name) => {
            log::debug!("Ignoring unsupported event: {}", name);
            Normalized::Ignored
        }
    }
}

/// Build a kill from a dashboard-shaped bounty payload.
///
/// Also used to replay persisted records, which carry the same field names.
pub fn kill_from_payload(payload: &Value) -> Option<KillEvent> {
    let event_type = str_field(payload, &["eventType", "event"]).and_then(EventType::from_str)?;

    let rewards = payload
        .get("Rewards")
        .or_else(|| payload.get("rewards"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(reward_from_value).collect())
        .unwrap_or_default();

    Some(KillEvent {
        timestamp: str_field(payload, &["timestamp"]).unwrap_or_default().to_string(),
        event_type,
        ship_name: str_field(payload, &["shipname", "Ship", "ShipName"])
            .unwrap_or_default()
            .to_string(),
        victim_faction: non_empty(str_field(payload, &["VictimFaction", "victimFaction", "Faction"])),
        bounty_amount: u64_field(payload, &["bountyAmount", "TotalReward"]),
        rewards,
    })
}

/// Build a kill from a test event; the ship is a numeric id resolved through the catalog
pub fn kill_from_test(payload: &Value, catalog: &ShipCatalog) -> Option<(KillEvent, Option<String>)> {
    let body = payload.get("entry").filter(|e| e.is_object()).unwrap_or(payload);

    let event_type = str_field(body, &["event", "eventType"]).and_then(EventType::from_str)?;

    let ship_name = match body.get("Target").and_then(lenient_id) {
        Some(id) => catalog.ship_name(id),
        None => "Unknown".to_string(),
    };

    let rewards = body
        .get("Rewards")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(reward_from_value).collect())
        .unwrap_or_default();

    let kill = KillEvent {
        timestamp: str_field(body, &["timestamp"]).unwrap_or_default().to_string(),
        event_type,
        ship_name,
        victim_faction: non_empty(str_field(body, &["VictimFaction"])),
        bounty_amount: u64_field(body, &["TotalReward", "bountyAmount"]),
        rewards,
    };

    let status = match (
        str_field(payload, &["Cmdr", "cmdr"]),
        str_field(payload, &["System", "system"]),
        str_field(payload, &["Station", "station"]),
    ) {
        (None, None, None) => None,
        (cmdr, system, station) => Some(format!(
            "Cmdr {}: {} {}",
            cmdr.unwrap_or_default(),
            system.unwrap_or_default(),
            station.unwrap_or_default()
        )),
    };

    Some((kill, status))
}

/// Build a mission from a dashboard-shaped payload. Non-massacre missions and
/// missions without an id yield `None`.
pub fn mission_from_payload(payload: &Value) -> Option<MissionEvent> {
    let is_massacre = payload.get("isMassacre").and_then(Value::as_bool).unwrap_or(false);
    if !is_massacre {
        return None;
    }

    let id = payload.get("ID").and_then(id_string);
    let Some(id) = id else {
        log::warn!("Dropping massacre mission without an ID");
        return None;
    };

    Some(MissionEvent {
        id,
        is_massacre,
        faction: str_field(payload, &["faction"]).unwrap_or("Unknown Faction").to_string(),
        target: str_field(payload, &["target"]).unwrap_or("Unknown Faction").to_string(),
        kills_required: u64_field(payload, &["kills"]),
        reward: u64_field(payload, &["reward"]),
    })
}

fn mission_closed(payload: &Value, outcome: MissionOutcome) -> Normalized {
    match payload.get("ID").and_then(id_string) {
        Some(id) => Normalized::MissionClosed {
            id,
            outcome,
            reward: payload.get("reward").map(lenient_u64),
        },
        None => {
            log::warn!("Dropping {:?} mission event without an ID", outcome);
            Normalized::Ignored
        }
    }
}

/// Map a raw journal envelope `{cmdr, system, station, entry: {...}}`
pub fn from_journal(payload: &Value) -> Normalized {
    let Some(entry) = payload.get("entry") else {
        return Normalized::Ignored;
    };

    match str_field(entry, &["event"]).unwrap_or_default() {
        "Bounty" => Normalized::Kill {
            kill: journal_bounty(entry),
            status: None,
        },
        "MissionAccepted" => match mission_from_payload(&journal_mission(entry)) {
            Some(mission) => Normalized::MissionAccepted(mission),
            None => Normalized::Ignored,
        },
        "MissionFailed" | "MissionAbandoned" => journal_closed(entry, MissionOutcome::Failed),
        "MissionCompleted" => journal_closed(entry, MissionOutcome::Completed),
        other => {
            log::debug!("Ignoring journal event: {}", other);
            Normalized::Ignored
        }
    }
}

fn journal_bounty(entry: &Value) -> KillEvent {
    let display_name = str_field(entry, &["Target_Localised", "Ship_Localised", "Target", "Ship"])
        .unwrap_or("Unknown");

    let rewards = entry
        .get("Rewards")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(reward_from_value).collect())
        .unwrap_or_default();

    KillEvent {
        timestamp: str_field(entry, &["timestamp"]).unwrap_or_default().to_string(),
        event_type: EventType::Bounty,
        ship_name: title_case(display_name),
        // Absent -> "Unknown"; blank -> None, same as on replay
        victim_faction: match str_field(entry, &["VictimFaction"]) {
            None => Some("Unknown".to_string()),
            present => non_empty(present),
        },
        bounty_amount: u64_field(entry, &["TotalReward"]),
        rewards,
    }
}

/// Re-shape a `MissionAccepted` journal entry into the dashboard mission payload
fn journal_mission(entry: &Value) -> Value {
    let name = str_field(entry, &["Name"]).unwrap_or("Unknown Mission");
    serde_json::json!({
        "ID": entry.get("MissionID").cloned().unwrap_or(Value::Null),
        "isMassacre": name.contains("Massacre"),
        "faction": str_field(entry, &["Faction"]).unwrap_or("Unknown Faction"),
        "target": str_field(entry, &["TargetFaction"]).unwrap_or("Unknown Faction"),
        "kills": u64_field(entry, &["KillCount"]),
        "reward": u64_field(entry, &["Reward"]),
    })
}

fn journal_closed(entry: &Value, outcome: MissionOutcome) -> Normalized {
    match entry.get("MissionID").and_then(id_string) {
        Some(id) => Normalized::MissionClosed {
            id,
            outcome,
            reward: entry.get("Reward").map(lenient_u64),
        },
        None => Normalized::Ignored,
    }
}

fn reward_from_value(value: &Value) -> Option<RewardShare> {
    let faction = non_empty(str_field(value, &["Faction", "faction"]))?;
    Some(RewardShare {
        faction,
        reward: u64_field(value, &["Reward", "reward"]),
    })
}

/// First present string field among `keys`
fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str))
}

/// First present numeric field among `keys`, 0 when absent or unparseable
fn u64_field(value: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|k| value.get(*k).filter(|v| !v.is_null()))
        .map(lenient_u64)
        .unwrap_or(0)
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Numbers, or strings with thousands separators. Anything else is 0.
pub fn lenient_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.replace(',', "").trim().parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(|f| f as u64)
            .unwrap_or(0),
        _ => 0,
    }
}

fn lenient_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Mission ids arrive as numbers or strings; the store keys them as strings
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Capitalize the first letter of every word (`krait_mkii` -> `Krait_Mkii`).
/// `Unknown` is returned untouched.
pub fn title_case(name: &str) -> String {
    if name.is_empty() || name == "Unknown" {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut prev_is_letter = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ShipRecord;
    use serde_json::json;

    fn inbound(name: &str, payload: Value) -> InboundEvent {
        InboundEvent::new(EventName::parse(name), payload)
    }

    #[test]
    fn test_normalize_bounty_kill() {
        let payload = json!({
            "timestamp": "2025-03-01T10:00:00Z",
            "event": "Bounty",
            "Ship": "Vulture",
            "VictimFaction": "Pirate Clan",
            "Rewards": [{"Faction": "Federal Navy", "Reward": 5000}, {"Faction": "Alliance Assembly", "Reward": "1,250"}],
            "bountyAmount": 6250,
        });

        let Normalized::Kill { kill, status } = normalize(&inbound("new_kill", payload), &ShipCatalog::new()) else {
            panic!("expected kill");
        };
        assert_eq!(kill.ship_name, "Vulture");
        assert_eq!(kill.victim_faction.as_deref(), Some("Pirate Clan"));
        assert_eq!(kill.bounty_amount, 6250);
        assert_eq!(kill.rewards.len(), 2);
        assert_eq!(kill.rewards[1].reward, 1250);
        assert!(status.is_none());
    }

    #[test]
    fn test_missing_bounty_defaults_to_zero() {
        let kill = kill_from_payload(&json!({"event": "Bounty", "Ship": "Eagle"})).unwrap();
        assert_eq!(kill.bounty_amount, 0);
        assert!(kill.rewards.is_empty());
        assert!(kill.victim_faction.is_none());
    }

    #[test]
    fn test_non_bounty_kill_is_ignored() {
        let result = normalize(
            &inbound("new_kill", json!({"event": "FactionKillBond", "Ship": "Eagle"})),
            &ShipCatalog::new(),
        );
        assert_eq!(result, Normalized::Ignored);
    }

    #[test]
    fn test_persisted_record_replays_identically() {
        let kill = KillEvent {
            timestamp: "2025-03-01T10:00:00Z".to_string(),
            event_type: EventType::Bounty,
            ship_name: "Python".to_string(),
            victim_faction: Some("Empire".to_string()),
            bounty_amount: 90_000,
            rewards: vec![RewardShare { faction: "Empire".to_string(), reward: 90_000 }],
        };
        let stored = serde_json::to_value(&kill).unwrap();
        assert_eq!(kill_from_payload(&stored), Some(kill));
    }

    #[test]
    fn test_non_massacre_mission_is_dropped() {
        let payload = json!({"ID": 1, "isMassacre": false, "faction": "A", "target": "B", "kills": 5, "reward": 10});
        assert_eq!(normalize(&inbound("new_mission", payload), &ShipCatalog::new()), Normalized::Ignored);
    }

    #[test]
    fn test_massacre_mission_id_becomes_string() {
        let payload = json!({"ID": 987654, "isMassacre": true, "faction": "Federation", "target": "Empire", "kills": 24, "reward": 1500000});
        let mission = mission_from_payload(&payload).unwrap();
        assert_eq!(mission.id, "987654");
        assert_eq!(mission.kills_required, 24);
        assert_eq!(mission.reward, 1_500_000);
    }

    #[test]
    fn test_mission_fail_and_complete() {
        let catalog = ShipCatalog::new();
        assert_eq!(
            normalize(&inbound("fail_mission", json!({"ID": 5})), &catalog),
            Normalized::MissionClosed { id: "5".to_string(), outcome: MissionOutcome::Failed, reward: None }
        );
        assert_eq!(
            normalize(&inbound("complete_mission", json!({"ID": "5", "reward": 1000})), &catalog),
            Normalized::MissionClosed { id: "5".to_string(), outcome: MissionOutcome::Completed, reward: Some(1000) }
        );
        assert_eq!(normalize(&inbound("fail_mission", json!({})), &catalog), Normalized::Ignored);
    }

    #[test]
    fn test_test_event_resolves_ship_id() {
        let payload = json!({
            "event": "Bounty",
            "Target": 128049309,
            "TotalReward": 4200,
            "Cmdr": "Jameson",
            "System": "Shinrarta Dezhra",
            "Station": "Jameson Memorial",
        });

        let before = normalize(&inbound("new_test", payload.clone()), &ShipCatalog::new());
        let Normalized::Kill { kill, status } = before else { panic!("expected kill") };
        assert_eq!(kill.ship_name, "Unknown: 128049309");
        assert_eq!(kill.bounty_amount, 4200);
        assert_eq!(status.as_deref(), Some("Cmdr Jameson: Shinrarta Dezhra Jameson Memorial"));

        let catalog = ShipCatalog::from_records(vec![ShipRecord {
            id: 128049309,
            name: "Vulture".to_string(),
            image_filename: "vulture.png".to_string(),
        }]);
        let Normalized::Kill { kill, .. } = normalize(&inbound("new_test", payload), &catalog) else {
            panic!("expected kill")
        };
        assert_eq!(kill.ship_name, "Vulture");
    }

    #[test]
    fn test_journal_bounty_prefers_localised_name() {
        let payload = json!({
            "cmdr": "Jameson",
            "entry": {
                "timestamp": "2025-03-01T10:00:00Z",
                "event": "Bounty",
                "Target": "krait_mkii",
                "Target_Localised": "krait mkii",
                "TotalReward": 120000,
                "Rewards": [{"Faction": "Ahaut Purple Gang", "Reward": 120000}],
            }
        });
        let Normalized::Kill { kill, .. } = from_journal(&payload) else { panic!("expected kill") };
        assert_eq!(kill.ship_name, "Krait Mkii");
        assert_eq!(kill.victim_faction.as_deref(), Some("Unknown"));
        assert_eq!(kill.bounty_amount, 120_000);
    }

    #[test]
    fn test_journal_victim_faction_matches_replay() {
        let blank = json!({"entry": {"event": "Bounty", "Target": "eagle", "VictimFaction": "  ", "TotalReward": 10}});
        let Normalized::Kill { kill, .. } = from_journal(&blank) else { panic!("expected kill") };
        assert_eq!(kill.victim_faction, None);

        let padded = json!({"entry": {"event": "Bounty", "Target": "eagle", "VictimFaction": " Pirates ", "TotalReward": 10}});
        let Normalized::Kill { kill, .. } = from_journal(&padded) else { panic!("expected kill") };
        assert_eq!(kill.victim_faction.as_deref(), Some("Pirates"));

        let stored = serde_json::to_value(&kill).unwrap();
        assert_eq!(kill_from_payload(&stored), Some(kill));
    }

    #[test]
    fn test_journal_missions() {
        let accepted = json!({"entry": {
            "event": "MissionAccepted", "MissionID": 77, "Name": "Mission_Massacre_Conflict",
            "Faction": "Federation", "TargetFaction": "Empire", "KillCount": 12, "Reward": 900000
        }});
        let Normalized::MissionAccepted(mission) = from_journal(&accepted) else { panic!("expected mission") };
        assert_eq!(mission.id, "77");
        assert_eq!(mission.target, "Empire");

        let courier = json!({"entry": {"event": "MissionAccepted", "MissionID": 78, "Name": "Mission_Courier"}});
        assert_eq!(from_journal(&courier), Normalized::Ignored);

        let abandoned = json!({"entry": {"event": "MissionAbandoned", "MissionID": 77}});
        assert!(matches!(
            from_journal(&abandoned),
            Normalized::MissionClosed { outcome: MissionOutcome::Failed, .. }
        ));

        assert_eq!(from_journal(&json!({"entry": {"event": "Docked"}})), Normalized::Ignored);
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(lenient_u64(&json!(12)), 12);
        assert_eq!(lenient_u64(&json!("1,234,567")), 1_234_567);
        assert_eq!(lenient_u64(&json!("lots")), 0);
        assert_eq!(lenient_u64(&json!(-5)), 0);
        assert_eq!(lenient_u64(&json!(null)), 0);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("federal corvette"), "Federal Corvette");
        assert_eq!(title_case("type-9 HEAVY"), "Type-9 Heavy");
        assert_eq!(title_case("Unknown"), "Unknown");
    }
}
