//! Random kills and missions for exercising the dashboard without a game running

use {
    crate::{
        events::{EventType, KillEvent, MissionEvent, RewardShare},
        tracker::{TrackerMessage, ViewCommand},
    },
    rand::{seq::SliceRandom, Rng},
    std::time::Duration,
    tokio::sync::mpsc,
};

const FACTIONS: [&str; 4] = ["Federation", "Empire", "Alliance", "Independent"];

const SHIPS: [&str; 10] = [
    "Anaconda",
    "Federal Corvette",
    "Python",
    "Fer-de-Lance",
    "Krait MkII",
    "Vulture",
    "Eagle",
    "Viper MkIII",
    "Cobra MkIII",
    "Imperial Cutter",
];

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or("Unknown")
}

/// A bounty on a random ship, paid out by two authorities
pub fn random_kill<R: Rng + ?Sized>(rng: &mut R) -> KillEvent {
    KillEvent {
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        event_type: EventType::Bounty,
        ship_name: pick(rng, &SHIPS).to_string(),
        victim_faction: Some(pick(rng, &FACTIONS).to_string()),
        bounty_amount: rng.gen_range(10_000..1_010_000),
        rewards: vec![
            RewardShare {
                faction: "Federal Navy".to_string(),
                reward: rng.gen_range(0..500_000),
            },
            RewardShare {
                faction: "Alliance Assembly".to_string(),
                reward: rng.gen_range(0..300_000),
            },
        ],
    }
}

/// A massacre mission between two random factions
pub fn random_mission<R: Rng + ?Sized>(rng: &mut R) -> MissionEvent {
    MissionEvent {
        id: rng.gen_range(0..200_000u64).to_string(),
        is_massacre: true,
        faction: pick(rng, &FACTIONS).to_string(),
        target: pick(rng, &FACTIONS).to_string(),
        kills_required: rng.gen_range(0..100),
        reward: rng.gen_range(0..100_000_000),
    }
}

/// Inject a random kill every `every`, and a mission every tenth tick
pub async fn demo_task(tx: mpsc::Sender<TrackerMessage>, every: Duration) {
    log::info!("🎲 Demo generator running every {:?}", every);
    let mut timer = tokio::time::interval(every);
    let mut ticks: u64 = 0;

    loop {
        timer.tick().await;
        ticks += 1;

        let command = if ticks % 10 == 0 {
            ViewCommand::DemoMission
        } else {
            ViewCommand::DemoKill
        };
        if tx.send(TrackerMessage::Command(command)).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_random_kill_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let kill = random_kill(&mut rng);
            assert!(SHIPS.contains(&kill.ship_name.as_str()));
            assert!(kill.bounty_amount >= 10_000);
            assert_eq!(kill.rewards.len(), 2);
            assert!(chrono::DateTime::parse_from_rfc3339(&kill.timestamp).is_ok());
        }
    }

    #[test]
    fn test_random_mission_is_massacre() {
        let mut rng = StdRng::seed_from_u64(11);
        let mission = random_mission(&mut rng);
        assert!(mission.is_massacre);
        assert!(mission.kills_required < 100);
        assert!(mission.id.parse::<u64>().unwrap() < 200_000);
        assert!(FACTIONS.contains(&mission.faction.as_str()));
    }
}
