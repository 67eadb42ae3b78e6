//! Integration tests for the live path: JSONL feed → channel → tracker task
//!
//! Key integration points tested:
//! - Feed lines of every supported event name reach the tracker
//! - Malformed lines are skipped without stopping the feed
//! - Shutdown writes a snapshot that a fresh tracker restores

#[cfg(test)]
mod feed_integration_tests {
    use killtracker::{
        events::{forward_events, JsonlFeed},
        persistence::{FileBlobStore, PersistenceBridge},
        reference::{ShipCatalog, ShipRecord},
        tracker::{tracker_task, Tracker, TrackerMessage},
        view::TableId,
    };
    use std::{sync::Arc, time::Duration};
    use tokio::{
        io::AsyncWriteExt,
        sync::{mpsc, RwLock},
    };

    const FEED: &str = r#"{"event":"test_server","data":{}}
{"event":"new_kill","data":{"event":"Bounty","timestamp":"2025-03-01T10:00:00Z","Ship":"Vulture","VictimFaction":"Pirates","bountyAmount":"1,500","Rewards":[{"Faction":"Federal Navy","Reward":1500}]}}
this is not json
{"event":"new_test","data":{"event":"Bounty","timestamp":"2025-03-01T10:01:00Z","Target":128049339,"TotalReward":700,"Cmdr":"Jameson","System":"Sol","Station":"Galileo"}}
{"event":"new_mission","data":{"ID":42,"isMassacre":true,"faction":"Federation","target":"Empire","kills":16,"reward":3000000}}
{"event":"new_mission","data":{"ID":43,"isMassacre":false,"faction":"Federation","target":"Empire","kills":1,"reward":1}}
{"event":"journal","data":{"cmdr":"Jameson","entry":{"event":"MissionAccepted","MissionID":44,"Name":"Mission_MassacreWing","Faction":"Empire","TargetFaction":"Federation","KillCount":9,"Reward":800000}}}
{"event":"fail_mission","data":{"ID":44}}
{"event":"journal","data":{"entry":{"event":"Bounty","timestamp":"2025-03-01T10:02:00Z","Target_Localised":"federal corvette","TotalReward":250000,"Rewards":[{"Faction":"Empire","Reward":250000}]}}}
"#;

    async fn wait_for_kills(tracker: &Arc<RwLock<Tracker>>, expected: usize) {
        for _ in 0..100 {
            if tracker.read().await.store().kill_count() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("tracker never saw {} kills", expected);
    }

    #[tokio::test]
    async fn test_feed_reaches_tracker_and_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let feed_path = dir.path().join("events.jsonl");
        let data_dir = dir.path().join("data");

        let mut file = tokio::fs::File::create(&feed_path).await.unwrap();
        file.write_all(FEED.as_bytes()).await.unwrap();
        file.flush().await.unwrap();

        let catalog = ShipCatalog::from_records(vec![ShipRecord {
            id: 128049339,
            name: "Python".to_string(),
            image_filename: "python.png".to_string(),
        }]);
        let tracker = Arc::new(RwLock::new(Tracker::new(
            PersistenceBridge::new(Box::new(FileBlobStore::new(&data_dir))),
            catalog,
            10,
        )));

        let (tx, rx) = mpsc::channel::<TrackerMessage>(100);
        let handle = tokio::spawn(tracker_task(rx, tracker.clone()));

        let mut feed = JsonlFeed::new(feed_path.clone()).from_start();
        feed.start().await.unwrap();
        let forwarder = tokio::spawn(forward_events(feed, tx.clone(), TrackerMessage::Inbound));

        wait_for_kills(&tracker, 3).await;
        // Let the trailing mission events settle
        tokio::time::sleep(Duration::from_millis(100)).await;

        {
            let tracker = tracker.read().await;
            assert_eq!(tracker.status(), Some("Cmdr Jameson: Sol Galileo"));

            let ships: Vec<String> = tracker
                .rollups()
                .keyed(killtracker::rollup::RollupKind::ShipType)
                .rows()
                .iter()
                .map(|r| r.key.clone())
                .collect();
            assert_eq!(ships, vec!["Vulture", "Python", "Federal Corvette"]);
            assert_eq!(tracker.summary(TableId::ShipTypeBounties).footer[1], "252,200");

            let missions = tracker.summary(TableId::Missions);
            assert_eq!(missions.rows.len(), 1);
            assert_eq!(missions.rows[0][0], "Federation");
        }

        forwarder.abort();
        tx.send(TrackerMessage::Shutdown).await.unwrap();
        handle.await.unwrap();

        let mut restarted = Tracker::new(
            PersistenceBridge::new(Box::new(FileBlobStore::new(&data_dir))),
            ShipCatalog::new(),
            10,
        );
        let report = restarted.restore();
        assert_eq!(report.kills, 3);
        assert_eq!(report.missions, 1);
        assert_eq!(restarted.kill_log().rows[0][1], "Federal Corvette");
    }
}
