use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Achievement, BattleMode, BattleStatus, CardNew, CoinTransactionKind, Engine, EngineError,
    MAX_CARD_VALUE, PullListFilter, PullStatus, RetryPolicy, with_retry,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .rng_seed(Some(1234))
        .build()
        .await
        .unwrap();
    engine.new_user("admin", "secret", true).await.unwrap();
    engine.new_user("alice", "password", false).await.unwrap();
    engine.new_user("bob", "password", false).await.unwrap();
    (engine, db)
}

/// Engine over an on-disk database, so concurrent transactions really contend.
async fn engine_with_file_db(name: &str) -> (Engine, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("packattack-{name}-{}.db", Uuid::new_v4()));
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .rng_seed(Some(99))
        .build()
        .await
        .unwrap();
    for (user, admin) in [("admin", true), ("alice", false), ("bob", false), ("carol", false)] {
        engine.new_user(user, "password", admin).await.unwrap();
    }
    (engine, path)
}

fn patient() -> RetryPolicy {
    RetryPolicy {
        attempts: 6,
        ..RetryPolicy::default()
    }
}

fn card(name: &str, coin_value: i64, pull_rate: f64) -> CardNew {
    CardNew {
        name: name.to_string(),
        rarity: "common".to_string(),
        coin_value,
        pull_rate,
        image_url: None,
    }
}

fn base_pool() -> Vec<CardNew> {
    vec![
        card("Pidgey", 5, 60.0),
        card("Pikachu", 40, 30.0),
        card("Mewtwo", 400, 9.0),
        card("Charizard", 1500, 1.0),
    ]
}

async fn base_box(engine: &Engine, price: i64, cards_per_pack: i32) -> Uuid {
    engine
        .new_box("admin", "Base Set", Some("The classics"), price, cards_per_pack, base_pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn open_pack_charges_and_records_pulls() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 100, 5).await;
    engine.grant_coins("alice", 1000, Some("welcome")).await.unwrap();

    let opening = engine.open_pack("alice", box_id, 2).await.unwrap();
    assert_eq!(opening.cost, 200);
    assert_eq!(opening.pulls.len(), 10);
    assert!(opening.pulls.iter().all(|p| p.pull.user_id == "alice"));
    assert!(opening.pulls.iter().all(|p| p.pull.status == PullStatus::Kept));
    assert_eq!(
        opening.total_value,
        opening.pulls.iter().map(|p| p.card.coin_value).sum::<i64>()
    );
    assert!(opening.unlocked.contains(&Achievement::FirstPull));

    let reward: i64 = opening.unlocked.iter().map(|a| a.reward()).sum();
    assert_eq!(opening.balance, 1000 - 200 + reward);
    assert_eq!(engine.user("alice").await.unwrap().coins, opening.balance);

    let history = engine.coin_history("alice", 50).await.unwrap();
    assert_eq!(history.iter().map(|t| t.amount).sum::<i64>(), opening.balance);
    let purchase = history
        .iter()
        .find(|t| t.kind == CoinTransactionKind::PackPurchase)
        .unwrap();
    assert_eq!(purchase.amount, -200);
    assert_eq!(purchase.balance_after, 800);
}

#[tokio::test]
async fn open_pack_without_funds_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 100, 5).await;
    engine.grant_coins("alice", 150, None).await.unwrap();

    let err = engine.open_pack("alice", box_id, 2).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert_eq!(engine.user("alice").await.unwrap().coins, 150);
    let page = engine
        .list_pulls("alice", &PullListFilter::default(), None, 100)
        .await
        .unwrap();
    assert!(page.pulls.is_empty());
}

#[tokio::test]
async fn open_pack_validates_quantity_and_box_state() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 10, 1).await;
    engine.grant_coins("alice", 1000, None).await.unwrap();

    assert!(matches!(
        engine.open_pack("alice", box_id, 0).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.open_pack("alice", Uuid::new_v4(), 1).await,
        Err(EngineError::KeyNotFound(_))
    ));

    engine.set_box_active("admin", box_id, false).await.unwrap();
    assert!(matches!(
        engine.open_pack("alice", box_id, 1).await,
        Err(EngineError::InvalidState(_))
    ));
    assert!(engine.list_boxes(false).await.unwrap().is_empty());
    assert_eq!(engine.list_boxes(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_admins_manage_boxes() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .new_box("alice", "Jungle", None, 100, 5, base_pool())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let box_id = base_box(&engine, 100, 5).await;
    assert!(matches!(
        engine.add_card("alice", box_id, card("Snorlax", 80, 5.0)).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine.set_box_active("bob", box_id, false).await,
        Err(EngineError::Forbidden(_))
    ));
}

#[tokio::test]
async fn box_names_are_unique_ignoring_case_and_accents() {
    let (engine, _db) = engine_with_db().await;
    engine
        .new_box("admin", "Pokémon Base", None, 100, 5, base_pool())
        .await
        .unwrap();

    let err = engine
        .new_box("admin", "  POKEMON   base ", None, 100, 5, base_pool())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn new_box_rejects_invalid_pools() {
    let (engine, _db) = engine_with_db().await;
    assert!(matches!(
        engine.new_box("admin", "Empty", None, 100, 5, Vec::new()).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine
            .new_box("admin", "Zero", None, 100, 5, vec![card("Ditto", 1, 0.0)])
            .await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine
            .new_box("admin", "Priceless", None, 100, 2, vec![card("Ditto", i64::MAX, 1.0)])
            .await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine
            .new_box(
                "admin",
                "Overweight",
                None,
                100,
                1,
                vec![card("Ditto", 1, 1e308), card("Mew", 1, 1e308)],
            )
            .await,
        Err(EngineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn add_card_keeps_the_pool_drawable() {
    let (engine, _db) = engine_with_db().await;
    let box_id = engine
        .new_box("admin", "Heavy", None, 10, 1, vec![card("Ditto", 1, 1e308)])
        .await
        .unwrap();

    assert!(matches!(
        engine.add_card("admin", box_id, card("Mew", 1, 1e308)).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert_eq!(engine.box_detail(box_id).await.unwrap().cards.len(), 1);

    engine.grant_coins("alice", 10, None).await.unwrap();
    assert_eq!(engine.open_pack("alice", box_id, 1).await.unwrap().pulls.len(), 1);
}

#[tokio::test]
async fn most_valuable_packs_still_add_up() {
    let (engine, _db) = engine_with_db().await;
    let box_id = engine
        .new_box(
            "admin",
            "Vault",
            None,
            1,
            20,
            vec![card("Gold Star", MAX_CARD_VALUE, 1.0)],
        )
        .await
        .unwrap();
    engine.grant_coins("alice", 10, None).await.unwrap();

    let opening = engine.open_pack("alice", box_id, 10).await.unwrap();
    assert_eq!(opening.pulls.len(), 200);
    assert_eq!(opening.total_value, 200 * MAX_CARD_VALUE);

    let stats = engine.collection_stats("alice").await.unwrap();
    assert_eq!(stats.kept_value, 200 * MAX_CARD_VALUE);
}

#[tokio::test]
async fn box_detail_reports_drop_odds() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 100, 5).await;
    engine
        .add_card("admin", box_id, card("Snorlax", 80, 100.0))
        .await
        .unwrap();

    let detail = engine.box_detail(box_id).await.unwrap();
    assert_eq!(detail.cards.len(), 5);
    let sum: f64 = detail.cards.iter().map(|c| c.probability).sum();
    assert!((sum - 1.0).abs() < 1e-9);

    let snorlax = detail.cards.iter().find(|c| c.card.name == "Snorlax").unwrap();
    assert!((snorlax.probability - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn sell_pull_credits_card_value_once() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 50, 1).await;
    engine.grant_coins("alice", 50, None).await.unwrap();

    let opening = engine.open_pack("alice", box_id, 1).await.unwrap();
    let pulled = &opening.pulls[0];

    assert!(matches!(
        engine.sell_pull("bob", pulled.pull.id).await,
        Err(EngineError::Forbidden(_))
    ));

    let balance = engine.sell_pull("alice", pulled.pull.id).await.unwrap();
    assert_eq!(balance, opening.balance + pulled.card.coin_value);

    assert!(matches!(
        engine.sell_pull("alice", pulled.pull.id).await,
        Err(EngineError::InvalidState(_))
    ));

    let sold = engine
        .list_pulls(
            "alice",
            &PullListFilter {
                status: Some(PullStatus::Sold),
                box_id: None,
            },
            None,
            10,
        )
        .await
        .unwrap();
    assert_eq!(sold.pulls.len(), 1);

    let stats = engine.collection_stats("alice").await.unwrap();
    assert_eq!(stats.pulls_owned, 1);
    assert_eq!(stats.sold_value, pulled.card.coin_value);
    assert_eq!(stats.kept_value, 0);
}

#[tokio::test]
async fn list_pulls_paginates_without_overlap() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 10, 5).await;
    engine.grant_coins("alice", 10, None).await.unwrap();
    engine.open_pack("alice", box_id, 1).await.unwrap();

    let filter = PullListFilter::default();
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = engine
            .list_pulls("alice", &filter, cursor.as_deref(), 2)
            .await
            .unwrap();
        assert!(page.pulls.len() <= 2);
        seen.extend(page.pulls.iter().map(|p| p.pull.id));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen.len(), 5);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);

    assert!(matches!(
        engine.list_pulls("alice", &filter, Some("not-a-cursor"), 2).await,
        Err(EngineError::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn full_battle_hands_every_card_to_the_winner() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 100, 3).await;
    engine.grant_coins("alice", 1000, None).await.unwrap();
    engine.grant_coins("bob", 1000, None).await.unwrap();

    let created = engine
        .create_battle("alice", box_id, 2, 2, BattleMode::Highest)
        .await
        .unwrap();
    assert_eq!(created.battle.entry_fee, 200);
    assert_eq!(created.battle.status, BattleStatus::Open);
    assert_eq!(engine.user("alice").await.unwrap().coins, 800);

    let finished = engine.join_battle("bob", created.battle.id).await.unwrap();
    assert_eq!(finished.battle.status, BattleStatus::Finished);
    assert_eq!(finished.participants.len(), 2);
    assert_eq!(finished.pulls.len(), 2 * 2 * 3);

    let winner = finished.battle.winner_id.clone().unwrap();
    assert!(finished.pulls.iter().all(|p| p.pull.user_id == winner));
    for participant in &finished.participants {
        let pulled: i64 = finished
            .pulls
            .iter()
            .filter(|p| p.pull.pulled_by == participant.user_id)
            .map(|p| p.card.coin_value)
            .sum();
        assert_eq!(pulled, participant.total_value);
    }

    let best = finished
        .participants
        .iter()
        .map(|p| p.total_value)
        .max()
        .unwrap();
    let first_best = finished
        .participants
        .iter()
        .find(|p| p.total_value == best)
        .unwrap();
    assert_eq!(first_best.user_id, winner);

    let loser = if winner == "alice" { "bob" } else { "alice" };
    let loser_pulls = engine
        .list_pulls(loser, &PullListFilter::default(), None, 100)
        .await
        .unwrap();
    assert!(loser_pulls.pulls.is_empty());

    let winner_achievements = engine.achievements(&winner).await.unwrap();
    assert!(
        winner_achievements
            .iter()
            .any(|a| a.achievement == Achievement::FirstBattleWin && a.unlocked_at.is_some())
    );

    assert!(matches!(
        engine.join_battle("admin", created.battle.id).await,
        Err(EngineError::InvalidState(_))
    ));
}

#[tokio::test]
async fn lowest_mode_rewards_the_smallest_haul() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 10, 5).await;
    for user in ["alice", "bob", "admin"] {
        engine.grant_coins(user, 1000, None).await.unwrap();
    }

    let battle = engine
        .create_battle("alice", box_id, 3, 3, BattleMode::Lowest)
        .await
        .unwrap();
    let open = engine.join_battle("bob", battle.battle.id).await.unwrap();
    assert_eq!(open.battle.status, BattleStatus::Open);
    let done = engine.join_battle("admin", battle.battle.id).await.unwrap();

    let lowest = done
        .participants
        .iter()
        .map(|p| p.total_value)
        .min()
        .unwrap();
    let winner = done.battle.winner_id.unwrap();
    let winner_total = done
        .participants
        .iter()
        .find(|p| p.user_id == winner)
        .unwrap()
        .total_value;
    assert_eq!(winner_total, lowest);
}

#[tokio::test]
async fn battle_seating_rules() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 100, 1).await;
    engine.grant_coins("alice", 500, None).await.unwrap();
    engine.grant_coins("bob", 50, None).await.unwrap();

    let battle = engine
        .create_battle("alice", box_id, 1, 3, BattleMode::Random)
        .await
        .unwrap();
    let id = battle.battle.id;

    assert!(matches!(
        engine.join_battle("alice", id).await,
        Err(EngineError::ExistingKey(_))
    ));
    assert!(matches!(
        engine.join_battle("bob", id).await,
        Err(EngineError::InsufficientFunds(_))
    ));
    assert!(matches!(
        engine.create_battle("alice", box_id, 1, 5, BattleMode::Highest).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.leave_battle("alice", id).await,
        Err(EngineError::InvalidState(_))
    ));
}

#[tokio::test]
async fn leave_and_cancel_refund_entry_fees() {
    let (engine, _db) = engine_with_db().await;
    let box_id = base_box(&engine, 100, 1).await;
    engine.grant_coins("alice", 500, None).await.unwrap();
    engine.grant_coins("bob", 500, None).await.unwrap();

    let battle = engine
        .create_battle("alice", box_id, 2, 3, BattleMode::Highest)
        .await
        .unwrap();
    let id = battle.battle.id;
    engine.join_battle("bob", id).await.unwrap();
    assert_eq!(engine.user("bob").await.unwrap().coins, 300);

    engine.leave_battle("bob", id).await.unwrap();
    assert_eq!(engine.user("bob").await.unwrap().coins, 500);
    assert_eq!(engine.battle(id).await.unwrap().participants.len(), 1);

    engine.join_battle("bob", id).await.unwrap();
    assert!(matches!(
        engine.cancel_battle("bob", id).await,
        Err(EngineError::Forbidden(_))
    ));
    engine.cancel_battle("alice", id).await.unwrap();

    assert_eq!(engine.user("alice").await.unwrap().coins, 500);
    assert_eq!(engine.user("bob").await.unwrap().coins, 500);
    let detail = engine.battle(id).await.unwrap();
    assert_eq!(detail.battle.status, BattleStatus::Cancelled);
    assert!(detail.pulls.is_empty());

    let open = engine
        .list_battles(Some(BattleStatus::Open), 10)
        .await
        .unwrap();
    assert!(open.is_empty());
    let cancelled = engine
        .list_battles(Some(BattleStatus::Cancelled), 10)
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn big_hit_unlocks_once_with_reward() {
    let (engine, _db) = engine_with_db().await;
    let box_id = engine
        .new_box(
            "admin",
            "Vault",
            None,
            10,
            1,
            vec![card("Gold Star", 1000, 1.0)],
        )
        .await
        .unwrap();
    engine.grant_coins("alice", 20, None).await.unwrap();

    let first = engine.open_pack("alice", box_id, 1).await.unwrap();
    assert!(first.unlocked.contains(&Achievement::BigHit));
    assert!(first.unlocked.contains(&Achievement::FirstPull));
    assert_eq!(first.balance, 20 - 10 + 50 + 10);

    let second = engine.open_pack("alice", box_id, 1).await.unwrap();
    assert!(second.unlocked.is_empty());
    assert_eq!(second.balance, first.balance - 10);
}

#[tokio::test]
async fn grant_coins_validates_input() {
    let (engine, _db) = engine_with_db().await;
    assert!(matches!(
        engine.grant_coins("alice", 0, None).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.grant_coins("nobody", 10, None).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.new_user("alice", "again", false).await,
        Err(EngineError::ExistingKey(_))
    ));
}

#[tokio::test]
async fn racing_joins_seat_exactly_one_player() {
    let (engine, path) = engine_with_file_db("join").await;
    let box_id = base_box(&engine, 100, 2).await;
    for user in ["alice", "bob", "carol"] {
        engine.grant_coins(user, 1000, None).await.unwrap();
    }

    let battle = engine
        .create_battle("alice", box_id, 1, 2, BattleMode::Highest)
        .await
        .unwrap();
    let id = battle.battle.id;

    let engine = &engine;
    let (bob, carol) = tokio::join!(
        with_retry(patient(), move || engine.join_battle("bob", id)),
        with_retry(patient(), move || engine.join_battle("carol", id)),
    );

    let (seated, loser, err) = match (bob, carol) {
        (Ok(_), Err(err)) => ("bob", "carol", err),
        (Err(err), Ok(_)) => ("carol", "bob", err),
        other => panic!("expected exactly one join to win: {other:?}"),
    };
    assert!(matches!(err, EngineError::InvalidState(_)), "{err:?}");

    let detail = engine.battle(id).await.unwrap();
    assert_eq!(detail.battle.status, BattleStatus::Finished);
    let seats: Vec<&str> = detail
        .participants
        .iter()
        .map(|p| p.user_id.as_str())
        .collect();
    assert_eq!(seats, vec!["alice", seated]);

    assert_eq!(engine.user(loser).await.unwrap().coins, 1000);
    assert!(
        engine
            .coin_history(loser, 10)
            .await
            .unwrap()
            .iter()
            .all(|tx| tx.kind != CoinTransactionKind::BattleEntry)
    );

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn racing_sales_pay_out_once() {
    let (engine, path) = engine_with_file_db("sell").await;
    let box_id = base_box(&engine, 50, 1).await;
    engine.grant_coins("alice", 50, None).await.unwrap();
    let opening = engine.open_pack("alice", box_id, 1).await.unwrap();
    let pull_id = opening.pulls[0].pull.id;
    let value = opening.pulls[0].card.coin_value;

    let engine = &engine;
    let (first, second) = tokio::join!(
        with_retry(patient(), move || engine.sell_pull("alice", pull_id)),
        with_retry(patient(), move || engine.sell_pull("alice", pull_id)),
    );

    let sold: Vec<_> = [&first, &second].into_iter().filter(|r| r.is_ok()).collect();
    assert_eq!(sold.len(), 1);
    assert!(
        [first, second]
            .into_iter()
            .filter_map(Result::err)
            .all(|err| matches!(err, EngineError::InvalidState(_)))
    );
    assert_eq!(
        engine.user("alice").await.unwrap().coins,
        opening.balance + value
    );

    let _ = std::fs::remove_file(path);
}
