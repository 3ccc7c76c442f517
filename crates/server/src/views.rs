//! Conversions from engine types to response bodies.

use api_types::{
    battle::{BattleMode as ApiMode, BattleStatus as ApiStatus, BattleView, ParticipantView},
    boxes::{BoxView, CardView},
    pull::{PullStatus as ApiPullStatus, PullView},
};

pub fn map_pull_status(status: engine::PullStatus) -> ApiPullStatus {
    match status {
        engine::PullStatus::Kept => ApiPullStatus::Kept,
        engine::PullStatus::Sold => ApiPullStatus::Sold,
    }
}

pub fn map_battle_mode(mode: engine::BattleMode) -> ApiMode {
    match mode {
        engine::BattleMode::Highest => ApiMode::Highest,
        engine::BattleMode::Lowest => ApiMode::Lowest,
        engine::BattleMode::Random => ApiMode::Random,
    }
}

pub fn map_battle_status(status: engine::BattleStatus) -> ApiStatus {
    match status {
        engine::BattleStatus::Open => ApiStatus::Open,
        engine::BattleStatus::Finished => ApiStatus::Finished,
        engine::BattleStatus::Cancelled => ApiStatus::Cancelled,
    }
}

pub fn box_view(pack_box: engine::PackBox) -> BoxView {
    BoxView {
        id: pack_box.id,
        name: pack_box.name,
        description: pack_box.description,
        price: pack_box.price,
        cards_per_pack: pack_box.cards_per_pack,
        active: pack_box.active,
        created_at: pack_box.created_at,
    }
}

pub fn card_view(card: engine::Card) -> CardView {
    CardView {
        id: card.id,
        box_id: card.box_id,
        name: card.name,
        rarity: card.rarity,
        coin_value: card.coin_value,
        pull_rate: card.pull_rate,
        image_url: card.image_url,
    }
}

pub fn pull_view(pulled: engine::PulledCard) -> PullView {
    let engine::PulledCard { pull, card } = pulled;
    PullView {
        id: pull.id,
        owner: pull.user_id,
        pulled_by: pull.pulled_by,
        status: map_pull_status(pull.status),
        battle_id: pull.battle_id,
        round: pull.round,
        created_at: pull.created_at,
        card: card_view(card),
    }
}

pub fn battle_view(battle: engine::Battle) -> BattleView {
    BattleView {
        id: battle.id,
        creator: battle.creator_id,
        box_id: battle.box_id,
        rounds: battle.rounds,
        max_participants: battle.max_participants,
        mode: map_battle_mode(battle.mode),
        status: map_battle_status(battle.status),
        entry_fee: battle.entry_fee,
        winner: battle.winner_id,
        created_at: battle.created_at,
        finished_at: battle.finished_at,
    }
}

pub fn participant_view(participant: engine::Participant) -> ParticipantView {
    ParticipantView {
        username: participant.user_id,
        seat: participant.seat,
        total_value: participant.total_value,
        joined_at: participant.joined_at,
    }
}
