//! Initial schema.
//!
//! - `users`: credentials and coin balance
//! - `boxes`: purchasable pack definitions
//! - `cards`: weighted card pool of each box
//! - `pulls`: cards owned by users
//! - `battles` / `battle_participants`: multiplayer pack battles
//! - `coin_transactions`: append-only coin ledger

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Coins,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
enum Boxes {
    Table,
    Id,
    Name,
    NameNorm,
    Description,
    Price,
    CardsPerPack,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum Cards {
    Table,
    Id,
    BoxId,
    Name,
    Rarity,
    CoinValue,
    PullRate,
    ImageUrl,
}

#[derive(Iden)]
enum Pulls {
    Table,
    Id,
    UserId,
    PulledBy,
    CardId,
    BoxId,
    BattleId,
    Round,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Battles {
    Table,
    Id,
    CreatorId,
    BoxId,
    Rounds,
    MaxParticipants,
    Mode,
    Status,
    EntryFee,
    WinnerId,
    CreatedAt,
    FinishedAt,
}

#[derive(Iden)]
enum BattleParticipants {
    Table,
    BattleId,
    UserId,
    Seat,
    TotalValue,
    JoinedAt,
}

#[derive(Iden)]
enum CoinTransactions {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    BalanceAfter,
    Reference,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::Coins)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Users::Coins).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Boxes and their cards
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Boxes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Boxes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Boxes::Name).string().not_null())
                    .col(ColumnDef::new(Boxes::NameNorm).string().not_null())
                    .col(ColumnDef::new(Boxes::Description).string())
                    .col(ColumnDef::new(Boxes::Price).big_integer().not_null())
                    .col(ColumnDef::new(Boxes::CardsPerPack).integer().not_null())
                    .col(
                        ColumnDef::new(Boxes::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Boxes::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-boxes-name_norm-unique")
                    .table(Boxes::Table)
                    .col(Boxes::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Cards::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Cards::BoxId).string().not_null())
                    .col(ColumnDef::new(Cards::Name).string().not_null())
                    .col(ColumnDef::new(Cards::Rarity).string().not_null())
                    .col(ColumnDef::new(Cards::CoinValue).big_integer().not_null())
                    .col(ColumnDef::new(Cards::PullRate).double().not_null())
                    .col(ColumnDef::new(Cards::ImageUrl).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cards-box_id")
                            .from(Cards::Table, Cards::BoxId)
                            .to(Boxes::Table, Boxes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cards-box_id")
                    .table(Cards::Table)
                    .col(Cards::BoxId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Battles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Battles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Battles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Battles::CreatorId).string().not_null())
                    .col(ColumnDef::new(Battles::BoxId).string().not_null())
                    .col(ColumnDef::new(Battles::Rounds).integer().not_null())
                    .col(ColumnDef::new(Battles::MaxParticipants).integer().not_null())
                    .col(ColumnDef::new(Battles::Mode).string().not_null())
                    .col(ColumnDef::new(Battles::Status).string().not_null())
                    .col(ColumnDef::new(Battles::EntryFee).big_integer().not_null())
                    .col(ColumnDef::new(Battles::WinnerId).string())
                    .col(ColumnDef::new(Battles::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Battles::FinishedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-battles-creator_id")
                            .from(Battles::Table, Battles::CreatorId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-battles-box_id")
                            .from(Battles::Table, Battles::BoxId)
                            .to(Boxes::Table, Boxes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-battles-status-created_at")
                    .table(Battles::Table)
                    .col(Battles::Status)
                    .col(Battles::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BattleParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BattleParticipants::BattleId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BattleParticipants::UserId).string().not_null())
                    .col(ColumnDef::new(BattleParticipants::Seat).integer().not_null())
                    .col(
                        ColumnDef::new(BattleParticipants::TotalValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BattleParticipants::JoinedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(BattleParticipants::BattleId)
                            .col(BattleParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-battle_participants-battle_id")
                            .from(BattleParticipants::Table, BattleParticipants::BattleId)
                            .to(Battles::Table, Battles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-battle_participants-user_id")
                            .from(BattleParticipants::Table, BattleParticipants::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // Two concurrent joins must not end up on the same seat.
        manager
            .create_index(
                Index::create()
                    .name("idx-battle_participants-battle_id-seat-unique")
                    .table(BattleParticipants::Table)
                    .col(BattleParticipants::BattleId)
                    .col(BattleParticipants::Seat)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Pulls
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Pulls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pulls::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Pulls::UserId).string().not_null())
                    .col(ColumnDef::new(Pulls::PulledBy).string().not_null())
                    .col(ColumnDef::new(Pulls::CardId).string().not_null())
                    .col(ColumnDef::new(Pulls::BoxId).string().not_null())
                    .col(ColumnDef::new(Pulls::BattleId).string())
                    .col(ColumnDef::new(Pulls::Round).integer())
                    .col(
                        ColumnDef::new(Pulls::Status)
                            .string()
                            .not_null()
                            .default("kept"),
                    )
                    .col(ColumnDef::new(Pulls::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pulls-user_id")
                            .from(Pulls::Table, Pulls::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pulls-card_id")
                            .from(Pulls::Table, Pulls::CardId)
                            .to(Cards::Table, Cards::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pulls-battle_id")
                            .from(Pulls::Table, Pulls::BattleId)
                            .to(Battles::Table, Battles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-pulls-user_id-created_at")
                    .table(Pulls::Table)
                    .col(Pulls::UserId)
                    .col(Pulls::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-pulls-battle_id")
                    .table(Pulls::Table)
                    .col(Pulls::BattleId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Coin ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CoinTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CoinTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CoinTransactions::UserId).string().not_null())
                    .col(ColumnDef::new(CoinTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(CoinTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CoinTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CoinTransactions::Reference).string())
                    .col(
                        ColumnDef::new(CoinTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-coin_transactions-user_id")
                            .from(CoinTransactions::Table, CoinTransactions::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-coin_transactions-user_id-created_at")
                    .table(CoinTransactions::Table)
                    .col(CoinTransactions::UserId)
                    .col(CoinTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse order of creation (FK dependencies).
        manager
            .drop_table(Table::drop().table(CoinTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Pulls::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BattleParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Battles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boxes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
