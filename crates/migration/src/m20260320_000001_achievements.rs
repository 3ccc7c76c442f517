use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Username,
}

#[derive(Iden)]
enum UserAchievements {
    Table,
    UserId,
    Code,
    UnlockedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserAchievements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserAchievements::UserId).string().not_null())
                    .col(ColumnDef::new(UserAchievements::Code).string().not_null())
                    .col(
                        ColumnDef::new(UserAchievements::UnlockedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserAchievements::UserId)
                            .col(UserAchievements::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_achievements-user_id")
                            .from(UserAchievements::Table, UserAchievements::UserId)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAchievements::Table).to_owned())
            .await
    }
}
