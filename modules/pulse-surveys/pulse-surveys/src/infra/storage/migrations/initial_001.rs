use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Surveys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Surveys::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Surveys::Title).string().not_null())
                    .col(ColumnDef::new(Surveys::Description).text().not_null())
                    .col(ColumnDef::new(Surveys::Blocks).json().not_null())
                    .col(ColumnDef::new(Surveys::Status).string().not_null())
                    .col(ColumnDef::new(Surveys::IsAnonymous).boolean().not_null())
                    .col(ColumnDef::new(Surveys::StartsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Surveys::EndsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Surveys::Assignment).json().not_null())
                    .col(ColumnDef::new(Surveys::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Surveys::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Surveys::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Surveys::LastStatusChangeBy).uuid())
                    .col(ColumnDef::new(Surveys::LastStatusChangeAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invitations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invitations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invitations::Kind).string().not_null())
                    .col(ColumnDef::new(Invitations::CompanyId).uuid())
                    .col(ColumnDef::new(Invitations::CompanyName).string())
                    .col(ColumnDef::new(Invitations::SurveyId).uuid())
                    .col(ColumnDef::new(Invitations::Email).string().not_null())
                    .col(ColumnDef::new(Invitations::DisplayName).string().not_null())
                    .col(ColumnDef::new(Invitations::Role).string().not_null())
                    .col(ColumnDef::new(Invitations::Code).string().not_null())
                    .col(ColumnDef::new(Invitations::ExpiryDays).integer().not_null())
                    .col(ColumnDef::new(Invitations::IssuedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Invitations::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invitations::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invitations::RedeemedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Invitations::RedeemedByKind).string())
                    .col(ColumnDef::new(Invitations::RedeemedById).uuid())
                    .col(ColumnDef::new(Invitations::ActiveSlot).string())
                    .to_owned(),
            )
            .await?;

        // Codes are looked up without the target, so they are globally unique.
        manager
            .create_index(
                Index::create()
                    .name("ux_invitations_code")
                    .table(Invitations::Table)
                    .col(Invitations::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // At most one usable invitation per (target, email). Nulls never collide.
        manager
            .create_index(
                Index::create()
                    .name("ux_invitations_active_slot")
                    .table(Invitations::Table)
                    .col(Invitations::ActiveSlot)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invitations_target_email")
                    .table(Invitations::Table)
                    .col(Invitations::Kind)
                    .col(Invitations::SurveyId)
                    .col(Invitations::CompanyId)
                    .col(Invitations::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SurveyResponses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SurveyResponses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SurveyResponses::SurveyId).uuid().not_null())
                    .col(
                        ColumnDef::new(SurveyResponses::RespondentKey)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SurveyResponses::UserId).uuid())
                    .col(ColumnDef::new(SurveyResponses::CompanyId).uuid())
                    .col(ColumnDef::new(SurveyResponses::CompanyName).string())
                    .col(ColumnDef::new(SurveyResponses::CompanyNameKey).string())
                    .col(ColumnDef::new(SurveyResponses::Answers).json().not_null())
                    .col(
                        ColumnDef::new(SurveyResponses::RespondentKind)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SurveyResponses::RespondentId).uuid())
                    .col(
                        ColumnDef::new(SurveyResponses::Anonymized)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SurveyResponses::CompletedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SurveyResponses::Table, SurveyResponses::SurveyId)
                            .to(Surveys::Table, Surveys::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // One response per respondent per survey.
        manager
            .create_index(
                Index::create()
                    .name("ux_survey_responses_respondent")
                    .table(SurveyResponses::Table)
                    .col(SurveyResponses::SurveyId)
                    .col(SurveyResponses::RespondentKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_survey_responses_user")
                    .table(SurveyResponses::Table)
                    .col(SurveyResponses::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Companies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Companies::Name).string().not_null())
                    .col(ColumnDef::new(Companies::NameKey).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_companies_name_key")
                    .table(Companies::Table)
                    .col(Companies::NameKey)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Participants::CompanyId).uuid())
                    .col(ColumnDef::new(Participants::CompanyName).string())
                    .col(ColumnDef::new(Participants::CompanyNameKey).string())
                    .col(
                        ColumnDef::new(Participants::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SurveyResponses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invitations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Surveys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Surveys {
    Table,
    Id,
    Title,
    Description,
    Blocks,
    Status,
    IsAnonymous,
    StartsAt,
    EndsAt,
    Assignment,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    LastStatusChangeBy,
    LastStatusChangeAt,
}

#[derive(DeriveIden)]
enum Invitations {
    Table,
    Id,
    Kind,
    CompanyId,
    CompanyName,
    SurveyId,
    Email,
    DisplayName,
    Role,
    Code,
    ExpiryDays,
    IssuedBy,
    IssuedAt,
    ExpiresAt,
    RedeemedAt,
    RedeemedByKind,
    RedeemedById,
    ActiveSlot,
}

#[derive(DeriveIden)]
enum SurveyResponses {
    Table,
    Id,
    SurveyId,
    RespondentKey,
    UserId,
    CompanyId,
    CompanyName,
    CompanyNameKey,
    Answers,
    RespondentKind,
    RespondentId,
    Anonymized,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    NameKey,
}

#[derive(DeriveIden)]
enum Participants {
    Table,
    Id,
    CompanyId,
    CompanyName,
    CompanyNameKey,
    Active,
}
