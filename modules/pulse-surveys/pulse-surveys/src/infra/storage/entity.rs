//! `SeaORM` entities for pulse surveys.

pub use company::Entity as CompanyEntity;
pub use invitation::Entity as InvitationEntity;
pub use participant::Entity as ParticipantEntity;
pub use response::Entity as ResponseEntity;
pub use survey::Entity as SurveyEntity;

/// Survey entity for the `surveys` table.
pub mod survey {
    use sea_orm::entity::prelude::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "surveys")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub blocks: Json,
        pub status: String,
        pub is_anonymous: bool,
        pub starts_at: Option<OffsetDateTime>,
        pub ends_at: Option<OffsetDateTime>,
        /// Serialized `CompanyAssignment`.
        pub assignment: Json,
        pub created_by: Uuid,
        pub created_at: OffsetDateTime,
        pub updated_at: OffsetDateTime,
        pub last_status_change_by: Option<Uuid>,
        pub last_status_change_at: Option<OffsetDateTime>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::response::Entity")]
        Responses,
    }

    impl Related<super::response::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Responses.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Invitation entity for the `invitations` table.
///
/// The target is flattened: `kind` selects which of `company_id`,
/// `company_name` and `survey_id` are meaningful.
pub mod invitation {
    use sea_orm::entity::prelude::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    pub const KIND_COMPANY_JOIN: &str = "company_join";
    pub const KIND_SURVEY_RESPONSE: &str = "survey_response";

    pub const REDEEMED_BY_USER: &str = "user";
    pub const REDEEMED_BY_RESPONSE: &str = "response";
    pub const REDEEMED_BY_ANONYMOUS: &str = "anonymous";

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "invitations")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub kind: String,
        pub company_id: Option<Uuid>,
        pub company_name: Option<String>,
        pub survey_id: Option<Uuid>,
        pub email: String,
        pub display_name: String,
        pub role: String,
        #[sea_orm(unique)]
        pub code: String,
        pub expiry_days: i32,
        pub issued_by: Uuid,
        pub issued_at: OffsetDateTime,
        pub expires_at: OffsetDateTime,
        pub redeemed_at: Option<OffsetDateTime>,
        pub redeemed_by_kind: Option<String>,
        pub redeemed_by_id: Option<Uuid>,
        /// Digest of (target, email) while the invitation may still be used;
        /// null once redeemed or released after expiry.
        #[sea_orm(unique)]
        pub active_slot: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Response entity for the `survey_responses` table.
pub mod response {
    use sea_orm::entity::prelude::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    pub const RESPONDENT_USER: &str = "user";
    pub const RESPONDENT_INVITATION: &str = "invitation";
    pub const RESPONDENT_ANONYMOUS: &str = "anonymous";

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "survey_responses")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub survey_id: Uuid,
        /// Unique together with `survey_id`.
        pub respondent_key: String,
        pub user_id: Option<Uuid>,
        pub company_id: Option<Uuid>,
        pub company_name: Option<String>,
        pub company_name_key: Option<String>,
        pub answers: Json,
        pub respondent_kind: String,
        pub respondent_id: Option<Uuid>,
        pub anonymized: bool,
        pub completed_at: OffsetDateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::survey::Entity",
            from = "Column::SurveyId",
            to = "super::survey::Column::Id"
        )]
        Survey,
    }

    impl Related<super::survey::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Survey.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Company entity for the `companies` directory table.
pub mod company {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "companies")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
        pub name_key: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Participant entity for the `participants` directory table.
pub mod participant {
    use sea_orm::entity::prelude::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "participants")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub company_id: Option<Uuid>,
        pub company_name: Option<String>,
        pub company_name_key: Option<String>,
        pub active: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
