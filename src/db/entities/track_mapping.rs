use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "track_mappings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub track_id: i64,
    pub connector_track_id: i64,
    pub match_method: String,
    pub confidence: i32,
    pub confidence_evidence: Option<Json>,
    pub metadata: Option<Json>,
    pub last_verified: Option<DateTimeWithTimeZone>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::track::Entity",
        from = "Column::TrackId",
        to = "super::track::Column::Id",
        on_delete = "Cascade"
    )]
    Track,
    #[sea_orm(
        belongs_to = "super::connector_track::Entity",
        from = "Column::ConnectorTrackId",
        to = "super::connector_track::Column::Id",
        on_delete = "Cascade"
    )]
    ConnectorTrack,
}

impl Related<super::track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Track.def()
    }
}

impl Related<super::connector_track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConnectorTrack.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
