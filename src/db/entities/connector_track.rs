use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "connector_tracks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub connector_name: String,
    pub connector_track_id: String,
    pub title: String,
    pub artists: Json,
    pub album: Option<String>,
    pub duration_ms: Option<i32>,
    pub release_date: Option<DateTimeWithTimeZone>,
    pub isrc: Option<String>,
    pub raw_metadata: Json,
    pub last_updated: DateTimeWithTimeZone,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::track_mapping::Entity")]
    TrackMapping,
}

impl Related<super::track_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackMapping.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
